use super::allocation::FrequencyAllocation;


// Width in MHz of the intersection of two occupied ranges. Ranges that only
// touch do not overlap.
#[must_use]
pub fn overlap(
    allocation1: &FrequencyAllocation,
    allocation2: &FrequencyAllocation
) -> f64 {
    let range1 = allocation1.range();
    let range2 = allocation2.range();

    (range1.end.min(range2.end) - range1.start.max(range2.start)).max(0.0)
}

// Overlap relative to the narrower channel, in [0, 1].
#[must_use]
pub fn overlap_fraction(
    allocation1: &FrequencyAllocation,
    allocation2: &FrequencyAllocation
) -> f64 {
    let narrower_width = allocation1.width().min(allocation2.width());

    (overlap(allocation1, allocation2) / f64::from(narrower_width)).clamp(0.0, 1.0)
}
