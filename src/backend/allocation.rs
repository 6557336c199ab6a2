use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mathphysics::Megahertz;


#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),
}


// Occupied spectrum in megahertz. Endpoints may be fractional for odd widths.
#[derive(Clone, Copy, Debug, Display, PartialEq, Serialize)]
#[display("[{start}, {end}]")]
pub struct FrequencyRange {
    pub start: f64,
    pub end: f64,
}

impl FrequencyRange {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    #[must_use]
    pub fn contains_range(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}


// Only the center and the width are stored. The occupied range is always
// derived from them.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize, Deserialize
)]
#[serde(try_from = "RawAllocation")]
#[display("{center}/{width} MHz")]
pub struct FrequencyAllocation {
    center: Megahertz,
    width: Megahertz,
}

impl FrequencyAllocation {
    /// # Errors
    ///
    /// Will return `Err` if the width is zero or the occupied range would
    /// reach below 0 MHz.
    pub fn build(
        center: Megahertz,
        width: Megahertz
    ) -> Result<Self, AllocationError> {
        if width == 0 {
            return Err(AllocationError::InvalidAllocation(
                format!("channel width must be positive (center {center})")
            ));
        }
        if center == 0 || u64::from(center) * 2 <= u64::from(width) {
            return Err(AllocationError::InvalidAllocation(
                format!("center {center} MHz does not fit width {width} MHz")
            ));
        }

        Ok(Self { center, width })
    }

    /// # Errors
    ///
    /// Will return `Err` if either value is not a finite positive whole number
    /// of megahertz, or if [`FrequencyAllocation::build`] rejects it.
    pub fn from_raw(center: f64, width: f64) -> Result<Self, AllocationError> {
        let center = whole_megahertz(center, "center")?;
        let width  = whole_megahertz(width, "width")?;

        Self::build(center, width)
    }

    #[must_use]
    pub fn center(&self) -> Megahertz {
        self.center
    }

    #[must_use]
    pub fn width(&self) -> Megahertz {
        self.width
    }

    #[must_use]
    pub fn range(&self) -> FrequencyRange {
        let half_width = f64::from(self.width) / 2.0;

        FrequencyRange {
            start: f64::from(self.center) - half_width,
            end: f64::from(self.center) + half_width,
        }
    }

    // Same width, different center.
    #[must_use]
    pub fn retuned_to(&self, center: Megahertz) -> Option<Self> {
        Self::build(center, self.width).ok()
    }

    #[must_use]
    pub fn center_distance(&self, other: &Self) -> Megahertz {
        self.center.abs_diff(other.center)
    }
}

fn whole_megahertz(
    value: f64,
    field: &str
) -> Result<Megahertz, AllocationError> {
    if !value.is_finite() || value <= 0.0 || value.fract() != 0.0
        || value > f64::from(Megahertz::MAX)
    {
        return Err(AllocationError::InvalidAllocation(
            format!("{field} `{value}` is not a positive whole number of MHz")
        ));
    }

    // Checked above: finite, integral and in range.
    Ok(value as Megahertz)
}


#[derive(Deserialize)]
struct RawAllocation {
    center: f64,
    width: f64,
}

impl TryFrom<RawAllocation> for FrequencyAllocation {
    type Error = AllocationError;

    fn try_from(raw: RawAllocation) -> Result<Self, Self::Error> {
        Self::from_raw(raw.center, raw.width)
    }
}
