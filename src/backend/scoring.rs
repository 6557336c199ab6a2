use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::allocation::FrequencyAllocation;
use super::device::DeviceIndex;
use super::overlap::{overlap, overlap_fraction};
use super::propagation::{PairGeometry, PropagationEstimate, PropagationModel};


pub const DEFAULT_MATERIALITY_THRESHOLD: f64 = 0.1;

pub const DEFAULT_OVERLAP_WEIGHT: f64     = 0.5;
pub const DEFAULT_PROPAGATION_WEIGHT: f64 = 0.3;
pub const DEFAULT_UTILIZATION_WEIGHT: f64 = 0.2;

const HIGH_SEVERITY_THRESHOLD: f64   = 0.7;
const MEDIUM_SEVERITY_THRESHOLD: f64 = 0.4;


#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub overlap: f64,
    pub propagation: f64,
    pub utilization: f64,
}

impl ScoreWeights {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.overlap + self.propagation + self.utilization
    }

    #[must_use]
    pub fn has_negative(&self) -> bool {
        self.overlap < 0.0 || self.propagation < 0.0 || self.utilization < 0.0
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            overlap: DEFAULT_OVERLAP_WEIGHT,
            propagation: DEFAULT_PROPAGATION_WEIGHT,
            utilization: DEFAULT_UTILIZATION_WEIGHT,
        }
    }
}


#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum SeverityBand {
    High,
    Medium,
    Low,
}

impl From<f64> for SeverityBand {
    fn from(severity: f64) -> Self {
        if severity > HIGH_SEVERITY_THRESHOLD {
            Self::High
        } else if severity > MEDIUM_SEVERITY_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreInputs {
    pub overlap_mhz: f64,
    pub overlap_fraction: f64,
    pub propagation: PropagationEstimate,
    // Load of the busier device, in [0, 1].
    pub utilization: f64,
}


// Unordered pair, stored with `source < target`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ConflictEdge {
    pub source: DeviceIndex,
    pub target: DeviceIndex,
    pub overlap_mhz: f64,
    pub propagation: PropagationEstimate,
    pub severity: f64,
}

impl ConflictEdge {
    #[must_use]
    pub fn band(&self) -> SeverityBand {
        SeverityBand::from(self.severity)
    }

    #[must_use]
    pub fn touches(&self, device: DeviceIndex) -> bool {
        self.source == device || self.target == device
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scorer {
    weights: ScoreWeights,
    model: PropagationModel,
    materiality_threshold: f64,
}

impl Scorer {
    #[must_use]
    pub fn new(
        weights: ScoreWeights,
        model: PropagationModel,
        materiality_threshold: f64
    ) -> Self {
        Self { weights, model, materiality_threshold }
    }

    #[must_use]
    pub fn model(&self) -> &PropagationModel {
        &self.model
    }

    #[must_use]
    pub fn materiality_threshold(&self) -> f64 {
        self.materiality_threshold
    }

    #[must_use]
    pub fn is_material(&self, severity: f64) -> bool {
        severity > self.materiality_threshold
    }

    // Spectral overlap and propagation significance are both hard gates.
    // Past them, severity is the weighted sum of the three factors.
    #[must_use]
    pub fn score(&self, inputs: &ScoreInputs) -> f64 {
        if inputs.overlap_mhz <= 0.0 || !inputs.propagation.significant {
            return 0.0;
        }

        let propagation_factor = self.model
            .strength_factor(inputs.propagation.attenuation_db)
            * inputs.propagation.beam_coupling;

        let severity = self.weights.overlap * inputs.overlap_fraction
            + self.weights.propagation * propagation_factor
            + self.weights.utilization * inputs.utilization.clamp(0.0, 1.0);

        severity.clamp(0.0, 1.0)
    }

    // Both directions are estimated, each at its transmitter's frequency.
    // The stronger one represents the pair.
    #[must_use]
    pub fn score_pair(
        &self,
        allocation1: &FrequencyAllocation,
        allocation2: &FrequencyAllocation,
        geometry: &PairGeometry,
        utilization: f64,
    ) -> (f64, ScoreInputs) {
        let forward = geometry.estimate_at(allocation1.center(), &self.model);
        let reverse = geometry.reversed()
            .estimate_at(allocation2.center(), &self.model);

        let propagation = if reverse.attenuation_db < forward.attenuation_db {
            reverse
        } else {
            forward
        };

        let inputs = ScoreInputs {
            overlap_mhz: overlap(allocation1, allocation2),
            overlap_fraction: overlap_fraction(allocation1, allocation2),
            propagation,
            utilization,
        };

        (self.score(&inputs), inputs)
    }

    // Severity counted towards residual conflict. Immaterial pairs count as
    // zero, like they are absent from the conflict graph.
    #[must_use]
    pub fn material_severity(
        &self,
        allocation1: &FrequencyAllocation,
        allocation2: &FrequencyAllocation,
        geometry: &PairGeometry,
        utilization: f64,
    ) -> f64 {
        let (severity, _) = self.score_pair(
            allocation1,
            allocation2,
            geometry,
            utilization
        );

        if self.is_material(severity) {
            severity
        } else {
            0.0
        }
    }

    // `None` for pairs at or below the materiality threshold.
    #[must_use]
    pub fn conflict_edge(
        &self,
        source: (DeviceIndex, &FrequencyAllocation),
        target: (DeviceIndex, &FrequencyAllocation),
        geometry: &PairGeometry,
        utilization: f64,
    ) -> Option<ConflictEdge> {
        let (severity, inputs) = self.score_pair(
            source.1,
            target.1,
            geometry,
            utilization
        );

        if !self.is_material(severity) {
            return None;
        }

        Some(ConflictEdge {
            source: source.0.min(target.0),
            target: source.0.max(target.0),
            overlap_mhz: inputs.overlap_mhz,
            propagation: inputs.propagation,
            severity,
        })
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(
            ScoreWeights::default(),
            PropagationModel::default(),
            DEFAULT_MATERIALITY_THRESHOLD
        )
    }
}
