use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::device::DeviceIndex;
use super::grouping::{group, ConflictCluster};
use super::mathphysics::Megahertz;
use super::propagation::{PairGeometry, PropagationModel};
use super::recommendation::{ClusterPlan, ReassignmentConstraints, Recommender};
use super::scoring::{ConflictEdge, ScoreWeights, Scorer, DEFAULT_MATERIALITY_THRESHOLD};
use super::snapshot::{DeviceIssue, IssueKind, Snapshot};


const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;


#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Score weights sum to `{0}` instead of 1.0")]
    WeightSum(f64),
    #[error("Score weights must not be negative")]
    NegativeWeight,
    #[error("Materiality threshold `{0}` is outside [0, 1)")]
    MaterialityOutOfRange(f64),
    #[error("Channel pool is empty")]
    EmptyChannelPool,
    #[error("Band edges `{0}`-`{1}` MHz do not form a band")]
    InvalidBand(Megahertz, Megahertz),
    #[error("Exhaustive search needs a positive cluster size")]
    ZeroExhaustiveSize,
    #[error(
        "Significance threshold `{threshold}` dB is not above the reference \
         attenuation `{reference}` dB"
    )]
    ThresholdBelowReference { threshold: f64, reference: f64 },
}


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub materiality_threshold: f64,
    pub score_weights: ScoreWeights,
    pub propagation: PropagationModel,
    #[serde(flatten)]
    pub reassignment: ReassignmentConstraints,
    // Ignore pairs sharing a site, e.g. radios on one mast.
    pub skip_colocated_pairs: bool,
}

impl AnalysisConfig {
    /// # Errors
    ///
    /// Will return `Err` on the first setting the analysis can not run with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let weights = &self.score_weights;

        if weights.has_negative() {
            return Err(ConfigurationError::NegativeWeight);
        }
        if (weights.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationError::WeightSum(weights.sum()));
        }
        if !(0.0..1.0).contains(&self.materiality_threshold) {
            return Err(ConfigurationError::MaterialityOutOfRange(
                self.materiality_threshold
            ));
        }

        let pool = &self.reassignment.channel_pool;
        if pool.is_empty() {
            return Err(ConfigurationError::EmptyChannelPool);
        }
        if pool.band_start >= pool.band_end {
            return Err(ConfigurationError::InvalidBand(pool.band_start, pool.band_end));
        }
        if self.reassignment.max_exhaustive_cluster_size == 0 {
            return Err(ConfigurationError::ZeroExhaustiveSize);
        }

        let model = &self.propagation;
        if model.significance_threshold_db <= model.reference_attenuation_db {
            return Err(ConfigurationError::ThresholdBelowReference {
                threshold: model.significance_threshold_db,
                reference: model.reference_attenuation_db,
            });
        }

        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: DEFAULT_MATERIALITY_THRESHOLD,
            score_weights: ScoreWeights::default(),
            propagation: PropagationModel::default(),
            reassignment: ReassignmentConstraints::default(),
            skip_colocated_pairs: false,
        }
    }
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    // Sorted by `(source, target)`.
    pub edges: Vec<ConflictEdge>,
    pub clusters: Vec<ConflictCluster>,
    // One per cluster, same order.
    pub plans: Vec<ClusterPlan>,
    pub issues: Vec<DeviceIssue>,
}


#[derive(Clone, Debug)]
pub struct InterferenceEngine {
    config: AnalysisConfig,
    scorer: Scorer,
}

impl InterferenceEngine {
    /// # Errors
    ///
    /// Will return `Err` if [`AnalysisConfig::validate`] fails.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let scorer = Scorer::new(
            config.score_weights,
            config.propagation,
            config.materiality_threshold
        );

        Ok(Self { config, scorer })
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[must_use]
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    #[must_use]
    pub fn analyze(&self, snapshot: &Snapshot) -> Analysis {
        let (located, mut issues) = self.resolve_geometry(snapshot);
        let edges = self.score_pairs(snapshot, &located);
        let clusters = group(&edges);

        let recommender = Recommender::new(
            snapshot,
            &self.scorer,
            &self.config.reassignment
        ).set_skip_colocated_pairs(self.config.skip_colocated_pairs);
        let plans = Self::plan_clusters(&recommender, &clusters);

        issues.extend(recommender.cross_cluster_collisions(&plans));
        issues.extend_from_slice(snapshot.issues());
        issues.sort_by(|issue1, issue2| issue1.device.cmp(&issue2.device));

        info!(
            "Analysed {} devices: {} conflict edges in {} clusters, {} recommendations",
            snapshot.len(),
            edges.len(),
            clusters.len(),
            plans.iter().filter(|plan| plan.recommendation.is_some()).count()
        );

        Analysis { edges, clusters, plans, issues }
    }

    // Analysable devices with a coordinate. The rest are flagged.
    fn resolve_geometry(&self, snapshot: &Snapshot) -> (Vec<DeviceIndex>, Vec<DeviceIssue>) {
        let mut located = Vec::new();
        let mut issues = Vec::new();

        for index in snapshot.analysable_indices() {
            if snapshot.effective_position(index).is_some() {
                located.push(index);
                continue;
            }

            if let Some(device) = snapshot.device(index) {
                issues.push(DeviceIssue {
                    device: device.id().clone(),
                    kind: IssueKind::MissingGeometry,
                });
            }
        }

        debug!("{} analysable devices with geometry", located.len());

        (located, issues)
    }

    fn score_pair(
        &self,
        snapshot: &Snapshot,
        source: DeviceIndex,
        target: DeviceIndex
    ) -> Option<ConflictEdge> {
        if self.config.skip_colocated_pairs && snapshot.same_site(source, target) {
            return None;
        }

        let allocation1 = snapshot.device(source)?.allocation()?;
        let allocation2 = snapshot.device(target)?.allocation()?;
        let geometry = PairGeometry::between(
            snapshot,
            source,
            target,
            self.scorer.model()
        ).ok()?;
        let utilization = snapshot.utilization(source)
            .max(snapshot.utilization(target));

        self.scorer.conflict_edge(
            (source, allocation1),
            (target, allocation2),
            &geometry,
            utilization
        )
    }

    fn score_pairs(&self, snapshot: &Snapshot, located: &[DeviceIndex]) -> Vec<ConflictEdge> {
        let pairs: Vec<(DeviceIndex, DeviceIndex)> = located
            .iter()
            .enumerate()
            .flat_map(|(position, source)| {
                located[position + 1..]
                    .iter()
                    .map(move |target| (*source, *target))
            })
            .collect();

        #[cfg(feature = "parallel")]
        let mut edges: Vec<ConflictEdge> = pairs
            .into_par_iter()
            .filter_map(|(source, target)| self.score_pair(snapshot, source, target))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let mut edges: Vec<ConflictEdge> = pairs
            .into_iter()
            .filter_map(|(source, target)| self.score_pair(snapshot, source, target))
            .collect();

        edges.sort_by_key(|edge| (edge.source, edge.target));

        edges
    }

    fn plan_clusters(
        recommender: &Recommender<'_>,
        clusters: &[ConflictCluster]
    ) -> Vec<ClusterPlan> {
        // Clusters are independent of each other.
        #[cfg(feature = "parallel")]
        let plans: Vec<ClusterPlan> = clusters
            .par_iter()
            .map(|cluster| recommender.recommend(cluster))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let plans: Vec<ClusterPlan> = clusters
            .iter()
            .map(|cluster| recommender.recommend(cluster))
            .collect();

        plans
    }
}


#[cfg(test)]
mod tests {
    use crate::backend::allocation::FrequencyAllocation;
    use crate::backend::device::{
        Device, DeviceBuilder, DeviceId, DeviceRole, DeviceStatus, Orientation,
        SiteId
    };
    use crate::backend::mathphysics::{Degree, GeoPoint};
    use crate::backend::recommendation::StrategyKind;
    use crate::backend::snapshot::SnapshotBuilder;

    use super::*;


    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 40.7128,
        longitude: -74.0060,
        elevation: None
    };


    fn sector(
        id: &str,
        position: GeoPoint,
        azimuth: Degree,
        center: Megahertz,
        width: Megahertz,
    ) -> Device {
        DeviceBuilder::new()
            .set_id(DeviceId::new(id))
            .set_role(DeviceRole::Sector)
            .set_site_id(SiteId::new(id))
            .set_position(position)
            .set_orientation(Orientation::new(azimuth, 60.0))
            .set_allocation(
                FrequencyAllocation::build(center, width)
                    .unwrap_or_else(|error| panic!("{}", error))
            )
            .build()
    }

    fn omni(id: &str, site: &str, position: GeoPoint, center: Megahertz) -> Device {
        DeviceBuilder::new()
            .set_id(DeviceId::new(id))
            .set_site_id(SiteId::new(site))
            .set_position(position)
            .set_allocation(
                FrequencyAllocation::build(center, 20)
                    .unwrap_or_else(|error| panic!("{}", error))
            )
            .build()
    }

    fn snapshot_of(devices: &[Device]) -> Snapshot {
        SnapshotBuilder::new()
            .add_devices(devices)
            .build()
            .unwrap_or_else(|error| panic!("{}", error))
    }

    fn default_engine() -> InterferenceEngine {
        InterferenceEngine::new(AnalysisConfig::default())
            .unwrap_or_else(|error| panic!("{}", error))
    }

    // Mixed mesh: a colliding facing pair, a quiet device, one device
    // without coordinates and a crowded omni site.
    fn mixed_snapshot() -> Snapshot {
        let mut devices = vec![
            sector("a", ORIGIN, 90.0, 5_700, 40),
            sector("b", ORIGIN.destination(90.0, 0.05), 270.0, 5_700, 40),
            sector("c", ORIGIN.destination(0.0, 2.0), 0.0, 5_180, 40),
            DeviceBuilder::new()
                .set_id(DeviceId::new("d"))
                .set_site_id(SiteId::new("nowhere"))
                .set_allocation(
                    FrequencyAllocation::build(5_700, 40)
                        .unwrap_or_else(|error| panic!("{}", error))
                )
                .build(),
        ];

        let far_away = ORIGIN.destination(180.0, 30.0);
        for number in 0..3 {
            devices.push(omni(
                &format!("o{number}"),
                "mast",
                far_away.destination(f64::from(number) * 120.0, 0.02),
                5_500
            ));
        }

        snapshot_of(&devices)
    }


    #[test]
    fn facing_sectors_form_one_cluster_with_a_fix() {
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 90.0, 5_700, 40),
            sector("b", ORIGIN.destination(90.0, 0.05), 270.0, 5_700, 40),
        ]);

        let analysis = default_engine().analyze(&snapshot);

        assert_eq!(1, analysis.edges.len());
        assert_eq!(40.0, analysis.edges[0].overlap_mhz);
        assert_eq!(1, analysis.clusters.len());

        let recommendation = analysis.plans[0].recommendation
            .as_ref()
            .unwrap_or_else(|| panic!("no recommendation"));
        let pool = &AnalysisConfig::default().reassignment.channel_pool;

        assert!(!recommendation.changes.is_empty());
        for change in &recommendation.changes {
            assert_ne!(5_700, change.to.center());
            assert!(pool.channels()
                .iter()
                .any(|channel| channel.center == change.to.center()));
        }
    }

    #[test]
    fn disjoint_ranges_produce_nothing() {
        // [5530, 5570] and [5680, 5720].
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 90.0, 5_550, 40),
            sector("b", ORIGIN.destination(90.0, 0.05), 270.0, 5_700, 40),
        ]);

        let analysis = default_engine().analyze(&snapshot);

        assert!(analysis.edges.is_empty());
        assert!(analysis.clusters.is_empty());
        assert!(analysis.plans.is_empty());
    }

    #[test]
    fn inactive_devices_are_ignored() {
        let inactive = DeviceBuilder::new()
            .set_id(DeviceId::new("b"))
            .set_position(ORIGIN.destination(90.0, 0.05))
            .set_status(DeviceStatus::Inactive)
            .set_allocation(
                FrequencyAllocation::build(5_700, 40)
                    .unwrap_or_else(|error| panic!("{}", error))
            )
            .build();
        let snapshot = snapshot_of(&[sector("a", ORIGIN, 90.0, 5_700, 40), inactive]);

        assert!(default_engine().analyze(&snapshot).edges.is_empty());
    }

    #[test]
    fn missing_geometry_is_flagged_not_fatal() {
        let analysis = default_engine().analyze(&mixed_snapshot());

        assert!(analysis.issues.iter().any(|issue| {
            issue.device == DeviceId::new("d")
                && issue.kind == IssueKind::MissingGeometry
        }));
        assert!(analysis.edges
            .iter()
            .all(|edge| edge.source != 3 && edge.target != 3));
    }

    #[test]
    fn non_finite_elevation_is_flagged_as_missing_geometry() {
        let broken = DeviceBuilder::new()
            .set_id(DeviceId::new("b"))
            .set_position(ORIGIN.destination(90.0, 0.05).with_elevation(f64::NAN))
            .set_allocation(
                FrequencyAllocation::build(5_700, 40)
                    .unwrap_or_else(|error| panic!("{}", error))
            )
            .build();
        let snapshot = snapshot_of(&[sector("a", ORIGIN, 90.0, 5_700, 40), broken]);

        let analysis = default_engine().analyze(&snapshot);

        assert!(analysis.edges.is_empty());
        assert_eq!(
            vec![DeviceIssue {
                device: DeviceId::new("b"),
                kind: IssueKind::MissingGeometry,
            }],
            analysis.issues
        );
    }

    #[test]
    fn colliding_plans_of_neighbouring_clusters_are_flagged() {
        // Two conflicting pairs 100 m apart, planned independently. The
        // nearest free channel is the same for both.
        let north = ORIGIN.destination(0.0, 0.1);
        let snapshot = snapshot_of(&[
            omni("a", "s1", ORIGIN, 5_700),
            omni("b", "s2", ORIGIN.destination(90.0, 0.05), 5_700),
            omni("c", "s3", north, 5_500),
            omni("d", "s4", north.destination(90.0, 0.05), 5_500),
        ]);

        let analysis = default_engine().analyze(&snapshot);

        assert_eq!(2, analysis.plans.len());

        let moved: Vec<&DeviceId> = analysis.plans
            .iter()
            .filter_map(|plan| plan.recommendation.as_ref())
            .flat_map(|recommendation| &recommendation.changes)
            .map(|change| &change.device)
            .collect();
        let collisions: Vec<&DeviceIssue> = analysis.issues
            .iter()
            .filter(|issue| matches!(issue.kind, IssueKind::PlanCollision(_)))
            .collect();

        assert_eq!(2, collisions.len());
        for collision in collisions {
            assert!(moved.contains(&&collision.device));
        }
    }

    #[test]
    fn separated_plans_raise_no_collision() {
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 90.0, 5_700, 40),
            sector("b", ORIGIN.destination(90.0, 0.05), 270.0, 5_700, 40),
        ]);

        let analysis = default_engine().analyze(&snapshot);

        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn edges_are_sorted_and_clusters_partition_them() {
        let analysis = default_engine().analyze(&mixed_snapshot());

        assert!(analysis.edges
            .windows(2)
            .all(|pair| (pair[0].source, pair[0].target) < (pair[1].source, pair[1].target)));

        let mut seen = Vec::new();
        for cluster in &analysis.clusters {
            for member in cluster.members() {
                assert!(!seen.contains(member));
                seen.push(*member);
            }
        }

        let clustered_edges: usize = analysis.clusters
            .iter()
            .map(|cluster| cluster.edges().len())
            .sum();
        assert_eq!(analysis.edges.len(), clustered_edges);
        assert_eq!(analysis.clusters.len(), analysis.plans.len());
    }

    #[test]
    fn recommendations_never_worsen_a_cluster() {
        let analysis = default_engine().analyze(&mixed_snapshot());

        for plan in &analysis.plans {
            if let Some(recommendation) = &plan.recommendation {
                assert!(recommendation.residual_severity < plan.current_severity);
            }
        }
    }

    #[test]
    fn analysis_is_idempotent() {
        let engine = default_engine();
        let snapshot = mixed_snapshot();

        assert_eq!(engine.analyze(&snapshot), engine.analyze(&snapshot));
    }

    #[test]
    fn colocated_pairs_can_be_skipped() {
        let snapshot = mixed_snapshot();
        let with_mast = default_engine().analyze(&snapshot);

        let engine = InterferenceEngine::new(AnalysisConfig {
            skip_colocated_pairs: true,
            ..AnalysisConfig::default()
        }).unwrap_or_else(|error| panic!("{}", error));
        let without_mast = engine.analyze(&snapshot);

        assert!(with_mast.clusters.len() > without_mast.clusters.len());
        assert_eq!(1, without_mast.clusters.len());
    }

    #[test]
    fn eight_device_cluster_is_searched_greedily() {
        let devices: Vec<Device> = (0..8)
            .map(|number| omni(
                &format!("n{number}"),
                &format!("s{number}"),
                ORIGIN.destination(f64::from(number) * 45.0, 0.1),
                5_180
            ))
            .collect();

        let analysis = default_engine().analyze(&snapshot_of(&devices));

        assert_eq!(1, analysis.plans.len());
        assert_eq!(8, analysis.clusters[0].len());
        assert_eq!(StrategyKind::Greedy, analysis.plans[0].strategy);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let bad_sum = AnalysisConfig {
            score_weights: ScoreWeights { overlap: 0.5, propagation: 0.5, utilization: 0.5 },
            ..AnalysisConfig::default()
        };
        let negative = AnalysisConfig {
            score_weights: ScoreWeights { overlap: 1.2, propagation: -0.2, utilization: 0.0 },
            ..AnalysisConfig::default()
        };
        let mut empty_pool = AnalysisConfig::default();
        empty_pool.reassignment.channel_pool.channels.clear();
        let mut flat_model = AnalysisConfig::default();
        flat_model.propagation.significance_threshold_db = 80.0;

        assert!(matches!(
            InterferenceEngine::new(bad_sum),
            Err(ConfigurationError::WeightSum(_))
        ));
        assert!(matches!(
            InterferenceEngine::new(negative),
            Err(ConfigurationError::NegativeWeight)
        ));
        assert!(matches!(
            InterferenceEngine::new(empty_pool),
            Err(ConfigurationError::EmptyChannelPool)
        ));
        assert!(matches!(
            InterferenceEngine::new(flat_model),
            Err(ConfigurationError::ThresholdBelowReference { .. })
        ));
    }

    #[test]
    fn config_fields_default_when_missing() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{"min_separation_mhz": 60, "allow_dfs": true, "score_weights": {"overlap": 0.6, "propagation": 0.2}}"#
        ).unwrap_or_else(|error| panic!("{}", error));

        assert_eq!(60, config.reassignment.min_separation_mhz);
        assert!(config.reassignment.allow_dfs);
        assert_eq!(0.2, config.score_weights.utilization);
        assert_eq!(DEFAULT_MATERIALITY_THRESHOLD, config.materiality_threshold);
        assert!(config.validate().is_ok());
    }
}
