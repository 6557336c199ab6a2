use std::collections::HashSet;
use std::fmt;

use chrono::Local;
use serde::Serialize;

use super::allocation::FrequencyAllocation;
use super::device::{DeviceId, DeviceIndex};
use super::engine::Analysis;
use super::mathphysics::{Decibel, Kilometer};
use super::recommendation::{
    ClusterPlan, Recommendation, StrategyKind, UnsatisfiableConstraints
};
use super::scoring::{ConflictEdge, SeverityBand};
use super::snapshot::{DeviceIssue, Snapshot};


pub const TOP_ISSUE_COUNT: usize = 10;

// Devices above this power get a reduction hint on conflicts no plan resolves.
pub const HIGH_TX_POWER_DBM: Decibel = 15.0;
pub const TX_POWER_REDUCTION_DB: Decibel = 3.0;


#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_devices: usize,
    pub total_sites: usize,
    pub devices_with_frequency: usize,
    pub conflict_edges: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
    pub low_severity: usize,
    pub clusters: usize,
    pub recommendations: usize,
    pub unsatisfiable_devices: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Total devices analysed: {}", self.total_devices)?;
        writeln!(f, "- Total sites: {}", self.total_sites)?;
        writeln!(f, "- Devices with frequency data: {}", self.devices_with_frequency)?;
        writeln!(f, "- Conflicts detected: {}", self.conflict_edges)?;
        writeln!(f, "- High severity: {}", self.high_severity)?;
        writeln!(f, "- Medium severity: {}", self.medium_severity)?;
        writeln!(f, "- Low severity: {}", self.low_severity)?;
        writeln!(f, "- Conflict clusters: {}", self.clusters)?;
        writeln!(f, "- Clusters with a recommendation: {}", self.recommendations)?;
        write!(f, "- Devices without an admissible channel: {}", self.unsatisfiable_devices)
    }
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PowerReduction {
    pub device: DeviceId,
    pub from_dbm: Decibel,
    pub to_dbm: Decibel,
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportedEdge {
    pub source: DeviceId,
    pub source_name: String,
    pub source_allocation: Option<FrequencyAllocation>,
    pub target: DeviceId,
    pub target_name: String,
    pub target_allocation: Option<FrequencyAllocation>,
    pub overlap_mhz: f64,
    pub distance_km: Kilometer,
    pub attenuation_db: Decibel,
    pub severity: f64,
    pub band: SeverityBand,
    // Only for conflicts no recommended retune touches.
    pub power_reductions: Vec<PowerReduction>,
}

impl ReportedEdge {
    fn new(snapshot: &Snapshot, edge: &ConflictEdge, retuned: &HashSet<DeviceId>) -> Self {
        let source = device_id(snapshot, edge.source);
        let target = device_id(snapshot, edge.target);

        let power_reductions = if retuned.contains(&source) || retuned.contains(&target) {
            Vec::new()
        } else {
            [edge.source, edge.target]
                .into_iter()
                .filter_map(|index| power_reduction(snapshot, index))
                .collect()
        };

        Self {
            source_name: device_name(snapshot, edge.source),
            source_allocation: device_allocation(snapshot, edge.source),
            target_name: device_name(snapshot, edge.target),
            target_allocation: device_allocation(snapshot, edge.target),
            source,
            target,
            overlap_mhz: edge.overlap_mhz,
            distance_km: edge.propagation.distance_km,
            attenuation_db: edge.propagation.attenuation_db,
            severity: edge.severity,
            band: edge.band(),
            power_reductions,
        }
    }
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportedCluster {
    pub id: usize,
    pub devices: Vec<DeviceId>,
    pub max_severity: f64,
    pub total_severity: f64,
    pub edges: Vec<ReportedEdge>,
    pub strategy: StrategyKind,
    pub recommendation: Option<Recommendation>,
    pub unsatisfiable: Vec<UnsatisfiableConstraints>,
}

impl ReportedCluster {
    fn new(
        snapshot: &Snapshot,
        id: usize,
        plan: &ClusterPlan,
        retuned: &HashSet<DeviceId>
    ) -> Self {
        let cluster = &plan.cluster;

        Self {
            id,
            devices: cluster.members()
                .iter()
                .map(|index| device_id(snapshot, *index))
                .collect(),
            max_severity: cluster.max_severity(),
            total_severity: cluster.total_severity(),
            edges: cluster.edges()
                .iter()
                .map(|edge| ReportedEdge::new(snapshot, edge, retuned))
                .collect(),
            strategy: plan.strategy,
            recommendation: plan.recommendation.clone(),
            unsatisfiable: plan.unsatisfiable.clone(),
        }
    }
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConflictReport {
    // RFC 3339, local time.
    pub generated_at: String,
    pub summary: ReportSummary,
    pub top_issues: Vec<ReportedEdge>,
    pub clusters: Vec<ReportedCluster>,
    pub issues: Vec<DeviceIssue>,
}

impl ConflictReport {
    #[must_use]
    pub fn new(snapshot: &Snapshot, analysis: &Analysis) -> Self {
        let count_band = |band: SeverityBand| analysis.edges
            .iter()
            .filter(|edge| edge.band() == band)
            .count();

        let summary = ReportSummary {
            total_devices: snapshot.len(),
            total_sites: snapshot.sites().len(),
            devices_with_frequency: snapshot.analysable_indices().len(),
            conflict_edges: analysis.edges.len(),
            high_severity: count_band(SeverityBand::High),
            medium_severity: count_band(SeverityBand::Medium),
            low_severity: count_band(SeverityBand::Low),
            clusters: analysis.clusters.len(),
            recommendations: analysis.plans
                .iter()
                .filter(|plan| plan.recommendation.is_some())
                .count(),
            unsatisfiable_devices: analysis.plans
                .iter()
                .map(|plan| plan.unsatisfiable.len())
                .sum(),
        };

        let retuned: HashSet<DeviceId> = analysis.plans
            .iter()
            .filter_map(|plan| plan.recommendation.as_ref())
            .flat_map(|recommendation| &recommendation.changes)
            .map(|change| change.device.clone())
            .collect();

        let mut ranked: Vec<&ConflictEdge> = analysis.edges.iter().collect();
        ranked.sort_by(|edge1, edge2| {
            edge2.severity
                .total_cmp(&edge1.severity)
                .then_with(|| (edge1.source, edge1.target).cmp(&(edge2.source, edge2.target)))
        });

        let top_issues = ranked
            .into_iter()
            .take(TOP_ISSUE_COUNT)
            .map(|edge| ReportedEdge::new(snapshot, edge, &retuned))
            .collect();

        let clusters = analysis.plans
            .iter()
            .enumerate()
            .map(|(id, plan)| ReportedCluster::new(snapshot, id, plan, &retuned))
            .collect();

        Self {
            generated_at: Local::now().to_rfc3339(),
            summary,
            top_issues,
            clusters,
            issues: analysis.issues.clone(),
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// Plain text digest for operators.
impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh interference recommendations ({})", self.generated_at)?;
        writeln!(f)?;
        writeln!(f, "Summary:")?;
        writeln!(f, "{}", self.summary)?;

        if !self.top_issues.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top interference issues:")?;
        }
        for (rank, issue) in self.top_issues.iter().enumerate() {
            writeln!(
                f,
                "{}. {} and {}: severity {:.2} ({}), overlap {:.1} MHz at {:.3} km",
                rank + 1,
                issue.source,
                issue.target,
                issue.severity,
                issue.band,
                issue.overlap_mhz,
                issue.distance_km
            )?;
        }

        for cluster in &self.clusters {
            let Some(recommendation) = &cluster.recommendation else {
                continue;
            };

            writeln!(f)?;
            writeln!(
                f,
                "Cluster {} ({} search): {:.2} -> {:.2} (improvement {:.2})",
                cluster.id,
                cluster.strategy,
                recommendation.current_severity,
                recommendation.residual_severity,
                recommendation.improvement()
            )?;
            for change in &recommendation.changes {
                writeln!(f, "   retune {} from {} to {}", change.device, change.from, change.to)?;
            }
        }

        let reductions: Vec<&PowerReduction> = self.top_issues
            .iter()
            .flat_map(|issue| &issue.power_reductions)
            .collect();
        if !reductions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unresolved conflicts:")?;
        }
        for reduction in reductions {
            writeln!(
                f,
                "   reduce transmit power of {} from {:.1} dBm to {:.1} dBm",
                reduction.device,
                reduction.from_dbm,
                reduction.to_dbm
            )?;
        }

        Ok(())
    }
}


// Indices always come from the same snapshot.
fn device_id(snapshot: &Snapshot, index: DeviceIndex) -> DeviceId {
    snapshot.device(index)
        .map(|device| device.id().clone())
        .unwrap_or_default()
}

fn device_name(snapshot: &Snapshot, index: DeviceIndex) -> String {
    snapshot.device(index)
        .map(|device| device.name().to_string())
        .unwrap_or_default()
}

fn device_allocation(snapshot: &Snapshot, index: DeviceIndex) -> Option<FrequencyAllocation> {
    snapshot.device(index)?.allocation().copied()
}

fn power_reduction(snapshot: &Snapshot, index: DeviceIndex) -> Option<PowerReduction> {
    let device = snapshot.device(index)?;
    let from_dbm = device.tx_power_dbm()
        .filter(|power| *power > HIGH_TX_POWER_DBM)?;

    Some(PowerReduction {
        device: device.id().clone(),
        from_dbm,
        to_dbm: from_dbm - TX_POWER_REDUCTION_DB,
    })
}
