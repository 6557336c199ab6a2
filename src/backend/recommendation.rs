use log::{debug, warn};
use serde::Serialize;

pub use channel::{Channel, ChannelPool};
pub use constraints::{ReassignmentConstraints, Rejections, UnsatisfiableConstraints};
pub use strategy::{
    ExhaustiveSearch, GreedySearch, SearchStrategy, StrategyKind,
    StrategySelector
};

use super::allocation::FrequencyAllocation;
use super::device::{DeviceId, DeviceIndex};
use super::grouping::ConflictCluster;
use super::mathphysics::Megahertz;
use super::propagation::{PairGeometry, FALLBACK_FREQUENCY};
use super::scoring::Scorer;
use super::snapshot::{DeviceIssue, IssueKind, Snapshot};

use problem::{MemberSpec, OutsiderTerm, PairTerm, SearchProblem};


pub mod channel;
pub mod constraints;
pub mod problem;
pub mod strategy;


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelChange {
    pub device: DeviceId,
    pub from: FrequencyAllocation,
    pub to: FrequencyAllocation,
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub changes: Vec<ChannelChange>,
    pub current_severity: f64,
    pub residual_severity: f64,
}

impl Recommendation {
    #[must_use]
    pub fn improvement(&self) -> f64 {
        self.current_severity - self.residual_severity
    }
}


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClusterPlan {
    pub cluster: ConflictCluster,
    pub current_severity: f64,
    pub strategy: StrategyKind,
    pub recommendation: Option<Recommendation>,
    pub unsatisfiable: Vec<UnsatisfiableConstraints>,
}


/// Searches channel reassignments for conflict clusters of one snapshot.
///
/// Devices outside the cluster keep their current allocation. The snapshot
/// is only read.
#[derive(Clone, Copy, Debug)]
pub struct Recommender<'a> {
    snapshot: &'a Snapshot,
    scorer: &'a Scorer,
    constraints: &'a ReassignmentConstraints,
    skip_colocated_pairs: bool,
    // Lowest frequency any device could end up on. Propagation is strongest
    // there, so reachability at it bounds reachability at any candidate.
    lowest_frequency: Megahertz,
}

impl<'a> Recommender<'a> {
    #[must_use]
    pub fn new(
        snapshot: &'a Snapshot,
        scorer: &'a Scorer,
        constraints: &'a ReassignmentConstraints,
    ) -> Self {
        let lowest_frequency = snapshot.devices()
            .iter()
            .filter_map(|device| device.allocation())
            .map(FrequencyAllocation::center)
            .chain(constraints.channel_pool.lowest_center())
            .min()
            .unwrap_or(FALLBACK_FREQUENCY);

        Self {
            snapshot,
            scorer,
            constraints,
            skip_colocated_pairs: false,
            lowest_frequency,
        }
    }

    #[must_use]
    pub fn set_skip_colocated_pairs(mut self, skip_colocated_pairs: bool) -> Self {
        self.skip_colocated_pairs = skip_colocated_pairs;
        self
    }

    #[must_use]
    pub fn recommend(&self, cluster: &ConflictCluster) -> ClusterPlan {
        let (problem, unsatisfiable) = self.build_problem(cluster);
        let status_quo = problem.status_quo();

        let strategy = StrategySelector::from_constraints(self.constraints)
            .select(&problem);
        let best = strategy.search(&problem);

        debug!(
            "{} search over {} members and {} combinations: {:.3} -> {:.3}",
            strategy.kind(),
            problem.len(),
            problem.combinations(),
            status_quo.residual,
            best.residual
        );

        let recommendation = (best.residual < status_quo.residual).then(|| {
            Recommendation {
                changes: self.changes(&problem, &best.choices),
                current_severity: status_quo.residual,
                residual_severity: best.residual,
            }
        });

        ClusterPlan {
            cluster: cluster.clone(),
            current_severity: status_quo.residual,
            strategy: strategy.kind(),
            recommendation,
            unsatisfiable,
        }
    }

    // Clusters are planned against the current allocations of everyone
    // else, so two plans may still land reachable devices on colliding
    // channels. Each such pair is flagged on both devices.
    #[must_use]
    pub fn cross_cluster_collisions(&self, plans: &[ClusterPlan]) -> Vec<DeviceIssue> {
        let snapshot = self.snapshot;
        let moved: Vec<(usize, DeviceIndex, &ChannelChange)> = plans
            .iter()
            .enumerate()
            .filter_map(|(plan_index, plan)| {
                plan.recommendation.as_ref().map(|recommendation| (plan_index, recommendation))
            })
            .flat_map(|(plan_index, recommendation)| {
                recommendation.changes
                    .iter()
                    .filter_map(move |change| {
                        let index = snapshot.index_of(&change.device)?;

                        Some((plan_index, index, change))
                    })
            })
            .collect();

        let mut issues = Vec::new();

        for (position, (plan1, index1, change1)) in moved.iter().enumerate() {
            for (plan2, index2, change2) in &moved[position + 1..] {
                if plan1 == plan2 || self.constraints.is_separated(&change1.to, &change2.to) {
                    continue;
                }

                let reachable = self.geometry(*index1, *index2)
                    .is_some_and(|geometry| self.is_reachable(&geometry));
                if !reachable {
                    continue;
                }

                warn!(
                    "Plans for clusters {plan1} and {plan2} move {} and {} to {} and {}",
                    change1.device,
                    change2.device,
                    change1.to,
                    change2.to
                );

                issues.push(DeviceIssue {
                    device: change1.device.clone(),
                    kind: IssueKind::PlanCollision(change2.device.clone()),
                });
                issues.push(DeviceIssue {
                    device: change2.device.clone(),
                    kind: IssueKind::PlanCollision(change1.device.clone()),
                });
            }
        }

        issues
    }

    fn changes(&self, problem: &SearchProblem, choices: &[usize]) -> Vec<ChannelChange> {
        choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| **choice != 0)
            .filter_map(|(member, choice)| {
                let device = self.snapshot.device(problem.device(member)?)?;
                let domain = problem.domain(member);

                Some(ChannelChange {
                    device: device.id().clone(),
                    from: *domain.first()?,
                    to: *domain.get(*choice)?,
                })
            })
            .collect()
    }

    fn considered(&self, index1: DeviceIndex, index2: DeviceIndex) -> bool {
        index1 != index2
            && !(self.skip_colocated_pairs && self.snapshot.same_site(index1, index2))
    }

    fn geometry(&self, source: DeviceIndex, target: DeviceIndex) -> Option<PairGeometry> {
        if !self.considered(source, target) {
            return None;
        }

        PairGeometry::between(self.snapshot, source, target, self.scorer.model()).ok()
    }

    fn is_reachable(&self, geometry: &PairGeometry) -> bool {
        geometry
            .estimate_at(self.lowest_frequency, self.scorer.model())
            .significant
    }

    fn pair_utilization(&self, index1: DeviceIndex, index2: DeviceIndex) -> f64 {
        self.snapshot.utilization(index1).max(self.snapshot.utilization(index2))
    }

    fn outsiders(&self, cluster: &ConflictCluster, member: DeviceIndex) -> Vec<OutsiderTerm> {
        self.snapshot
            .analysable_indices()
            .into_iter()
            .filter(|index| !cluster.contains(*index))
            .filter_map(|index| {
                let allocation = *self.snapshot.device(index)?.allocation()?;
                let geometry = self.geometry(member, index)?;

                self.is_reachable(&geometry).then(|| OutsiderTerm {
                    allocation,
                    geometry,
                    utilization: self.pair_utilization(member, index),
                })
            })
            .collect()
    }

    fn build_problem(
        &self,
        cluster: &ConflictCluster
    ) -> (SearchProblem, Vec<UnsatisfiableConstraints>) {
        let mut members = Vec::with_capacity(cluster.len());
        let mut unsatisfiable = Vec::new();

        for &index in cluster.members() {
            let Some(device) = self.snapshot.device(index) else {
                continue;
            };
            let Some(current) = device.allocation() else {
                continue;
            };

            let outsiders = self.outsiders(cluster, index);
            let outsider_allocations: Vec<FrequencyAllocation> = outsiders
                .iter()
                .map(|outsider| outsider.allocation)
                .collect();

            let domain = self.constraints.candidate_domain(
                device.id(),
                device.site_id(),
                current,
                &outsider_allocations
            );

            if !domain.has_alternative() {
                unsatisfiable.push(UnsatisfiableConstraints {
                    device: device.id().clone(),
                    rejections: domain.rejections(),
                });
            }

            members.push(MemberSpec {
                device: index,
                domain: domain.into_candidates(),
                outsiders,
                worst_severity: cluster.worst_severity_of(index),
            });
        }

        let devices: Vec<DeviceIndex> = members
            .iter()
            .map(|member| member.device)
            .collect();

        let problem = SearchProblem::build(
            members,
            |member1, member2| {
                let (index1, index2) = (devices[member1], devices[member2]);
                let geometry = self.geometry(index1, index2)?;

                Some(PairTerm {
                    geometry,
                    utilization: self.pair_utilization(index1, index2),
                    reachable: self.is_reachable(&geometry),
                })
            },
            self.scorer,
            self.constraints
        );

        (problem, unsatisfiable)
    }
}


/// Plans a reassignment for a single cluster.
#[must_use]
pub fn recommend(
    cluster: &ConflictCluster,
    snapshot: &Snapshot,
    scorer: &Scorer,
    constraints: &ReassignmentConstraints,
) -> ClusterPlan {
    Recommender::new(snapshot, scorer, constraints).recommend(cluster)
}
