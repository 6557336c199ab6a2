use crate::backend::allocation::FrequencyAllocation;
use crate::backend::device::DeviceIndex;
use crate::backend::mathphysics::Megahertz;
use crate::backend::propagation::PairGeometry;
use crate::backend::scoring::Scorer;

use super::constraints::ReassignmentConstraints;


// Interaction between a cluster member and a device that stays put.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutsiderTerm {
    pub allocation: FrequencyAllocation,
    // Oriented from the member towards the outsider.
    pub geometry: PairGeometry,
    pub utilization: f64,
}


// Interaction between two cluster members, oriented from the lower member
// position to the higher one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairTerm {
    pub geometry: PairGeometry,
    pub utilization: f64,
    // Close enough for the separation rule to apply.
    pub reachable: bool,
}


#[derive(Clone, Debug, PartialEq)]
pub struct MemberSpec {
    pub device: DeviceIndex,
    // First entry is the current allocation.
    pub domain: Vec<FrequencyAllocation>,
    pub outsiders: Vec<OutsiderTerm>,
    pub worst_severity: f64,
}


#[derive(Clone, Debug, PartialEq)]
struct PairCosts {
    columns: usize,
    // `None` where the two choices violate separation.
    costs: Vec<Option<f64>>,
}

impl PairCosts {
    fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.costs
            .get(row * self.columns + column)
            .copied()
            .flatten()
    }
}


/// Precomputed cost tables of one cluster.
///
/// Members are addressed by their position in the cluster, candidates by
/// their position in the member's domain. Choice `0` always means "keep the
/// current allocation", so the all-zero choice vector is the status quo and
/// is always feasible.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchProblem {
    devices: Vec<DeviceIndex>,
    domains: Vec<Vec<FrequencyAllocation>>,
    worst_severity: Vec<f64>,
    outsider_costs: Vec<Vec<f64>>,
    pair_costs: Vec<Option<PairCosts>>,
}

impl SearchProblem {
    // `pair_term(i, j)` is asked once for every `i < j`.
    #[must_use]
    pub fn build<F>(
        members: Vec<MemberSpec>,
        pair_term: F,
        scorer: &Scorer,
        constraints: &ReassignmentConstraints,
    ) -> Self
    where
        F: Fn(usize, usize) -> Option<PairTerm>
    {
        let member_count = members.len();

        let outsider_costs = members
            .iter()
            .map(|member| member.domain
                .iter()
                .map(|candidate| member.outsiders
                    .iter()
                    .map(|outsider| scorer.material_severity(
                        candidate,
                        &outsider.allocation,
                        &outsider.geometry,
                        outsider.utilization
                    ))
                    .sum()
                )
                .collect()
            )
            .collect();

        let mut pair_costs = vec![None; member_count * member_count];
        for i in 0..member_count {
            for j in (i + 1)..member_count {
                pair_costs[i * member_count + j] = pair_term(i, j).map(|term| {
                    pair_cost_table(
                        &members[i].domain,
                        &members[j].domain,
                        &term,
                        scorer,
                        constraints
                    )
                });
            }
        }

        let mut devices = Vec::with_capacity(member_count);
        let mut domains = Vec::with_capacity(member_count);
        let mut worst_severity = Vec::with_capacity(member_count);
        for member in members {
            devices.push(member.device);
            domains.push(member.domain);
            worst_severity.push(member.worst_severity);
        }

        Self { devices, domains, worst_severity, outsider_costs, pair_costs }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    #[must_use]
    pub fn device(&self, member: usize) -> Option<DeviceIndex> {
        self.devices.get(member).copied()
    }

    #[must_use]
    pub fn domain(&self, member: usize) -> &[FrequencyAllocation] {
        self.domains
            .get(member)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn domain_len(&self, member: usize) -> usize {
        self.domain(member).len()
    }

    #[must_use]
    pub fn worst_severity(&self, member: usize) -> f64 {
        self.worst_severity
            .get(member)
            .copied()
            .unwrap_or_default()
    }

    // Saturates instead of overflowing.
    #[must_use]
    pub fn combinations(&self) -> u64 {
        self.domains
            .iter()
            .map(|domain| domain.len() as u64)
            .fold(1, u64::saturating_mul)
    }

    #[must_use]
    pub fn outsider_cost(&self, member: usize, choice: usize) -> f64 {
        self.outsider_costs
            .get(member)
            .and_then(|costs| costs.get(choice))
            .copied()
            .unwrap_or_default()
    }

    // Symmetric in its two members. `None` if infeasible.
    #[must_use]
    pub fn pair_cost(
        &self,
        member1: usize,
        choice1: usize,
        member2: usize,
        choice2: usize
    ) -> Option<f64> {
        let (low, low_choice, high, high_choice) = if member1 < member2 {
            (member1, choice1, member2, choice2)
        } else {
            (member2, choice2, member1, choice1)
        };

        match self.pair_costs.get(low * self.len() + high) {
            Some(Some(costs)) => costs.get(low_choice, high_choice),
            _ => Some(0.0),
        }
    }

    #[must_use]
    pub fn shift(&self, member: usize, choice: usize) -> Megahertz {
        let domain = self.domain(member);

        match (domain.first(), domain.get(choice)) {
            (Some(current), Some(candidate)) => current.center_distance(candidate),
            _ => 0,
        }
    }

    // Residual severity of a full choice vector, accumulated member by
    // member in cluster order. `None` if any pair violates separation.
    #[must_use]
    pub fn evaluate(&self, choices: &[usize]) -> Option<Assignment> {
        let mut residual = 0.0;
        let mut total_shift = 0;

        for (member, choice) in choices.iter().enumerate() {
            residual += self.outsider_cost(member, *choice);
            for (previous, previous_choice) in choices[..member].iter().enumerate() {
                residual += self.pair_cost(previous, *previous_choice, member, *choice)?;
            }
            total_shift += self.shift(member, *choice);
        }

        Some(Assignment { choices: choices.to_vec(), residual, total_shift })
    }

    #[must_use]
    pub fn status_quo(&self) -> Assignment {
        let choices = vec![0; self.len()];
        let residual = self
            .evaluate(&choices)
            .map_or(0.0, |assignment| assignment.residual);

        Assignment { choices, residual, total_shift: 0 }
    }
}


fn pair_cost_table(
    domain1: &[FrequencyAllocation],
    domain2: &[FrequencyAllocation],
    term: &PairTerm,
    scorer: &Scorer,
    constraints: &ReassignmentConstraints,
) -> PairCosts {
    let mut costs = Vec::with_capacity(domain1.len() * domain2.len());

    for (choice1, candidate1) in domain1.iter().enumerate() {
        for (choice2, candidate2) in domain2.iter().enumerate() {
            let moved = choice1 != 0 || choice2 != 0;

            if moved && term.reachable
                && !constraints.is_separated(candidate1, candidate2)
            {
                costs.push(None);
                continue;
            }

            costs.push(Some(scorer.material_severity(
                candidate1,
                candidate2,
                &term.geometry,
                term.utilization
            )));
        }
    }

    PairCosts { columns: domain2.len(), costs }
}


#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub choices: Vec<usize>,
    pub residual: f64,
    pub total_shift: Megahertz,
}

impl Assignment {
    // Lower residual wins, then the smaller total retune.
    #[must_use]
    pub fn is_better_than(&self, other: &Self) -> bool {
        is_better(self.residual, self.total_shift, other)
    }
}

// Strict order on (residual, shift). Equal pairs keep the earlier candidate.
pub(super) fn is_better(residual: f64, total_shift: Megahertz, best: &Assignment) -> bool {
    residual < best.residual
        || (residual == best.residual && total_shift < best.total_shift)
}
