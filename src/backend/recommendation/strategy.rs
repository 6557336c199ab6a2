use derive_more::Display;
use serde::Serialize;

use crate::backend::mathphysics::Megahertz;

use super::constraints::ReassignmentConstraints;
use super::problem::{is_better, Assignment, SearchProblem};


#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum StrategyKind {
    Exhaustive,
    Greedy,
}


pub trait SearchStrategy {
    fn kind(&self) -> StrategyKind;

    // Never returns an assignment worse than the status quo.
    fn search(&self, problem: &SearchProblem) -> Assignment;
}


// Depth-first enumeration of every combination. A branch is cut as soon as
// its partial residual can no longer beat the best complete one, which is
// sound because every cost term is non-negative.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExhaustiveSearch;

impl ExhaustiveSearch {
    fn descend(
        problem: &SearchProblem,
        choices: &mut Vec<usize>,
        partial_residual: f64,
        partial_shift: Megahertz,
        best: &mut Assignment,
    ) {
        let member = choices.len();

        if member == problem.len() {
            if is_better(partial_residual, partial_shift, best) {
                *best = Assignment {
                    choices: choices.clone(),
                    residual: partial_residual,
                    total_shift: partial_shift,
                };
            }
            return;
        }

        'candidates: for choice in 0..problem.domain_len(member) {
            let mut residual = partial_residual + problem.outsider_cost(member, choice);

            for (previous, previous_choice) in choices.iter().enumerate() {
                match problem.pair_cost(previous, *previous_choice, member, choice) {
                    Some(cost) => residual += cost,
                    None => continue 'candidates,
                }
            }

            let shift = partial_shift + problem.shift(member, choice);
            if !is_better(residual, shift, best) {
                continue;
            }

            choices.push(choice);
            Self::descend(problem, choices, residual, shift, best);
            choices.pop();
        }
    }
}

impl SearchStrategy for ExhaustiveSearch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Exhaustive
    }

    fn search(&self, problem: &SearchProblem) -> Assignment {
        let mut best = problem.status_quo();
        let mut choices = Vec::with_capacity(problem.len());

        Self::descend(problem, &mut choices, 0.0, 0, &mut best);

        best
    }
}


// One pass over the members, worst first. Each member takes the candidate
// that minimizes its own residual against everybody else's current or
// already chosen allocation. Members are never revisited.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedySearch;

impl GreedySearch {
    fn visiting_order(problem: &SearchProblem) -> Vec<usize> {
        let mut order: Vec<usize> = (0..problem.len()).collect();

        order.sort_by(|member1, member2| {
            problem.worst_severity(*member2)
                .total_cmp(&problem.worst_severity(*member1))
                .then_with(|| member1.cmp(member2))
        });

        order
    }

    fn own_residual(
        problem: &SearchProblem,
        choices: &[usize],
        member: usize,
        choice: usize
    ) -> Option<f64> {
        let mut residual = problem.outsider_cost(member, choice);

        for (other, other_choice) in choices.iter().enumerate() {
            if other != member {
                residual += problem.pair_cost(member, choice, other, *other_choice)?;
            }
        }

        Some(residual)
    }
}

impl SearchStrategy for GreedySearch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Greedy
    }

    fn search(&self, problem: &SearchProblem) -> Assignment {
        let status_quo = problem.status_quo();
        let mut choices = status_quo.choices.clone();

        for member in Self::visiting_order(problem) {
            let mut best_choice: Option<(usize, f64, Megahertz)> = None;

            for choice in 0..problem.domain_len(member) {
                let Some(residual) = Self::own_residual(
                    problem,
                    &choices,
                    member,
                    choice
                ) else {
                    continue;
                };
                let shift = problem.shift(member, choice);

                let improves = best_choice.is_none_or(|(_, best_residual, best_shift)| {
                    residual < best_residual
                        || (residual == best_residual && shift < best_shift)
                });
                if improves {
                    best_choice = Some((choice, residual, shift));
                }
            }

            if let Some((choice, _, _)) = best_choice {
                choices[member] = choice;
            }
        }

        match problem.evaluate(&choices) {
            Some(assignment) if !status_quo.is_better_than(&assignment) => assignment,
            _ => status_quo,
        }
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategySelector {
    max_exhaustive_cluster_size: usize,
    max_exhaustive_combinations: u64,
}

impl StrategySelector {
    #[must_use]
    pub fn new(max_exhaustive_cluster_size: usize, max_exhaustive_combinations: u64) -> Self {
        Self { max_exhaustive_cluster_size, max_exhaustive_combinations }
    }

    #[must_use]
    pub fn from_constraints(constraints: &ReassignmentConstraints) -> Self {
        Self::new(
            constraints.max_exhaustive_cluster_size,
            constraints.max_exhaustive_combinations
        )
    }

    #[must_use]
    pub fn select(&self, problem: &SearchProblem) -> &'static dyn SearchStrategy {
        if problem.len() <= self.max_exhaustive_cluster_size
            && problem.combinations() <= self.max_exhaustive_combinations
        {
            &ExhaustiveSearch
        } else {
            &GreedySearch
        }
    }
}
