use std::collections::{BTreeSet, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::allocation::FrequencyAllocation;
use crate::backend::device::{DeviceId, SiteId};
use crate::backend::mathphysics::Megahertz;

use super::channel::ChannelPool;


pub const DEFAULT_MIN_SEPARATION_MHZ: Megahertz = 40;
pub const DEFAULT_MAX_EXHAUSTIVE_CLUSTER_SIZE: usize = 6;
pub const DEFAULT_MAX_EXHAUSTIVE_COMBINATIONS: u64 = 2_000_000;


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassignmentConstraints {
    pub channel_pool: ChannelPool,
    // Center to center.
    pub min_separation_mhz: Megahertz,
    // Centers a site may not use, on top of the pool's own DFS flags.
    pub dfs_exclusions: HashMap<SiteId, BTreeSet<Megahertz>>,
    pub allow_dfs: bool,
    pub max_exhaustive_cluster_size: usize,
    pub max_exhaustive_combinations: u64,
}

impl ReassignmentConstraints {
    #[must_use]
    pub fn is_dfs_blocked(&self, site_id: &SiteId, center: Megahertz, dfs: bool) -> bool {
        if self.allow_dfs {
            return false;
        }

        dfs || self.dfs_exclusions
            .get(site_id)
            .is_some_and(|centers| centers.contains(&center))
    }

    #[must_use]
    pub fn is_separated(
        &self,
        allocation1: &FrequencyAllocation,
        allocation2: &FrequencyAllocation
    ) -> bool {
        allocation1.center_distance(allocation2) >= self.min_separation_mhz
    }

    // Status quo first, then every pool channel passing the hard
    // constraints, in pool order. `outsiders` are the current allocations of
    // reachable devices outside the cluster.
    #[must_use]
    pub fn candidate_domain(
        &self,
        device: &DeviceId,
        site_id: &SiteId,
        current: &FrequencyAllocation,
        outsiders: &[FrequencyAllocation],
    ) -> CandidateDomain {
        let mut domain = CandidateDomain {
            candidates: vec![*current],
            rejections: Rejections::default(),
        };

        for channel in self.channel_pool.channels() {
            if channel.center == current.center() {
                continue;
            }

            if self.is_dfs_blocked(site_id, channel.center, channel.dfs) {
                domain.rejections.dfs += 1;
                continue;
            }

            let candidate = match current.retuned_to(channel.center) {
                Some(candidate) if channel.allows_width(current.width())
                    && self.channel_pool.fits(&candidate) => candidate,
                _ => {
                    domain.rejections.width += 1;
                    continue;
                },
            };

            if !outsiders
                .iter()
                .all(|outsider| self.is_separated(&candidate, outsider))
            {
                domain.rejections.separation += 1;
                continue;
            }

            domain.candidates.push(candidate);
        }

        if domain.candidates.len() == 1 {
            debug!(
                "Device {device} keeps {current}: {} DFS, {} width, {} separation rejections",
                domain.rejections.dfs,
                domain.rejections.width,
                domain.rejections.separation
            );
        }

        domain
    }
}

impl Default for ReassignmentConstraints {
    fn default() -> Self {
        Self {
            channel_pool: ChannelPool::default(),
            min_separation_mhz: DEFAULT_MIN_SEPARATION_MHZ,
            dfs_exclusions: HashMap::new(),
            allow_dfs: false,
            max_exhaustive_cluster_size: DEFAULT_MAX_EXHAUSTIVE_CLUSTER_SIZE,
            max_exhaustive_combinations: DEFAULT_MAX_EXHAUSTIVE_COMBINATIONS,
        }
    }
}


#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Rejections {
    pub dfs: usize,
    pub width: usize,
    pub separation: usize,
}


#[derive(Clone, Debug, PartialEq)]
pub struct CandidateDomain {
    candidates: Vec<FrequencyAllocation>,
    rejections: Rejections,
}

impl CandidateDomain {
    // Never empty, the first entry is the current allocation.
    #[must_use]
    pub fn candidates(&self) -> &[FrequencyAllocation] {
        &self.candidates
    }

    #[must_use]
    pub fn rejections(&self) -> Rejections {
        self.rejections
    }

    #[must_use]
    pub fn has_alternative(&self) -> bool {
        self.candidates.len() > 1
    }

    #[must_use]
    pub fn into_candidates(self) -> Vec<FrequencyAllocation> {
        self.candidates
    }
}


// No pool channel is left for the device once the hard constraints are
// applied. Reported per device, the analysis goes on.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[error(
    "No admissible channel for device `{device}` \
     (rejected: {} DFS, {} width, {} separation)",
    .rejections.dfs, .rejections.width, .rejections.separation
)]
pub struct UnsatisfiableConstraints {
    pub device: DeviceId,
    pub rejections: Rejections,
}
