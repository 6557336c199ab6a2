use serde::{Deserialize, Serialize};

use crate::backend::allocation::{FrequencyAllocation, FrequencyRange};
use crate::backend::mathphysics::Megahertz;


pub const DEFAULT_BAND_START: Megahertz = 5_150;
pub const DEFAULT_BAND_END: Megahertz   = 5_850;

const DEFAULT_CHANNEL_STEP: Megahertz = 20;
// Lower UNII-1/2, UNII-2C, UNII-3 with the DFS flag of each block.
const DEFAULT_BLOCKS: [(Megahertz, Megahertz, bool); 4] = [
    (5_180, 5_240, false),
    (5_260, 5_320, true),
    (5_500, 5_700, true),
    (5_745, 5_825, false),
];


#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub center: Megahertz,
    #[serde(default)]
    pub dfs: bool,
    // Widest channel the regulator allows on this center.
    #[serde(default)]
    pub max_width: Option<Megahertz>,
}

impl Channel {
    #[must_use]
    pub fn new(center: Megahertz, dfs: bool) -> Self {
        Self { center, dfs, max_width: None }
    }

    #[must_use]
    pub fn set_max_width(mut self, max_width: Megahertz) -> Self {
        self.max_width = Some(max_width);
        self
    }

    #[must_use]
    pub fn allows_width(&self, width: Megahertz) -> bool {
        self.max_width.is_none_or(|max_width| width <= max_width)
    }
}


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPool {
    pub channels: Vec<Channel>,
    pub band_start: Megahertz,
    pub band_end: Megahertz,
}

impl ChannelPool {
    #[must_use]
    pub fn new(
        channels: Vec<Channel>,
        band_start: Megahertz,
        band_end: Megahertz
    ) -> Self {
        Self { channels, band_start, band_end }
    }

    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[must_use]
    pub fn band(&self) -> FrequencyRange {
        FrequencyRange {
            start: f64::from(self.band_start),
            end: f64::from(self.band_end),
        }
    }

    // Whole occupied range inside the band edges.
    #[must_use]
    pub fn fits(&self, allocation: &FrequencyAllocation) -> bool {
        self.band().contains_range(&allocation.range())
    }

    #[must_use]
    pub fn lowest_center(&self) -> Option<Megahertz> {
        self.channels
            .iter()
            .map(|channel| channel.center)
            .min()
    }
}

impl Default for ChannelPool {
    fn default() -> Self {
        let channels = DEFAULT_BLOCKS
            .iter()
            .flat_map(|(first, last, dfs)| {
                (*first..=*last)
                    .step_by(DEFAULT_CHANNEL_STEP as usize)
                    .map(|center| Channel::new(center, *dfs))
            })
            .collect();

        Self::new(channels, DEFAULT_BAND_START, DEFAULT_BAND_END)
    }
}
