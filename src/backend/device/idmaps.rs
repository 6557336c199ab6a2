use std::collections::HashMap;

use super::{DeviceId, Site, SiteId};


// Index of a device inside its snapshot.
pub type DeviceIndex = usize;

pub type IdToIndexMap       = HashMap<DeviceId, DeviceIndex>;
pub type IdToUtilizationMap = HashMap<DeviceId, f64>;


#[derive(Clone, Debug, Default)]
pub struct IdToSiteMap(HashMap<SiteId, Site>);

impl IdToSiteMap {
    #[must_use]
    pub fn get(&self, site_id: &SiteId) -> Option<&Site> {
        self.0.get(site_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[Site]> for IdToSiteMap {
    fn from(sites: &[Site]) -> Self {
        let hash_map = sites
            .iter()
            .map(|site| (site.id().clone(), site.clone()))
            .collect();

        Self(hash_map)
    }
}
