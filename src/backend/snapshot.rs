use std::collections::HashMap;
use std::fs;
use std::path::Path;

use derive_more::Display;
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use super::device::{
    Device, DeviceId, DeviceIndex, IdToIndexMap, IdToSiteMap,
    IdToUtilizationMap, Site
};
use super::mathphysics::{Decibel, GeoPoint};

use raw::RawSnapshot;


pub mod raw;


pub const DEFAULT_UTILIZATION: f64 = 1.0;


#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Device `{0}` appears more than once")]
    DuplicateDevice(DeviceId),
    #[error("Failed to read snapshot with error `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse snapshot with error `{0}`")]
    Json(#[from] serde_json::Error),
}


#[derive(Clone, Debug, Display, PartialEq, Serialize)]
pub enum IssueKind {
    #[display("invalid allocation ({_0})")]
    InvalidAllocation(String),
    #[display("missing geometry")]
    MissingGeometry,
    // Two independently planned clusters move reachable devices onto
    // channels closer than the minimum separation.
    #[display("planned channel collides with the plan for {_0}")]
    PlanCollision(DeviceId),
}


// A problem that degrades one device's analysis without stopping the run.
#[derive(Clone, Debug, Display, PartialEq, Serialize)]
#[display("{device}: {kind}")]
pub struct DeviceIssue {
    pub device: DeviceId,
    pub kind: IssueKind,
}


#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    sites: Vec<Site>,
    devices: Vec<Device>,
    utilization: IdToUtilizationMap,
    obstructions: Vec<(DeviceId, DeviceId, Decibel)>,
    issues: Vec<DeviceIssue>,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_site(mut self, site: Site) -> Self {
        self.sites.push(site);
        self
    }

    #[must_use]
    pub fn add_device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    #[must_use]
    pub fn add_devices(mut self, devices: &[Device]) -> Self {
        self.devices.extend_from_slice(devices);
        self
    }

    // Traffic load in [0, 1]. Values outside are clamped, NaN is dropped.
    #[must_use]
    pub fn set_utilization(mut self, device_id: DeviceId, load: f64) -> Self {
        if load.is_nan() {
            warn!("Ignoring NaN utilization of device {device_id}");
            return self;
        }

        self.utilization.insert(device_id, load.clamp(0.0, 1.0));
        self
    }

    // Terrain obstruction penalty between two devices, supplied by an
    // elevation-profile collaborator.
    #[must_use]
    pub fn add_obstruction(
        mut self,
        device1: DeviceId,
        device2: DeviceId,
        penalty: Decibel,
    ) -> Self {
        self.obstructions.push((device1, device2, penalty.max(0.0)));
        self
    }

    #[must_use]
    pub fn add_issue(mut self, device: DeviceId, kind: IssueKind) -> Self {
        self.issues.push(DeviceIssue { device, kind });
        self
    }

    /// # Errors
    ///
    /// Will return `Err` if two devices share an identifier.
    pub fn build(self) -> Result<Snapshot, SnapshotError> {
        let mut devices = self.devices;
        devices.sort_by(|device1, device2| device1.id().cmp(device2.id()));

        if let Some(duplicate) = devices
            .windows(2)
            .find(|pair| pair[0].id() == pair[1].id())
        {
            return Err(SnapshotError::DuplicateDevice(duplicate[0].id().clone()));
        }

        let index_map: IdToIndexMap = devices
            .iter()
            .enumerate()
            .map(|(index, device)| (device.id().clone(), index))
            .collect();

        let mut obstructions = HashMap::new();
        for (device1, device2, penalty) in self.obstructions {
            let (Some(index1), Some(index2)) = (
                index_map.get(&device1),
                index_map.get(&device2)
            ) else {
                debug!("Obstruction between unknown devices {device1} and {device2}");
                continue;
            };

            obstructions.insert(pair_key(*index1, *index2), penalty);
        }

        let mut issues = self.issues;
        issues.sort_by(|issue1, issue2| issue1.device.cmp(&issue2.device));

        for issue in &issues {
            warn!("Snapshot issue: {issue}");
        }

        Ok(Snapshot {
            devices,
            sites: IdToSiteMap::from(self.sites.as_slice()),
            index_map,
            utilization: self.utilization,
            obstructions,
            issues,
        })
    }
}


fn pair_key(index1: DeviceIndex, index2: DeviceIndex) -> (DeviceIndex, DeviceIndex) {
    (index1.min(index2), index1.max(index2))
}


// One consistent, immutable view of the network. Devices are kept sorted by
// identifier, so device indices are stable across runs.
#[derive(Clone, Debug)]
pub struct Snapshot {
    devices: Vec<Device>,
    sites: IdToSiteMap,
    index_map: IdToIndexMap,
    utilization: IdToUtilizationMap,
    obstructions: HashMap<(DeviceIndex, DeviceIndex), Decibel>,
    issues: Vec<DeviceIssue>,
}

impl Snapshot {
    /// # Errors
    ///
    /// Will return `Err` if the JSON is malformed or device identifiers
    /// repeat.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        let raw_snapshot: RawSnapshot = serde_json::from_str(json)?;

        raw_snapshot.into_builder().build()
    }

    /// # Errors
    ///
    /// Will return `Err` if the file can not be read or
    /// [`Snapshot::from_json_str`] fails.
    pub fn from_json_file(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;

        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn device(&self, index: DeviceIndex) -> Option<&Device> {
        self.devices.get(index)
    }

    #[must_use]
    pub fn index_of(&self, device_id: &DeviceId) -> Option<DeviceIndex> {
        self.index_map.get(device_id).copied()
    }

    #[must_use]
    pub fn sites(&self) -> &IdToSiteMap {
        &self.sites
    }

    #[must_use]
    pub fn issues(&self) -> &[DeviceIssue] {
        &self.issues
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    // Own position first, then the owning site's coordinate.
    #[must_use]
    pub fn effective_position(&self, index: DeviceIndex) -> Option<&GeoPoint> {
        let device = self.devices.get(index)?;

        device.position().or_else(|| {
            self.sites
                .get(device.site_id())
                .and_then(Site::position)
        })
    }

    // Unknown load is treated as the worst case.
    #[must_use]
    pub fn utilization(&self, index: DeviceIndex) -> f64 {
        self.devices
            .get(index)
            .and_then(|device| self.utilization.get(device.id()))
            .copied()
            .unwrap_or(DEFAULT_UTILIZATION)
    }

    #[must_use]
    pub fn obstruction(&self, index1: DeviceIndex, index2: DeviceIndex) -> Decibel {
        self.obstructions
            .get(&pair_key(index1, index2))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn analysable_indices(&self) -> Vec<DeviceIndex> {
        self.devices
            .iter()
            .enumerate()
            .filter(|(_, device)| device.is_analysable())
            .map(|(index, _)| index)
            .collect()
    }

    #[must_use]
    pub fn same_site(&self, index1: DeviceIndex, index2: DeviceIndex) -> bool {
        match (self.devices.get(index1), self.devices.get(index2)) {
            (Some(device1), Some(device2)) =>
                device1.site_id() == device2.site_id(),
            _ => false,
        }
    }
}
