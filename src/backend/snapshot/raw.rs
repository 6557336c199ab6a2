use std::collections::HashMap;

use serde::Deserialize;

use crate::backend::allocation::FrequencyAllocation;
use crate::backend::device::{
    Device, DeviceBuilder, DeviceId, DeviceRole, DeviceStatus, Orientation,
    Site, SiteId, DEFAULT_SECTOR_BEAMWIDTH
};
use crate::backend::mathphysics::{Decibel, Degree, GeoPoint};

use super::{IssueKind, SnapshotBuilder};


// Field names follow the management-system export, camelCase aliases
// included.
#[derive(Debug, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    sites: Vec<Site>,
    devices: Vec<RawDevice>,
    #[serde(default)]
    utilization: HashMap<DeviceId, f64>,
    #[serde(default)]
    obstructions: Vec<RawObstruction>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    id: DeviceId,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "type")]
    role: DeviceRole,
    #[serde(default, alias = "siteId")]
    site_id: SiteId,
    #[serde(default)]
    position: Option<GeoPoint>,
    #[serde(default)]
    azimuth: Option<Degree>,
    #[serde(default, alias = "beamWidth")]
    beamwidth: Option<Degree>,
    #[serde(default)]
    status: DeviceStatus,
    #[serde(default, alias = "frequency")]
    center: Option<f64>,
    #[serde(default, alias = "channelWidth")]
    width: Option<f64>,
    #[serde(default, alias = "txPower")]
    tx_power_dbm: Option<Decibel>,
}

#[derive(Debug, Deserialize)]
struct RawObstruction {
    devices: (DeviceId, DeviceId),
    penalty_db: Decibel,
}


impl RawSnapshot {
    // Malformed allocations degrade only their own device.
    #[must_use]
    pub fn into_builder(self) -> SnapshotBuilder {
        let mut builder = SnapshotBuilder::new();

        for site in self.sites {
            builder = builder.add_site(site);
        }

        for raw_device in self.devices {
            let (device, issue) = raw_device.into_device();

            if let Some(issue) = issue {
                builder = builder.add_issue(device.id().clone(), issue);
            }
            builder = builder.add_device(device);
        }

        for (device_id, utilization) in self.utilization {
            builder = builder.set_utilization(device_id, utilization);
        }

        for obstruction in self.obstructions {
            let (device1, device2) = obstruction.devices;

            builder = builder.add_obstruction(
                device1,
                device2,
                obstruction.penalty_db
            );
        }

        builder
    }
}

impl RawDevice {
    fn into_device(self) -> (Device, Option<IssueKind>) {
        let mut issue = None;
        let mut builder = DeviceBuilder::new()
            .set_id(self.id)
            .set_name(&self.name)
            .set_role(self.role)
            .set_site_id(self.site_id)
            .set_status(self.status);

        if let Some(position) = self.position {
            builder = builder.set_position(position);
        }

        if let Some(tx_power_dbm) = self.tx_power_dbm {
            builder = builder.set_tx_power(tx_power_dbm);
        }

        if let Some(azimuth) = self.azimuth {
            builder = builder.set_orientation(Orientation::new(
                azimuth,
                self.beamwidth.unwrap_or(DEFAULT_SECTOR_BEAMWIDTH)
            ));
        }

        match (self.center, self.width) {
            (Some(center), Some(width)) => {
                match FrequencyAllocation::from_raw(center, width) {
                    Ok(allocation) => {
                        builder = builder.set_allocation(allocation);
                    },
                    Err(error) => {
                        issue = Some(IssueKind::InvalidAllocation(
                            error.to_string()
                        ));
                    },
                }
            },
            (None, None) => (),
            _ => {
                issue = Some(IssueKind::InvalidAllocation(
                    "center and width must be given together".to_string()
                ));
            },
        }

        (builder.build(), issue)
    }
}
