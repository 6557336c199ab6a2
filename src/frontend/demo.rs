use std::ops::Range;

use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::backend::allocation::FrequencyAllocation;
use crate::backend::device::{
    Device, DeviceBuilder, DeviceId, DeviceRole, DeviceStatus, Site, SiteId
};
use crate::backend::mathphysics::{Decibel, GeoPoint, Kilometer, Megahertz, Meter};
use crate::backend::snapshot::{Snapshot, SnapshotBuilder, SnapshotError};


pub const MESH_ORIGIN: GeoPoint = GeoPoint {
    latitude: 40.7128,
    longitude: -74.0060,
    elevation: None,
};


const SECTORS_PER_SITE: usize = 3;
const SECTOR_DIRECTIONS: [&str; 4] = ["north", "east", "south", "west"];

// Channels operators actually pick, so collisions are common.
const POPULAR_CENTERS: [Megahertz; 8] = [
    5_180, 5_220, 5_500, 5_580, 5_660, 5_700, 5_745, 5_805
];
const CHANNEL_WIDTHS: [Megahertz; 3] = [20, 40, 80];
const TX_POWERS_DBM: [Decibel; 4]    = [14.0, 17.0, 20.0, 23.0];

const OMNI_PROBABILITY: f64     = 0.2;
const INACTIVE_PROBABILITY: f64 = 0.05;


#[derive(Clone, Debug)]
pub struct MeshArea {
    origin: GeoPoint,
    radius: Kilometer,
    elevation_range: Range<Meter>,
    utilization_range: Range<f64>,
}

impl MeshArea {
    #[must_use]
    pub fn new(
        origin: GeoPoint,
        radius: Kilometer,
        elevation_range: Range<Meter>,
        utilization_range: Range<f64>,
    ) -> Self {
        Self { origin, radius, elevation_range, utilization_range }
    }
}

impl Default for MeshArea {
    fn default() -> Self {
        Self::new(MESH_ORIGIN, 3.0, 10.0..80.0, 0.05..1.0)
    }
}


/// Builds a random rooftop mesh: sites scattered around the area origin,
/// each carrying up to three sectors or a single omni.
///
/// # Errors
///
/// Will return `Err` if generated identifiers collide, which they do not
/// for distinct site numbers.
pub fn generate_snapshot(
    device_count: usize,
    seed: Option<u64>,
    area: &MeshArea,
) -> Result<Snapshot, SnapshotError> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_rng(&mut rand::rng()),
    };

    let mut builder = SnapshotBuilder::new();
    let mut generated = 0;
    let mut site_number = 0;

    while generated < device_count {
        let site_id = SiteId::new(&format!("site-{site_number:03}"));
        let position = random_site_position(&mut rng, area);
        builder = builder.add_site(Site::new(
            site_id.clone(),
            &format!("Rooftop {site_number}"),
            Some(position)
        ));

        let devices = if rng.random_bool(OMNI_PROBABILITY) {
            vec![random_device(&mut rng, &site_id, "omni", DeviceRole::Omni)]
        } else {
            let sector_count = SECTORS_PER_SITE.min(device_count - generated);
            let first_direction = rng.random_range(0..SECTOR_DIRECTIONS.len());

            (0..sector_count)
                .map(|offset| {
                    let direction = SECTOR_DIRECTIONS
                        [(first_direction + offset) % SECTOR_DIRECTIONS.len()];

                    random_device(&mut rng, &site_id, direction, DeviceRole::Sector)
                })
                .collect()
        };

        for device in devices {
            let load = rng.random_range(area.utilization_range.clone());

            builder = builder
                .set_utilization(device.id().clone(), load)
                .add_device(device);
            generated += 1;
        }

        site_number += 1;
    }

    info!("Generated demo mesh of {device_count} devices on {site_number} sites");

    builder.build()
}

fn random_site_position(rng: &mut StdRng, area: &MeshArea) -> GeoPoint {
    let bearing = rng.random_range(0.0..360.0);
    // Uniform over the disc.
    let distance = area.radius * rng.random_range(0.0_f64..1.0).sqrt();

    area.origin
        .destination(bearing, distance)
        .with_elevation(rng.random_range(area.elevation_range.clone()))
}

// Devices take their site's coordinate, sectors their orientation from the
// compass word in the name.
fn random_device(
    rng: &mut StdRng,
    site_id: &SiteId,
    label: &str,
    role: DeviceRole,
) -> Device {
    let name = format!("{site_id}-{label}");
    let status = if rng.random_bool(INACTIVE_PROBABILITY) {
        DeviceStatus::Inactive
    } else {
        DeviceStatus::Active
    };

    let mut builder = DeviceBuilder::new()
        .set_id(DeviceId::new(&name))
        .set_name(&name)
        .set_role(role)
        .set_site_id(site_id.clone())
        .set_status(status);

    if let Some(allocation) = random_allocation(rng) {
        builder = builder.set_allocation(allocation);
    }
    if let Some(tx_power_dbm) = TX_POWERS_DBM.choose(rng) {
        builder = builder.set_tx_power(*tx_power_dbm);
    }

    builder.build()
}

fn random_allocation(rng: &mut StdRng) -> Option<FrequencyAllocation> {
    let center = *POPULAR_CENTERS.choose(rng)?;
    let width = *CHANNEL_WIDTHS.choose(rng)?;

    FrequencyAllocation::build(center, width).ok()
}


#[cfg(test)]
mod tests {
    use super::*;


    fn seeded_snapshot(device_count: usize, seed: u64) -> Snapshot {
        generate_snapshot(device_count, Some(seed), &MeshArea::default())
            .unwrap_or_else(|error| panic!("{}", error))
    }


    #[test]
    fn generates_requested_device_count() {
        for device_count in [0, 1, 5, 30] {
            assert_eq!(device_count, seeded_snapshot(device_count, 1).len());
        }
    }

    #[test]
    fn same_seed_same_mesh() {
        let snapshot1 = seeded_snapshot(20, 42);
        let snapshot2 = seeded_snapshot(20, 42);

        assert_eq!(snapshot1.devices(), snapshot2.devices());
    }

    #[test]
    fn devices_resolve_to_site_coordinates_inside_area() {
        let area = MeshArea::default();
        let snapshot = seeded_snapshot(25, 3);

        for index in 0..snapshot.len() {
            let position = snapshot.effective_position(index)
                .unwrap_or_else(|| panic!("device {index} has no coordinate"));

            assert!(MESH_ORIGIN.great_circle_distance(position) <= area.radius + 1e-6);
        }
    }

    #[test]
    fn sectors_are_oriented_from_their_names() {
        let snapshot = seeded_snapshot(30, 9);

        assert!(snapshot.devices()
            .iter()
            .filter(|device| device.role() == DeviceRole::Sector)
            .all(|device| device.orientation().is_some()));
    }
}
