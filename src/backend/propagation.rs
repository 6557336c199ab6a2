use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::device::{DeviceId, DeviceIndex};
use super::mathphysics::{
    free_space_path_loss, radio_horizon, slant_distance, Decibel, Kilometer,
    Megahertz, Position
};
use super::snapshot::Snapshot;


pub const DEFAULT_SIGNIFICANCE_THRESHOLD_DB: Decibel = 125.0;
pub const DEFAULT_REFERENCE_ATTENUATION_DB: Decibel  = 80.0;
pub const DEFAULT_BEYOND_HORIZON_PENALTY_DB: Decibel = 20.0;
pub const DEFAULT_REFERENCE_TX_POWER_DBM: Decibel    = 20.0;

// Used when the transmitting side has no allocation of its own.
pub const FALLBACK_FREQUENCY: Megahertz = 5_500;

// A pair seen only by one of its beams couples at most half as strongly.
const ONE_SIDED_COUPLING: f64 = 0.5;


#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Device `{0}` has neither a position nor a site coordinate")]
    MissingGeometry(DeviceId),
    #[error("Device index {0} is not in the snapshot")]
    UnknownDevice(DeviceIndex),
}


// Constants of the simplified path-loss model. The values rank pairs
// relative to each other; they do not predict received power.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationModel {
    pub significance_threshold_db: Decibel,
    pub reference_attenuation_db: Decibel,
    pub beyond_horizon_penalty_db: Decibel,
    // Transmit power the attenuation figures are calibrated for. Devices
    // without a reported power are assumed to transmit at it.
    pub reference_tx_power_dbm: Decibel,
}

impl PropagationModel {
    #[must_use]
    pub fn is_significant(&self, attenuation: Decibel) -> bool {
        attenuation < self.significance_threshold_db
    }

    // 1.0 at or below the reference attenuation, falling linearly to 0.0 at
    // the significance threshold.
    #[must_use]
    pub fn strength_factor(&self, attenuation: Decibel) -> f64 {
        let span = self.significance_threshold_db - self.reference_attenuation_db;

        if span <= 0.0 {
            return 0.0;
        }

        ((self.significance_threshold_db - attenuation) / span).clamp(0.0, 1.0)
    }
}

impl Default for PropagationModel {
    fn default() -> Self {
        Self {
            significance_threshold_db: DEFAULT_SIGNIFICANCE_THRESHOLD_DB,
            reference_attenuation_db: DEFAULT_REFERENCE_ATTENUATION_DB,
            beyond_horizon_penalty_db: DEFAULT_BEYOND_HORIZON_PENALTY_DB,
            reference_tx_power_dbm: DEFAULT_REFERENCE_TX_POWER_DBM,
        }
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PropagationEstimate {
    pub distance_km: Kilometer,
    // The source beam covers the target.
    pub within_beam: bool,
    // The target beam covers the source.
    pub reverse_within_beam: bool,
    pub attenuation_db: Decibel,
    // 1.0 for two antennas on each other's boresight, 0.0 when neither
    // beam covers the other side.
    pub beam_coupling: f64,
    pub significant: bool,
}


// Frequency independent part of an estimate. Computed once per pair, then
// evaluated at whatever frequency the pair is tried on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairGeometry {
    distance_km: Kilometer,
    source_covers_target: bool,
    target_covers_source: bool,
    source_alignment: f64,
    target_alignment: f64,
    source_tx_power_dbm: Option<Decibel>,
    target_tx_power_dbm: Option<Decibel>,
    penalty_db: Decibel,
}

impl PairGeometry {
    /// # Errors
    ///
    /// Will return `Err` if either device is unknown or has no resolvable
    /// coordinate.
    pub fn between(
        snapshot: &Snapshot,
        source: DeviceIndex,
        target: DeviceIndex,
        model: &PropagationModel,
    ) -> Result<Self, GeometryError> {
        let source_device = snapshot.device(source)
            .ok_or(GeometryError::UnknownDevice(source))?;
        let target_device = snapshot.device(target)
            .ok_or(GeometryError::UnknownDevice(target))?;

        let source_position = snapshot.effective_position(source)
            .ok_or_else(|| GeometryError::MissingGeometry(
                source_device.id().clone()
            ))?;
        let target_position = snapshot.effective_position(target)
            .ok_or_else(|| GeometryError::MissingGeometry(
                target_device.id().clone()
            ))?;

        let ground_distance = source_position.distance_to(target_position);
        let mut penalty_db = snapshot.obstruction(source, target);

        let distance_km = match (source_position.elevation, target_position.elevation) {
            (Some(source_height), Some(target_height)) => {
                if ground_distance > radio_horizon(source_height, target_height) {
                    penalty_db += model.beyond_horizon_penalty_db;
                }

                slant_distance(ground_distance, target_height - source_height)
            },
            _ => ground_distance,
        };

        // Coincident devices have no meaningful bearing. Treat them as
        // facing each other.
        let (source_covers_target, target_covers_source, source_alignment, target_alignment) =
            if ground_distance > 0.0 {
                let forward = source_position.bearing_to(target_position);
                let backward = target_position.bearing_to(source_position);

                (
                    source_device.beam_covers(forward),
                    target_device.beam_covers(backward),
                    source_device.beam_alignment(forward),
                    target_device.beam_alignment(backward),
                )
            } else {
                (true, true, 1.0, 1.0)
            };

        Ok(Self {
            distance_km,
            source_covers_target,
            target_covers_source,
            source_alignment,
            target_alignment,
            source_tx_power_dbm: source_device.tx_power_dbm(),
            target_tx_power_dbm: target_device.tx_power_dbm(),
            penalty_db,
        })
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            source_covers_target: self.target_covers_source,
            target_covers_source: self.source_covers_target,
            source_alignment: self.target_alignment,
            target_alignment: self.source_alignment,
            source_tx_power_dbm: self.target_tx_power_dbm,
            target_tx_power_dbm: self.source_tx_power_dbm,
            ..*self
        }
    }

    #[must_use]
    pub fn distance_km(&self) -> Kilometer {
        self.distance_km
    }

    #[must_use]
    pub fn any_beam_covers(&self) -> bool {
        self.source_covers_target || self.target_covers_source
    }

    // Boresight alignments averaged when both beams cover, halved when only
    // one does.
    #[must_use]
    pub fn beam_coupling(&self) -> f64 {
        match (self.source_covers_target, self.target_covers_source) {
            (true, true)   => (self.source_alignment + self.target_alignment) / 2.0,
            (true, false)  => ONE_SIDED_COUPLING * self.source_alignment,
            (false, true)  => ONE_SIDED_COUPLING * self.target_alignment,
            (false, false) => 0.0,
        }
    }

    #[must_use]
    pub fn estimate_at(
        &self,
        frequency: Megahertz,
        model: &PropagationModel
    ) -> PropagationEstimate {
        // A louder transmitter is heard as if the path were shorter.
        let power_offset_db = self.source_tx_power_dbm
            .map_or(0.0, |power| power - model.reference_tx_power_dbm);
        let attenuation_db = free_space_path_loss(self.distance_km, frequency)
            + self.penalty_db
            - power_offset_db;

        PropagationEstimate {
            distance_km: self.distance_km,
            within_beam: self.source_covers_target,
            reverse_within_beam: self.target_covers_source,
            attenuation_db,
            beam_coupling: self.beam_coupling(),
            significant: model.is_significant(attenuation_db)
                && self.any_beam_covers(),
        }
    }
}


/// Estimates how strongly `source` is heard at `target`, at the source's own
/// center frequency.
///
/// # Errors
///
/// Will return `Err` if either device lacks a usable coordinate.
pub fn estimate(
    snapshot: &Snapshot,
    source: DeviceIndex,
    target: DeviceIndex,
    model: &PropagationModel,
) -> Result<PropagationEstimate, GeometryError> {
    let geometry = PairGeometry::between(snapshot, source, target, model)?;
    let frequency = snapshot.device(source)
        .and_then(|device| device.allocation())
        .map_or(FALLBACK_FREQUENCY, |allocation| allocation.center());

    Ok(geometry.estimate_at(frequency, model))
}


#[cfg(test)]
mod tests {
    use crate::backend::allocation::FrequencyAllocation;
    use crate::backend::device::{
        Device, DeviceBuilder, DeviceRole, Orientation, Site, SiteId
    };
    use crate::backend::mathphysics::{Degree, GeoPoint};
    use crate::backend::snapshot::SnapshotBuilder;

    use super::*;


    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 40.7128,
        longitude: -74.0060,
        elevation: None
    };


    fn sector(id: &str, position: GeoPoint, azimuth: Degree) -> Device {
        DeviceBuilder::new()
            .set_id(DeviceId::new(id))
            .set_role(DeviceRole::Sector)
            .set_site_id(SiteId::new(id))
            .set_position(position)
            .set_orientation(Orientation::new(azimuth, 60.0))
            .set_allocation(
                FrequencyAllocation::build(5_700, 40)
                    .unwrap_or_else(|error| panic!("{}", error))
            )
            .build()
    }

    fn snapshot_of(devices: &[Device]) -> Snapshot {
        SnapshotBuilder::new()
            .add_devices(devices)
            .build()
            .unwrap_or_else(|error| panic!("{}", error))
    }

    fn estimate_between(
        snapshot: &Snapshot,
        source: DeviceIndex,
        target: DeviceIndex
    ) -> PropagationEstimate {
        estimate(snapshot, source, target, &PropagationModel::default())
            .unwrap_or_else(|error| panic!("{}", error))
    }


    #[test]
    fn facing_sectors_50_m_apart_are_significant() {
        let east_point = ORIGIN.destination(90.0, 0.05);
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 90.0),
            sector("b", east_point, 270.0),
        ]);

        let estimate = estimate_between(&snapshot, 0, 1);

        assert!((estimate.distance_km - 0.05).abs() < 1e-6);
        assert!(estimate.within_beam);
        assert!(estimate.reverse_within_beam);
        assert!(estimate.significant);
        assert!(estimate.beam_coupling > 0.99);
    }

    #[test]
    fn sectors_facing_away_are_not_significant() {
        let east_point = ORIGIN.destination(90.0, 0.05);
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 270.0),
            sector("b", east_point, 90.0),
        ]);

        let estimate = estimate_between(&snapshot, 0, 1);

        assert!(!estimate.within_beam);
        assert!(!estimate.reverse_within_beam);
        assert!(!estimate.significant);
    }

    #[test]
    fn beam_test_wraps_around_north() {
        let north_west_point = ORIGIN.destination(350.0, 0.2);
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 10.0),
            sector("b", north_west_point, 250.0),
        ]);

        let estimate = estimate_between(&snapshot, 0, 1);

        assert!(estimate.within_beam);
        assert!(!estimate.reverse_within_beam);
        // 20 degrees off a 30 degree half beam, seen from one side only.
        let expected = ONE_SIDED_COUPLING * (1.0 - 20.0 / 30.0);
        assert!((estimate.beam_coupling - expected).abs() < 1e-3);
        assert!(estimate.significant);
    }

    #[test]
    fn coupling_weakens_off_boresight() {
        let east_point = ORIGIN.destination(90.0, 0.05);
        let on_axis = snapshot_of(&[
            sector("a", ORIGIN, 90.0),
            sector("b", east_point, 270.0),
        ]);
        let skewed = snapshot_of(&[
            sector("a", ORIGIN, 115.0),
            sector("b", east_point, 245.0),
        ]);

        let on_axis_estimate = estimate_between(&on_axis, 0, 1);
        let skewed_estimate = estimate_between(&skewed, 0, 1);

        assert!(skewed_estimate.within_beam);
        assert!(skewed_estimate.reverse_within_beam);
        assert!((skewed_estimate.beam_coupling - 1.0 / 6.0).abs() < 1e-3);
        assert!(skewed_estimate.beam_coupling < on_axis_estimate.beam_coupling);
    }

    #[test]
    fn louder_transmitter_is_attenuated_less() {
        let east_point = ORIGIN.destination(90.0, 0.5);
        let loud = DeviceBuilder::new()
            .set_id(DeviceId::new("loud"))
            .set_position(east_point)
            .set_tx_power(27.0)
            .build();
        let quiet = DeviceBuilder::new()
            .set_id(DeviceId::new("quiet"))
            .set_position(east_point)
            .build();
        let snapshot = snapshot_of(&[sector("a", ORIGIN, 90.0), loud, quiet]);

        let from_loud = estimate_between(&snapshot, 1, 0);
        let from_quiet = estimate_between(&snapshot, 2, 0);

        assert!(
            (from_quiet.attenuation_db - from_loud.attenuation_db - 7.0).abs() < 1e-9
        );
    }

    #[test]
    fn client_receivers_are_always_within_beam() {
        let client = DeviceBuilder::new()
            .set_id(DeviceId::new("client"))
            .set_role(DeviceRole::Client)
            .set_position(ORIGIN.destination(180.0, 0.5))
            .build();
        let snapshot = snapshot_of(&[sector("a", ORIGIN, 0.0), client]);

        let estimate = estimate_between(&snapshot, 0, 1);

        assert!(!estimate.within_beam);
        assert!(estimate.reverse_within_beam);
        assert!(estimate.significant);
    }

    #[test]
    fn attenuation_grows_with_distance() {
        let snapshot = snapshot_of(&[
            sector("a", ORIGIN, 90.0),
            sector("b", ORIGIN.destination(90.0, 0.5), 270.0),
            sector("c", ORIGIN.destination(90.0, 50.0), 270.0),
        ]);

        let near = estimate_between(&snapshot, 0, 1);
        let far  = estimate_between(&snapshot, 0, 2);

        assert!(near.attenuation_db < far.attenuation_db);
        assert!(!far.significant);
    }

    #[test]
    fn obstruction_and_horizon_penalties_are_added() {
        let low_a = ORIGIN.with_elevation(1.0);
        let low_b = ORIGIN.destination(90.0, 10.0).with_elevation(1.0);
        let high_b = ORIGIN.destination(90.0, 10.0).with_elevation(100.0);

        let clear = snapshot_of(&[sector("a", low_a, 90.0), sector("b", high_b, 270.0)]);
        let beyond_horizon = snapshot_of(&[
            sector("a", low_a, 90.0),
            sector("b", low_b, 270.0)
        ]);
        let obstructed = SnapshotBuilder::new()
            .add_devices(&[sector("a", low_a, 90.0), sector("b", high_b, 270.0)])
            .add_obstruction(DeviceId::new("a"), DeviceId::new("b"), 15.0)
            .build()
            .unwrap_or_else(|error| panic!("{}", error));

        let clear_estimate = estimate_between(&clear, 0, 1);
        let beyond_estimate = estimate_between(&beyond_horizon, 0, 1);
        let obstructed_estimate = estimate_between(&obstructed, 0, 1);

        let free_space = free_space_path_loss(clear_estimate.distance_km, 5_700);

        assert!((clear_estimate.attenuation_db - free_space).abs() < 1e-9);
        assert!(
            beyond_estimate.attenuation_db - clear_estimate.attenuation_db > 19.0
        );
        assert!(
            (obstructed_estimate.attenuation_db - free_space - 15.0).abs() < 1e-9
        );
    }

    #[test]
    fn missing_geometry_is_reported() {
        let unplaced = DeviceBuilder::new()
            .set_id(DeviceId::new("z"))
            .set_site_id(SiteId::new("unknown"))
            .build();
        let snapshot = snapshot_of(&[sector("a", ORIGIN, 0.0), unplaced]);

        let result = estimate(&snapshot, 0, 1, &PropagationModel::default());

        assert_eq!(
            Err(GeometryError::MissingGeometry(DeviceId::new("z"))),
            result
        );
    }

    #[test]
    fn site_coordinate_is_used_when_position_is_absent() {
        let on_site = DeviceBuilder::new()
            .set_id(DeviceId::new("z"))
            .set_site_id(SiteId::new("roof"))
            .build();
        let snapshot = SnapshotBuilder::new()
            .add_site(Site::new(
                SiteId::new("roof"),
                "Roof",
                Some(ORIGIN.destination(0.0, 1.0))
            ))
            .add_devices(&[sector("a", ORIGIN, 0.0), on_site])
            .build()
            .unwrap_or_else(|error| panic!("{}", error));

        let estimate = estimate_between(&snapshot, 0, 1);

        assert!((estimate.distance_km - 1.0).abs() < 1e-6);
        assert!(estimate.within_beam);
    }

    #[test]
    fn strength_factor_is_clipped() {
        let model = PropagationModel::default();

        assert_eq!(1.0, model.strength_factor(60.0));
        assert_eq!(0.0, model.strength_factor(130.0));
        assert!((model.strength_factor(102.5) - 0.5).abs() < 1e-9);
    }
}
