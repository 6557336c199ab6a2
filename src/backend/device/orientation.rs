use serde::{Deserialize, Serialize};

use crate::backend::mathphysics::{angular_difference, normalize_degrees, Degree};


pub const DEFAULT_SECTOR_BEAMWIDTH: Degree = 90.0;

// Intercardinal words first, they contain the cardinal ones.
const COMPASS_HINTS: [(&str, Degree); 8] = [
    ("northeast", 45.0),
    ("southeast", 135.0),
    ("southwest", 225.0),
    ("northwest", 315.0),
    ("north", 0.0),
    ("east", 90.0),
    ("south", 180.0),
    ("west", 270.0),
];


#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    azimuth: Degree,
    beamwidth: Degree,
}

impl Orientation {
    #[must_use]
    pub fn new(azimuth: Degree, beamwidth: Degree) -> Self {
        Self {
            azimuth: normalize_degrees(azimuth),
            beamwidth: beamwidth.clamp(0.0, 360.0),
        }
    }

    // Sector names in the field often carry the direction they face,
    // e.g. "nycmesh-1340-north".
    #[must_use]
    pub fn from_name_hint(name: &str) -> Option<Self> {
        let name = name.to_lowercase();

        COMPASS_HINTS
            .iter()
            .find(|(hint, _)| name.contains(hint))
            .map(|(_, azimuth)| Self::new(*azimuth, DEFAULT_SECTOR_BEAMWIDTH))
    }

    #[must_use]
    pub fn azimuth(&self) -> Degree {
        self.azimuth
    }

    #[must_use]
    pub fn beamwidth(&self) -> Degree {
        self.beamwidth
    }

    // Bounds are inclusive and wrap around 0/360.
    #[must_use]
    pub fn covers(&self, bearing: Degree) -> bool {
        angular_difference(bearing, self.azimuth) <= self.beamwidth / 2.0
    }

    // Share of the half beam left between the bearing and the beam edge.
    #[must_use]
    pub fn alignment(&self, bearing: Degree) -> f64 {
        let half_beam = self.beamwidth / 2.0;
        let difference = angular_difference(bearing, self.azimuth);

        if difference > half_beam {
            0.0
        } else if half_beam <= 0.0 {
            1.0
        } else {
            1.0 - difference / half_beam
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn beam_wraps_around_north() {
        let north_facing = Orientation::new(350.0, 40.0);

        assert!(north_facing.covers(5.0));
        assert!(north_facing.covers(330.0));
        assert!(north_facing.covers(10.0));
        assert!(!north_facing.covers(11.0));
        assert!(!north_facing.covers(180.0));
    }

    #[test]
    fn alignment_falls_off_towards_beam_edge() {
        let east_facing = Orientation::new(90.0, 60.0);

        assert_eq!(1.0, east_facing.alignment(90.0));
        assert!((east_facing.alignment(105.0) - 0.5).abs() < 1e-9);
        assert!((east_facing.alignment(60.0) - 0.0).abs() < 1e-9);
        assert_eq!(0.0, east_facing.alignment(200.0));
    }

    #[test]
    fn full_circle_beam_covers_everything() {
        let omni_like = Orientation::new(123.0, 360.0);

        assert!(omni_like.covers(303.0));
        assert!(omni_like.covers(0.0));
    }

    #[test]
    fn azimuth_is_normalized() {
        assert_eq!(270.0, Orientation::new(-90.0, 60.0).azimuth());
    }

    #[test]
    fn orientation_is_inferred_from_name() {
        let east = Orientation::from_name_hint("nycmesh-227-East-LBE")
            .unwrap_or_else(|| panic!("no hint found"));

        assert_eq!(90.0, east.azimuth());
        assert_eq!(DEFAULT_SECTOR_BEAMWIDTH, east.beamwidth());
        assert!(Orientation::from_name_hint("nycmesh-227-omni").is_none());
    }

    #[test]
    fn intercardinal_hints_win_over_cardinal_ones() {
        let azimuth = |name: &str| Orientation::from_name_hint(name)
            .map(|orientation| orientation.azimuth());

        assert_eq!(Some(45.0), azimuth("nycmesh-1340-NorthEast"));
        assert_eq!(Some(135.0), azimuth("nycmesh-1340-southeast"));
        assert_eq!(Some(225.0), azimuth("sn3-southwest"));
        assert_eq!(Some(315.0), azimuth("sn3-northwest"));
        assert_eq!(Some(0.0), azimuth("sn3-north"));
    }
}
