use serde::{Deserialize, Serialize};

use super::{normalize_degrees, Degree, Kilometer, Meter};


pub const EARTH_RADIUS_KM: Kilometer = 6_371.0;


#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: Degree,
    pub longitude: Degree,
    #[serde(default)]
    pub elevation: Option<Meter>,
}

impl GeoPoint {
    #[must_use]
    pub fn new(latitude: Degree, longitude: Degree) -> Self {
        Self { latitude, longitude, elevation: None }
    }

    #[must_use]
    pub fn with_elevation(mut self, elevation: Meter) -> Self {
        self.elevation = Some(elevation);
        self
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.elevation.is_none_or(f64::is_finite)
    }

    // Haversine formula.
    #[must_use]
    pub fn great_circle_distance(&self, other: &Self) -> Kilometer {
        let latitude1 = self.latitude.to_radians();
        let latitude2 = other.latitude.to_radians();
        let delta_latitude  = (other.latitude - self.latitude).to_radians();
        let delta_longitude = (other.longitude - self.longitude).to_radians();

        let a = (delta_latitude / 2.0).sin().powi(2)
            + latitude1.cos()
            * latitude2.cos()
            * (delta_longitude / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    #[must_use]
    pub fn initial_bearing(&self, other: &Self) -> Degree {
        let latitude1 = self.latitude.to_radians();
        let latitude2 = other.latitude.to_radians();
        let delta_longitude = (other.longitude - self.longitude).to_radians();

        let x = delta_longitude.sin() * latitude2.cos();
        let y = latitude1.cos() * latitude2.sin()
            - latitude1.sin() * latitude2.cos() * delta_longitude.cos();

        normalize_degrees(x.atan2(y).to_degrees())
    }

    // Moves the point by a distance along a bearing. Used to lay out
    // synthetic networks.
    #[must_use]
    pub fn destination(&self, bearing: Degree, distance: Kilometer) -> Self {
        let angular_distance = distance / EARTH_RADIUS_KM;
        let bearing   = bearing.to_radians();
        let latitude1 = self.latitude.to_radians();
        let longitude1 = self.longitude.to_radians();

        let latitude2 = (latitude1.sin() * angular_distance.cos()
            + latitude1.cos() * angular_distance.sin() * bearing.cos())
            .asin();
        let longitude2 = longitude1 + (
            bearing.sin() * angular_distance.sin() * latitude1.cos()
        ).atan2(angular_distance.cos() - latitude1.sin() * latitude2.sin());

        Self {
            latitude: latitude2.to_degrees(),
            longitude: longitude2.to_degrees(),
            elevation: self.elevation,
        }
    }
}
