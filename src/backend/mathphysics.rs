pub use geo::{GeoPoint, EARTH_RADIUS_KM};


pub mod geo;


pub type Decibel   = f64;
pub type Degree    = f64;
pub type Kilometer = f64;
pub type Megahertz = u32;
pub type Meter     = f64;


// Constant term of the free-space path loss with distance in kilometers and
// frequency in megahertz.
const FSPL_CONSTANT_DB: Decibel = 32.44;
// Effective earth radius (k = 4/3) folded into the radio horizon formula.
const RADIO_HORIZON_COEFFICIENT: Kilometer = 4.12;
const MIN_PATH_LENGTH: Kilometer = 0.001;


#[must_use]
pub fn normalize_degrees(angle: Degree) -> Degree {
    angle.rem_euclid(360.0)
}

// Smallest absolute difference between two headings, in [0, 180].
#[must_use]
pub fn angular_difference(angle1: Degree, angle2: Degree) -> Degree {
    let difference = normalize_degrees(angle1 - angle2);

    if difference > 180.0 {
        360.0 - difference
    } else {
        difference
    }
}

#[must_use]
pub fn free_space_path_loss(distance: Kilometer, frequency: Megahertz) -> Decibel {
    let distance = distance.max(MIN_PATH_LENGTH);

    FSPL_CONSTANT_DB
        + 20.0 * distance.log10()
        + 20.0 * f64::from(frequency).log10()
}

#[must_use]
pub fn radio_horizon(height1: Meter, height2: Meter) -> Kilometer {
    RADIO_HORIZON_COEFFICIENT * (height1.max(0.0).sqrt() + height2.max(0.0).sqrt())
}

#[must_use]
pub fn slant_distance(ground_distance: Kilometer, height_difference: Meter) -> Kilometer {
    let height_difference = height_difference / 1_000.0;

    ground_distance.hypot(height_difference)
}


pub trait Position {
    fn position(&self) -> &GeoPoint;

    fn distance_to<P: Position>(&self, other: &P) -> Kilometer {
        self.position().great_circle_distance(other.position())
    }

    fn bearing_to<P: Position>(&self, other: &P) -> Degree {
        self.position().initial_bearing(other.position())
    }
}

impl Position for GeoPoint {
    fn position(&self) -> &GeoPoint {
        self
    }
}
