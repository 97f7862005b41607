use serde::{Deserialize, Serialize};

use crate::error::{invalid_input_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(invalid_input_error(format!(
                "latitude must be between -90 and 90, got {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(invalid_input_error(format!(
                "longitude must be between -180 and 180, got {}",
                self.longitude
            )));
        }

        Ok(())
    }
}

/// A named point of the permutation location set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Rectangular sampling area for the random method.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lng..=self.max_lng).contains(&point.longitude)
    }

    pub fn validate(&self) -> Result<(), Error> {
        Coordinates::new(self.min_lat, self.min_lng).validate()?;
        Coordinates::new(self.max_lat, self.max_lng).validate()?;

        if self.min_lat > self.max_lat || self.min_lng > self.max_lng {
            return Err(invalid_input_error("bounds minimum exceeds maximum"));
        }

        Ok(())
    }
}

#[test]
fn coordinates_outside_range_are_rejected() {
    assert!(Coordinates::new(51.5074, -0.1278).validate().is_ok());
    assert!(Coordinates::new(90.0, 180.0).validate().is_ok());
    assert!(Coordinates::new(90.5, 0.0).validate().is_err());
    assert!(Coordinates::new(0.0, -180.1).validate().is_err());
}

#[test]
fn inverted_bounds_are_rejected() {
    let bounds = Bounds {
        min_lat: 50.0,
        max_lat: 49.0,
        min_lng: -5.0,
        max_lng: 1.0,
    };

    assert!(bounds.validate().is_err());
}
