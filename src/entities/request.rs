use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Car,
    Bike,
    Foot,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Car, Profile::Bike, Profile::Foot];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bike => "bike",
            Self::Foot => "foot",
        }
    }

    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// One generated query. Never modified after generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub id: u64,
    pub start: Coordinates,
    pub end: Coordinates,
    pub profile: Profile,
}

impl RouteRequest {
    pub fn new(id: u64, start: Coordinates, end: Coordinates, profile: Profile) -> Self {
        Self {
            id,
            start,
            end,
            profile,
        }
    }
}
