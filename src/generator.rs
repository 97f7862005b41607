use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

use crate::{
    config::{Config, ProfileSelection},
    entities::{Bounds, Coordinates, Location, Method, Profile, RouteRequest},
    error::{configuration_error, Error},
};

/// Builds the request sequence described by `config`, seeded from `random_seed`.
#[tracing::instrument(skip_all, fields(method = config.route_generator.method.name()))]
pub fn generate(config: &Config) -> Result<Vec<RouteRequest>, Error> {
    let rg = &config.route_generator;
    let mut rng = StdRng::seed_from_u64(rg.random_seed);

    let requests = match rg.method {
        Method::Random => {
            let bounds = config.bounds()?;
            generate_random(rg.route_count, &bounds, rg.profile, &mut rng)?
        }
        Method::Permutation => {
            generate_permutation(rg.route_count, &rg.location_set, rg.profile, &mut rng)?
        }
    };

    tracing::info!("generated {} route requests", requests.len());

    Ok(requests)
}

/// Draws `count` independent start/end pairs uniformly inside `bounds`.
pub fn generate_random<R: Rng + ?Sized>(
    count: usize,
    bounds: &Bounds,
    profile: ProfileSelection,
    rng: &mut R,
) -> Result<Vec<RouteRequest>, Error> {
    bounds
        .validate()
        .map_err(|err| configuration_error(format!("invalid bounds: {}", err.message)))?;

    let lat = Uniform::new_inclusive(bounds.min_lat, bounds.max_lat);
    let lng = Uniform::new_inclusive(bounds.min_lng, bounds.max_lng);

    let requests = (1..=count as u64)
        .map(|id| {
            let start = Coordinates::new(lat.sample(rng), lng.sample(rng));
            let end = Coordinates::new(lat.sample(rng), lng.sample(rng));

            RouteRequest::new(id, start, end, pick_profile(profile, rng))
        })
        .collect();

    Ok(requests)
}

/// Cycles through a shuffled list of every ordered pair of distinct locations.
///
/// All `L * (L - 1)` pairs are covered once before any pair repeats, and
/// `count` may exceed the number of pairs.
pub fn generate_permutation<R: Rng + ?Sized>(
    count: usize,
    locations: &[Location],
    profile: ProfileSelection,
    rng: &mut R,
) -> Result<Vec<RouteRequest>, Error> {
    if locations.len() < 2 {
        return Err(configuration_error(
            "need at least 2 locations for permutation",
        ));
    }

    let mut pairs: Vec<(usize, usize)> = (0..locations.len())
        .flat_map(|i| (0..locations.len()).map(move |j| (i, j)))
        .filter(|(i, j)| i != j)
        .collect();

    pairs.shuffle(rng);

    let requests = (0..count)
        .map(|i| {
            let (from, to) = pairs[i % pairs.len()];

            RouteRequest::new(
                i as u64 + 1,
                locations[from].coordinates(),
                locations[to].coordinates(),
                pick_profile(profile, rng),
            )
        })
        .collect();

    Ok(requests)
}

fn pick_profile<R: Rng + ?Sized>(selection: ProfileSelection, rng: &mut R) -> Profile {
    selection.fixed().unwrap_or_else(|| Profile::sample(rng))
}
