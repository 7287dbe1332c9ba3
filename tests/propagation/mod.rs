extern crate nyx_ephem as nyx;

use nyx::cosmic::Spacecraft;
use nyx::dynamics::OrbitalDynamics;
use nyx::propagators::{MixedTolerance, PropOpts, Propagator};
use nyx::time::Epoch;
use rstest::*;

pub(crate) const GMAT_EARTH_GM: f64 = 398_600.441_5;

mod abort;
mod additional;
mod config;
mod direction;
mod events;
mod jacobians;

pub(crate) fn start_epoch() -> Epoch {
    Epoch::from_gregorian_tai_at_midnight(2020, 1, 1)
}

/// Slightly eccentric orbit whose periapsis is well above the surface of the Earth
#[fixture]
pub(crate) fn leo() -> Spacecraft {
    Spacecraft::cartesian(7000.0, 1000.0, 4000.0, -0.5, 8.0, 1.0, start_epoch())
}

/// Two body Dormand Prince 8(5,3) propagator with the same absolute and relative tolerance on every
/// component
pub(crate) fn two_body(tolerance: f64) -> Propagator<OrbitalDynamics, MixedTolerance> {
    Propagator::dp853(
        OrbitalDynamics::new(GMAT_EARTH_GM),
        PropOpts::with_tolerance(tolerance),
    )
}
