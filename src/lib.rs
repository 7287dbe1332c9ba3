/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2023 Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

/*! # nyx-ephem

Numerical propagation into bounded ephemerides.

An adaptive step Runge Kutta integrator drives a spacecraft state forward or backward in time.
Every accepted step is recorded with its dense output, and the recorded steps are frozen into a
[`BoundedEphemeris`](ephemeris::BoundedEphemeris) which can be queried at any epoch of its
validity interval, in any order, from any thread, without integrating again.

The state vector may be augmented with the variational equations so that a single run yields both
the trajectory and its state transition matrix (and parameter sensitivities).
*/

/// Provides the integrators, the propagator and the step recorder.
pub mod propagators;

/// Provides the equations of motion interface, the variational equations and reference dynamics.
pub mod dynamics;

/// Provides the spacecraft state, its vector codec and the additional state registry.
pub mod cosmic;

/// Bounded ephemeris built from the recorded integration steps.
pub mod ephemeris;

/// Terminal events which stop a propagation.
pub mod events;

/// Configuration of propagators from YAML.
pub mod io;

/// Utility functions shared by different modules.
pub mod utils;

mod errors;
pub use self::errors::StateError;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::cosmic::{Spacecraft, StateLayout};
pub use self::ephemeris::BoundedEphemeris;
pub use self::propagators::{PropInstance, PropOpts, Propagator};
