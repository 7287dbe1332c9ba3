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

use super::EventEvaluator;
use crate::cosmic::Spacecraft;
use crate::errors::{MissingDataSnafu, StateError};
use crate::time::{Duration, Unit};
use snafu::OptionExt;
use std::fmt;

/// Radius magnitude crosses the desired value.
///
/// By default, the time precision is 1 millisecond and the value precision is one meter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadiusEvent {
    pub desired_value_km: f64,
    pub epoch_precision: Duration,
    pub value_precision_km: f64,
}

impl RadiusEvent {
    pub fn new(desired_value_km: f64) -> Self {
        Self::within_tolerance(desired_value_km, 1 * Unit::Millisecond, 1e-3)
    }

    pub fn within_tolerance(
        desired_value_km: f64,
        epoch_precision: Duration,
        value_precision_km: f64,
    ) -> Self {
        Self {
            desired_value_km,
            epoch_precision,
            value_precision_km,
        }
    }
}

impl fmt::Display for RadiusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|r| = {} km (± {:e} km)",
            self.desired_value_km, self.value_precision_km
        )
    }
}

impl EventEvaluator for RadiusEvent {
    fn eval(&self, state: &Spacecraft) -> Result<f64, StateError> {
        Ok(state.rmag_km() - self.desired_value_km)
    }

    fn epoch_precision(&self) -> Duration {
        self.epoch_precision
    }

    fn value_precision(&self) -> f64 {
        self.value_precision_km
    }
}

/// Propagated mass crosses the desired value, e.g. to stop when the propellant runs out.
///
/// By default, the time precision is 1 millisecond and the value precision is one gram.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MassEvent {
    pub desired_value_kg: f64,
    pub epoch_precision: Duration,
    pub value_precision_kg: f64,
}

impl MassEvent {
    pub fn new(desired_value_kg: f64) -> Self {
        Self {
            desired_value_kg,
            epoch_precision: 1 * Unit::Millisecond,
            value_precision_kg: 1e-3,
        }
    }
}

impl fmt::Display for MassEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mass = {} kg (± {:e} kg)",
            self.desired_value_kg, self.value_precision_kg
        )
    }
}

impl EventEvaluator for MassEvent {
    /// Fails if the mass is not propagated
    fn eval(&self, state: &Spacecraft) -> Result<f64, StateError> {
        let mass_kg = state.mass_kg.context(MissingDataSnafu {
            what: "mass",
            expected: 1_usize,
            got: 0_usize,
        })?;
        Ok(mass_kg - self.desired_value_kg)
    }

    fn epoch_precision(&self) -> Duration {
        self.epoch_precision
    }

    fn value_precision(&self) -> f64 {
        self.value_precision_kg
    }
}
