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

use super::orbital::check_len;
use super::{Dynamics, DynamicsError, DynamicsStateSnafu, OrbitalDynamics, MU_PARAM};
use crate::errors::MissingDataSnafu;
use crate::linalg::{DMatrix, DVector};
use crate::time::Epoch;
use snafu::prelude::*;
use std::fmt;

/// Name of the mass flow rate for the parameter partials
pub const MASS_FLOW_PARAM: &str = "mass_flow";

/// A spacecraft which continuously depletes its mass at a constant rate, e.g. a cold gas leak or a
/// low thrust engine whose acceleration is not modeled.
///
/// The mass must be part of the propagated state.
#[derive(Clone, Debug, PartialEq)]
pub struct SpacecraftDynamics {
    pub orbital_dyn: OrbitalDynamics,
    /// Rate at which the mass decreases, in kg/s
    pub mass_flow_kg_s: f64,
}

impl SpacecraftDynamics {
    /// Spacecraft with a constant mass and the provided orbital dynamics
    pub fn new(orbital_dyn: OrbitalDynamics) -> Self {
        Self {
            orbital_dyn,
            mass_flow_kg_s: 0.0,
        }
    }

    /// Spacecraft depleting its mass at the provided rate
    pub fn with_mass_flow(orbital_dyn: OrbitalDynamics, mass_flow_kg_s: f64) -> Self {
        Self {
            orbital_dyn,
            mass_flow_kg_s,
        }
    }

    fn require_mass(state_vec: &DVector<f64>) -> Result<(), DynamicsError> {
        check_len(state_vec)?;
        if state_vec.len() != 7 {
            return MissingDataSnafu {
                what: "mass",
                expected: 7_usize,
                got: state_vec.len(),
            }
            .fail()
            .context(DynamicsStateSnafu);
        }
        Ok(())
    }
}

impl fmt::Display for SpacecraftDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Spacecraft dynamics (mass flow = {} kg/s)\t{}",
            self.mass_flow_kg_s, self.orbital_dyn
        )
    }
}

impl Dynamics for SpacecraftDynamics {
    fn eom(&self, epoch: Epoch, state_vec: &DVector<f64>) -> Result<DVector<f64>, DynamicsError> {
        Self::require_mass(state_vec)?;
        let mut d_x = self.orbital_dyn.eom(epoch, state_vec)?;
        d_x[6] = -self.mass_flow_kg_s;
        Ok(d_x)
    }

    fn dual_eom(
        &self,
        epoch: Epoch,
        state_vec: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), DynamicsError> {
        Self::require_mass(state_vec)?;
        // The mass rate does not depend on the state, so its row of the gradient is zero.
        let (mut d_x, grad) = self.orbital_dyn.dual_eom(epoch, state_vec)?;
        d_x[6] = -self.mass_flow_kg_s;
        Ok((d_x, grad))
    }

    fn parameter_partials(
        &self,
        epoch: Epoch,
        state_vec: &DVector<f64>,
        params: &[String],
    ) -> Result<DMatrix<f64>, DynamicsError> {
        Self::require_mass(state_vec)?;
        let mut partials = DMatrix::zeros(state_vec.len(), params.len());
        for (col, name) in params.iter().enumerate() {
            if name == MASS_FLOW_PARAM {
                partials[(6, col)] = -1.0;
            } else {
                let orbital = self.orbital_dyn.parameter_partials(
                    epoch,
                    state_vec,
                    std::slice::from_ref(name),
                )?;
                partials.set_column(col, &orbital.column(0));
            }
        }
        Ok(partials)
    }

    fn supports_parameter(&self, name: &str) -> bool {
        name == MASS_FLOW_PARAM || name == MU_PARAM
    }
}
