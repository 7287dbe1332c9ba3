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

use super::{Dynamics, DynamicsError, DynamicsStateSnafu, UnsupportedParameterSnafu};
use crate::cosmic::EARTH_GM_KM3_S2;
use crate::errors::MissingDataSnafu;
use crate::linalg::{DMatrix, DVector, Vector3, U5};
use crate::time::Epoch;
use hyperdual::linalg::norm;
use hyperdual::{Float, OHyperdual};
use snafu::prelude::*;
use std::fmt;

/// Name of the gravitational parameter for the parameter partials
pub const MU_PARAM: &str = "mu";

/// `OrbitalDynamics` provides the equations of motion for a point mass central body.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitalDynamics {
    /// Gravitational parameter of the central body, in km^3/s^2
    pub mu_km3_s2: f64,
}

impl OrbitalDynamics {
    /// Two body dynamics about the Earth
    pub fn two_body() -> Self {
        Self::new(EARTH_GM_KM3_S2)
    }

    /// Two body dynamics about a central body with the provided gravitational parameter
    pub fn new(mu_km3_s2: f64) -> Self {
        Self { mu_km3_s2 }
    }

    /// Computes the acceleration and its dual parts with respect to the position (first three) and mu (last).
    fn dual_acceleration(&self, state_vec: &DVector<f64>) -> Vector3<OHyperdual<f64, U5>> {
        let radius = Vector3::new(
            OHyperdual::<f64, U5>::from_slice(&[state_vec[0], 1.0, 0.0, 0.0, 0.0]),
            OHyperdual::<f64, U5>::from_slice(&[state_vec[1], 0.0, 1.0, 0.0, 0.0]),
            OHyperdual::<f64, U5>::from_slice(&[state_vec[2], 0.0, 0.0, 1.0, 0.0]),
        );
        let mu = OHyperdual::<f64, U5>::from_slice(&[self.mu_km3_s2, 0.0, 0.0, 0.0, 1.0]);

        let rmag = norm(&radius);
        radius * (-mu / rmag.powi(3))
    }
}

pub(crate) fn check_len(state_vec: &DVector<f64>) -> Result<(), DynamicsError> {
    if state_vec.len() != 6 && state_vec.len() != 7 {
        return MissingDataSnafu {
            what: "base state",
            expected: 6_usize,
            got: state_vec.len(),
        }
        .fail()
        .context(DynamicsStateSnafu);
    }
    Ok(())
}

impl fmt::Display for OrbitalDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Two body dynamics (mu = {} km^3/s^2)", self.mu_km3_s2)
    }
}

impl Dynamics for OrbitalDynamics {
    fn eom(&self, _epoch: Epoch, state_vec: &DVector<f64>) -> Result<DVector<f64>, DynamicsError> {
        check_len(state_vec)?;
        let radius = Vector3::new(state_vec[0], state_vec[1], state_vec[2]);
        let body_acceleration = (-self.mu_km3_s2 / radius.norm().powi(3)) * radius;

        // The mass derivative, if any, is zero
        let mut d_x = DVector::zeros(state_vec.len());
        d_x.fixed_rows_mut::<3>(0).copy_from(&state_vec.fixed_rows::<3>(3));
        d_x.fixed_rows_mut::<3>(3).copy_from(&body_acceleration);
        Ok(d_x)
    }

    fn dual_eom(
        &self,
        _epoch: Epoch,
        state_vec: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), DynamicsError> {
        check_len(state_vec)?;
        let n = state_vec.len();
        let body_acceleration = self.dual_acceleration(state_vec);

        let mut d_x = DVector::zeros(n);
        let mut grad = DMatrix::zeros(n, n);
        for i in 0..3 {
            // Velocity
            d_x[i] = state_vec[i + 3];
            grad[(i, i + 3)] = 1.0;
            // Acceleration
            d_x[i + 3] = body_acceleration[i].real();
            for j in 0..3 {
                grad[(i + 3, j)] = body_acceleration[i][j + 1];
            }
        }

        Ok((d_x, grad))
    }

    fn parameter_partials(
        &self,
        _epoch: Epoch,
        state_vec: &DVector<f64>,
        params: &[String],
    ) -> Result<DMatrix<f64>, DynamicsError> {
        check_len(state_vec)?;
        let mut partials = DMatrix::zeros(state_vec.len(), params.len());
        let body_acceleration = self.dual_acceleration(state_vec);
        for (col, name) in params.iter().enumerate() {
            ensure!(
                name == MU_PARAM,
                UnsupportedParameterSnafu { name: name.clone() }
            );
            for i in 0..3 {
                partials[(i + 3, col)] = body_acceleration[i][4];
            }
        }
        Ok(partials)
    }

    fn supports_parameter(&self, name: &str) -> bool {
        name == MU_PARAM
    }
}
