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

use crate::cosmic::Spacecraft;
use crate::errors::StateError;
use crate::linalg::{DMatrix, DVector};
use crate::time::Epoch;
use snafu::Snafu;
use std::fmt;

/// Cartesian two body dynamics, with automatic differentiation.
pub mod orbital;
pub use self::orbital::*;

/// Spacecraft dynamics with a constant mass flow.
pub mod spacecraft;
pub use self::spacecraft::*;

/// Variational equations and the augmented equations of motion seen by the integrator.
pub mod variational;
pub use self::variational::*;

/// The `Dynamics` trait handles the equations of motion of the base state.
///
/// The base state vector is [x, y, z, vx, vy, vz] in km and km/s, followed by the mass in kg when the
/// mass is propagated. Implementations must return a derivative of the same length as the provided state.
pub trait Dynamics: Clone + Sync + Send + fmt::Display {
    /// Defines the equations of motion at the provided epoch.
    fn eom(&self, epoch: Epoch, state_vec: &DVector<f64>) -> Result<DVector<f64>, DynamicsError>;

    /// Returns the derivative of the state and the Jacobian of the equations of motion with respect to
    /// the state, i.e. the matrix A(t) = ∂f/∂x of the variational equations.
    ///
    /// Dynamics which cannot be differentiated keep the default, which prevents the variational
    /// equations from being integrated.
    fn dual_eom(
        &self,
        _epoch: Epoch,
        _state_vec: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), DynamicsError> {
        Err(DynamicsError::StateTransitionMatrixUnset)
    }

    /// Returns the partial derivatives of the equations of motion with respect to the named parameters,
    /// as a matrix of as many rows as the state and one column per parameter.
    fn parameter_partials(
        &self,
        _epoch: Epoch,
        state_vec: &DVector<f64>,
        params: &[String],
    ) -> Result<DMatrix<f64>, DynamicsError> {
        match params.first() {
            None => Ok(DMatrix::zeros(state_vec.len(), 0)),
            Some(name) => Err(DynamicsError::UnsupportedParameter { name: name.clone() }),
        }
    }

    /// Whether the partial derivatives with respect to the named parameter are available
    fn supports_parameter(&self, _name: &str) -> bool {
        false
    }

    /// Performs final changes after each successful integration step.
    fn finally(&self, next_state: Spacecraft) -> Result<Spacecraft, DynamicsError> {
        Ok(next_state)
    }
}

/// Equations of a named additional state, integrated alongside the main state.
///
/// The derivatives may depend on the base state (e.g. an integral of the radius), but not the other
/// way around.
pub trait AdditionalEquations: Send + Sync {
    /// Name of the additional state, unique within a propagation
    fn name(&self) -> &str;

    /// Number of components of the additional state
    fn dimension(&self) -> usize;

    /// Time derivative of the additional state
    fn derivatives(
        &self,
        epoch: Epoch,
        base_state: &DVector<f64>,
        additional_state: &[f64],
    ) -> Result<DVector<f64>, DynamicsError>;
}

/// Errors raised while evaluating the equations of motion.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// State Transition Matrix (STM) was expected but the dynamics cannot compute it.
    #[snafu(display("expected STM to be set"))]
    StateTransitionMatrixUnset,
    #[snafu(display("the dynamics do not provide partial derivatives with respect to `{name}`"))]
    UnsupportedParameter { name: String },
    #[snafu(display("dynamical model encountered an issue with the state: {source}"))]
    DynamicsState { source: StateError },
    #[snafu(display("additional equations `{name}` returned {got} derivatives instead of {expected}"))]
    AdditionalDimension {
        name: String,
        expected: usize,
        got: usize,
    },
}
