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

use super::{
    AdditionalDimensionSnafu, AdditionalEquations, Dynamics, DynamicsError, DynamicsStateSnafu,
};
use crate::cosmic::{Jacobians, StateLayout};
use crate::io::{ConfigError, JacobianDimensionSnafu, UnsupportedParameterSnafu};
use crate::linalg::{DMatrix, DVector};
use crate::time::Epoch;
use crate::utils::{read_row_major, write_row_major};
use snafu::prelude::*;

use std::sync::Arc;

/// Configuration of the variational equations integrated alongside the state.
///
/// The STM Φ and the sensitivity matrix S obey
///
/// ```text
/// dΦ/dt = A(t) Φ
/// dS/dt = A(t) S + ∂f/∂p
/// ```
///
/// where A(t) = ∂f/∂x is provided by the dynamics. By default Φ(t0) is the identity and S(t0) is zero.
#[derive(Clone, Debug, PartialEq)]
pub struct VariationalEquations {
    /// Name under which the flattened Jacobians are exposed as an additional state
    pub name: String,
    /// Dimension of the differentiated state, 6 or 7
    pub state_dim: usize,
    /// Names of the differentiated parameters
    pub params: Vec<String>,
    pub stm_seed: Option<DMatrix<f64>>,
    pub sensitivity_seed: Option<DMatrix<f64>>,
}

impl VariationalEquations {
    /// Variational equations of a state of dimension `state_dim` with respect to the named parameters.
    pub fn new(name: &str, state_dim: usize, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            state_dim,
            params: params.iter().map(|p| p.to_string()).collect(),
            stm_seed: None,
            sensitivity_seed: None,
        }
    }

    /// Uses the provided matrix instead of the identity as the initial STM.
    pub fn with_stm_seed(mut self, stm: DMatrix<f64>) -> Self {
        self.stm_seed = Some(stm);
        self
    }

    /// Uses the provided matrix instead of zeros as the initial sensitivity matrix.
    pub fn with_sensitivity_seed(mut self, sensitivity: DMatrix<f64>) -> Self {
        self.sensitivity_seed = Some(sensitivity);
        self
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Checks this configuration against the dynamics and returns the initial Jacobians.
    pub fn initial_jacobians<D: Dynamics>(&self, dynamics: &D) -> Result<Jacobians, ConfigError> {
        for name in &self.params {
            ensure!(
                dynamics.supports_parameter(name),
                UnsupportedParameterSnafu { name: name.clone() }
            );
        }

        let n = self.state_dim;
        let p = self.param_count();
        let mut jacobians = Jacobians::identity(n, p);
        if let Some(stm) = &self.stm_seed {
            ensure!(
                stm.shape() == (n, n),
                JacobianDimensionSnafu {
                    msg: format!("STM seed is {:?} but expected ({n}, {n})", stm.shape())
                }
            );
            jacobians.stm = stm.clone();
        }
        if let Some(sensitivity) = &self.sensitivity_seed {
            ensure!(
                sensitivity.shape() == (n, p),
                JacobianDimensionSnafu {
                    msg: format!(
                        "sensitivity seed is {:?} but expected ({n}, {p})",
                        sensitivity.shape()
                    )
                }
            );
            jacobians.sensitivity = sensitivity.clone();
        }
        Ok(jacobians)
    }
}

/// The full right hand side seen by the integrator: the dynamics of the base state, the variational
/// equations if enabled, and the additional equations, in the order of the layout.
pub struct AugmentedDynamics<'a, D: Dynamics> {
    pub dynamics: &'a D,
    pub layout: &'a StateLayout,
    pub additional_eqs: &'a [Arc<dyn AdditionalEquations>],
}

impl<'a, D: Dynamics> AugmentedDynamics<'a, D> {
    /// Derivative of the augmented state vector at the provided epoch
    pub fn derivatives(&self, epoch: Epoch, x: &DVector<f64>) -> Result<DVector<f64>, DynamicsError> {
        let base_len = self.layout.base_len();
        let base = x.rows(0, base_len).into_owned();
        let mut d_x = DVector::zeros(x.len());

        match self.layout.jacobians() {
            None => {
                let f = self.dynamics.eom(epoch, &base)?;
                d_x.rows_mut(0, base_len).copy_from(&f);
            }
            Some(jac) => {
                let (f, grad) = self.dynamics.dual_eom(epoch, &base)?;
                d_x.rows_mut(0, base_len).copy_from(&f);

                let n = jac.state_dim;
                let p = jac.param_count();
                // Only the differentiated part of A(t) is used
                let a_mat = grad.view((0, 0), (n, n)).into_owned();
                let offset = self.layout.jacobian_offset();

                let stm = read_row_major(&x.as_slice()[offset..offset + n * n], n, n);
                let stm_dot = &a_mat * stm;
                write_row_major(
                    &mut d_x.as_mut_slice()[offset..offset + n * n],
                    &stm_dot,
                );

                if p > 0 {
                    let sens = read_row_major(&x.as_slice()[offset + n * n..offset + n * (n + p)], n, p);
                    let partials = self.dynamics.parameter_partials(epoch, &base, &jac.params)?;
                    let sens_dot = &a_mat * sens + partials.view((0, 0), (n, p));
                    write_row_major(
                        &mut d_x.as_mut_slice()[offset + n * n..offset + n * (n + p)],
                        &sens_dot,
                    );
                }
            }
        }

        for eqs in self.additional_eqs {
            let range = self
                .layout
                .additional_range(eqs.name())
                .context(DynamicsStateSnafu)?;
            let own = &x.as_slice()[range.clone()];
            let own_dot = eqs.derivatives(epoch, &base, own)?;
            ensure!(
                own_dot.len() == range.len(),
                AdditionalDimensionSnafu {
                    name: eqs.name(),
                    expected: range.len(),
                    got: own_dot.len()
                }
            );
            d_x.rows_mut(range.start, range.len()).copy_from(&own_dot);
        }

        Ok(d_x)
    }
}
