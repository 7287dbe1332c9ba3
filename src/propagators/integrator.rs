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

use super::{DenseInterpolant, ErrorCtrl, RkDenseOutput, RK};
use crate::dynamics::DynamicsError;
use crate::linalg::DVector;
use std::fmt;
use std::sync::Arc;

/// Right hand side seen by an integrator: the time in seconds past the start of the step and the
/// augmented state, returning the derivative of the augmented state.
pub type StepRhs<'a> = dyn FnMut(f64, &DVector<f64>) -> Result<DVector<f64>, DynamicsError> + 'a;

/// Result of a single integration attempt.
#[derive(Debug)]
pub enum StepOutcome {
    /// The step is within tolerance (or was forced) and may be recorded.
    Accepted {
        state: DVector<f64>,
        error: f64,
        interpolant: Arc<dyn DenseInterpolant>,
    },
    /// The error is above tolerance: the same step must be retried with a smaller step size.
    Retry { error: f64 },
}

/// A single step integrator with a continuous extension.
///
/// The integrator owns none of the propagation logic: the caller chooses the step size, decides what to
/// do with a rejection, and records the accepted steps.
pub trait StepIntegrator: Send + fmt::Debug {
    /// Order used to adapt the step size
    fn order(&self) -> u8;

    /// Maximum number of evaluations of the right hand side in a single attempt
    fn stages(&self) -> usize;

    /// Forget any derivative cached from a previous step. Must be called whenever the next step does not
    /// start exactly where the previous accepted step ended.
    fn reset(&mut self);

    /// Attempts a step of `step_s` seconds (negative to integrate backward) from `state`.
    ///
    /// Only the first `error_dim` components are error controlled. If `force` is set, the step is
    /// accepted whatever its error.
    fn step(
        &mut self,
        rhs: &mut StepRhs<'_>,
        state: &DVector<f64>,
        step_s: f64,
        error_ctrl: &dyn ErrorCtrl,
        error_dim: usize,
        force: bool,
    ) -> Result<StepOutcome, DynamicsError>;
}

/// An explicit embedded Runge Kutta integrator, defined by its Butcher table (cf. [`RK`]).
#[derive(Clone)]
pub struct EmbeddedRk {
    order: u8,
    stages: usize,
    a_coeffs: &'static [f64],
    b_coeffs: &'static [f64],
    low_order_coeffs: &'static [f64],
    dense_stages: usize,
    dense_a_coeffs: &'static [f64],
    dense_coeffs: &'static [f64],
    dense_order: usize,
    /// Set when the last stage is evaluated on the solution at the end of the step
    fsal: bool,
    /// Derivative at the start of the next step, if already known
    first_derivative: Option<DVector<f64>>,
}

impl EmbeddedRk {
    pub fn new<M: RK>() -> Self {
        let s = M::STAGES;
        // First same as last if the last row of A is b
        let fsal = M::A_COEFFS[M::A_COEFFS.len() - (s - 1)..] == M::B_COEFFS[..s - 1]
            && M::B_COEFFS[s - 1] == 0.0;
        Self {
            order: M::ORDER,
            stages: s,
            a_coeffs: M::A_COEFFS,
            b_coeffs: M::B_COEFFS,
            low_order_coeffs: M::LOW_ORDER_COEFFS,
            dense_stages: M::DENSE_STAGES,
            dense_a_coeffs: M::DENSE_A_COEFFS,
            dense_coeffs: M::DENSE_COEFFS,
            dense_order: M::DENSE_ORDER,
            fsal,
            first_derivative: None,
        }
    }

    pub fn is_fsal(&self) -> bool {
        self.fsal
    }
}

impl fmt::Debug for EmbeddedRk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EmbeddedRk {{order: {}, stages: {}+{}, fsal: {}}}",
            self.order, self.stages, self.dense_stages, self.fsal
        )
    }
}

impl StepIntegrator for EmbeddedRk {
    fn order(&self) -> u8 {
        self.order
    }

    fn stages(&self) -> usize {
        self.stages + self.dense_stages
    }

    fn reset(&mut self) {
        self.first_derivative = None;
    }

    fn step(
        &mut self,
        rhs: &mut StepRhs<'_>,
        state: &DVector<f64>,
        step_s: f64,
        error_ctrl: &dyn ErrorCtrl,
        error_dim: usize,
        force: bool,
    ) -> Result<StepOutcome, DynamicsError> {
        let k0 = match self.first_derivative.take() {
            Some(k0) => k0,
            None => rhs(0.0, state)?,
        };
        let mut k = Vec::with_capacity(self.stages + self.dense_stages);
        k.push(k0);

        let mut a_idx: usize = 0;
        for i in 0..(self.stages - 1) {
            // Let's compute the c_i by summing the relevant items from the list of coefficients.
            // \sum_{j=1}^{i-1} a_ij  ∀ i ∈ [2, s]
            let mut ci: f64 = 0.0;
            // The wi stores the a_{s1} * k_1 + a_{s2} * k_2 + ... + a_{s, s-1} * k_{s-1} +
            let mut wi = DVector::zeros(state.len());
            for kj in &k[0..i + 1] {
                let a_ij = self.a_coeffs[a_idx];
                ci += a_ij;
                wi.axpy(a_ij, kj, 1.0);
                a_idx += 1;
            }

            let ki = match rhs(ci * step_s, &(state + step_s * wi)) {
                Ok(ki) => ki,
                Err(e) => {
                    // The first derivative is still valid for the next attempt
                    self.first_derivative = k.into_iter().next();
                    return Err(e);
                }
            };
            k.push(ki);
        }

        // Compute the next state and the error
        // State error estimation from https://en.wikipedia.org/wiki/Runge%E2%80%93Kutta_methods#Adaptive_Runge%E2%80%93Kutta_methods
        let mut next_state = state.clone();
        let mut error_est = DVector::zeros(state.len());
        for (i, ki) in k.iter().enumerate() {
            let b_i = self.b_coeffs[i];
            let b_i_star = self.b_coeffs[i + self.stages];
            next_state.axpy(step_s * b_i, ki, 1.0);
            error_est.axpy(step_s * (b_i - b_i_star), ki, 1.0);
        }

        let n = error_dim.min(state.len());
        let next_rows = next_state.rows(0, n).into_owned();
        let prev_rows = state.rows(0, n).into_owned();
        let mut error =
            error_ctrl.estimate(&error_est.rows(0, n).into_owned(), &next_rows, &prev_rows);

        if !self.low_order_coeffs.is_empty() {
            // DOP853 estimate: the fifth order error, damped by the third order one on large steps
            let mut low_est = DVector::zeros(state.len());
            for (i, ki) in k.iter().enumerate() {
                low_est.axpy(
                    step_s * (self.b_coeffs[i] - self.low_order_coeffs[i]),
                    ki,
                    1.0,
                );
            }
            let err3 = error_ctrl.estimate(&low_est.rows(0, n).into_owned(), &next_rows, &prev_rows);
            let denom = error.powi(2) + 0.01 * err3.powi(2);
            error = if denom == 0.0 {
                0.0
            } else {
                error.powi(2) / denom.sqrt()
            };
        }

        if error <= 1.0 || force {
            if self.dense_stages > 0 {
                // Derivative at the end of the step, followed by the stages of the continuous extension
                let end = rhs(step_s, &next_state)?;
                self.first_derivative = Some(end.clone());
                k.push(end);
                let mut a_idx: usize = 0;
                for _ in 1..self.dense_stages {
                    let mut ci: f64 = 0.0;
                    let mut wi = DVector::zeros(state.len());
                    for kj in &k {
                        let a_ij = self.dense_a_coeffs[a_idx];
                        ci += a_ij;
                        wi.axpy(a_ij, kj, 1.0);
                        a_idx += 1;
                    }
                    k.push(rhs(ci * step_s, &(state + step_s * wi))?);
                }
            } else if self.fsal {
                self.first_derivative = k.last().cloned();
            }
            let interpolant = RkDenseOutput {
                y0: state.clone(),
                y1: next_state.clone(),
                k,
                step_s,
                dense_coeffs: self.dense_coeffs,
                dense_order: self.dense_order,
            };
            Ok(StepOutcome::Accepted {
                state: next_state,
                error,
                interpolant: Arc::new(interpolant),
            })
        } else {
            // Same starting point for the retry
            self.first_derivative = k.into_iter().next();
            Ok(StepOutcome::Retry { error })
        }
    }
}
