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

use crate::linalg::DVector;
use std::fmt;

/// The continuous extension of a single accepted integration step.
///
/// Implementations are immutable once built, and therefore safe to evaluate from any thread.
pub trait DenseInterpolant: Send + Sync + fmt::Debug {
    /// Signed duration of the step in seconds, negative when integrating backward
    fn step_s(&self) -> f64;

    /// Augmented state `delta_s` seconds after the start of the step.
    ///
    /// `delta_s` has the sign of the step and its magnitude should not exceed that of the step.
    fn evaluate(&self, delta_s: f64) -> DVector<f64>;

    /// Augmented state at the start of the step
    fn start_state(&self) -> DVector<f64> {
        self.evaluate(0.0)
    }

    /// Augmented state at the end of the step
    fn end_state(&self) -> DVector<f64> {
        self.evaluate(self.step_s())
    }
}

/// Dense output of an embedded Runge Kutta step, built from the stage derivatives of that step.
///
/// The polynomial matches the start and end states exactly, which are stored so that the boundaries of
/// contiguous steps agree bit for bit.
#[derive(Clone, Debug)]
pub struct RkDenseOutput {
    pub(crate) y0: DVector<f64>,
    pub(crate) y1: DVector<f64>,
    pub(crate) k: Vec<DVector<f64>>,
    pub(crate) step_s: f64,
    pub(crate) dense_coeffs: &'static [f64],
    pub(crate) dense_order: usize,
}

impl DenseInterpolant for RkDenseOutput {
    fn step_s(&self) -> f64 {
        self.step_s
    }

    fn evaluate(&self, delta_s: f64) -> DVector<f64> {
        if delta_s == 0.0 || self.step_s == 0.0 {
            return self.y0.clone();
        } else if delta_s == self.step_s {
            return self.y1.clone();
        }

        let theta = delta_s / self.step_s;
        let mut state = self.y0.clone();
        for (i, ki) in self.k.iter().enumerate() {
            // \sum_j d_ij θ^{j+1}, by Horner's method
            let coeffs = &self.dense_coeffs[i * self.dense_order..(i + 1) * self.dense_order];
            let weight = coeffs.iter().rev().fold(0.0, |acc, d_ij| (acc + d_ij) * theta);
            if weight != 0.0 {
                state.axpy(self.step_s * weight, ki, 1.0);
            }
        }
        state
    }

    fn start_state(&self) -> DVector<f64> {
        self.y0.clone()
    }

    fn end_state(&self) -> DVector<f64> {
        self.y1.clone()
    }
}
