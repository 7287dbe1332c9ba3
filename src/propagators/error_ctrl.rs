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

use crate::linalg::{DVector, Vector3};
use crate::utils::rms;
use std::fmt;

// This determines when to take into consideration the magnitude of the state_delta and
// prevents dividing by too small of a number.
const REL_ERR_THRESH: f64 = 0.1;

/// The Error Control trait manages how a propagator computes the error in the current step.
///
/// The estimate is normalized by the tolerance: a step is acceptable if and only if the returned
/// value is at most one.
pub trait ErrorCtrl: Send + Sync + fmt::Debug {
    /// Computes the normalized error from the error estimate of the step, the candidate state at the
    /// end of the step and the state at the start of the step.
    fn estimate(
        &self,
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64;
}

/// Mixed absolute and relative tolerances, the usual error control of embedded Runge Kutta methods.
///
/// The scaled error of each component is e_i / (atol_i + rtol_i * max(|y0_i|, |y1_i|)) and the
/// normalized error is the root mean square of the scaled errors.
///
/// Tolerances may be provided for each component, or as a single value applied to all of them. If fewer
/// tolerances than components are provided, the last tolerance applies to the remaining components.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedTolerance {
    pub abs_tol: Vec<f64>,
    pub rel_tol: Vec<f64>,
}

impl MixedTolerance {
    /// The same absolute and relative tolerances for all components
    pub fn new(abs_tol: f64, rel_tol: f64) -> Self {
        Self {
            abs_tol: vec![abs_tol],
            rel_tol: vec![rel_tol],
        }
    }

    /// Per component tolerances
    pub fn with_vectors(abs_tol: Vec<f64>, rel_tol: Vec<f64>) -> Self {
        Self { abs_tol, rel_tol }
    }

    fn tol_at(tols: &[f64], i: usize) -> f64 {
        match tols.get(i) {
            Some(tol) => *tol,
            None => tols.last().copied().unwrap_or(0.0),
        }
    }

    /// Returns whether these tolerances may be used, i.e. are non-empty, non-negative, and not all zero.
    pub fn is_valid(&self) -> bool {
        !self.abs_tol.is_empty()
            && !self.rel_tol.is_empty()
            && self
                .abs_tol
                .iter()
                .chain(self.rel_tol.iter())
                .all(|tol| tol.is_finite() && *tol >= 0.0)
            && (0..self.abs_tol.len().max(self.rel_tol.len())).all(|i| {
                Self::tol_at(&self.abs_tol, i) + Self::tol_at(&self.rel_tol, i) > 0.0
            })
    }
}

impl Default for MixedTolerance {
    fn default() -> Self {
        Self::new(1e-12, 1e-12)
    }
}

impl ErrorCtrl for MixedTolerance {
    fn estimate(
        &self,
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        rms((0..error_est.len()).map(|i| {
            // A component which is exactly integrated is within any tolerance, even a null one
            if error_est[i] == 0.0 {
                return 0.0;
            }
            let scale = Self::tol_at(&self.abs_tol, i)
                + Self::tol_at(&self.rel_tol, i) * cur_state[i].abs().max(candidate[i].abs());
            error_est[i] / scale
        }))
    }
}

impl fmt::Display for MixedTolerance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "abs_tol: {:?}, rel_tol: {:?}", self.abs_tol, self.rel_tol)
    }
}

/// An RSS step error control on the position and the velocity, as in GMAT, normalized by the tolerance.
///
/// Only the first six components (the Cartesian state) are considered.
/// (Source)[https://github.com/ChristopherRabotin/GMAT/blob/37201a6290e7f7b941bc98ee973a527a5857104b/src/base/forcemodel/ODEModel.cpp#L3045]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RSSCartesianStep {
    pub tolerance: f64,
}

impl ErrorCtrl for RSSCartesianStep {
    fn estimate(
        &self,
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        let part = |v: &DVector<f64>, offset: usize| -> Vector3<f64> {
            Vector3::new(v[offset], v[offset + 1], v[offset + 2])
        };
        let err_radius = rss_step(
            &part(error_est, 0),
            &part(candidate, 0),
            &part(cur_state, 0),
        );
        let err_velocity = rss_step(
            &part(error_est, 3),
            &part(candidate, 3),
            &part(cur_state, 3),
        );
        err_radius.max(err_velocity) / self.tolerance
    }
}

/// An RSS step error control which effectively computes the L2 norm of the provided Vector of size 3
///
/// Note that this error controller should be preferrably be used only with slices of a state with the same units.
/// For example, one should probably use this for position independently of using it for the velocity.
pub fn rss_step(prop_err: &Vector3<f64>, candidate: &Vector3<f64>, cur_state: &Vector3<f64>) -> f64 {
    let mag = (candidate - cur_state).norm();
    let err = prop_err.norm();
    if mag > REL_ERR_THRESH {
        err / mag
    } else {
        err
    }
}
