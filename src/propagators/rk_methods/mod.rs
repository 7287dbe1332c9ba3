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

mod dormand;
pub use self::dormand::*;

/// The `RK` trait defines an embedded Runge Kutta integrator with a continuous extension.
#[allow(clippy::upper_case_acronyms)]
pub trait RK
where
    Self: Sized,
{
    /// Returns the order of this integrator (as u8 because there probably isn't an order greater than 255).
    /// The order is used for the adaptive step size only to compute the error between estimates.
    const ORDER: u8;

    /// Returns the stages of this integrator (as usize because it's used as indexing)
    const STAGES: usize;

    /// Returns a pointer to a list of f64 corresponding to the A coefficients of the Butcher table for that RK.
    /// This module only supports *explicit* integrators, and as such, `Self::A_COEFFS.len()` must be of
    /// size (stages-1)*(stages)/2.
    /// *Warning:* this RK trait supposes that the implementation is consistent, i.e. c_i = \sum_j a_{ij}.
    const A_COEFFS: &'static [f64];

    /// Returns a pointer to a list of f64 corresponding to the b_i and b^*_i coefficients of the
    /// Butcher table for that RK. `Self::B_COEFFS.len()` must be of size stages*2.
    const B_COEFFS: &'static [f64];

    /// Weights of a second, lower order embedded solution. When not empty, the error estimate combines
    /// both embedded solutions as in DOP853.
    const LOW_ORDER_COEFFS: &'static [f64] = &[];

    /// Number of stages evaluated only once a step is accepted, the first one being the derivative at
    /// the end of the step. When non zero, that derivative is reused as the first stage of the next step.
    const DENSE_STAGES: usize = 0;

    /// A coefficients of the stages following the end of step derivative, stored row by row. Each row
    /// covers all of the stages that precede it.
    const DENSE_A_COEFFS: &'static [f64] = &[];

    /// Order of the polynomial of the dense output
    const DENSE_ORDER: usize;

    /// Coefficients of the dense output, one row of `DENSE_ORDER` items per stage, stored row by row.
    ///
    /// The state within the step is y(t0 + θh) = y0 + h \sum_i k_i \sum_j d_{ij} θ^{j+1}, for θ ∈ [0, 1].
    const DENSE_COEFFS: &'static [f64];
}
