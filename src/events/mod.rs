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

pub mod evaluators;
pub use evaluators::*;
pub mod search;

use crate::cosmic::Spacecraft;
use crate::errors::StateError;
use crate::time::Duration;

use std::fmt;

/// A trait to specify how a specific event must be evaluated.
///
/// The event happens where the evaluation changes sign. A propagation stopped by an event stops at the
/// first sign change after its start.
pub trait EventEvaluator: fmt::Display + Send + Sync {
    // Evaluation of event crossing, must return whether the condition happened between between both states.
    fn eval_crossing(&self, prev_state: &Spacecraft, next_state: &Spacecraft) -> Result<bool, StateError> {
        let prev = self.eval(prev_state)?;
        let next = self.eval(next_state)?;

        Ok(prev * next < 0.0)
    }

    /// Evaluation of the event, must return a value corresponding to whether the state is before or after the event
    fn eval(&self, state: &Spacecraft) -> Result<f64, StateError>;
    fn epoch_precision(&self) -> Duration;
    fn value_precision(&self) -> f64;
}
