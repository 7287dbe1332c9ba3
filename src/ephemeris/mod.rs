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

use snafu::prelude::*;

mod bounded;
mod ephem_it;
mod master;

pub use bounded::BoundedEphemeris;
pub use ephem_it::EphemIterator;
pub use master::{EphemerisStepInterpolator, MasterMode, StepHandler};

use crate::errors::StateError;
use crate::linalg::DVector;
use crate::propagators::DenseInterpolant;
use crate::time::{Duration, Epoch};

use std::sync::Arc;

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EphemerisError {
    #[snafu(display("{epoch} is outside of the ephemeris validity interval [{min_epoch}, {max_epoch}]"))]
    OutOfRange {
        epoch: Epoch,
        min_epoch: Epoch,
        max_epoch: Epoch,
    },
    #[snafu(display("Failed to create ephemeris: {msg}"))]
    CreationError { msg: String },
    #[snafu(display("ephemeris could not rebuild the state: {source}"))]
    EphemState { source: StateError },
    #[snafu(display("Event {event} not found between {start} and {end}"))]
    EventNotFound {
        start: Epoch,
        end: Epoch,
        event: String,
    },
    #[snafu(display("step handler failed: {msg}"))]
    StepHandlerError { msg: String },
}

/// A single accepted integration step, from its start epoch to its end epoch, with its dense output.
///
/// The end epoch is before the start epoch when integrating backward. The end of a step may precede the
/// end of the underlying integrator step when the propagation was stopped by an event within it.
#[derive(Clone, Debug)]
pub struct StepModel {
    pub start: Epoch,
    pub end: Epoch,
    pub interpolant: Arc<dyn DenseInterpolant>,
}

impl StepModel {
    pub fn new(start: Epoch, end: Epoch, interpolant: Arc<dyn DenseInterpolant>) -> Self {
        Self {
            start,
            end,
            interpolant,
        }
    }

    /// Signed duration of the step
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_forward(&self) -> bool {
        self.end >= self.start
    }

    /// Earliest epoch covered by this step
    pub fn min_epoch(&self) -> Epoch {
        self.start.min(self.end)
    }

    /// Latest epoch covered by this step
    pub fn max_epoch(&self) -> Epoch {
        self.start.max(self.end)
    }

    pub fn contains(&self, epoch: Epoch) -> bool {
        epoch >= self.min_epoch() && epoch <= self.max_epoch()
    }

    /// Augmented state vector at the provided epoch, which should be within this step.
    pub fn evaluate(&self, epoch: Epoch) -> DVector<f64> {
        if epoch == self.start {
            self.interpolant.start_state()
        } else {
            self.interpolant.evaluate((epoch - self.start).to_seconds())
        }
    }
}
