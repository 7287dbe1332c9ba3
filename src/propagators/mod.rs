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
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Provides different methods for controlling the error computation of the integrator.
pub mod error_ctrl;
pub use self::error_ctrl::*;

// Re-Export
mod instance;
pub use instance::*;
mod propagator;
pub use propagator::*;
mod rk_methods;
pub use rk_methods::*;
mod options;
pub use options::*;
mod integrator;
pub use integrator::*;
mod interpolant;
pub use interpolant::*;
mod recorder;
pub use recorder::*;

use crate::{
    dynamics::DynamicsError, ephemeris::EphemerisError, errors::StateError, io::ConfigError,
    time::Duration, time::Epoch,
};

/// Stores the details of the previous integration step of a given propagator. Access as `my_prop.latest_details()`.
#[derive(Copy, Clone, Debug)]
pub struct IntegrationDetails {
    /// step size used
    pub step: Duration,
    /// error in the previous integration step, normalized by the tolerance
    pub error: f64,
    /// number of attempts needed by an adaptive step size to be within the tolerance
    pub attempts: u8,
    /// number of evaluations of the equations of motion in the last run
    pub evaluations: usize,
    /// number of accepted steps in the last run
    pub steps: usize,
}

impl fmt::Display for IntegrationDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IntegrationDetails {{step: {}, error: {:.3e}, attempts: {}, evaluations: {}, steps: {}}}",
            self.step, self.error, self.attempts, self.evaluations, self.steps
        )
    }
}

/// Why a propagation was stopped before reaching its target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// Cancellation was requested through an [`AbortHandle`]
    Cancelled,
    /// The maximum number of evaluations of the equations of motion was reached
    MaxEvaluations,
    /// A step was rejected more times than the allowed number of attempts
    MaxAttempts,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::MaxEvaluations => write!(f, "maximum number of evaluations reached"),
            Self::MaxAttempts => write!(f, "maximum number of attempts reached"),
        }
    }
}

/// Requests the cancellation of a running propagation, from any thread.
///
/// The flag is checked between steps. A cancellation request is consumed by the run it aborts.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Withdraws a pending cancellation request
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display("encountered a dynamics error {source}"))]
    Dynamics { source: DynamicsError },
    #[snafu(display("propagation failed because {source}"))]
    PropConfigError { source: ConfigError },
    #[snafu(display("propagation reached an invalid state: {source}"))]
    InvalidState { source: StateError },
    #[snafu(display("propagation aborted at {epoch}: {reason}"))]
    PropagationAborted { reason: AbortReason, epoch: Epoch },
    #[snafu(display("no ephemeris available: the last run was not in ephemeris mode"))]
    NotInEphemerisMode,
    #[snafu(display("could not build the ephemeris: {source}"))]
    Ephemeris { source: EphemerisError },
    #[snafu(display("when propagating until an event: {source}"))]
    TrajectoryEventError { source: EphemerisError },
}
