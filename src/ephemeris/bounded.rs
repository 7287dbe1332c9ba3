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

use super::ephem_it::EphemIterator;
use super::master::{MasterMode, StepHandler};
use super::{CreationSnafu, EphemStateSnafu, EphemerisError, OutOfRangeSnafu, StepModel};
use crate::cosmic::{decode, decode_jacobians, Jacobians, Spacecraft, StateLayout};
use crate::errors::StateError;
use crate::linalg::DVector;
use crate::time::{Duration, Epoch, TimeSeries};
use rayon::prelude::*;
use snafu::prelude::*;

use std::fmt;
use std::sync::Arc;

/// An ephemeris built from the recorded steps of a single propagation run.
///
/// It is valid from the start to the end of that run, in either time direction, and may be queried at any
/// epoch within its validity interval, in any order, without integrating again. Querying never mutates
/// the ephemeris, so it may be shared between threads.
#[derive(Clone)]
pub struct BoundedEphemeris {
    steps: Arc<[StepModel]>,
    layout: StateLayout,
    backward: bool,
}

impl BoundedEphemeris {
    /// Builds an ephemeris from contiguous steps, all in the same time direction, in recording order.
    pub fn from_steps(steps: Vec<StepModel>, layout: StateLayout) -> Result<Self, EphemerisError> {
        ensure!(
            !steps.is_empty(),
            CreationSnafu {
                msg: "no integration step was recorded"
            }
        );
        let backward = !steps[0].is_forward();
        for (i, step) in steps.iter().enumerate() {
            ensure!(
                step.start != step.end,
                CreationSnafu {
                    msg: format!("step #{i} at {} has a zero duration", step.start)
                }
            );
            ensure!(
                step.is_forward() != backward,
                CreationSnafu {
                    msg: format!(
                        "step #{i} from {} to {} is not in the direction of the propagation",
                        step.start, step.end
                    )
                }
            );
            if let Some(next) = steps.get(i + 1) {
                ensure!(
                    step.end == next.start,
                    CreationSnafu {
                        msg: format!(
                            "step #{i} ends at {} but step #{} starts at {}",
                            step.end,
                            i + 1,
                            next.start
                        )
                    }
                );
            }
        }

        Ok(Self {
            steps: steps.into(),
            layout,
            backward,
        })
    }

    /// Earliest epoch of the validity interval
    pub fn min_epoch(&self) -> Epoch {
        if self.backward {
            self.end_epoch()
        } else {
            self.start_epoch()
        }
    }

    /// Latest epoch of the validity interval
    pub fn max_epoch(&self) -> Epoch {
        if self.backward {
            self.start_epoch()
        } else {
            self.end_epoch()
        }
    }

    /// Epoch at which the propagation started
    pub fn start_epoch(&self) -> Epoch {
        self.steps[0].start
    }

    /// Epoch at which the propagation ended
    pub fn end_epoch(&self) -> Epoch {
        self.steps[self.steps.len() - 1].end
    }

    /// Returns whether this ephemeris was built from a propagation backward in time
    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The recorded steps, in recording order
    pub fn steps(&self) -> &[StepModel] {
        &self.steps
    }

    /// Layout of the recorded state vectors
    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Duration of the validity interval
    pub fn duration(&self) -> Duration {
        self.max_epoch() - self.min_epoch()
    }

    pub(crate) fn check_range(&self, epoch: Epoch) -> Result<(), EphemerisError> {
        ensure!(
            epoch >= self.min_epoch() && epoch <= self.max_epoch(),
            OutOfRangeSnafu {
                epoch,
                min_epoch: self.min_epoch(),
                max_epoch: self.max_epoch(),
            }
        );
        Ok(())
    }

    /// Index of the step covering this epoch, which must be within the validity interval.
    /// At the boundary between two steps, the step recorded first is returned.
    pub(crate) fn index_of(&self, epoch: Epoch) -> usize {
        let idx = if self.backward {
            self.steps.partition_point(|step| step.end > epoch)
        } else {
            self.steps.partition_point(|step| step.end < epoch)
        };
        idx.min(self.steps.len() - 1)
    }

    /// Returns the step covering the provided epoch
    pub fn step_at(&self, epoch: Epoch) -> Result<&StepModel, EphemerisError> {
        self.check_range(epoch)?;
        Ok(&self.steps[self.index_of(epoch)])
    }

    /// Augmented state vector at the provided epoch, as seen by the integrator.
    pub fn state_vector_at(&self, epoch: Epoch) -> Result<DVector<f64>, EphemerisError> {
        Ok(self.step_at(epoch)?.evaluate(epoch))
    }

    /// Evaluate the ephemeris at this specific epoch.
    pub fn at(&self, epoch: Epoch) -> Result<Spacecraft, EphemerisError> {
        let vec = self.state_vector_at(epoch)?;
        decode(&vec, epoch, &self.layout).context(EphemStateSnafu)
    }

    /// Same as [`Self::at`]: an ephemeris "propagates" by interpolating its recorded steps.
    pub fn propagate(&self, epoch: Epoch) -> Result<Spacecraft, EphemerisError> {
        self.at(epoch)
    }

    /// Evaluates the ephemeris at all of the provided epochs in parallel. Results are in the order of the epochs.
    pub fn at_epochs(&self, epochs: &[Epoch]) -> Vec<Result<Spacecraft, EphemerisError>> {
        epochs.par_iter().map(|epoch| self.at(*epoch)).collect()
    }

    /// State transition matrix and sensitivity matrix at the provided epoch
    pub fn jacobians_at(&self, epoch: Epoch) -> Result<Jacobians, EphemerisError> {
        if !self.layout.has_jacobians() {
            return Err(EphemerisError::EphemState {
                source: StateError::StateJacobianNotInitialized,
            });
        }
        let vec = self.state_vector_at(epoch)?;
        decode_jacobians(&vec, &self.layout).context(EphemStateSnafu)
    }

    /// Named additional state at the provided epoch
    pub fn additional_state_at(
        &self,
        name: &str,
        epoch: Epoch,
    ) -> Result<DVector<f64>, EphemerisError> {
        let range = self
            .layout
            .additional_range(name)
            .context(EphemStateSnafu)?;
        let vec = self.state_vector_at(epoch)?;
        Ok(vec.rows(range.start, range.len()).into_owned())
    }

    /// State at the start of the propagation
    pub fn first(&self) -> Result<Spacecraft, EphemerisError> {
        self.at(self.start_epoch())
    }

    /// State at the end of the propagation
    pub fn last(&self) -> Result<Spacecraft, EphemerisError> {
        self.at(self.end_epoch())
    }

    /// Creates an iterator through the ephemeris by the provided step size, from its earliest to its latest epoch
    pub fn every(&self, step: Duration) -> EphemIterator {
        self.every_between(step, self.min_epoch(), self.max_epoch())
    }

    /// Creates an iterator through the ephemeris by the provided step size between the provided bounds
    pub fn every_between(&self, step: Duration, start: Epoch, end: Epoch) -> EphemIterator {
        EphemIterator {
            time_series: TimeSeries::inclusive(start, end, step),
            ephem: self,
        }
    }

    /// Replays this ephemeris through the provided step handler, starting at the start of the propagation.
    ///
    /// Every call to [`MasterMode::propagate`] feeds the handler with the recorded steps between the current
    /// epoch and the target, clipped to those epochs.
    pub fn set_master_mode<H: StepHandler>(&self, handler: H) -> MasterMode<'_, H> {
        MasterMode::new(self, handler)
    }
}

impl fmt::Display for BoundedEphemeris {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dur = self.end_epoch() - self.start_epoch();
        write!(
            f,
            "Ephemeris from {} to {} ({}, or {:.3} s) [{} steps]",
            self.start_epoch(),
            self.end_epoch(),
            dur,
            dur.to_seconds(),
            self.steps.len()
        )
    }
}

impl fmt::Debug for BoundedEphemeris {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} @ {self:p}")
    }
}
