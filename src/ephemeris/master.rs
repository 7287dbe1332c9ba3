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

use super::{BoundedEphemeris, EphemStateSnafu, EphemerisError, OutOfRangeSnafu, StepModel};
use crate::cosmic::{decode, Spacecraft};
use crate::linalg::DVector;
use crate::time::Epoch;
use snafu::prelude::*;

/// A handler called for each step replayed from an ephemeris in master mode.
pub trait StepHandler {
    /// Called once at the start of each replay, with the state at the current epoch and the target epoch.
    fn init(&mut self, _initial: &Spacecraft, _target: Epoch) -> Result<(), EphemerisError> {
        Ok(())
    }

    /// Called for each replayed step, in the direction of the replay. `is_last` is set for the step
    /// which reaches the target epoch.
    fn handle_step(
        &mut self,
        interpolator: &EphemerisStepInterpolator<'_>,
        is_last: bool,
    ) -> Result<(), EphemerisError>;
}

impl<F> StepHandler for F
where
    F: FnMut(&EphemerisStepInterpolator<'_>, bool) -> Result<(), EphemerisError>,
{
    fn handle_step(
        &mut self,
        interpolator: &EphemerisStepInterpolator<'_>,
        is_last: bool,
    ) -> Result<(), EphemerisError> {
        self(interpolator, is_last)
    }
}

/// Interpolator over a single replayed step, restricted to the part of the step between the previous and
/// the current epochs of the replay.
pub struct EphemerisStepInterpolator<'a> {
    ephem: &'a BoundedEphemeris,
    step: &'a StepModel,
    previous: Epoch,
    current: Epoch,
}

impl<'a> EphemerisStepInterpolator<'a> {
    pub fn previous_epoch(&self) -> Epoch {
        self.previous
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current
    }

    /// Whether the replay moves forward in time
    pub fn is_forward(&self) -> bool {
        self.current >= self.previous
    }

    fn vector_at(&self, epoch: Epoch) -> Result<DVector<f64>, EphemerisError> {
        let (min_epoch, max_epoch) = if self.is_forward() {
            (self.previous, self.current)
        } else {
            (self.current, self.previous)
        };
        ensure!(
            epoch >= min_epoch && epoch <= max_epoch,
            OutOfRangeSnafu {
                epoch,
                min_epoch,
                max_epoch
            }
        );
        Ok(self.step.evaluate(epoch))
    }

    /// Interpolated state at an epoch between the previous and the current epochs
    pub fn state_at(&self, epoch: Epoch) -> Result<Spacecraft, EphemerisError> {
        let vec = self.vector_at(epoch)?;
        decode(&vec, epoch, self.ephem.layout()).context(EphemStateSnafu)
    }

    pub fn previous_state(&self) -> Result<Spacecraft, EphemerisError> {
        self.state_at(self.previous)
    }

    pub fn current_state(&self) -> Result<Spacecraft, EphemerisError> {
        self.state_at(self.current)
    }

    /// Named additional state at an epoch between the previous and the current epochs
    pub fn additional_state_at(
        &self,
        name: &str,
        epoch: Epoch,
    ) -> Result<DVector<f64>, EphemerisError> {
        let range = self
            .ephem
            .layout()
            .additional_range(name)
            .context(EphemStateSnafu)?;
        let vec = self.vector_at(epoch)?;
        Ok(vec.rows(range.start, range.len()).into_owned())
    }

    /// Named additional state at the current epoch
    pub fn additional_state(&self, name: &str) -> Result<DVector<f64>, EphemerisError> {
        self.additional_state_at(name, self.current)
    }
}

/// Replay of an ephemeris through a step handler, as if it were propagated again.
pub struct MasterMode<'a, H: StepHandler> {
    ephem: &'a BoundedEphemeris,
    handler: H,
    current: Epoch,
}

impl<'a, H: StepHandler> MasterMode<'a, H> {
    pub(crate) fn new(ephem: &'a BoundedEphemeris, handler: H) -> Self {
        Self {
            ephem,
            handler,
            current: ephem.start_epoch(),
        }
    }

    /// Epoch reached by the previous replay, initially the start of the ephemeris
    pub fn current_epoch(&self) -> Epoch {
        self.current
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Replays the recorded steps from the current epoch to the target epoch, in either direction, and
    /// returns the state at the target.
    pub fn propagate(&mut self, target: Epoch) -> Result<Spacecraft, EphemerisError> {
        self.ephem.check_range(target)?;
        let from = self.current;
        let initial = self.ephem.at(from)?;
        self.handler.init(&initial, target)?;

        if target == from {
            return Ok(initial);
        }

        let forward = target > from;
        let (lo, hi) = if forward { (from, target) } else { (target, from) };
        let i_from = self.ephem.index_of(from);
        let i_to = self.ephem.index_of(target);
        let indices: Vec<usize> = if i_from <= i_to {
            (i_from..=i_to).collect()
        } else {
            (i_to..=i_from).rev().collect()
        };

        // Clip each step to the replayed interval, dropping the steps which only touch it
        let mut replayed = Vec::with_capacity(indices.len());
        for idx in indices {
            let step = &self.ephem.steps()[idx];
            let start = step.min_epoch().max(lo);
            let end = step.max_epoch().min(hi);
            if start < end {
                if forward {
                    replayed.push((step, start, end));
                } else {
                    replayed.push((step, end, start));
                }
            }
        }

        let num_steps = replayed.len();
        for (i, (step, previous, current)) in replayed.into_iter().enumerate() {
            let interpolator = EphemerisStepInterpolator {
                ephem: self.ephem,
                step,
                previous,
                current,
            };
            self.handler.handle_step(&interpolator, i + 1 == num_steps)?;
        }

        self.current = target;
        self.ephem.at(target)
    }
}
