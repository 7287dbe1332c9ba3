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

use super::error_ctrl::ErrorCtrl;
use super::{
    AbortHandle, AbortReason, DynamicsSnafu, EphemerisSnafu, IntegrationDetails,
    InvalidStateSnafu, NotInEphemerisModeSnafu, PropConfigSnafu, PropagationError, Propagator,
    StepIntegrator, StepOutcome, StepRecorder, TrajectoryEventSnafu,
};
use crate::cosmic::{decode_unchecked, encode, ensure_physical, Spacecraft, StateLayout};
use crate::dynamics::{AdditionalEquations, AugmentedDynamics, Dynamics, VariationalEquations};
use crate::ephemeris::{BoundedEphemeris, EphemStateSnafu, EphemerisError, StepModel};
use crate::errors::StateError;
use crate::events::search::find_bracketed;
use crate::events::EventEvaluator;
use crate::io::{
    ConfigError, DuplicateAdditionalStateSnafu, InvalidConfigSnafu, JacobianAfterStartSnafu,
};
use crate::linalg::DVector;
use crate::time::{Duration, Epoch, Unit};
use snafu::prelude::*;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Largest increase of the step size after an accepted step
const MAX_GROWTH: f64 = 5.0;
/// Largest decrease of the step size after a rejected step
const MIN_SHRINK: f64 = 0.2;

/// A propagator instance drives a spacecraft state forward or backward in time with the dynamics and
/// options of its propagator.
///
/// In ephemeris mode, every run records its accepted steps and the resulting [`BoundedEphemeris`] is
/// available from [`generated_ephemeris`](Self::generated_ephemeris) until the next run.
pub struct PropInstance<'a, D: Dynamics, E: ErrorCtrl> {
    /// The state of this propagator instance
    pub state: Spacecraft,
    /// The propagator setup (kind, stages, etc.)
    pub prop: &'a Propagator<D, E>,
    /// Stores the details of the previous integration step
    pub details: IntegrationDetails,
    pub(crate) step_size: Duration, // Stores the magnitude of the adapted step for the _next_ call
    pub(crate) fixed_step: bool,
    pub(crate) integrator: Box<dyn StepIntegrator>,
    pub(crate) variational: Option<VariationalEquations>,
    pub(crate) additional_eqs: Vec<Arc<dyn AdditionalEquations>>,
    pub(crate) recorder: StepRecorder,
    pub(crate) ephemeris_mode: bool,
    pub(crate) abort: AbortHandle,
    /// Set once the first step was attempted
    pub(crate) started: bool,
}

impl<'a, D: Dynamics, E: ErrorCtrl> PropInstance<'a, D, E> {
    /// Allows setting the step size of the propagator
    pub fn set_step(&mut self, step_size: Duration, fixed: bool) {
        self.step_size = step_size.abs();
        self.fixed_step = fixed;
    }

    /// Replaces the integrator, e.g. to use another Runge Kutta method with the same propagator.
    pub fn set_integrator(&mut self, integrator: Box<dyn StepIntegrator>) {
        self.integrator = integrator;
    }

    /// Every subsequent run records its steps into an ephemeris.
    pub fn set_ephemeris_mode(&mut self) {
        self.ephemeris_mode = true;
    }

    /// Subsequent runs only return their final state. Any previously generated ephemeris is released by
    /// this instance, but copies of it remain valid.
    pub fn set_slave_mode(&mut self) {
        self.ephemeris_mode = false;
        self.recorder.discard();
    }

    pub fn is_ephemeris_mode(&self) -> bool {
        self.ephemeris_mode
    }

    /// Enables the variational equations. Must be called before the first step of this instance.
    ///
    /// The state Jacobians are initialized to the seeds of the variational equations.
    pub fn with_jacobians(&mut self, variational: VariationalEquations) -> Result<(), ConfigError> {
        ensure!(!self.started, JacobianAfterStartSnafu);
        let jacobians = variational.initial_jacobians(&self.prop.dynamics)?;
        // Check the full layout before changing anything
        self.build_layout(Some(&variational))?;
        self.state.jacobians = Some(jacobians);
        self.variational = Some(variational);
        Ok(())
    }

    /// Registers additional equations, integrated alongside the state from the provided initial value.
    pub fn add_additional_equations(
        &mut self,
        equations: Arc<dyn AdditionalEquations>,
        initial: DVector<f64>,
    ) -> Result<(), ConfigError> {
        let name = equations.name().to_string();
        ensure!(
            initial.len() == equations.dimension(),
            InvalidConfigSnafu {
                msg: format!(
                    "initial value of `{name}` has {} components but its equations have {}",
                    initial.len(),
                    equations.dimension()
                )
            }
        );
        ensure!(
            !self.additional_eqs.iter().any(|eqs| eqs.name() == name),
            DuplicateAdditionalStateSnafu { name: name.clone() }
        );
        if let Some(variational) = &self.variational {
            ensure!(
                variational.name != name,
                DuplicateAdditionalStateSnafu { name: name.clone() }
            );
        }
        self.additional_eqs.push(equations);
        if let Err(e) = self.build_layout(self.variational.as_ref()) {
            self.additional_eqs.pop();
            return Err(e);
        }
        self.state.additional.insert(name, initial);
        Ok(())
    }

    /// A handle to cancel the runs of this instance from another thread
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Layout of the augmented state vector of the next run
    pub fn layout(&self) -> Result<StateLayout, ConfigError> {
        self.build_layout(self.variational.as_ref())
    }

    fn build_layout(
        &self,
        variational: Option<&VariationalEquations>,
    ) -> Result<StateLayout, ConfigError> {
        let mut layout = StateLayout::new(self.state.mass_kg.is_some());
        if let Some(variational) = variational {
            layout = layout.with_jacobians(
                &variational.name,
                variational.state_dim,
                variational.params.clone(),
            )?;
        }
        for eqs in &self.additional_eqs {
            layout = layout.with_additional(eqs.name(), eqs.dimension())?;
        }
        Ok(layout)
    }

    /// This method propagates the provided Dynamics for the provided duration.
    pub fn for_duration(&mut self, duration: Duration) -> Result<Spacecraft, PropagationError> {
        self.run(duration, None, None, false)
    }

    /// This method propagates the provided Dynamics for the provided duration and publishes each accepted
    /// step on the channel.
    pub fn for_duration_with_channel(
        &mut self,
        duration: Duration,
        tx_chan: Sender<StepModel>,
    ) -> Result<Spacecraft, PropagationError> {
        self.run(duration, Some(tx_chan), None, false)
    }

    /// Propagates the provided Dynamics until the provided epoch. Returns the end state.
    pub fn until_epoch(&mut self, end_time: Epoch) -> Result<Spacecraft, PropagationError> {
        let duration: Duration = end_time - self.state.epoch;
        self.for_duration(duration)
    }

    /// Propagates the provided Dynamics until the provided epoch and publishes each accepted step on the
    /// provided channel. Returns the end state.
    pub fn until_epoch_with_channel(
        &mut self,
        end_time: Epoch,
        tx_chan: Sender<StepModel>,
    ) -> Result<Spacecraft, PropagationError> {
        let duration: Duration = end_time - self.state.epoch;
        self.for_duration_with_channel(duration, tx_chan)
    }

    /// Propagates the provided Dynamics for the provided duration and records the ephemeris of this run,
    /// whether or not this instance is in ephemeris mode. Returns the end state and the ephemeris.
    pub fn for_duration_with_ephem(
        &mut self,
        duration: Duration,
    ) -> Result<(Spacecraft, BoundedEphemeris), PropagationError> {
        let end_state = self.run(duration, None, None, true)?;
        Ok((end_state, self.generated_ephemeris()?))
    }

    /// Propagates the provided Dynamics until the provided epoch and records the ephemeris of this run.
    /// Returns the end state and the ephemeris.
    pub fn until_epoch_with_ephem(
        &mut self,
        end_time: Epoch,
    ) -> Result<(Spacecraft, BoundedEphemeris), PropagationError> {
        let duration: Duration = end_time - self.state.epoch;
        self.for_duration_with_ephem(duration)
    }

    /// Propagate until a specific event is found once, or at most for `max_duration`.
    ///
    /// The run stops at the event and its ephemeris ends there. Returns the state at the event and the
    /// ephemeris. If the event is not found, the ephemeris until `max_duration` is still available from
    /// `generated_ephemeris`.
    pub fn until_event<F: EventEvaluator>(
        &mut self,
        max_duration: Duration,
        event: &F,
    ) -> Result<(Spacecraft, BoundedEphemeris), PropagationError> {
        info!("Searching for {}", event);
        let event_state = self.run(max_duration, None, Some(event as &dyn EventEvaluator), true)?;
        Ok((event_state, self.generated_ephemeris()?))
    }

    /// The ephemeris of the last run of this instance, if it was recorded.
    pub fn generated_ephemeris(&self) -> Result<BoundedEphemeris, PropagationError> {
        self.recorder
            .ephemeris()
            .cloned()
            .context(NotInEphemerisModeSnafu)
    }

    /// Copy the details of the latest integration step.
    pub fn latest_details(&self) -> IntegrationDetails {
        self.details
    }

    /// Runs a propagation, recording it if needed. On failure, nothing is recorded.
    fn run(
        &mut self,
        duration: Duration,
        maybe_tx_chan: Option<Sender<StepModel>>,
        event: Option<&dyn EventEvaluator>,
        force_record: bool,
    ) -> Result<Spacecraft, PropagationError> {
        let layout = self.layout().context(PropConfigSnafu)?;
        let record = force_record || self.ephemeris_mode;
        let maybe_rec_chan = if record {
            Some(self.recorder.start())
        } else {
            self.recorder.discard();
            None
        };

        let start = self.state.epoch;
        let stop_time = start + duration;
        match self.integrate(&layout, stop_time, maybe_rec_chan, maybe_tx_chan, event) {
            Ok(event_found) => {
                if record {
                    self.recorder.finalize(layout).context(EphemerisSnafu)?;
                }
                match event {
                    Some(event) if !event_found => Err(PropagationError::TrajectoryEventError {
                        source: EphemerisError::EventNotFound {
                            start,
                            end: stop_time,
                            event: format!("{event}"),
                        },
                    }),
                    _ => Ok(self.state.clone()),
                }
            }
            Err(e) => {
                self.recorder.discard();
                Err(e)
            }
        }
    }

    /// Rebuilds the spacecraft from its augmented vector. Additional states without equations are carried
    /// over unchanged from the current state.
    ///
    /// The rebuilt state may not be physical, cf. [`ensure_physical`].
    fn rebuild(
        &self,
        vec: &DVector<f64>,
        epoch: Epoch,
        layout: &StateLayout,
    ) -> Result<Spacecraft, StateError> {
        let mut state = decode_unchecked(vec, epoch, layout)?;
        for (name, value) in &self.state.additional {
            if !state.additional.contains_key(name) {
                state.additional.insert(name.clone(), value.clone());
            }
        }
        Ok(state)
    }

    /// Latest physical state of the step up to `found`, within the epoch precision of the event.
    fn last_physical(
        &self,
        step_model: &StepModel,
        found: Spacecraft,
        event: &dyn EventEvaluator,
        layout: &StateLayout,
    ) -> Result<Spacecraft, PropagationError> {
        if ensure_physical(&found).is_ok() {
            return Ok(found);
        }
        let precision_s = event.epoch_precision().to_seconds().abs();
        // The start of the step is physical
        let (mut good, mut bad) = (0.0, (found.epoch - step_model.start).to_seconds());
        let mut good_state = self.state.clone();
        while (bad - good).abs() > precision_s {
            let mid = 0.5 * (good + bad);
            let epoch = step_model.start + mid * Unit::Second;
            let state = self
                .rebuild(&step_model.evaluate(epoch), epoch, layout)
                .context(InvalidStateSnafu)?;
            if ensure_physical(&state).is_ok() {
                good = mid;
                good_state = state;
            } else {
                bad = mid;
            }
        }
        Ok(good_state)
    }

    /// Integrates until the stop time or until the event is found, and returns whether it was found.
    fn integrate(
        &mut self,
        layout: &StateLayout,
        stop_time: Epoch,
        maybe_rec_chan: Option<Sender<StepModel>>,
        maybe_tx_chan: Option<Sender<StepModel>>,
        event: Option<&dyn EventEvaluator>,
    ) -> Result<bool, PropagationError> {
        self.details.evaluations = 0;
        self.details.steps = 0;
        let duration = stop_time - self.state.epoch;
        if duration == Duration::ZERO {
            return Ok(false);
        }

        #[cfg(not(target_arch = "wasm32"))]
        let tick = Instant::now();
        let log_progress = duration.abs() >= 2 * Unit::Minute;

        if log_progress {
            // Prevent the print spam for short propagations
            info!("Propagating for {} until {}", duration, stop_time);
        }

        let prop = self.prop;
        let additional_eqs = self.additional_eqs.clone();
        let rhs_model = AugmentedDynamics {
            dynamics: &prop.dynamics,
            layout,
            additional_eqs: &additional_eqs,
        };
        let backprop = duration.is_negative();
        // Only the base state is error controlled
        let error_dim = layout.base_len();

        self.started = true;
        // Call `finally` on the current state to set anything up
        self.state = prop
            .dynamics
            .finally(self.state.clone())
            .context(DynamicsSnafu)?;
        let mut state_vec = encode(&self.state, layout).context(InvalidStateSnafu)?;
        self.integrator.reset();
        let order = f64::from(self.integrator.order());

        let mut event_found = false;
        loop {
            let epoch = self.state.epoch;
            if epoch == stop_time {
                break;
            }
            if self.abort.is_cancelled() {
                self.abort.reset();
                warn!("Propagation cancelled at {epoch}");
                return Err(PropagationError::PropagationAborted {
                    reason: AbortReason::Cancelled,
                    epoch,
                });
            }

            let remaining = (stop_time - epoch).abs();
            // Take one final step of exactly the needed duration until the stop time
            let (mut step, mut is_final) = if self.step_size >= remaining {
                (remaining, true)
            } else {
                (self.step_size, false)
            };

            self.details.attempts = 1;
            let (next_vec, interpolant) = loop {
                if let Some(max_evaluations) = prop.opts.max_evaluations {
                    if self.details.evaluations + self.integrator.stages() > max_evaluations {
                        warn!(
                            "Maximum number of evaluations reached ({}) at {epoch}",
                            self.details.evaluations
                        );
                        return Err(PropagationError::PropagationAborted {
                            reason: AbortReason::MaxEvaluations,
                            epoch,
                        });
                    }
                }

                let step_s = if backprop {
                    -step.to_seconds()
                } else {
                    step.to_seconds()
                };
                let at_min_step = step <= prop.opts.min_step;
                let force = self.fixed_step || at_min_step;

                let evaluations = &mut self.details.evaluations;
                let mut rhs = |delta_s: f64, x: &DVector<f64>| {
                    *evaluations += 1;
                    rhs_model.derivatives(epoch + delta_s * Unit::Second, x)
                };
                let outcome = self
                    .integrator
                    .step(
                        &mut rhs,
                        &state_vec,
                        step_s,
                        &prop.opts.error_ctrl,
                        error_dim,
                        force,
                    )
                    .context(DynamicsSnafu)?;

                if let StepOutcome::Accepted { error, .. } | StepOutcome::Retry { error } = &outcome {
                    if error.is_nan() {
                        warn!("Undefined error estimate for a step of {step} at {epoch}");
                        return Err(PropagationError::InvalidState {
                            source: StateError::PhysicallyInvalidState {
                                epoch,
                                reason: format!("undefined error estimate for a step of {step}"),
                            },
                        });
                    }
                }

                match outcome {
                    StepOutcome::Accepted {
                        state,
                        error,
                        interpolant,
                    } => {
                        self.details.error = error;
                        self.details.step = step;
                        if !self.fixed_step {
                            if error > 1.0 {
                                warn!(
                                    "Could not further decrease step size: accepted {step} with a normalized error of {error:.3e}"
                                );
                            }
                            // The final step was cut, so it says nothing about the next step size
                            if !is_final {
                                // Let's attempt to increase the step for the next iteration.
                                let factor = if error > 0.0 {
                                    (0.9 * (1.0 / error).powf(1.0 / order))
                                        .min(MAX_GROWTH)
                                } else {
                                    MAX_GROWTH
                                };
                                self.step_size = self.clamp_step(step.to_seconds() * factor);
                            }
                        }
                        break (state, interpolant);
                    }
                    StepOutcome::Retry { error } => {
                        self.details.error = error;
                        if self.details.attempts >= prop.opts.attempts {
                            warn!(
                                "Could not further decrease step size: maximum number of attempts reached ({})",
                                self.details.attempts
                            );
                            return Err(PropagationError::PropagationAborted {
                                reason: AbortReason::MaxAttempts,
                                epoch,
                            });
                        }
                        // Error is too high and we aren't using the smallest step, so let's adapt the step size.
                        self.details.attempts += 1;
                        let factor = (0.9 * (1.0 / error).powf(1.0 / (order - 1.0))).max(MIN_SHRINK);
                        step = self.clamp_step(step.to_seconds() * factor);
                        if step >= remaining {
                            step = remaining;
                            is_final = true;
                        } else {
                            is_final = false;
                        }
                    }
                }
            };

            let next_epoch = if is_final {
                stop_time
            } else if backprop {
                epoch - step
            } else {
                epoch + step
            };
            let mut next_state = self
                .rebuild(&next_vec, next_epoch, layout)
                .context(InvalidStateSnafu)?;
            let is_physical = ensure_physical(&next_state).is_ok();
            if is_physical {
                next_state = prop.dynamics.finally(next_state).context(DynamicsSnafu)?;
            }
            let mut step_model = StepModel::new(epoch, next_epoch, interpolant);

            // The event is searched before rejecting a non physical end of step, so that it may stop the
            // propagation where the state becomes invalid (e.g. at propellant depletion).
            if let Some(event) = event {
                let prev_value = event.eval(&self.state).context(InvalidStateSnafu)?;
                let next_value = event.eval(&next_state).context(InvalidStateSnafu)?;
                let precision = event.value_precision().abs();
                // An event at the very start of the run is ignored
                if prev_value.abs() > precision
                    && (prev_value * next_value < 0.0 || next_value.abs() <= precision)
                {
                    let found = {
                        let model = &step_model;
                        find_bracketed(epoch, next_epoch, event, |t| {
                            self.rebuild(&model.evaluate(t), t, layout)
                                .context(EphemStateSnafu)
                        })
                        .context(TrajectoryEventSnafu)?
                    };
                    let found = self.last_physical(&step_model, found, event, layout)?;
                    info!("{event} found @ {}", found.epoch);
                    // Truncate the step at the event
                    step_model.end = found.epoch;
                    next_state = prop.dynamics.finally(found).context(DynamicsSnafu)?;
                    event_found = true;
                }
            }

            if !event_found && !is_physical {
                ensure_physical(&next_state).context(InvalidStateSnafu)?;
            }

            // Publish to channels
            if step_model.start != step_model.end {
                if let Some(ref chan) = maybe_rec_chan {
                    if let Err(e) = chan.send(step_model.clone()) {
                        warn!("{} when sending on the recorder channel", e)
                    }
                }
                if let Some(ref chan) = maybe_tx_chan {
                    if let Err(e) = chan.send(step_model) {
                        warn!("{} when sending on channel", e)
                    }
                }
            }
            self.details.steps += 1;

            if event_found {
                self.state = next_state;
                self.integrator.reset();
                break;
            }

            let next_vec_final = encode(&next_state, layout).context(InvalidStateSnafu)?;
            if next_vec_final != next_vec {
                // `finally` changed the state, so the derivative at the end of the step is stale
                self.integrator.reset();
            }
            state_vec = next_vec_final;
            self.state = next_state;
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            if log_progress {
                let tock: Duration = tick.elapsed().into();
                info!(
                    "Done in {} ({} steps, {} evaluations)",
                    tock, self.details.steps, self.details.evaluations
                );
            }
        }

        Ok(event_found)
    }

    /// Step size in seconds, bounded by the minimum and maximum steps of the options
    fn clamp_step(&self, step_s: f64) -> Duration {
        let step = step_s.abs() * Unit::Second;
        if step > self.prop.opts.max_step {
            self.prop.opts.max_step
        } else if step < self.prop.opts.min_step {
            self.prop.opts.min_step
        } else {
            step
        }
    }
}

impl<'a, D: Dynamics, E: ErrorCtrl> fmt::Debug for PropInstance<'a, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropInstance")
            .field("state", &self.state)
            .field("details", &self.details)
            .field("step_size", &self.step_size)
            .field("fixed_step", &self.fixed_step)
            .field("integrator", &self.integrator)
            .field("variational", &self.variational)
            .field(
                "additional_eqs",
                &self
                    .additional_eqs
                    .iter()
                    .map(|eqs| eqs.name())
                    .collect::<Vec<_>>(),
            )
            .field("recorder", &self.recorder)
            .field("ephemeris_mode", &self.ephemeris_mode)
            .finish()
    }
}
