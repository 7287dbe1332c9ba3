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

use super::error_ctrl::{ErrorCtrl, MixedTolerance};
use super::{
    AbortHandle, Dormand45, Dormand853, EmbeddedRk, IntegrationDetails, PropInstance, PropOpts,
    StepIntegrator, StepRecorder, RK,
};
use crate::cosmic::Spacecraft;
use crate::dynamics::Dynamics;

/// A Propagator allows propagating a set of dynamics forward or backward in time.
/// It includes the options and the Runge Kutta method used by each of its instances.
#[derive(Clone, Debug)]
pub struct Propagator<D: Dynamics, E: ErrorCtrl> {
    pub dynamics: D, // Stores the dynamics used. *Must* use this to get the latest values
    pub opts: PropOpts<E>, // Stores the integration options (tolerance, min/max step, init step, etc.)
    method: EmbeddedRk, // Prototype of the integrator, cloned for each instance
}

impl<D: Dynamics, E: ErrorCtrl> Propagator<D, E> {
    /// Each propagator must be initialized with `new` which stores propagator information.
    pub fn new<T: RK>(dynamics: D, opts: PropOpts<E>) -> Self {
        Self {
            dynamics,
            opts,
            method: EmbeddedRk::new::<T>(),
        }
    }

    /// A Dormand Prince 5(4) propagator with custom propagator options.
    pub fn dp45(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<Dormand45>(dynamics, opts)
    }

    /// A Dormand Prince 8(5,3) propagator with custom propagator options.
    pub fn dp853(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<Dormand853>(dynamics, opts)
    }

    /// Order of the Runge Kutta method of this propagator
    pub fn order(&self) -> u8 {
        self.method.order()
    }

    pub fn with(&self, state: Spacecraft) -> PropInstance<'_, D, E> {
        PropInstance {
            state,
            prop: self,
            details: IntegrationDetails {
                step: self.opts.init_step,
                error: 0.0,
                attempts: 1,
                evaluations: 0,
                steps: 0,
            },
            step_size: self.opts.init_step.abs(),
            fixed_step: self.opts.fixed_step,
            integrator: Box::new(self.method.clone()),
            variational: None,
            additional_eqs: Vec::new(),
            recorder: StepRecorder::new(),
            ephemeris_mode: false,
            abort: AbortHandle::new(),
            started: false,
        }
    }
}

impl<D: Dynamics> Propagator<D, MixedTolerance> {
    /// Default propagator is a Dormand Prince 8(5,3) with the default PropOpts.
    pub fn default(dynamics: D) -> Self {
        Self::new::<Dormand853>(dynamics, PropOpts::default())
    }
}
