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

use std::fmt;

use crate::time::{Duration, Unit};

use super::{ErrorCtrl, MixedTolerance};
use typed_builder::TypedBuilder;

/// PropOpts stores the integrator options, including the minimum and maximum step sizes, the error
/// control, and the limits after which a propagation is aborted.
///
/// Note that different step sizes and tolerances are only used for adaptive methods. To use a fixed
/// step integrator, initialize the options using `with_fixed_step`.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(doc)]
pub struct PropOpts<E: ErrorCtrl> {
    #[builder(default_code = "60.0 * Unit::Second")]
    pub init_step: Duration,
    #[builder(default_code = "0.001 * Unit::Second")]
    pub min_step: Duration,
    #[builder(default_code = "2700.0 * Unit::Second")]
    pub max_step: Duration,
    /// Number of rejected attempts of a single step after which the propagation is aborted
    #[builder(default = 50)]
    pub attempts: u8,
    /// Number of evaluations of the equations of motion in a single run after which the propagation is aborted
    #[builder(default, setter(strip_option))]
    pub max_evaluations: Option<usize>,
    #[builder(default = false)]
    pub fixed_step: bool,
    pub error_ctrl: E,
}

impl<E: ErrorCtrl> PropOpts<E> {
    /// `with_adaptive_step` initializes an `PropOpts` such that the integrator is used with an
    ///  adaptive step size. The number of attempts is fixed to 50 (as in GMAT).
    pub fn with_adaptive_step(min_step: Duration, max_step: Duration, error_ctrl: E) -> Self {
        PropOpts {
            init_step: max_step,
            min_step,
            max_step,
            attempts: 50,
            max_evaluations: None,
            fixed_step: false,
            error_ctrl,
        }
    }

    pub fn with_adaptive_step_s(min_step: f64, max_step: f64, error_ctrl: E) -> Self {
        Self::with_adaptive_step(min_step * Unit::Second, max_step * Unit::Second, error_ctrl)
    }

    /// Set the maximum step size and sets the initial step to that value if currently greater
    pub fn set_max_step(&mut self, max_step: Duration) {
        if self.init_step > max_step {
            self.init_step = max_step;
        }
        self.max_step = max_step;
    }
}

impl<E: ErrorCtrl> fmt::Display for PropOpts<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fixed_step {
            write!(f, "fixed step: {:e}", self.min_step,)
        } else {
            write!(
                f,
                "min_step: {:e}, max_step: {:e}, error control: {:?}, attempts: {}",
                self.min_step, self.max_step, self.error_ctrl, self.attempts,
            )?;
            if let Some(max_evals) = self.max_evaluations {
                write!(f, ", max evaluations: {max_evals}")?;
            }
            Ok(())
        }
    }
}

impl PropOpts<MixedTolerance> {
    /// `with_fixed_step` initializes an `PropOpts` such that the integrator is used with a fixed
    ///  step size.
    pub fn with_fixed_step(step: Duration) -> Self {
        PropOpts {
            init_step: step,
            min_step: step,
            max_step: step,
            attempts: 0,
            max_evaluations: None,
            fixed_step: true,
            error_ctrl: MixedTolerance::default(),
        }
    }

    pub fn with_fixed_step_s(step: f64) -> Self {
        Self::with_fixed_step(step * Unit::Second)
    }

    /// Returns the default options with the same absolute and relative tolerance on every component.
    #[allow(clippy::field_reassign_with_default)]
    pub fn with_tolerance(tolerance: f64) -> Self {
        let mut opts = Self::default();
        opts.error_ctrl = MixedTolerance::new(tolerance, tolerance);
        opts
    }

    /// Creates a propagator with the provided max step, and sets the initial step to that value as well.
    #[allow(clippy::field_reassign_with_default)]
    pub fn with_max_step(max_step: Duration) -> Self {
        let mut opts = Self::default();
        opts.set_max_step(max_step);
        opts
    }
}

impl Default for PropOpts<MixedTolerance> {
    /// `default` returns the same step sizes and attempts as GMAT.
    fn default() -> PropOpts<MixedTolerance> {
        PropOpts {
            init_step: 60.0 * Unit::Second,
            min_step: 0.001 * Unit::Second,
            max_step: 2700.0 * Unit::Second,
            attempts: 50,
            max_evaluations: None,
            fixed_step: false,
            error_ctrl: MixedTolerance::default(),
        }
    }
}

#[test]
fn test_options() {
    use super::error_ctrl::RSSCartesianStep;

    let opts = PropOpts::with_fixed_step_s(1e-1);
    assert_eq!(opts.min_step, 1e-1 * Unit::Second);
    assert_eq!(opts.max_step, 1e-1 * Unit::Second);
    assert!(opts.fixed_step);

    let opts = PropOpts::with_adaptive_step_s(1e-2, 10.0, RSSCartesianStep { tolerance: 1e-12 });
    assert_eq!(opts.min_step, 1e-2 * Unit::Second);
    assert_eq!(opts.max_step, 10.0 * Unit::Second);
    assert!(!opts.fixed_step);

    let opts: PropOpts<MixedTolerance> = Default::default();
    assert_eq!(opts.init_step, 60.0 * Unit::Second);
    assert_eq!(opts.min_step, 0.001 * Unit::Second);
    assert_eq!(opts.max_step, 2700.0 * Unit::Second);
    assert_eq!(opts.error_ctrl, MixedTolerance::new(1e-12, 1e-12));
    assert_eq!(opts.attempts, 50);
    assert_eq!(opts.max_evaluations, None);
    assert!(!opts.fixed_step);

    let opts = PropOpts::with_max_step(1.0 * Unit::Second);
    assert_eq!(opts.init_step, 1.0 * Unit::Second);
    assert_eq!(opts.min_step, 0.001 * Unit::Second);
    assert_eq!(opts.max_step, 1.0 * Unit::Second);

    let opts = PropOpts::with_tolerance(1e-9);
    assert_eq!(opts.error_ctrl, MixedTolerance::new(1e-9, 1e-9));

    let opts = PropOpts::builder()
        .max_step(600.0 * Unit::Second)
        .max_evaluations(1000)
        .error_ctrl(MixedTolerance::new(1e-6, 1e-9))
        .build();
    assert_eq!(opts.init_step, 60.0 * Unit::Second);
    assert_eq!(opts.max_step, 600.0 * Unit::Second);
    assert_eq!(opts.max_evaluations, Some(1000));
    assert!(format!("{opts}").contains("max evaluations: 1000"));
}
