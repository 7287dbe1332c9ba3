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

use super::{duration_from_str, duration_to_str, ConfigError, ConfigRepr, InvalidConfigSnafu};
use crate::dynamics::{Dynamics, VariationalEquations};
use crate::propagators::{MixedTolerance, PropInstance, PropOpts, Propagator};
use crate::time::{Duration, Unit};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

fn default_init_step() -> Duration {
    60.0 * Unit::Second
}

fn default_min_step() -> Duration {
    0.001 * Unit::Second
}

fn default_max_step() -> Duration {
    2700.0 * Unit::Second
}

fn default_tolerance() -> Vec<f64> {
    vec![1e-12]
}

fn default_attempts() -> u8 {
    50
}

fn default_jacobian_name() -> String {
    "jacobians".to_string()
}

/// Variational equations settings of a propagator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JacobianConfig {
    /// Name under which the flattened Jacobians are recorded, defaults to `jacobians`
    #[serde(default = "default_jacobian_name")]
    pub name: String,
    /// Dimension of the differentiated state, 6 or 7
    pub state_dim: usize,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Serializable configuration of a Dormand Prince propagator and of its instances.
///
/// ```yaml
/// min_step: 1 ms
/// max_step: 45 min
/// abs_tol: [1e-9, 1e-9, 1e-9, 1e-12, 1e-12, 1e-12]
/// rel_tol: [1e-10]
/// max_evaluations: 100000
/// ephemeris_mode: true
/// jacobians:
///   state_dim: 6
///   params: [mu]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropagatorConfig {
    #[serde(
        default = "default_init_step",
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    pub init_step: Duration,
    #[serde(
        default = "default_min_step",
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    pub min_step: Duration,
    #[serde(
        default = "default_max_step",
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    pub max_step: Duration,
    /// Absolute tolerances, a single value applies to all components
    #[serde(default = "default_tolerance")]
    pub abs_tol: Vec<f64>,
    /// Relative tolerances, a single value applies to all components
    #[serde(default = "default_tolerance")]
    pub rel_tol: Vec<f64>,
    #[serde(default = "default_attempts")]
    pub attempts: u8,
    #[serde(default)]
    pub max_evaluations: Option<usize>,
    #[serde(default)]
    pub fixed_step: bool,
    /// Whether the instances record an ephemeris of each run
    #[serde(default)]
    pub ephemeris_mode: bool,
    #[serde(default)]
    pub jacobians: Option<JacobianConfig>,
}

impl ConfigRepr for PropagatorConfig {}

impl Default for PropagatorConfig {
    fn default() -> Self {
        Self {
            init_step: default_init_step(),
            min_step: default_min_step(),
            max_step: default_max_step(),
            abs_tol: default_tolerance(),
            rel_tol: default_tolerance(),
            attempts: default_attempts(),
            max_evaluations: None,
            fixed_step: false,
            ephemeris_mode: false,
            jacobians: None,
        }
    }
}

impl PropagatorConfig {
    /// Validates this configuration and builds the propagator options.
    pub fn to_opts(&self) -> Result<PropOpts<MixedTolerance>, ConfigError> {
        if self.fixed_step {
            ensure!(
                self.init_step > Duration::ZERO,
                InvalidConfigSnafu {
                    msg: format!("fixed step must be positive, got {}", self.init_step)
                }
            );
            let mut opts = PropOpts::with_fixed_step(self.init_step);
            opts.max_evaluations = self.max_evaluations;
            return Ok(opts);
        }

        ensure!(
            self.min_step > Duration::ZERO,
            InvalidConfigSnafu {
                msg: format!("minimum step must be positive, got {}", self.min_step)
            }
        );
        ensure!(
            self.min_step <= self.max_step,
            InvalidConfigSnafu {
                msg: format!(
                    "minimum step {} is greater than the maximum step {}",
                    self.min_step, self.max_step
                )
            }
        );
        ensure!(
            self.init_step >= self.min_step && self.init_step <= self.max_step,
            InvalidConfigSnafu {
                msg: format!(
                    "initial step {} is outside of [{}, {}]",
                    self.init_step, self.min_step, self.max_step
                )
            }
        );
        let error_ctrl = MixedTolerance::with_vectors(self.abs_tol.clone(), self.rel_tol.clone());
        ensure!(
            error_ctrl.is_valid(),
            InvalidConfigSnafu {
                msg: format!("invalid tolerances {error_ctrl}")
            }
        );

        Ok(PropOpts {
            init_step: self.init_step,
            min_step: self.min_step,
            max_step: self.max_step,
            attempts: self.attempts,
            max_evaluations: self.max_evaluations,
            fixed_step: false,
            error_ctrl,
        })
    }

    /// The variational equations requested by this configuration, if any
    pub fn variational(&self) -> Option<VariationalEquations> {
        self.jacobians.as_ref().map(|cfg| {
            let params: Vec<&str> = cfg.params.iter().map(|p| p.as_str()).collect();
            VariationalEquations::new(&cfg.name, cfg.state_dim, &params)
        })
    }

    /// Builds a Dormand Prince 8(5,3) propagator of the provided dynamics with these options.
    pub fn propagator<D: Dynamics>(
        &self,
        dynamics: D,
    ) -> Result<Propagator<D, MixedTolerance>, ConfigError> {
        Ok(Propagator::dp853(dynamics, self.to_opts()?))
    }

    /// Applies the instance settings of this configuration (ephemeris mode and variational equations).
    pub fn configure<D: Dynamics>(
        &self,
        instance: &mut PropInstance<'_, D, MixedTolerance>,
    ) -> Result<(), ConfigError> {
        if self.ephemeris_mode {
            instance.set_ephemeris_mode();
        } else {
            instance.set_slave_mode();
        }
        if let Some(variational) = self.variational() {
            instance.with_jacobians(variational)?;
        }
        Ok(())
    }
}
