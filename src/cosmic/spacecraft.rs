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

use crate::errors::{StateError, StateJacobianNotInitializedSnafu, UnknownAdditionalStateSnafu};
use crate::linalg::{DMatrix, DVector, Vector3};
use crate::time::Epoch;
use snafu::prelude::*;

use std::collections::BTreeMap;
use std::fmt;

/// The state transition matrix and the parameter sensitivity matrix of a state.
///
/// The STM is n x n and the sensitivity matrix is n x p, where n is the dimension of the differentiated
/// state (six without mass, seven with mass) and p the number of differentiated parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Jacobians {
    pub stm: DMatrix<f64>,
    pub sensitivity: DMatrix<f64>,
}

impl Jacobians {
    /// Identity STM and zero sensitivities, i.e. the Jacobians at the start of a propagation.
    pub fn identity(state_dim: usize, param_count: usize) -> Self {
        Self {
            stm: DMatrix::identity(state_dim, state_dim),
            sensitivity: DMatrix::zeros(state_dim, param_count),
        }
    }

    /// Dimension of the differentiated state
    pub fn state_dim(&self) -> usize {
        self.stm.nrows()
    }

    /// Number of differentiated parameters
    pub fn param_count(&self) -> usize {
        self.sensitivity.ncols()
    }
}

/// A spacecraft state: Cartesian position and velocity, an optional mass, and optionally the Jacobians
/// and named additional states carried alongside the dynamics.
///
/// Units are km, km/s and kg. Equality only compares the epoch, the position, the velocity and the mass.
#[derive(Clone, Debug)]
pub struct Spacecraft {
    pub epoch: Epoch,
    pub radius_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
    /// Mass of the spacecraft, if it is part of the propagated state
    pub mass_kg: Option<f64>,
    /// Set when the variational equations are integrated alongside the state
    pub jacobians: Option<Jacobians>,
    /// Named additional states, integrated by their own additional equations
    pub additional: BTreeMap<String, DVector<f64>>,
}

impl PartialEq for Spacecraft {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch
            && self.radius_km == other.radius_km
            && self.velocity_km_s == other.velocity_km_s
            && self.mass_kg == other.mass_kg
    }
}

impl Spacecraft {
    /// Creates a new massless spacecraft state from its Cartesian components.
    pub fn cartesian(
        x_km: f64,
        y_km: f64,
        z_km: f64,
        vx_km_s: f64,
        vy_km_s: f64,
        vz_km_s: f64,
        epoch: Epoch,
    ) -> Self {
        Self {
            epoch,
            radius_km: Vector3::new(x_km, y_km, z_km),
            velocity_km_s: Vector3::new(vx_km_s, vy_km_s, vz_km_s),
            mass_kg: None,
            jacobians: None,
            additional: BTreeMap::new(),
        }
    }

    /// Returns a copy of this state with the provided mass, which then becomes part of the propagated state.
    pub fn with_mass(mut self, mass_kg: f64) -> Self {
        self.mass_kg = Some(mass_kg);
        self
    }

    /// Returns a copy of this state with the provided additional state.
    pub fn with_additional_state(mut self, name: &str, value: DVector<f64>) -> Self {
        self.additional.insert(name.to_string(), value);
        self
    }

    /// Returns the state transition matrix, or an error if the variational equations were not integrated.
    pub fn stm(&self) -> Result<&DMatrix<f64>, StateError> {
        self.jacobians
            .as_ref()
            .map(|j| &j.stm)
            .context(StateJacobianNotInitializedSnafu)
    }

    /// Returns the parameter sensitivity matrix, or an error if the variational equations were not integrated.
    pub fn sensitivity(&self) -> Result<&DMatrix<f64>, StateError> {
        self.jacobians
            .as_ref()
            .map(|j| &j.sensitivity)
            .context(StateJacobianNotInitializedSnafu)
    }

    /// Returns the named additional state
    pub fn additional_state(&self, name: &str) -> Result<&DVector<f64>, StateError> {
        self.additional
            .get(name)
            .context(UnknownAdditionalStateSnafu { name })
    }

    /// Returns the magnitude of the radius vector in km
    pub fn rmag_km(&self) -> f64 {
        self.radius_km.norm()
    }

    /// Returns the magnitude of the velocity vector in km/s
    pub fn vmag_km_s(&self) -> f64 {
        self.velocity_km_s.norm()
    }

    /// Returns the root sum squared position and velocity differences between both states, in km and km/s.
    pub fn rss(&self, other: &Self) -> (f64, f64) {
        (
            (self.radius_km - other.radius_km).norm(),
            (self.velocity_km_s - other.velocity_km_s).norm(),
        )
    }

    /// Specific mechanical energy for the provided gravitational parameter, in km^2/s^2
    pub fn energy_km2_s2(&self, mu_km3_s2: f64) -> f64 {
        self.vmag_km_s().powi(2) / 2.0 - mu_km3_s2 / self.rmag_km()
    }
}

impl fmt::Display for Spacecraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(6);
        write!(
            f,
            "[{}] position = [{:.*}, {:.*}, {:.*}] km\tvelocity = [{:.*}, {:.*}, {:.*}] km/s",
            self.epoch,
            prec,
            self.radius_km.x,
            prec,
            self.radius_km.y,
            prec,
            self.radius_km.z,
            prec,
            self.velocity_km_s.x,
            prec,
            self.velocity_km_s.y,
            prec,
            self.velocity_km_s.z,
        )?;
        if let Some(mass_kg) = self.mass_kg {
            write!(f, "\tmass = {mass_kg:.3} kg")?;
        }
        Ok(())
    }
}

impl fmt::LowerExp for Spacecraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(6);
        write!(
            f,
            "[{}] position = [{:.*e}, {:.*e}, {:.*e}] km\tvelocity = [{:.*e}, {:.*e}, {:.*e}] km/s",
            self.epoch,
            prec,
            self.radius_km.x,
            prec,
            self.radius_km.y,
            prec,
            self.radius_km.z,
            prec,
            self.velocity_km_s.x,
            prec,
            self.velocity_km_s.y,
            prec,
            self.velocity_km_s.z,
        )
    }
}

#[test]
fn jacobians_not_initialized() {
    let epoch = Epoch::from_gregorian_tai_at_midnight(2020, 1, 1);
    let sc = Spacecraft::cartesian(7000.0, 0.0, 0.0, 0.0, 7.5, 0.0, epoch);
    assert_eq!(sc.stm(), Err(StateError::StateJacobianNotInitialized));
    assert_eq!(sc.sensitivity(), Err(StateError::StateJacobianNotInitialized));
    assert!(matches!(
        sc.additional_state("dummy"),
        Err(StateError::UnknownAdditionalState { .. })
    ));

    let mut with_jac = sc.clone();
    with_jac.jacobians = Some(Jacobians::identity(6, 1));
    assert_eq!(with_jac.stm().unwrap(), &DMatrix::<f64>::identity(6, 6));
    assert_eq!(with_jac.sensitivity().unwrap().shape(), (6, 1));
}

#[test]
fn display() {
    let epoch = Epoch::from_gregorian_tai_at_midnight(2020, 1, 1);
    let sc = Spacecraft::cartesian(7000.0, 0.0, 0.0, 0.0, 7.5, 0.0, epoch).with_mass(500.0);
    let repr = format!("{sc}");
    assert!(repr.contains("7000.000000"));
    assert!(repr.contains("mass = 500.000 kg"));
}

#[test]
fn equality() {
    let epoch = Epoch::from_gregorian_tai_at_midnight(2020, 1, 1);
    let sc = Spacecraft::cartesian(7000.0, 0.0, 0.0, 0.0, 7.5, 0.0, epoch).with_mass(500.0);

    // Jacobians and additional states are not compared
    let mut augmented = sc.clone();
    augmented.jacobians = Some(Jacobians::identity(6, 0));
    augmented
        .additional
        .insert("clock".to_string(), DVector::from_element(1, 3.0));
    assert_eq!(augmented, sc);

    assert_ne!(sc.clone().with_mass(499.0), sc);
    let mut moved = sc.clone();
    moved.velocity_km_s.y += 1e-12;
    assert_ne!(moved, sc);
}
