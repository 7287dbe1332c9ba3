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

//! The augmented state vector is laid out as follows:
//!
//! ```text
//! [ x y z vx vy vz (mass) | STM (n x n, row major) | sensitivities (n x p, row major) | additional states ... ]
//! ```
//!
//! where n is the dimension of the differentiated state and p the number of differentiated parameters.
//! The Jacobian block is itself a named additional state of length n * (n + p).

use super::{AdditionalStateRegistry, Jacobians, Spacecraft};
use crate::errors::{MissingDataSnafu, PhysicallyInvalidStateSnafu, StateError};
use crate::io::{ConfigError, DuplicateAdditionalStateSnafu, JacobianDimensionSnafu};
use crate::linalg::{DMatrix, DVector, Vector3};
use crate::time::Epoch;
use crate::utils::{read_row_major, write_row_major};
use snafu::prelude::*;

use std::collections::BTreeMap;
use std::ops::Range;

/// Shape of the Jacobian block of the augmented state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JacobianLayout {
    /// Name under which the flattened block is exposed as an additional state
    pub name: String,
    /// Dimension of the differentiated state: 6, or 7 when the mass is differentiated
    pub state_dim: usize,
    /// Names of the differentiated parameters, in column order of the sensitivity matrix
    pub params: Vec<String>,
}

impl JacobianLayout {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Number of components of the flattened STM and sensitivities
    pub fn len(&self) -> usize {
        self.state_dim * (self.state_dim + self.params.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Describes how a spacecraft state maps onto the flat vector seen by the integrator.
///
/// A layout is fixed for the duration of a propagation run and is shared with the ephemeris built from
/// that run, so that the recorded vectors can be decoded back at query time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateLayout {
    with_mass: bool,
    jacobians: Option<JacobianLayout>,
    additional: AdditionalStateRegistry,
}

impl StateLayout {
    /// Layout of the base state, with or without the mass component
    pub fn new(with_mass: bool) -> Self {
        Self {
            with_mass,
            jacobians: None,
            additional: AdditionalStateRegistry::new(),
        }
    }

    /// Adds the Jacobian block, named `name`, for a differentiated state of dimension `state_dim` and the
    /// provided parameters.
    pub fn with_jacobians(
        mut self,
        name: &str,
        state_dim: usize,
        params: Vec<String>,
    ) -> Result<Self, ConfigError> {
        ensure!(
            self.jacobians.is_none(),
            DuplicateAdditionalStateSnafu { name }
        );
        ensure!(
            !self.additional.contains(name),
            DuplicateAdditionalStateSnafu { name }
        );
        ensure!(
            state_dim == 6 || state_dim == 7,
            JacobianDimensionSnafu {
                msg: format!("the differentiated state must be of dimension 6 or 7, got {state_dim}")
            }
        );
        ensure!(
            state_dim == 6 || self.with_mass,
            JacobianDimensionSnafu {
                msg: "a differentiated state of dimension 7 requires the mass to be propagated"
                    .to_string()
            }
        );
        self.jacobians = Some(JacobianLayout {
            name: name.to_string(),
            state_dim,
            params,
        });
        Ok(self)
    }

    /// Adds a named additional state of `len` components.
    pub fn with_additional(mut self, name: &str, len: usize) -> Result<Self, ConfigError> {
        if let Some(jac) = &self.jacobians {
            ensure!(jac.name != name, DuplicateAdditionalStateSnafu { name });
        }
        self.additional.register(name, len)?;
        Ok(self)
    }

    /// Number of components of the base state: 6, or 7 with mass
    pub fn base_len(&self) -> usize {
        if self.with_mass {
            7
        } else {
            6
        }
    }

    /// Total number of components of the augmented state vector
    pub fn len(&self) -> usize {
        self.base_len()
            + self.jacobians.as_ref().map(|j| j.len()).unwrap_or(0)
            + self.additional.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn has_mass(&self) -> bool {
        self.with_mass
    }

    pub fn has_jacobians(&self) -> bool {
        self.jacobians.is_some()
    }

    pub fn jacobians(&self) -> Option<&JacobianLayout> {
        self.jacobians.as_ref()
    }

    /// Index of the first component of the STM, which is also the first component after the base state.
    pub fn jacobian_offset(&self) -> usize {
        self.base_len()
    }

    /// Index of the first component of the user additional states
    fn additional_offset(&self) -> usize {
        self.base_len() + self.jacobians.as_ref().map(|j| j.len()).unwrap_or(0)
    }

    /// Names of all the additional states, starting with the Jacobian block if any
    pub fn additional_names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.additional.blocks().len() + 1);
        if let Some(jac) = &self.jacobians {
            names.push(jac.name.as_str());
        }
        names.extend(self.additional.blocks().iter().map(|b| b.name.as_str()));
        names
    }

    /// Range of the named additional state within the augmented vector
    pub fn additional_range(&self, name: &str) -> Result<Range<usize>, StateError> {
        if let Some(jac) = &self.jacobians {
            if jac.name == name {
                let start = self.jacobian_offset();
                return Ok(start..start + jac.len());
            }
        }
        let rel = self.additional.range(name)?;
        let offset = self.additional_offset();
        Ok(rel.start + offset..rel.end + offset)
    }

    pub fn registry(&self) -> &AdditionalStateRegistry {
        &self.additional
    }
}

/// Flattens the spacecraft state into the augmented vector described by the layout.
///
/// When the layout has a Jacobian block but the state carries no Jacobians, the block is seeded with an
/// identity STM and zero sensitivities. Missing additional states are seeded with zeros.
pub fn encode(state: &Spacecraft, layout: &StateLayout) -> Result<DVector<f64>, StateError> {
    ensure!(
        state.mass_kg.is_some() == layout.has_mass(),
        MissingDataSnafu {
            what: "mass",
            expected: layout.has_mass() as usize,
            got: state.mass_kg.is_some() as usize,
        }
    );

    let mut vec = DVector::zeros(layout.len());
    vec.fixed_rows_mut::<3>(0).copy_from(&state.radius_km);
    vec.fixed_rows_mut::<3>(3).copy_from(&state.velocity_km_s);
    if let Some(mass_kg) = state.mass_kg {
        vec[6] = mass_kg;
    }

    if let Some(jac_layout) = layout.jacobians() {
        let n = jac_layout.state_dim;
        let p = jac_layout.param_count();
        let seeded;
        let jac = match &state.jacobians {
            Some(jac) => {
                ensure!(
                    jac.stm.shape() == (n, n),
                    MissingDataSnafu {
                        what: "state transition matrix",
                        expected: n * n,
                        got: jac.stm.len(),
                    }
                );
                ensure!(
                    jac.sensitivity.shape() == (n, p),
                    MissingDataSnafu {
                        what: "sensitivity matrix",
                        expected: n * p,
                        got: jac.sensitivity.len(),
                    }
                );
                jac
            }
            None => {
                seeded = Jacobians::identity(n, p);
                &seeded
            }
        };
        let offset = layout.jacobian_offset();
        write_row_major(&mut vec.as_mut_slice()[offset..offset + n * n], &jac.stm);
        write_row_major(
            &mut vec.as_mut_slice()[offset + n * n..offset + n * (n + p)],
            &jac.sensitivity,
        );
    }

    for block in layout.registry().blocks() {
        let range = layout.additional_range(&block.name)?;
        if let Some(value) = state.additional.get(&block.name) {
            ensure!(
                value.len() == block.len,
                MissingDataSnafu {
                    what: "additional state",
                    expected: block.len,
                    got: value.len(),
                }
            );
            vec.rows_mut(range.start, block.len).copy_from(value);
        }
    }

    Ok(vec)
}

/// Rebuilds the spacecraft state at the provided epoch from its augmented vector.
///
/// The flattened Jacobian block is also exposed as a named additional state.
pub fn decode(
    vec: &DVector<f64>,
    epoch: Epoch,
    layout: &StateLayout,
) -> Result<Spacecraft, StateError> {
    let state = decode_unchecked(vec, epoch, layout)?;
    ensure_physical(&state)?;
    Ok(state)
}

/// Ensures that the state is physical, i.e. that its mass is not negative.
pub fn ensure_physical(state: &Spacecraft) -> Result<(), StateError> {
    if let Some(mass_kg) = state.mass_kg {
        ensure!(
            mass_kg >= 0.0,
            PhysicallyInvalidStateSnafu {
                epoch: state.epoch,
                reason: format!("negative mass of {mass_kg} kg")
            }
        );
    }
    Ok(())
}

/// Same as [`decode`] but the state may not be physical, e.g. past the depletion of the propellant.
pub(crate) fn decode_unchecked(
    vec: &DVector<f64>,
    epoch: Epoch,
    layout: &StateLayout,
) -> Result<Spacecraft, StateError> {
    ensure!(
        vec.len() == layout.len(),
        MissingDataSnafu {
            what: "augmented state",
            expected: layout.len(),
            got: vec.len(),
        }
    );

    let mass_kg = if layout.has_mass() {
        Some(vec[6])
    } else {
        None
    };

    let mut additional = BTreeMap::new();
    let jacobians = match layout.jacobians() {
        Some(jac_layout) => {
            let range = layout.additional_range(&jac_layout.name)?;
            additional.insert(
                jac_layout.name.clone(),
                DVector::from_column_slice(&vec.as_slice()[range]),
            );
            Some(decode_jacobians(vec, layout)?)
        }
        None => None,
    };

    for block in layout.registry().blocks() {
        let range = layout.additional_range(&block.name)?;
        additional.insert(
            block.name.clone(),
            DVector::from_column_slice(&vec.as_slice()[range]),
        );
    }

    Ok(Spacecraft {
        epoch,
        radius_km: Vector3::new(vec[0], vec[1], vec[2]),
        velocity_km_s: Vector3::new(vec[3], vec[4], vec[5]),
        mass_kg,
        jacobians,
        additional,
    })
}

/// Extracts the STM and the sensitivity matrix from an augmented vector.
///
/// Fails fast with `MissingData` if the layout has no Jacobian block.
pub fn decode_jacobians(vec: &DVector<f64>, layout: &StateLayout) -> Result<Jacobians, StateError> {
    let jac_layout = layout.jacobians().context(MissingDataSnafu {
        what: "Jacobians",
        expected: 1_usize,
        got: 0_usize,
    })?;
    ensure!(
        vec.len() == layout.len(),
        MissingDataSnafu {
            what: "augmented state",
            expected: layout.len(),
            got: vec.len(),
        }
    );
    let n = jac_layout.state_dim;
    let p = jac_layout.param_count();
    let offset = layout.jacobian_offset();
    let data = vec.as_slice();
    Ok(Jacobians {
        stm: read_row_major(&data[offset..offset + n * n], n, n),
        sensitivity: read_row_major(&data[offset + n * n..offset + n * (n + p)], n, p),
    })
}
