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

use crate::errors::{StateError, UnknownAdditionalStateSnafu};
use crate::io::{ConfigError, DuplicateAdditionalStateSnafu, InvalidConfigSnafu};
use snafu::prelude::*;

use std::ops::Range;

/// A named block of the augmented state vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdditionalBlock {
    pub name: String,
    pub len: usize,
}

/// Ordered registry of the named additional states.
///
/// Offsets are relative to the start of the additional states in the augmented vector, and are
/// assigned in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdditionalStateRegistry {
    blocks: Vec<AdditionalBlock>,
}

impl AdditionalStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new named block. Names must be unique and blocks may not be empty.
    pub fn register(&mut self, name: &str, len: usize) -> Result<(), ConfigError> {
        ensure!(
            !self.contains(name),
            DuplicateAdditionalStateSnafu { name }
        );
        ensure!(
            len > 0,
            InvalidConfigSnafu {
                msg: format!("additional state `{name}` must have at least one component")
            }
        );
        self.blocks.push(AdditionalBlock {
            name: name.to_string(),
            len,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.iter().any(|b| b.name == name)
    }

    /// Total number of components of all the registered blocks
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|b| b.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Registered blocks, in registration order
    pub fn blocks(&self) -> &[AdditionalBlock] {
        &self.blocks
    }

    /// Range of the named block, relative to the first additional component
    pub fn range(&self, name: &str) -> Result<Range<usize>, StateError> {
        let mut offset = 0;
        for block in &self.blocks {
            if block.name == name {
                return Ok(offset..offset + block.len);
            }
            offset += block.len;
        }
        UnknownAdditionalStateSnafu { name }.fail()
    }
}
