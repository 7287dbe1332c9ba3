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

use crate::time::Epoch;
use snafu::prelude::*;

/// Errors raised when converting a spacecraft state to and from its vector representation.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StateError {
    /// The vector does not carry the data required by the layout or by the request.
    #[snafu(display("missing data: {what} (expected {expected} items, got {got})"))]
    MissingData {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// The state is not physical, e.g. the mass was depleted below zero.
    #[snafu(display("physically invalid state at {epoch}: {reason}"))]
    PhysicallyInvalidState { epoch: Epoch, reason: String },
    /// Jacobians were requested from a state whose propagation never enabled the variational equations.
    #[snafu(display("state Jacobians requested but the variational equations were never initialized"))]
    StateJacobianNotInitialized,
    /// The requested additional state is not registered in the layout.
    #[snafu(display("unknown additional state `{name}`"))]
    UnknownAdditionalState { name: String },
}
