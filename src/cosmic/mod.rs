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

// Re-Export spacecraft
mod spacecraft;
pub use self::spacecraft::*;

// Re-Export the registry of additional states
mod additional;
pub use self::additional::*;

/// Conversion of a spacecraft state to and from the flat vector seen by the integrator.
pub mod codec;
pub(crate) use self::codec::decode_unchecked;
pub use self::codec::{
    decode, decode_jacobians, encode, ensure_physical, JacobianLayout, StateLayout,
};

/// Gravitational parameter of the Earth used by GMAT, in km^3/s^2
pub const EARTH_GM_KM3_S2: f64 = 398_600.441_5;
