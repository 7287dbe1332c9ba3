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

use super::BoundedEphemeris;
use crate::cosmic::Spacecraft;
use crate::time::TimeSeries;

/// Iterates through an ephemeris at a fixed step.
pub struct EphemIterator<'a> {
    pub time_series: TimeSeries,
    /// A reference to the original ephemeris.
    pub ephem: &'a BoundedEphemeris,
}

impl Iterator for EphemIterator<'_> {
    type Item = Spacecraft;

    fn next(&mut self) -> Option<Self::Item> {
        match self.time_series.next() {
            Some(next_epoch) => match self.ephem.at(next_epoch) {
                Ok(item) => Some(item),
                Err(e) => {
                    if next_epoch >= self.ephem.min_epoch() && next_epoch <= self.ephem.max_epoch()
                    {
                        error!("!!! [BUG] EphemIterator: {e} not found but should be present in {} !", self.ephem);
                    }
                    None
                }
            },
            None => None,
        }
    }
}
