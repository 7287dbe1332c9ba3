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

use super::EventEvaluator;
use crate::cosmic::Spacecraft;
use crate::ephemeris::{BoundedEphemeris, EphemStateSnafu, EphemerisError};
use crate::time::{Epoch, Unit};
use snafu::ResultExt;

const MAX_ITER: usize = 50;

/// Finds the state where the event changes sign between `start` and `end`, which may be in either order.
///
/// The states are provided by `state_at`, typically the dense output of an integration step. The event
/// function is expected to be monotone in the provided interval because the event is found with a Brent
/// solver.
pub(crate) fn find_bracketed<E, F>(
    start: Epoch,
    end: Epoch,
    event: &E,
    mut state_at: F,
) -> Result<Spacecraft, EphemerisError>
where
    E: EventEvaluator + ?Sized,
    F: FnMut(Epoch) -> Result<Spacecraft, EphemerisError>,
{
    let not_found = || EphemerisError::EventNotFound {
        start,
        end,
        event: format!("{event}"),
    };
    let value_precision = event.value_precision().abs();

    // Helper lambdas, for f64s only
    let has_converged = |xa: f64, xb: f64| (xa - xb).abs() <= event.epoch_precision().to_seconds();
    let arrange = |a: f64, ya: f64, b: f64, yb: f64| {
        if ya.abs() > yb.abs() {
            (a, ya, b, yb)
        } else {
            (b, yb, a, ya)
        }
    };

    // Search in seconds past the start (convert to epoch just in time)
    let mut xa = 0.0;
    let mut xb = (end - start).to_seconds();
    // Evaluate the event at both bounds
    let ya_state = state_at(start)?;
    let yb_state = state_at(end)?;
    let ya0 = event.eval(&ya_state).context(EphemStateSnafu)?;
    let yb0 = event.eval(&yb_state).context(EphemStateSnafu)?;

    // Check if we're already at the root
    if ya0.abs() <= value_precision {
        debug!("{event} -- found with |{ya0}| < {value_precision} @ {start}");
        return Ok(ya_state);
    } else if yb0.abs() <= value_precision {
        debug!("{event} -- found with |{yb0}| < {value_precision} @ {end}");
        return Ok(yb_state);
    } else if ya0 * yb0 > 0.0 {
        return Err(not_found());
    }

    // The Brent solver, from the roots crate
    // Source: https://docs.rs/roots/0.0.5/src/roots/numerical/brent.rs.html#57-131
    let (mut ya, mut yb) = (ya0, yb0);
    let (mut xc, mut yc, mut xd) = (xa, ya, xa);
    let mut flag = true;

    for _ in 0..MAX_ITER {
        if yb.abs() < value_precision || has_converged(xa, xb) {
            // The root is bracketed within the epoch precision, so b is the best estimate
            let state = state_at(start + xb * Unit::Second)?;
            debug!("{event} -- found with |{yb}| @ {}", state.epoch);
            return Ok(state);
        }
        let mut s = if (ya - yc).abs() > f64::EPSILON && (yb - yc).abs() > f64::EPSILON {
            xa * yb * yc / ((ya - yb) * (ya - yc))
                + xb * ya * yc / ((yb - ya) * (yb - yc))
                + xc * ya * yb / ((yc - ya) * (yc - yb))
        } else {
            xb - yb * (xb - xa) / (yb - ya)
        };
        let cond1 = (s - xb) * (s - (3.0 * xa + xb) / 4.0) > 0.0;
        let cond2 = flag && (s - xb).abs() >= (xb - xc).abs() / 2.0;
        let cond3 = !flag && (s - xb).abs() >= (xc - xd).abs() / 2.0;
        let cond4 = flag && has_converged(xb, xc);
        let cond5 = !flag && has_converged(xc, xd);
        if cond1 || cond2 || cond3 || cond4 || cond5 {
            s = (xa + xb) / 2.0;
            flag = true;
        } else {
            flag = false;
        }
        let next_try = state_at(start + s * Unit::Second)?;
        let ys = event.eval(&next_try).context(EphemStateSnafu)?;
        xd = xc;
        xc = xb;
        yc = yb;
        if ya * ys < 0.0 {
            // Root bracketed between a and s
            (xa, ya, xb, yb) = arrange(xa, ya, s, ys);
        } else {
            // Root bracketed between s and b
            (xa, ya, xb, yb) = arrange(s, ys, xb, yb);
        }
    }
    error!("Brent solver failed after {MAX_ITER} iterations");
    Err(not_found())
}

impl BoundedEphemeris {
    /// Find the exact state where the requested event happens between two epochs of this ephemeris.
    /// The event function is expected to be monotone in the provided interval because we find the event
    /// using a Brent solver.
    pub fn find_bracketed<E: EventEvaluator + ?Sized>(
        &self,
        start: Epoch,
        end: Epoch,
        event: &E,
    ) -> Result<Spacecraft, EphemerisError> {
        self.check_range(start)?;
        self.check_range(end)?;
        find_bracketed(start, end, event, |epoch| self.at(epoch))
    }
}
