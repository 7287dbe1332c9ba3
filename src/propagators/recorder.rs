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

use crate::cosmic::StateLayout;
use crate::ephemeris::{BoundedEphemeris, EphemerisError, StepModel};
use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Status of a step recorder
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecorderStatus {
    /// Nothing is being recorded, and no ephemeris is available
    Idle,
    /// Accepted steps are being collected
    Recording,
    /// The last run completed and its ephemeris is available
    Finalized,
}

enum RecorderState {
    Idle,
    Recording(Receiver<StepModel>),
    Finalized(BoundedEphemeris),
}

/// Collects the accepted steps of a propagation run and freezes them into a [`BoundedEphemeris`].
///
/// Steps are received on a channel, so the propagation loop only ever holds the sending end. Starting a
/// new recording drops the reference to the previous ephemeris, but any clone of that ephemeris handed out
/// earlier remains valid.
pub struct StepRecorder {
    state: RecorderState,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
        }
    }

    pub fn status(&self) -> RecorderStatus {
        match self.state {
            RecorderState::Idle => RecorderStatus::Idle,
            RecorderState::Recording(_) => RecorderStatus::Recording,
            RecorderState::Finalized(_) => RecorderStatus::Finalized,
        }
    }

    /// Starts a new recording and returns the channel on which the accepted steps must be sent.
    pub fn start(&mut self) -> Sender<StepModel> {
        let (tx, rx) = channel();
        self.state = RecorderState::Recording(rx);
        tx
    }

    /// Builds the ephemeris from all the steps received so far. All of the senders must have been
    /// dropped, otherwise this call blocks.
    ///
    /// On failure, the recorder returns to idle.
    pub fn finalize(&mut self, layout: StateLayout) -> Result<BoundedEphemeris, EphemerisError> {
        let state = std::mem::replace(&mut self.state, RecorderState::Idle);
        let steps: Vec<StepModel> = match state {
            RecorderState::Recording(rx) => rx.into_iter().collect(),
            RecorderState::Idle | RecorderState::Finalized(_) => {
                return Err(EphemerisError::CreationError {
                    msg: "the recorder was not recording".to_string(),
                })
            }
        };
        debug!("finalizing ephemeris from {} steps", steps.len());
        let ephem = BoundedEphemeris::from_steps(steps, layout)?;
        self.state = RecorderState::Finalized(ephem.clone());
        Ok(ephem)
    }

    /// Drops any partial recording or previous ephemeris and returns to idle.
    pub fn discard(&mut self) {
        if let RecorderState::Recording(rx) = &self.state {
            let dropped = rx.try_iter().count();
            if dropped > 0 {
                debug!("discarding {dropped} recorded steps");
            }
        }
        self.state = RecorderState::Idle;
    }

    /// The ephemeris of the last completed run, if any
    pub fn ephemeris(&self) -> Option<&BoundedEphemeris> {
        match &self.state {
            RecorderState::Finalized(ephem) => Some(ephem),
            _ => None,
        }
    }
}

impl Default for StepRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StepRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepRecorder {{ status: {:?} }}", self.status())
    }
}
