extern crate nyx_ephem as nyx;

use super::{leo, two_body, GMAT_EARTH_GM};
use nyx::cosmic::Spacecraft;
use nyx::dynamics::{AdditionalEquations, DynamicsError, OrbitalDynamics, SpacecraftDynamics};
use nyx::linalg::DVector;
use nyx::propagators::{
    AbortHandle, AbortReason, MixedTolerance, PropOpts, PropagationError, Propagator,
};
use nyx::time::{Epoch, Unit};
use nyx::StateError;
use rstest::*;
use std::sync::Arc;

/// Requests the cancellation of the run as soon as the integration goes past an epoch
struct Tripwire {
    handle: AbortHandle,
    after: Epoch,
}

impl AdditionalEquations for Tripwire {
    fn name(&self) -> &str {
        "tripwire"
    }

    fn dimension(&self) -> usize {
        1
    }

    fn derivatives(
        &self,
        epoch: Epoch,
        _base_state: &DVector<f64>,
        _additional_state: &[f64],
    ) -> Result<DVector<f64>, DynamicsError> {
        if epoch > self.after {
            self.handle.cancel();
        }
        Ok(DVector::zeros(1))
    }
}

#[rstest]
fn cancel_before_run(leo: Spacecraft) {
    let setup = two_body(1e-9);
    let mut prop = setup.with(leo.clone());
    prop.set_ephemeris_mode();

    let handle = prop.abort_handle();
    handle.cancel();
    assert!(handle.is_cancelled());

    match prop.for_duration(1 * Unit::Hour) {
        Err(PropagationError::PropagationAborted { reason, epoch }) => {
            assert_eq!(reason, AbortReason::Cancelled);
            assert_eq!(epoch, leo.epoch);
        }
        other => panic!("expected a cancellation, got {other:?}"),
    }
    assert!(prop.generated_ephemeris().is_err());
    assert_eq!(prop.state, leo);

    // The request was consumed
    assert!(!handle.is_cancelled());
    assert!(prop.for_duration(1 * Unit::Hour).is_ok());
    assert!(prop.generated_ephemeris().is_ok());
}

#[rstest]
fn cancel_during_run(leo: Spacecraft) {
    let _ = pretty_env_logger::try_init();

    let setup = two_body(1e-9);
    let mut prop = setup.with(leo.clone());
    prop.set_ephemeris_mode();
    let resumed_from = prop.for_duration(30 * Unit::Minute).unwrap();
    let previous = prop.generated_ephemeris().unwrap();

    let after = leo.epoch + 2 * Unit::Hour;
    let tripwire = Tripwire {
        handle: prop.abort_handle(),
        after,
    };
    prop.add_additional_equations(Arc::new(tripwire), DVector::zeros(1))
        .unwrap();

    match prop.for_duration(1 * Unit::Day) {
        Err(PropagationError::PropagationAborted {
            reason: AbortReason::Cancelled,
            epoch,
        }) => {
            // Rejected attempts may also go past the tripwire
            assert!(epoch > leo.epoch + 1 * Unit::Hour && epoch < after + 1 * Unit::Hour);
        }
        other => panic!("expected a cancellation, got {other:?}"),
    }

    // No partial ephemeris, and the previous one is untouched
    assert!(prop.generated_ephemeris().is_err());
    assert_eq!(previous.start_epoch(), leo.epoch);
    assert_eq!(previous.end_epoch(), resumed_from.epoch);
    assert!(previous.at(leo.epoch + 15 * Unit::Minute).is_ok());
    assert!(!prop.abort_handle().is_cancelled());
}

#[rstest]
fn max_evaluations(leo: Spacecraft) {
    let mut opts = PropOpts::with_tolerance(1e-9);
    opts.max_evaluations = Some(100);
    let setup = Propagator::dp45(OrbitalDynamics::new(GMAT_EARTH_GM), opts);
    let mut prop = setup.with(leo.clone());
    prop.set_ephemeris_mode();

    assert!(matches!(
        prop.for_duration(1 * Unit::Day),
        Err(PropagationError::PropagationAborted {
            reason: AbortReason::MaxEvaluations,
            ..
        })
    ));
    assert!(prop.latest_details().evaluations <= 100);
    assert!(prop.generated_ephemeris().is_err());

    // The budget applies to each run
    assert!(prop.for_duration(5 * Unit::Minute).is_ok());
}

#[rstest]
fn max_attempts(leo: Spacecraft) {
    let mut opts = PropOpts::with_adaptive_step(
        1 * Unit::Second,
        2700 * Unit::Second,
        MixedTolerance::new(1e-14, 1e-14),
    );
    opts.attempts = 1;
    let setup = Propagator::dp45(OrbitalDynamics::new(GMAT_EARTH_GM), opts);
    let mut prop = setup.with(leo.clone());

    match prop.for_duration(1 * Unit::Day) {
        Err(PropagationError::PropagationAborted { reason, epoch }) => {
            assert_eq!(reason, AbortReason::MaxAttempts);
            assert_eq!(epoch, leo.epoch);
        }
        other => panic!("expected too many attempts, got {other:?}"),
    }
}

#[rstest]
fn negative_mass(leo: Spacecraft) {
    let setup = Propagator::dp45(
        SpacecraftDynamics::with_mass_flow(OrbitalDynamics::new(GMAT_EARTH_GM), 0.01),
        PropOpts::with_tolerance(1e-9),
    );
    let mut prop = setup.with(leo.with_mass(1.0));
    prop.set_ephemeris_mode();

    // Enough propellant for the first 50 seconds
    let (_, before) = prop.for_duration_with_ephem(50 * Unit::Second).unwrap();
    assert!((prop.state.mass_kg.unwrap() - 0.5).abs() < 1e-12);

    match prop.for_duration(1 * Unit::Hour) {
        Err(PropagationError::InvalidState {
            source: StateError::PhysicallyInvalidState { epoch, .. },
        }) => {
            assert!(epoch > before.end_epoch());
        }
        other => panic!("expected a physically invalid state, got {other:?}"),
    }
    assert!(prop.generated_ephemeris().is_err());
    assert!(before.last().unwrap().mass_kg.unwrap() > 0.0);
}

#[rstest]
fn planar_relative_tolerance(leo: Spacecraft) {
    // Purely relative tolerance, while the out of plane components stay at zero
    let mut opts = PropOpts::default();
    opts.error_ctrl = MixedTolerance::new(0.0, 1e-10);
    let setup = Propagator::dp853(OrbitalDynamics::new(GMAT_EARTH_GM), opts);
    let planar = Spacecraft::cartesian(7000.0, 0.0, 0.0, 0.0, 7.5, 0.0, leo.epoch);

    let mut prop = setup.with(planar);
    let end_state = prop.for_duration(1 * Unit::Minute).unwrap();
    assert_eq!(end_state.radius_km.z, 0.0);
    assert_eq!(end_state.velocity_km_s.z, 0.0);
    assert!(prop.latest_details().steps < 5);
    assert!(prop.latest_details().evaluations < 100);

    let end_state = prop.for_duration(1 * Unit::Hour).unwrap();
    assert_eq!(end_state.radius_km.z, 0.0);
    assert!(prop.latest_details().steps < 100);
}

#[rstest]
fn undefined_error_estimate(leo: Spacecraft) {
    let setup = two_body(1e-9);
    let mut broken = leo.clone();
    broken.radius_km.x = f64::NAN;

    match setup.with(broken).for_duration(1 * Unit::Hour) {
        Err(PropagationError::InvalidState {
            source: StateError::PhysicallyInvalidState { epoch, .. },
        }) => assert_eq!(epoch, leo.epoch),
        other => panic!("expected a physically invalid state, got {other:?}"),
    }
}
