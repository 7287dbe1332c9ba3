extern crate nyx_ephem as nyx;
extern crate pretty_env_logger;

use super::{leo, two_body, GMAT_EARTH_GM};
use nyx::cosmic::Spacecraft;
use nyx::dynamics::{OrbitalDynamics, SpacecraftDynamics};
use nyx::ephemeris::EphemerisError;
use nyx::events::{EventEvaluator, MassEvent, RadiusEvent};
use nyx::propagators::{PropOpts, PropagationError, Propagator};
use nyx::time::Unit;
use rstest::*;

#[rstest]
fn stop_at_radius(leo: Spacecraft) {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }

    let setup = two_body(1e-10);
    let event = RadiusEvent::new(10_000.0);
    let mut prop = setup.with(leo.clone());
    let (found, ephem) = prop.until_event(1 * Unit::Day, &event).unwrap();

    println!("{event} @ {found}");
    // Within the epoch precision of the event at the current radial velocity
    assert!((found.rmag_km() - 10_000.0).abs() < 1e-2);
    let elapsed_s = (found.epoch - leo.epoch).to_seconds();
    assert!(elapsed_s > 1_000.0 && elapsed_s < 1_200.0, "found after {elapsed_s} s");
    assert_eq!(prop.state, found);

    // The ephemeris is truncated at the event
    assert_eq!(ephem.end_epoch(), found.epoch);
    let (err_r, _) = ephem.last().unwrap().rss(&found);
    assert!(err_r < 1e-9);
    assert!(ephem.at(found.epoch + 1 * Unit::Second).is_err());

    // The same event is found in an ephemeris which was not stopped by it, in either search direction
    let (_, full) = setup
        .with(leo.clone())
        .for_duration_with_ephem(1 * Unit::Hour)
        .unwrap();
    for (start, end) in [
        (leo.epoch, leo.epoch + 1 * Unit::Hour),
        (leo.epoch + 1 * Unit::Hour, leo.epoch),
    ] {
        let again = full.find_bracketed(start, end, &event).unwrap();
        assert!((again.epoch - found.epoch).abs() < 10 * Unit::Millisecond);
    }

    // And the direct propagation to that epoch agrees with the ephemeris
    let direct = setup.with(leo).until_epoch(found.epoch).unwrap();
    let (err_r, _) = direct.rss(&found);
    assert!(err_r < 1e-4);
}

#[rstest]
fn event_not_found(leo: Spacecraft) {
    let setup = two_body(1e-9);
    let event = RadiusEvent::new(50_000.0);
    let mut prop = setup.with(leo.clone());

    match prop.until_event(1 * Unit::Hour, &event) {
        Err(PropagationError::TrajectoryEventError {
            source: EphemerisError::EventNotFound { start, end, .. },
        }) => {
            assert_eq!(start, leo.epoch);
            assert_eq!(end, leo.epoch + 1 * Unit::Hour);
        }
        other => panic!("expected the event not to be found, got {other:?}"),
    }

    // The full run is still available
    assert_eq!(prop.state.epoch, leo.epoch + 1 * Unit::Hour);
    let ephem = prop.generated_ephemeris().unwrap();
    assert_eq!(ephem.end_epoch(), leo.epoch + 1 * Unit::Hour);
    assert!(ephem
        .find_bracketed(leo.epoch, ephem.end_epoch(), &event)
        .is_err());
}

#[rstest]
fn stop_at_mass(leo: Spacecraft) {
    let setup = Propagator::dp45(
        SpacecraftDynamics::with_mass_flow(OrbitalDynamics::new(GMAT_EARTH_GM), 0.01),
        PropOpts::with_tolerance(1e-9),
    );
    let event = MassEvent::new(90.0);
    assert_eq!(event.epoch_precision(), 1 * Unit::Millisecond);

    let mut prop = setup.with(leo.clone().with_mass(100.0));
    let (found, ephem) = prop.until_event(1 * Unit::Day, &event).unwrap();

    println!("{event} @ {}", found.epoch);
    assert!((found.mass_kg.unwrap() - 90.0).abs() <= event.value_precision());
    assert!(((found.epoch - leo.epoch).to_seconds() - 1_000.0).abs() < 0.2);
    assert_eq!(ephem.end_epoch(), found.epoch);

    // The mass is interpolated like the rest of the state
    let half = ephem.at(leo.epoch + 500 * Unit::Second).unwrap();
    assert!((half.mass_kg.unwrap() - 95.0).abs() < 1e-9);

    // Without mass, the event cannot be evaluated
    let massless = two_body(1e-9);
    let mut prop = massless.with(leo);
    assert!(matches!(
        prop.until_event(1 * Unit::Hour, &event),
        Err(PropagationError::InvalidState { .. })
    ));
}

#[rstest]
fn stop_at_depletion(leo: Spacecraft) {
    let setup = Propagator::dp853(
        SpacecraftDynamics::with_mass_flow(OrbitalDynamics::new(GMAT_EARTH_GM), 0.01),
        PropOpts::with_tolerance(1e-9),
    );
    let event = MassEvent::new(0.0);

    // The step which crosses the depletion ends with a negative mass, but the event is found first
    let mut prop = setup.with(leo.clone().with_mass(10.0));
    let (found, ephem) = prop.until_event(1 * Unit::Day, &event).unwrap();
    let mass_kg = found.mass_kg.unwrap();
    assert!(mass_kg >= 0.0 && mass_kg <= event.value_precision(), "{mass_kg} kg left");
    assert!(((found.epoch - leo.epoch).to_seconds() - 1_000.0).abs() < 0.2);
    assert_eq!(prop.state, found);
    assert_eq!(ephem.end_epoch(), found.epoch);
    assert!(ephem.last().unwrap().mass_kg.unwrap() >= 0.0);

    // Without the event, the depletion is fatal
    let mut prop = setup.with(leo.with_mass(10.0));
    assert!(matches!(
        prop.for_duration(1 * Unit::Hour),
        Err(PropagationError::InvalidState { .. })
    ));
}
