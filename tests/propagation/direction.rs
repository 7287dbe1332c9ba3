extern crate nyx_ephem as nyx;
extern crate pretty_env_logger;

use super::{leo, two_body};
use nyx::cosmic::Spacecraft;
use nyx::ephemeris::{EphemerisError, EphemerisStepInterpolator, StepHandler};
use nyx::time::{Epoch, Unit};
use rstest::*;

#[rstest]
fn forward_then_backward(leo: Spacecraft) {
    let _ = pretty_env_logger::try_init();

    let setup = two_body(1e-12);
    let (end_state, fwd_ephem) = setup
        .with(leo.clone())
        .for_duration_with_ephem(1 * Unit::Day)
        .unwrap();

    let mut prop = setup.with(end_state.clone());
    let (back_state, bwd_ephem) = prop.until_epoch_with_ephem(leo.epoch).unwrap();

    assert_eq!(back_state.epoch, leo.epoch);
    let (err_r, err_v) = back_state.rss(&leo);
    println!("round trip error: {err_r:.3e} km\t{err_v:.3e} km/s");
    assert!(err_r < 1e-4, "round trip error larger than 0.1 m");

    // The backward ephemeris starts at the end and is queryable over the same interval
    assert!(bwd_ephem.is_backward());
    assert_eq!(bwd_ephem.start_epoch(), end_state.epoch);
    assert_eq!(bwd_ephem.end_epoch(), leo.epoch);
    assert_eq!(bwd_ephem.min_epoch(), fwd_ephem.min_epoch());
    assert_eq!(bwd_ephem.max_epoch(), fwd_ephem.max_epoch());
    assert_eq!(bwd_ephem.duration(), fwd_ephem.duration());
    for step in bwd_ephem.steps() {
        assert!(step.end < step.start);
    }

    for state in fwd_ephem.every(47 * Unit::Minute) {
        let (err_r, _) = bwd_ephem.at(state.epoch).unwrap().rss(&state);
        assert!(err_r < 1e-4, "forward and backward differ @ {}", state.epoch);
    }

    assert!(matches!(
        bwd_ephem.at(leo.epoch - 1 * Unit::Second),
        Err(EphemerisError::OutOfRange { .. })
    ));
}

#[rstest]
fn symmetry_against_reference(leo: Spacecraft) {
    let query = leo.epoch + 41_589 * Unit::Second;
    let reference = two_body(1e-14).with(leo.clone()).until_epoch(query).unwrap();

    // Both directions within 0.1 m of the reference, and of a direct propagation to the query epoch
    let setup = two_body(1e-11);
    let (end_state, fwd_ephem) = setup
        .with(leo.clone())
        .for_duration_with_ephem(1 * Unit::Day)
        .unwrap();
    let (_, bwd_ephem) = setup
        .with(end_state.clone())
        .until_epoch_with_ephem(leo.epoch)
        .unwrap();
    let fwd = fwd_ephem.at(query).unwrap();
    let bwd = bwd_ephem.at(query).unwrap();
    let direct_fwd = setup.with(leo.clone()).until_epoch(query).unwrap();
    let direct_bwd = setup.with(end_state).until_epoch(query).unwrap();
    for (name, state, direct) in [("forward", &fwd, &direct_fwd), ("backward", &bwd, &direct_bwd)] {
        let (err_r, _) = state.rss(&reference);
        println!("{name} @ {query}: {err_r:.3e} km from the reference");
        assert!(err_r < 1e-4, "{name} ephemeris off by {err_r:.3e} km");
        let (err_r, _) = state.rss(direct);
        assert!(err_r < 1e-4, "{name} ephemeris differs from direct by {err_r:.3e} km");
    }

    // A looser tolerance drifts from the reference in proportion, both ways
    let setup = two_body(1e-8);
    let (end_state, fwd_ephem) = setup
        .with(leo.clone())
        .for_duration_with_ephem(1 * Unit::Day)
        .unwrap();
    let (_, bwd_ephem) = setup
        .with(end_state)
        .until_epoch_with_ephem(leo.epoch)
        .unwrap();
    for ephem in [&fwd_ephem, &bwd_ephem] {
        let (err_r, _) = ephem.at(query).unwrap().rss(&reference);
        assert!(err_r < 0.1, "{err_r:.3e} km from the reference");
    }
}

#[rstest]
fn master_mode_replay(leo: Spacecraft) {
    let setup = two_body(1e-10);
    let (_, ephem) = setup
        .with(leo.clone())
        .for_duration_with_ephem(12 * Unit::Hour)
        .unwrap();

    let mut replayed: Vec<(Epoch, Epoch, bool)> = Vec::new();
    let handler = |interp: &EphemerisStepInterpolator<'_>,
                   is_last: bool|
     -> Result<(), EphemerisError> {
        // The replayed state matches the ephemeris
        let state = interp.current_state()?;
        let (err_r, _) = state.rss(&ephem.at(interp.current_epoch())?);
        assert!(err_r < 1e-9);
        replayed.push((interp.previous_epoch(), interp.current_epoch(), is_last));
        Ok(())
    };

    let mut master = ephem.set_master_mode(handler);
    assert_eq!(master.current_epoch(), leo.epoch);

    let mid = leo.epoch + 5 * Unit::Hour + 3 * Unit::Second;
    let state = master.propagate(mid).unwrap();
    assert_eq!(state.epoch, mid);
    assert_eq!(master.current_epoch(), mid);

    // Replay backward, down to the first hour
    let state = master.propagate(leo.epoch + 1 * Unit::Hour).unwrap();
    assert_eq!(state, ephem.at(leo.epoch + 1 * Unit::Hour).unwrap());

    // Out of range targets are rejected without moving
    assert!(master.propagate(leo.epoch + 13 * Unit::Hour).is_err());
    assert_eq!(master.current_epoch(), leo.epoch + 1 * Unit::Hour);
    drop(master);

    let forward: Vec<_> = replayed.iter().take_while(|(p, c, _)| c > p).collect();
    let backward: Vec<_> = replayed.iter().skip(forward.len()).collect();
    assert!(!forward.is_empty() && !backward.is_empty());

    // Contiguous replay clipped to the requested bounds, and the last step is flagged
    assert_eq!(forward[0].0, leo.epoch);
    assert_eq!(forward.last().unwrap().1, mid);
    assert!(forward.last().unwrap().2);
    assert!(forward.iter().rev().skip(1).all(|(_, _, last)| !last));
    for pair in forward.windows(2) {
        assert_eq!(pair[0].1, pair[1].0);
    }

    assert_eq!(backward[0].0, mid);
    assert_eq!(backward.last().unwrap().1, leo.epoch + 1 * Unit::Hour);
    assert!(backward.last().unwrap().2);
    for (prev, current, _) in &backward {
        assert!(current < prev);
    }
}

/// Accumulates the distance flown between the replayed steps
#[derive(Default)]
struct Odometer {
    replays: usize,
    distance_km: f64,
}

impl StepHandler for Odometer {
    fn init(&mut self, _initial: &Spacecraft, _target: Epoch) -> Result<(), EphemerisError> {
        self.replays += 1;
        Ok(())
    }

    fn handle_step(
        &mut self,
        interp: &EphemerisStepInterpolator<'_>,
        _is_last: bool,
    ) -> Result<(), EphemerisError> {
        let previous = interp.previous_state()?;
        let current = interp.current_state()?;
        self.distance_km += (current.radius_km - previous.radius_km).norm();
        Ok(())
    }
}

#[rstest]
fn stateful_step_handler(leo: Spacecraft) {
    let (_, ephem) = two_body(1e-10)
        .with(leo.clone())
        .for_duration_with_ephem(6 * Unit::Hour)
        .unwrap();

    let mut master = ephem.set_master_mode(Odometer::default());
    master.propagate(leo.epoch + 3 * Unit::Hour).unwrap();
    assert_eq!(master.handler().replays, 1);
    let outbound = master.handler().distance_km;
    // The chords are shorter than the path, but not by much
    let speed = leo.vmag_km_s();
    assert!(outbound > 0.0 && outbound < 3.0 * 3600.0 * speed * 2.0);

    master.handler_mut().distance_km = 0.0;
    master.propagate(leo.epoch).unwrap();
    let odometer = master.into_handler();
    assert_eq!(odometer.replays, 2);
    // Flying back over the same steps covers the same chords
    assert!((odometer.distance_km - outbound).abs() < 1e-6 * outbound);
}
