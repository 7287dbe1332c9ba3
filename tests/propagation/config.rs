extern crate nyx_ephem as nyx;

use super::{leo, GMAT_EARTH_GM};
use nyx::cosmic::Spacecraft;
use nyx::dynamics::OrbitalDynamics;
use nyx::io::{ConfigError, ConfigRepr, PropagatorConfig};
use nyx::propagators::{AbortReason, PropagationError};
use nyx::time::Unit;
use rstest::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[fixture]
fn configs() -> BTreeMap<String, PropagatorConfig> {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "data", "propagators.yaml"]
        .iter()
        .collect();
    PropagatorConfig::load_named(path).unwrap()
}

#[rstest]
fn load_named(configs: BTreeMap<String, PropagatorConfig>) {
    assert_eq!(configs.len(), 4);
    assert_eq!(configs["default"], PropagatorConfig::default());

    let precise = &configs["precise"];
    assert_eq!(precise.max_step, 20 * Unit::Minute);
    assert_eq!(precise.abs_tol.len(), 6);
    assert!(precise.ephemeris_mode);
    assert_eq!(precise.jacobians.as_ref().unwrap().name, "jacobians");

    for (name, cfg) in &configs {
        assert!(cfg.to_opts().is_ok(), "{name} is invalid");
    }

    assert!(matches!(
        PropagatorConfig::load("no/such/file.yaml"),
        Err(ConfigError::ReadError { .. })
    ));
}

#[rstest]
fn configured_instance(configs: BTreeMap<String, PropagatorConfig>, leo: Spacecraft) {
    let _ = pretty_env_logger::try_init();

    let cfg = &configs["precise"];
    let setup = cfg.propagator(OrbitalDynamics::new(GMAT_EARTH_GM)).unwrap();
    let mut prop = setup.with(leo.clone());
    cfg.configure(&mut prop).unwrap();
    assert!(prop.is_ephemeris_mode());

    let end_state = prop.for_duration(3 * Unit::Hour).unwrap();
    assert_eq!(end_state.stm().unwrap().shape(), (6, 6));
    assert_eq!(end_state.sensitivity().unwrap().shape(), (6, 1));

    let ephem = prop.generated_ephemeris().unwrap();
    for step in ephem.steps() {
        assert!(step.duration() <= 20 * Unit::Minute);
    }

    // Configuring again is too late for the Jacobians
    assert!(matches!(
        cfg.configure(&mut prop),
        Err(ConfigError::JacobianAfterStart)
    ));
}

#[rstest]
fn configured_budget(configs: BTreeMap<String, PropagatorConfig>, leo: Spacecraft) {
    let cfg = &configs["budget"];
    let setup = cfg.propagator(OrbitalDynamics::new(GMAT_EARTH_GM)).unwrap();
    let mut prop = setup.with(leo);
    cfg.configure(&mut prop).unwrap();
    assert!(!prop.is_ephemeris_mode());

    assert!(matches!(
        prop.for_duration(1 * Unit::Day),
        Err(PropagationError::PropagationAborted {
            reason: AbortReason::MaxEvaluations,
            ..
        })
    ));
}

#[rstest]
fn configured_fixed_step(configs: BTreeMap<String, PropagatorConfig>, leo: Spacecraft) {
    let cfg = &configs["fixed"];
    let setup = cfg.propagator(OrbitalDynamics::new(GMAT_EARTH_GM)).unwrap();
    let mut prop = setup.with(leo);
    cfg.configure(&mut prop).unwrap();

    prop.for_duration(10 * Unit::Minute).unwrap();
    let ephem = prop.generated_ephemeris().unwrap();
    assert_eq!(ephem.len(), 60);
}

#[test]
fn invalid_configurations() {
    for yaml in [
        "min_step: 0 s",
        "min_step: 1 h\nmax_step: 1 min",
        "init_step: 2 h",
        "abs_tol: []",
        "rel_tol: [1e-9, -1e-9]",
        "fixed_step: true\ninit_step: 0 s",
    ] {
        let cfg = PropagatorConfig::loads(yaml).unwrap();
        assert!(
            matches!(cfg.to_opts(), Err(ConfigError::InvalidConfig { .. })),
            "{yaml} should be invalid"
        );
        assert!(cfg.propagator(OrbitalDynamics::two_body()).is_err());
    }

    assert!(matches!(
        PropagatorConfig::loads("attempts: many"),
        Err(ConfigError::ParseError { .. })
    ));
}
