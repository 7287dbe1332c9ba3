extern crate nyx_ephem as nyx;

use super::{leo, two_body, GMAT_EARTH_GM};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use nyx::cosmic::Spacecraft;
use nyx::dynamics::{
    OrbitalDynamics, SpacecraftDynamics, VariationalEquations, MASS_FLOW_PARAM, MU_PARAM,
};
use nyx::ephemeris::{EphemerisError, EphemerisStepInterpolator};
use nyx::io::ConfigError;
use nyx::linalg::{DMatrix, DVector};
use nyx::propagators::{PropOpts, Propagator};
use nyx::time::Unit;
use nyx::StateError;
use rstest::*;

fn to_vec(state: &Spacecraft) -> DVector<f64> {
    DVector::from_iterator(
        6,
        state
            .radius_km
            .iter()
            .chain(state.velocity_km_s.iter())
            .copied(),
    )
}

fn perturbed(state: &Spacecraft, component: usize, delta: f64) -> Spacecraft {
    let mut state = state.clone();
    if component < 3 {
        state.radius_km[component] += delta;
    } else {
        state.velocity_km_s[component - 3] += delta;
    }
    state
}

// Compares the STM and the sensitivity to mu with central finite differences. Fixed steps ensure that all
// of the perturbed propagations share the same step sequence.
#[rstest]
fn stm_and_sensitivity_vs_finite_differences(leo: Spacecraft) {
    let _ = pretty_env_logger::try_init();

    let step = 10 * Unit::Second;
    let duration = 1 * Unit::Hour;
    let setup = Propagator::dp45(
        OrbitalDynamics::new(GMAT_EARTH_GM),
        PropOpts::with_fixed_step(step),
    );

    let mut prop = setup.with(leo.clone());
    prop.with_jacobians(VariationalEquations::new("jacobians", 6, &[MU_PARAM]))
        .unwrap();
    let end_state = prop.for_duration(duration).unwrap();
    let stm = end_state.stm().unwrap();
    let sensitivity = end_state.sensitivity().unwrap();
    assert_eq!(stm.shape(), (6, 6));
    assert_eq!(sensitivity.shape(), (6, 1));

    let mut stm_fd = DMatrix::<f64>::zeros(6, 6);
    for j in 0..6 {
        let delta = if j < 3 { 1e-3 } else { 1e-6 };
        let plus = setup
            .with(perturbed(&leo, j, delta))
            .for_duration(duration)
            .unwrap();
        let minus = setup
            .with(perturbed(&leo, j, -delta))
            .for_duration(duration)
            .unwrap();
        stm_fd.set_column(j, &((to_vec(&plus) - to_vec(&minus)) / (2.0 * delta)));
    }

    let stm_err = (&stm_fd - stm).norm() / stm.norm();
    println!("STM = {stm}\nrelative error w.r.t. finite differences: {stm_err:.3e}");
    assert!(stm_err < 1e-6);

    let delta_mu = 1.0;
    let plus = Propagator::dp45(
        OrbitalDynamics::new(GMAT_EARTH_GM + delta_mu),
        PropOpts::with_fixed_step(step),
    )
    .with(leo.clone())
    .for_duration(duration)
    .unwrap();
    let minus = Propagator::dp45(
        OrbitalDynamics::new(GMAT_EARTH_GM - delta_mu),
        PropOpts::with_fixed_step(step),
    )
    .with(leo)
    .for_duration(duration)
    .unwrap();
    let sens_fd = (to_vec(&plus) - to_vec(&minus)) / (2.0 * delta_mu);
    let sens_err = (&sens_fd - sensitivity.column(0)).norm() / sens_fd.norm();
    println!("dx/dmu = {sensitivity}\nrelative error w.r.t. finite differences: {sens_err:.3e}");
    assert!(sens_err < 1e-6);
}

#[rstest]
fn jacobian_block_in_ephemeris(leo: Spacecraft) {
    let setup = two_body(1e-10);
    let mut prop = setup.with(leo.clone());
    prop.set_ephemeris_mode();
    prop.with_jacobians(VariationalEquations::new("jacobians", 6, &[]))
        .unwrap();
    let end_state = prop.for_duration(2 * Unit::Hour).unwrap();
    let ephem = prop.generated_ephemeris().unwrap();

    assert!(ephem.layout().has_jacobians());
    assert_eq!(ephem.layout().len(), 6 + 36);

    for state in ephem.every(7 * Unit::Minute) {
        assert_eq!(state.additional_state("jacobians").unwrap().len(), 36);
        assert_eq!(
            ephem
                .additional_state_at("jacobians", state.epoch)
                .unwrap()
                .len(),
            36
        );
        let jacobians = ephem.jacobians_at(state.epoch).unwrap();
        assert_eq!(jacobians.state_dim(), 6);
        assert_eq!(jacobians.param_count(), 0);
        assert_eq!(&jacobians.stm, state.stm().unwrap());
    }

    // The STM starts at the identity and is propagated
    assert_eq!(
        ephem.jacobians_at(leo.epoch).unwrap().stm,
        DMatrix::<f64>::identity(6, 6)
    );
    assert_eq!(end_state.stm().unwrap(), &ephem.last().unwrap().jacobians.unwrap().stm);
    assert!(end_state.stm().unwrap()[(0, 3)].abs() > 1.0);

    // Also available when replaying the ephemeris
    let mut count = 0;
    let mut master = ephem.set_master_mode(
        |interp: &EphemerisStepInterpolator<'_>, _is_last: bool| -> Result<(), EphemerisError> {
            assert_eq!(interp.additional_state("jacobians")?.len(), 36);
            count += 1;
            Ok(())
        },
    );
    master.propagate(leo.epoch + 1 * Unit::Hour).unwrap();
    drop(master);
    assert!(count > 0);
}

#[rstest]
fn jacobians_with_mass(leo: Spacecraft) {
    let setup = Propagator::dp45(
        SpacecraftDynamics::with_mass_flow(OrbitalDynamics::new(GMAT_EARTH_GM), 1e-3),
        PropOpts::with_tolerance(1e-10),
    );
    let mut prop = setup.with(leo.with_mass(100.0));
    prop.with_jacobians(VariationalEquations::new("jacobians", 7, &[MASS_FLOW_PARAM]))
        .unwrap();
    let end_state = prop.for_duration(1 * Unit::Hour).unwrap();

    assert_abs_diff_eq!(end_state.mass_kg.unwrap(), 96.4, epsilon = 1e-9);
    let stm = end_state.stm().unwrap();
    assert_eq!(stm.shape(), (7, 7));
    assert!((stm[(6, 6)] - 1.0).abs() < f64::EPSILON);
    let sensitivity = end_state.sensitivity().unwrap();
    assert_eq!(sensitivity.shape(), (7, 1));
    assert_relative_eq!(sensitivity[(6, 0)], -3600.0, max_relative = 1e-9);
    // The orbit does not depend on the mass flow
    assert!(sensitivity.rows(0, 6).norm() < f64::EPSILON);
}

#[rstest]
fn jacobians_not_initialized(leo: Spacecraft) {
    let setup = two_body(1e-9);
    let (end_state, ephem) = setup
        .with(leo.clone())
        .for_duration_with_ephem(1 * Unit::Hour)
        .unwrap();

    assert_eq!(end_state.stm(), Err(StateError::StateJacobianNotInitialized));
    assert_eq!(
        ephem.jacobians_at(leo.epoch + 30 * Unit::Minute),
        Err(EphemerisError::EphemState {
            source: StateError::StateJacobianNotInitialized
        })
    );
    assert!(ephem
        .additional_state_at("jacobians", leo.epoch + 30 * Unit::Minute)
        .is_err());
}

#[rstest]
fn jacobian_configuration_errors(leo: Spacecraft) {
    let setup = two_body(1e-9);

    // Too late once the first step was taken
    let mut prop = setup.with(leo.clone());
    prop.for_duration(10 * Unit::Minute).unwrap();
    assert!(matches!(
        prop.with_jacobians(VariationalEquations::new("jacobians", 6, &[])),
        Err(ConfigError::JacobianAfterStart)
    ));
    assert!(prop.state.stm().is_err());

    // A seven dimensional STM requires the mass
    let mut prop = setup.with(leo.clone());
    assert!(matches!(
        prop.with_jacobians(VariationalEquations::new("jacobians", 7, &[])),
        Err(ConfigError::JacobianDimension { .. })
    ));

    // Mismatched seeds
    assert!(matches!(
        prop.with_jacobians(
            VariationalEquations::new("jacobians", 6, &[])
                .with_stm_seed(DMatrix::identity(7, 7))
        ),
        Err(ConfigError::JacobianDimension { .. })
    ));
    assert!(matches!(
        prop.with_jacobians(
            VariationalEquations::new("jacobians", 6, &[MU_PARAM])
                .with_sensitivity_seed(DMatrix::zeros(6, 2))
        ),
        Err(ConfigError::JacobianDimension { .. })
    ));

    // Parameters the dynamics cannot differentiate
    assert!(matches!(
        prop.with_jacobians(VariationalEquations::new("jacobians", 6, &["drag"])),
        Err(ConfigError::UnsupportedParameter { .. })
    ));

    // None of the failures changed the instance, which still propagates without Jacobians
    assert!(prop.state.jacobians.is_none());
    let end_state = prop.for_duration(10 * Unit::Minute).unwrap();
    assert!(end_state.stm().is_err());

    // A seeded STM is propagated from its seed
    let seed = DMatrix::<f64>::identity(6, 6) * 2.0;
    let mut prop = setup.with(leo);
    prop.with_jacobians(VariationalEquations::new("jacobians", 6, &[]).with_stm_seed(seed.clone()))
        .unwrap();
    assert_eq!(prop.state.stm().unwrap(), &seed);
    let unit_stm = {
        let mut prop = setup.with(prop.state.clone());
        prop.state.jacobians = None;
        prop.with_jacobians(VariationalEquations::new("jacobians", 6, &[]))
            .unwrap();
        prop.for_duration(10 * Unit::Minute).unwrap().stm().unwrap().clone()
    };
    let seeded_stm = prop.for_duration(10 * Unit::Minute).unwrap().stm().unwrap().clone();
    assert_abs_diff_eq!(seeded_stm, unit_stm * 2.0, epsilon = 1e-9);
}
