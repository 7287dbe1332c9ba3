extern crate nyx_ephem as nyx;

use super::{leo, two_body};
use approx::assert_abs_diff_eq;
use nyx::cosmic::Spacecraft;
use nyx::dynamics::{AdditionalEquations, DynamicsError, VariationalEquations};
use nyx::ephemeris::EphemerisError;
use nyx::io::ConfigError;
use nyx::linalg::DVector;
use nyx::propagators::PropagationError;
use nyx::time::{Epoch, Unit};
use nyx::StateError;
use rstest::*;
use std::sync::Arc;

/// Elapsed time since the start of the propagation, and the integral of the radius magnitude
struct Clock;

impl AdditionalEquations for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn derivatives(
        &self,
        _epoch: Epoch,
        base_state: &DVector<f64>,
        _additional_state: &[f64],
    ) -> Result<DVector<f64>, DynamicsError> {
        Ok(DVector::from_vec(vec![
            1.0,
            base_state.fixed_rows::<3>(0).norm(),
        ]))
    }
}

/// Additional equations which return too many derivatives
struct Broken;

impl AdditionalEquations for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn dimension(&self) -> usize {
        1
    }

    fn derivatives(
        &self,
        _epoch: Epoch,
        _base_state: &DVector<f64>,
        _additional_state: &[f64],
    ) -> Result<DVector<f64>, DynamicsError> {
        Ok(DVector::zeros(3))
    }
}

#[rstest]
fn integrated_alongside(leo: Spacecraft) {
    let setup = two_body(1e-10);
    let mut prop = setup.with(leo.clone());
    prop.set_ephemeris_mode();
    prop.add_additional_equations(Arc::new(Clock), DVector::zeros(2))
        .unwrap();
    assert_eq!(prop.layout().unwrap().additional_names(), vec!["clock"]);

    let end_state = prop.for_duration(2 * Unit::Hour).unwrap();
    let clock = end_state.additional_state("clock").unwrap();
    assert_abs_diff_eq!(clock[0], 7200.0, epsilon = 1e-9);
    // The mean radius is between the periapsis and the apoapsis
    let mean_radius = clock[1] / 7200.0;
    assert!(mean_radius > 7_800.0 && mean_radius < 16_500.0);

    let ephem = prop.generated_ephemeris().unwrap();
    let mid = ephem
        .additional_state_at("clock", leo.epoch + 1 * Unit::Hour)
        .unwrap();
    assert_abs_diff_eq!(mid[0], 3600.0, epsilon = 1e-9);
    assert_eq!(
        ephem.at(leo.epoch + 1 * Unit::Hour).unwrap().additional["clock"],
        mid
    );
    assert!(matches!(
        ephem.additional_state_at("unknown", leo.epoch),
        Err(EphemerisError::EphemState {
            source: StateError::UnknownAdditionalState { .. }
        })
    ));

    // Backward, the clock runs backward
    let mut prop = setup.with(end_state);
    prop.add_additional_equations(Arc::new(Clock), DVector::zeros(2))
        .unwrap();
    let back = prop.until_epoch(leo.epoch).unwrap();
    assert_abs_diff_eq!(
        back.additional_state("clock").unwrap()[0],
        -7200.0,
        epsilon = 1e-9
    );
}

#[rstest]
fn carried_without_equations(leo: Spacecraft) {
    let tag = DVector::from_vec(vec![1.0, 2.0, 3.0]);
    let setup = two_body(1e-9);
    let mut prop = setup.with(leo.with_additional_state("tag", tag.clone()));
    let end_state = prop.for_duration(1 * Unit::Hour).unwrap();
    assert_eq!(end_state.additional_state("tag").unwrap(), &tag);
}

#[rstest]
fn registration_errors(leo: Spacecraft) {
    let setup = two_body(1e-9);
    let mut prop = setup.with(leo.clone());

    assert!(matches!(
        prop.add_additional_equations(Arc::new(Clock), DVector::zeros(3)),
        Err(ConfigError::InvalidConfig { .. })
    ));

    prop.add_additional_equations(Arc::new(Clock), DVector::zeros(2))
        .unwrap();
    assert!(matches!(
        prop.add_additional_equations(Arc::new(Clock), DVector::zeros(2)),
        Err(ConfigError::DuplicateAdditionalState { .. })
    ));

    // The Jacobian block may not reuse the name of an additional state
    assert!(matches!(
        prop.with_jacobians(VariationalEquations::new("clock", 6, &[])),
        Err(ConfigError::DuplicateAdditionalState { .. })
    ));
    prop.with_jacobians(VariationalEquations::new("jacobians", 6, &[]))
        .unwrap();
    assert_eq!(
        prop.layout().unwrap().additional_names(),
        vec!["jacobians", "clock"]
    );

    // Wrong number of derivatives is caught when integrating
    let mut prop = setup.with(leo);
    prop.add_additional_equations(Arc::new(Broken), DVector::zeros(1))
        .unwrap();
    assert!(matches!(
        prop.for_duration(1 * Unit::Minute),
        Err(PropagationError::Dynamics {
            source: DynamicsError::AdditionalDimension { .. }
        })
    ));
}
