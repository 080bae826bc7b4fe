use ibs_kick_beam::{
    BeamParameters, ExecutionContext, LatticeOptics, OpticsPoint, OpticsSnapshot,
    ParticleCoordinates, ParticleEnsemble, ReferenceParticle,
};
use ibs_kick_core::IbsError;

fn optics() -> LatticeOptics {
    LatticeOptics::new(
        vec![
            OpticsPoint::new(0.0, 25.0, 16.0),
            OpticsPoint::new(10.0, 30.0, 12.0),
        ],
        100.0,
    )
    .expect("optics")
}

fn ensemble(len: usize) -> ParticleEnsemble {
    let mut coordinates = ParticleCoordinates::zeros(len);
    for index in 0..len {
        let sign = if index % 2 == 0 { 1.0 } else { -1.0 };
        coordinates.x[index] = sign * 5.0e-4;
        coordinates.y[index] = sign * 4.0e-4;
        coordinates.zeta[index] = sign * 0.1;
        coordinates.delta[index] = sign * 1.0e-3;
    }
    ParticleEnsemble::new(
        ReferenceParticle::proton(28.0).expect("reference"),
        coordinates,
        2.0e8,
        ExecutionContext::cpu(3),
    )
    .expect("ensemble")
}

#[test]
fn beam_parameters_follow_active_population() {
    let mut particles = ensemble(10);
    assert!(particles.mark_lost(0));
    assert!(particles.mark_lost(1));

    let beam = BeamParameters::from_ensemble(&particles, &optics()).expect("beam");
    assert_eq!(beam.num_particles, 8.0 * 2.0e8);
    assert!((beam.gemitt_x - 5.0e-4 * 5.0e-4 / 25.0).abs() < 1e-18);
    assert!((beam.gemitt_y - 4.0e-4 * 4.0e-4 / 16.0).abs() < 1e-18);
    assert!((beam.sigma_delta - 1.0e-3).abs() < 1e-15);
    assert!((beam.bunch_length - 0.1).abs() < 1e-15);
    assert!(beam.validate().is_ok());
}

#[test]
fn beam_parameters_require_active_particles() {
    let mut particles = ensemble(2);
    assert!(particles.mark_lost(0));
    assert!(particles.mark_lost(1));

    assert!(matches!(
        OpticsSnapshot::from_ensemble(&optics(), &particles),
        Err(IbsError::NumericFailure { .. })
    ));
}

#[test]
fn cold_bunch_fails_validation() {
    let particles = ensemble(1);
    let beam = BeamParameters::from_ensemble(&particles, &optics()).expect("beam");
    assert_eq!(beam.bunch_length, 0.0);
    assert!(matches!(
        beam.validate(),
        Err(IbsError::NumericFailure { .. })
    ));
}
