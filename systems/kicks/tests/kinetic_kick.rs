use std::f64::consts::PI;

use ibs_kick_beam::{
    query, Coordinate, ExecutionContext, LatticeOptics, OpticsPoint, OpticsSnapshot,
    ParticleCoordinates, ParticleEnsemble, ReferenceParticle,
};
use ibs_kick_core::{
    DiffusionCoefficients, FrictionCoefficients, GrowthRates, IbsError, KickEvent,
};
use ibs_kick_system_growth_rates::{
    GrowthRateModel, KineticCoefficients, KineticEngine, KineticModel,
};
use ibs_kick_system_kicks::{
    configure_intrabeam_scattering, IbsConfiguration, IbsKickElement, KineticKick, SimpleKick,
};

const GAMMA: f64 = 28.0;
const BETX: f64 = 60.0;
const BETY: f64 = 40.0;

fn optics() -> LatticeOptics {
    let points = [0.0, 1_000.0, 2_000.0]
        .into_iter()
        .map(|s| OpticsPoint::new(s, BETX, BETY))
        .collect();
    LatticeOptics::new(points, 2_000.0).expect("optics")
}

fn bunch(len: usize, seed: u64) -> ParticleEnsemble {
    let reference = ReferenceParticle::proton(GAMMA).expect("reference");
    let emittance = 2.5e-6 / (reference.beta0() * GAMMA);
    let mut context = ExecutionContext::cpu(seed);
    let mut column = |sigma: f64| -> Vec<f64> {
        context
            .standard_normal(len)
            .into_iter()
            .map(|value| sigma * value)
            .collect()
    };
    let coordinates = ParticleCoordinates {
        x: column((emittance * BETX).sqrt()),
        px: column((emittance / BETX).sqrt()),
        y: column((emittance * BETY).sqrt()),
        py: column((emittance / BETY).sqrt()),
        zeta: column(0.2),
        delta: column(1.0e-3),
    };
    ParticleEnsemble::new(reference, coordinates, 2.0e11 / len as f64, context)
        .expect("ensemble")
}

/// Kinetic model returning fixed coefficients.
#[derive(Clone, Debug)]
struct FixedKinetic(KineticCoefficients);

impl KineticModel for FixedKinetic {
    fn compute(&self, _snapshot: &OpticsSnapshot<'_>) -> Result<KineticCoefficients, IbsError> {
        Ok(self.0)
    }
}

/// Growth-rate model returning fixed rates.
#[derive(Clone, Debug)]
struct FixedRates(GrowthRates);

impl GrowthRateModel for FixedRates {
    fn compute(&self, _snapshot: &OpticsSnapshot<'_>) -> Result<GrowthRates, IbsError> {
        Ok(self.0)
    }
}

#[test]
fn kinetic_kick_caches_engine_coefficients() {
    let optics = optics();
    let mut particles = bunch(1_000, 11);
    let expected = {
        let snapshot = OpticsSnapshot::from_ensemble(&optics, &particles).expect("snapshot");
        KineticEngine::new().compute(&snapshot).expect("coefficients")
    };

    let mut kick = KineticKick::new(40).expect("kick");
    configure_intrabeam_scattering(&mut kick, optics, &IbsConfiguration::new(10))
        .expect("configure");
    let mut events = Vec::new();
    kick.track(&mut particles, &mut events).expect("track");

    assert_eq!(kick.coefficients(), Some(expected));
    assert_eq!(
        events,
        vec![
            KickEvent::CoefficientsRecomputed { turn: 0 },
            KickEvent::KicksApplied {
                turn: 0,
                particles: 1_000
            }
        ]
    );
}

#[test]
fn kinetic_kick_needs_no_clamping() {
    let mut kick = KineticKick::new(40).expect("kick");
    configure_intrabeam_scattering(&mut kick, optics(), &IbsConfiguration::new(2))
        .expect("configure");
    let mut particles = bunch(1_000, 12);
    let vertical_before = particles.coordinate(Coordinate::Py).to_vec();

    let mut events = Vec::new();
    for _ in 0..4 {
        kick.track(&mut particles, &mut events).expect("track");
        particles.advance_turn();
    }

    assert!(!events
        .iter()
        .any(|event| matches!(event, KickEvent::GrowthRateClamped { .. })));
    let recomputations = events
        .iter()
        .filter(|event| matches!(event, KickEvent::CoefficientsRecomputed { .. }))
        .count();
    assert_eq!(recomputations, 2);

    let coefficients = kick.coefficients().expect("coefficients");
    let diffusion = coefficients.diffusion();
    assert!(diffusion.dx() >= 0.0 && diffusion.dy() >= 0.0 && diffusion.dz() >= 0.0);
    // The damped vertical plane still receives friction and diffusion kicks.
    assert_ne!(particles.coordinate(Coordinate::Py), vertical_before.as_slice());
}

#[test]
fn pure_friction_pulls_momenta_towards_zero() {
    let friction = 1.0e3;
    let model = FixedKinetic(KineticCoefficients::new(
        DiffusionCoefficients::new(0.0, 0.0, 0.0),
        FrictionCoefficients::new(friction, friction, friction),
    ));
    let mut kick = KineticKick::with_model(model, 20).expect("kick");
    configure_intrabeam_scattering(&mut kick, optics(), &IbsConfiguration::new(1))
        .expect("configure");

    let mut particles = bunch(500, 13);
    let before = particles.coordinate(Coordinate::Px).to_vec();
    let mut events = Vec::new();
    kick.track(&mut particles, &mut events).expect("track");

    for (old, new) in before.iter().zip(particles.coordinate(Coordinate::Px)) {
        assert!(new.abs() <= old.abs());
        assert!(old * new >= 0.0, "friction must not flip the sign of {old}");
    }
    let spread_before = (before.iter().map(|p| p * p).sum::<f64>() / 500.0).sqrt();
    let spread_after = query::active_std(&particles, Coordinate::Px).expect("spread");
    assert!(spread_after < spread_before);
}

#[test]
fn simple_kick_coefficients_follow_the_rates() {
    let rates = GrowthRates::new(2.0e-3, -1.0e-3, 4.0e-3);
    let optics = optics();
    let mut kick = SimpleKick::with_model(FixedRates(rates), 20).expect("kick");
    configure_intrabeam_scattering(&mut kick, optics.clone(), &IbsConfiguration::new(1))
        .expect("configure");

    let mut particles = bunch(2_000, 14);
    let bunch_length = query::bunch_length(&particles).expect("bunch length");
    let px2 = query::active_std(&particles, Coordinate::Px).expect("px").powi(2);
    let delta2 = query::sigma_delta(&particles).expect("delta").powi(2);
    let revolution_period = optics.revolution_period(particles.reference());

    let mut events = Vec::new();
    kick.track(&mut particles, &mut events).expect("track");

    let coefficients = kick.coefficients().expect("coefficients");
    assert_eq!(coefficients.growth_rates(), rates);
    let factor = 2.0 * PI.sqrt() * bunch_length * revolution_period;
    let kick_coefficients = coefficients.kick();
    assert!((kick_coefficients.kx() - factor * 2.0e-3 * px2).abs() <= 1e-12 * kick_coefficients.kx());
    assert_eq!(kick_coefficients.ky(), 0.0);
    assert!(
        (kick_coefficients.kz() - factor * 4.0e-3 * delta2).abs() <= 1e-12 * kick_coefficients.kz()
    );
}

#[test]
fn non_finite_coefficients_are_reported() {
    let model = FixedKinetic(KineticCoefficients::new(
        DiffusionCoefficients::new(f64::INFINITY, 0.0, 0.0),
        FrictionCoefficients::new(0.0, 0.0, 0.0),
    ));
    let mut kick = KineticKick::with_model(model, 20).expect("kick");
    configure_intrabeam_scattering(&mut kick, optics(), &IbsConfiguration::new(1))
        .expect("configure");
    let mut particles = bunch(100, 15);
    let before = particles.coordinate(Coordinate::Px).to_vec();
    let mut events = Vec::new();

    let result = kick.track(&mut particles, &mut events);
    assert!(matches!(result, Err(IbsError::NumericFailure { .. })));
    assert_eq!(particles.coordinate(Coordinate::Px), before.as_slice());
    assert!(!events
        .iter()
        .any(|event| matches!(event, KickEvent::KicksApplied { .. })));
}
