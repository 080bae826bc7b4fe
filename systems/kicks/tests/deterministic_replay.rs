use ibs_kick_beam::{
    Coordinate, ExecutionContext, LatticeOptics, OpticsPoint, ParticleCoordinates,
    ParticleEnsemble, ReferenceParticle,
};
use ibs_kick_core::KickEvent;
use ibs_kick_system_kicks::{
    configure_intrabeam_scattering, IbsConfiguration, IbsKickElement, KineticKick, SimpleKick,
};

const TURNS: u64 = 6;

fn optics() -> LatticeOptics {
    let points = vec![
        OpticsPoint::new(0.0, 50.0, 20.0).with_horizontal_dispersion(1.5, 0.0),
        OpticsPoint::new(250.0, 20.0, 50.0).with_horizontal_dispersion(0.8, 0.0),
        OpticsPoint::new(500.0, 50.0, 20.0).with_horizontal_dispersion(1.5, 0.0),
    ];
    LatticeOptics::new(points, 500.0).expect("optics")
}

fn bunch(context: ExecutionContext) -> ParticleEnsemble {
    let len = 800;
    let reference = ReferenceParticle::proton(28.0).expect("reference");
    let mut sampler = ExecutionContext::cpu(2024);
    let mut column = |sigma: f64| -> Vec<f64> {
        sampler
            .standard_normal(len)
            .into_iter()
            .map(|value| sigma * value)
            .collect()
    };
    let coordinates = ParticleCoordinates {
        x: column(4.0e-4),
        px: column(8.0e-6),
        y: column(3.0e-4),
        py: column(1.0e-5),
        zeta: column(0.15),
        delta: column(8.0e-4),
    };
    ParticleEnsemble::new(reference, coordinates, 1.0e11 / len as f64, context).expect("ensemble")
}

fn run<E: IbsKickElement>(
    element: &mut E,
    particles: &mut ParticleEnsemble,
) -> Vec<KickEvent> {
    configure_intrabeam_scattering(element, optics(), &IbsConfiguration::new(2))
        .expect("configure");
    let mut events = Vec::new();
    for _ in 0..TURNS {
        element.track(particles, &mut events).expect("track");
        particles.advance_turn();
    }
    events
}

fn momenta(particles: &ParticleEnsemble) -> Vec<Vec<f64>> {
    [Coordinate::Px, Coordinate::Py, Coordinate::Delta]
        .into_iter()
        .map(|coordinate| particles.coordinate(coordinate).to_vec())
        .collect()
}

#[test]
fn seeded_simple_runs_replay_bit_identically() {
    let mut first = bunch(ExecutionContext::cpu(7));
    let mut second = bunch(ExecutionContext::cpu(7));
    let first_events = run(&mut SimpleKick::new("nagaitsev", 25).expect("kick"), &mut first);
    let second_events = run(&mut SimpleKick::new("nagaitsev", 25).expect("kick"), &mut second);

    assert_eq!(first_events, second_events);
    assert_eq!(momenta(&first), momenta(&second));
}

#[test]
fn seeded_kinetic_runs_replay_bit_identically() {
    let mut first = bunch(ExecutionContext::cpu(8));
    let mut second = bunch(ExecutionContext::cpu(8));
    let first_events = run(&mut KineticKick::new(25).expect("kick"), &mut first);
    let second_events = run(&mut KineticKick::new(25).expect("kick"), &mut second);

    assert_eq!(first_events, second_events);
    assert_eq!(momenta(&first), momenta(&second));
}

#[test]
fn different_seeds_draw_different_kicks() {
    let mut first = bunch(ExecutionContext::cpu(1));
    let mut second = bunch(ExecutionContext::cpu(2));
    let _ = run(&mut SimpleKick::new("b&m", 25).expect("kick"), &mut first);
    let _ = run(&mut SimpleKick::new("b&m", 25).expect("kick"), &mut second);

    assert_ne!(momenta(&first), momenta(&second));
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_backend_matches_sequential_backend() {
    let mut sequential = bunch(ExecutionContext::cpu(9));
    let mut parallel = bunch(ExecutionContext::parallel(9));
    let sequential_events = run(
        &mut SimpleKick::new("nagaitsev", 25).expect("kick"),
        &mut sequential,
    );
    let parallel_events = run(
        &mut SimpleKick::new("nagaitsev", 25).expect("kick"),
        &mut parallel,
    );

    assert_eq!(sequential_events, parallel_events);
    assert_eq!(momenta(&sequential), momenta(&parallel));
}
