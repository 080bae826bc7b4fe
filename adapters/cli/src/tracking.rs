//! Matched bunch generation, the linear one-turn map and the tracking loop.

use std::f64::consts::TAU;

use anyhow::{Context, Result};
use ibs_kick_beam::{
    query, Coordinate, ExecutionContext, LatticeOptics, OpticsPoint, ParticleCoordinates,
    ParticleEnsemble, ReferenceParticle,
};
use ibs_kick_core::{IbsError, KickEvent};
use ibs_kick_system_kicks::configure_intrabeam_scattering;
use serde::Serialize;

use crate::scenario::{BunchConfig, Scenario, TuneConfig};

/// Samples a Gaussian bunch matched to `point`, including its dispersion.
pub(crate) fn matched_bunch(
    bunch: &BunchConfig,
    reference: ReferenceParticle,
    point: &OpticsPoint,
    mut context: ExecutionContext,
) -> Result<ParticleEnsemble, IbsError> {
    let len = bunch.macroparticles;
    let beta_gamma = reference.beta0() * reference.gamma0();
    let gemitt_x = bunch.nemitt_x / beta_gamma;
    let gemitt_y = bunch.nemitt_y / beta_gamma;

    let mut draw = |sigma: f64| -> Vec<f64> {
        context
            .standard_normal(len)
            .into_iter()
            .map(|value| sigma * value)
            .collect()
    };
    let delta = draw(bunch.sigma_delta);
    let zeta = draw(bunch.bunch_length);
    let (x, px) = matched_plane(
        draw(1.0),
        draw(1.0),
        gemitt_x,
        point.betx,
        point.alfx,
        (point.dx, point.dpx),
        &delta,
    );
    let (y, py) = matched_plane(
        draw(1.0),
        draw(1.0),
        gemitt_y,
        point.bety,
        point.alfy,
        (point.dy, point.dpy),
        &delta,
    );

    let coordinates = ParticleCoordinates {
        x,
        px,
        y,
        py,
        zeta,
        delta,
    };
    ParticleEnsemble::new(
        reference,
        coordinates,
        bunch.intensity / len as f64,
        context,
    )
}

fn matched_plane(
    u: Vec<f64>,
    v: Vec<f64>,
    emittance: f64,
    beta: f64,
    alpha: f64,
    (dispersion, dispersion_prime): (f64, f64),
    delta: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let size = (emittance * beta).sqrt();
    let divergence = (emittance / beta).sqrt();
    u.iter()
        .zip(&v)
        .zip(delta)
        .map(|((u, v), delta)| {
            (
                size * u + dispersion * delta,
                divergence * (v - alpha * u) + dispersion_prime * delta,
            )
        })
        .unzip()
}

/// Twiss-parameterised 2x2 rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rotation {
    m11: f64,
    m12: f64,
    m21: f64,
    m22: f64,
}

impl Rotation {
    fn twiss(tune: f64, beta: f64, alpha: f64) -> Self {
        let (sin, cos) = (TAU * tune).sin_cos();
        let gamma = (1.0 + alpha * alpha) / beta;
        Self {
            m11: cos + alpha * sin,
            m12: beta * sin,
            m21: -gamma * sin,
            m22: cos - alpha * sin,
        }
    }

    fn apply(&self, q: f64, p: f64) -> (f64, f64) {
        (self.m11 * q + self.m12 * p, self.m21 * q + self.m22 * p)
    }
}

/// Linear betatron and synchrotron rotation over one turn, at the first optics point.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OneTurnMap {
    horizontal: Rotation,
    vertical: Rotation,
    longitudinal: Rotation,
    dispersion_x: (f64, f64),
    dispersion_y: (f64, f64),
}

impl OneTurnMap {
    pub(crate) fn new(point: &OpticsPoint, tunes: &TuneConfig, bunch: &BunchConfig) -> Self {
        Self {
            horizontal: Rotation::twiss(tunes.qx, point.betx, point.alfx),
            vertical: Rotation::twiss(tunes.qy, point.bety, point.alfy),
            longitudinal: Rotation::twiss(tunes.qs, bunch.bunch_length / bunch.sigma_delta, 0.0),
            dispersion_x: (point.dx, point.dpx),
            dispersion_y: (point.dy, point.dpy),
        }
    }

    /// Advances every active particle by one turn.
    pub(crate) fn apply(&self, particles: &mut ParticleEnsemble) {
        let active = particles.active_indices();
        let mut columns = Coordinate::ALL.map(|coordinate| particles.coordinate(coordinate).to_vec());
        let [x, px, y, py, zeta, delta] = &mut columns;
        for &index in &active {
            let d = delta[index];
            (x[index], px[index]) =
                rotate_betatron(&self.horizontal, self.dispersion_x, x[index], px[index], d);
            (y[index], py[index]) =
                rotate_betatron(&self.vertical, self.dispersion_y, y[index], py[index], d);
            (zeta[index], delta[index]) = self.longitudinal.apply(zeta[index], d);
        }
        for (coordinate, column) in Coordinate::ALL.into_iter().zip(&columns) {
            particles.coordinate_mut(coordinate).copy_from_slice(column);
        }
    }
}

fn rotate_betatron(
    rotation: &Rotation,
    (dispersion, dispersion_prime): (f64, f64),
    q: f64,
    p: f64,
    delta: f64,
) -> (f64, f64) {
    let (q, p) = rotation.apply(q - dispersion * delta, p - dispersion_prime * delta);
    (q + dispersion * delta, p + dispersion_prime * delta)
}

/// Beam sizes measured at one turn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub(crate) struct Report {
    pub(crate) turn: u64,
    pub(crate) nemitt_x: f64,
    pub(crate) nemitt_y: f64,
    pub(crate) sigma_delta: f64,
    pub(crate) bunch_length: f64,
}

impl Report {
    fn measure(particles: &ParticleEnsemble, optics: &LatticeOptics) -> Option<Self> {
        let reference = particles.reference();
        let beta_gamma = reference.beta0() * reference.gamma0();
        let sigma_delta = query::sigma_delta(particles)?;
        let emittance = |coordinate| {
            query::geometric_emittance(particles, optics, coordinate, sigma_delta)
                .map(|value| value * beta_gamma)
        };
        Some(Self {
            turn: particles.at_turn(),
            nemitt_x: emittance(Coordinate::X)?,
            nemitt_y: emittance(Coordinate::Y)?,
            sigma_delta,
            bunch_length: query::bunch_length(particles)?,
        })
    }
}

/// Outcome of a tracking run.
#[derive(Clone, Debug, Default)]
pub(crate) struct Summary {
    pub(crate) reports: Vec<Report>,
    pub(crate) recomputations: usize,
    pub(crate) clamped: usize,
}

/// Tracks the scenario bunch for `turns` turns, measuring every `report_every` turns.
pub(crate) fn run(scenario: &Scenario, context: ExecutionContext, turns: u64) -> Result<Summary> {
    let reference = scenario
        .reference
        .build()
        .context("invalid reference particle")?;
    let optics = scenario.optics.build().context("invalid optics")?;
    let point = *optics.first();
    let mut particles = matched_bunch(&scenario.bunch, reference, &point, context)
        .context("failed to generate the bunch")?;
    let map = OneTurnMap::new(&point, &scenario.tunes, &scenario.bunch);

    let mut element = scenario.kick.build().context("invalid kick element")?;
    configure_intrabeam_scattering(element.as_mut(), optics.clone(), &scenario.ibs)
        .context("failed to configure the kick element")?;
    log::info!(
        "tracking {} macro-particles for {turns} turns with {}",
        particles.len(),
        element.name()
    );

    let mut summary = Summary::default();
    summary.reports.extend(Report::measure(&particles, &optics));
    let mut events = Vec::new();
    for _ in 0..turns {
        map.apply(&mut particles);
        let turn = particles.at_turn();
        element
            .track(&mut particles, &mut events)
            .with_context(|| format!("intra-beam scattering kick failed at turn {turn}"))?;
        for event in events.drain(..) {
            match event {
                KickEvent::CoefficientsRecomputed { .. } => summary.recomputations += 1,
                KickEvent::GrowthRateClamped { .. } => summary.clamped += 1,
                KickEvent::KicksApplied { .. } => {}
            }
        }
        particles.advance_turn();
        if particles.at_turn() % scenario.report_every == 0 || particles.at_turn() == turns {
            summary.reports.extend(Report::measure(&particles, &optics));
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{matched_bunch, run, OneTurnMap, Report, Rotation};
    use crate::scenario::Scenario;
    use ibs_kick_beam::ExecutionContext;

    const SPS: &str = include_str!("../scenarios/sps_flat_bottom.json");

    fn scenario() -> Scenario {
        serde_json::from_str(SPS).expect("scenario")
    }

    fn relative(actual: f64, expected: f64) -> f64 {
        ((actual - expected) / expected).abs()
    }

    #[test]
    fn twiss_rotation_is_symplectic() {
        let rotation = Rotation::twiss(0.31, 42.0, -1.7);
        let determinant = rotation.m11 * rotation.m22 - rotation.m12 * rotation.m21;
        assert!((determinant - 1.0).abs() < 1e-12);

        let full = Rotation::twiss(1.0, 42.0, -1.7);
        let (q, p) = full.apply(1.0e-3, 2.0e-5);
        assert!((q - 1.0e-3).abs() < 1e-15);
        assert!((p - 2.0e-5).abs() < 1e-15);
    }

    #[test]
    fn generated_bunch_matches_the_requested_beam() {
        let scenario = scenario();
        let optics = scenario.optics.build().expect("optics");
        let reference = scenario.reference.build().expect("reference");
        let particles = matched_bunch(
            &scenario.bunch,
            reference,
            optics.first(),
            ExecutionContext::cpu(5),
        )
        .expect("bunch");
        let report = Report::measure(&particles, &optics).expect("report");

        assert!(relative(report.nemitt_x, scenario.bunch.nemitt_x) < 0.08);
        assert!(relative(report.nemitt_y, scenario.bunch.nemitt_y) < 0.08);
        assert!(relative(report.sigma_delta, scenario.bunch.sigma_delta) < 0.08);
        assert!(relative(report.bunch_length, scenario.bunch.bunch_length) < 0.08);
    }

    #[test]
    fn one_turn_map_preserves_matched_emittances() {
        let scenario = scenario();
        let optics = scenario.optics.build().expect("optics");
        let reference = scenario.reference.build().expect("reference");
        let point = *optics.first();
        let mut particles =
            matched_bunch(&scenario.bunch, reference, &point, ExecutionContext::cpu(6))
                .expect("bunch");
        let before = Report::measure(&particles, &optics).expect("before");
        let map = OneTurnMap::new(&point, &scenario.tunes, &scenario.bunch);
        for _ in 0..25 {
            map.apply(&mut particles);
        }
        let after = Report::measure(&particles, &optics).expect("after");

        assert!(relative(after.nemitt_x, before.nemitt_x) < 0.1);
        assert!(relative(after.nemitt_y, before.nemitt_y) < 0.1);
        assert!(relative(after.bunch_length, before.bunch_length) < 0.1);
    }

    #[test]
    fn short_run_reports_on_schedule() {
        let mut scenario = scenario();
        scenario.bunch.macroparticles = 500;
        scenario.report_every = 4;
        let summary = run(&scenario, ExecutionContext::cpu(7), 10).expect("run");

        let turns: Vec<u64> = summary.reports.iter().map(|report| report.turn).collect();
        assert_eq!(turns, vec![0, 4, 8, 10]);
        assert_eq!(summary.recomputations, 1);
        assert!(summary.reports.iter().all(|report| report.nemitt_x > 0.0));
    }
}
