use float_cmp::approx_eq;
use queuesim::experiment::Sweep;
use queuesim::{Error, ExponentialIntervals, Report, Simulation, SimulationParameters};

fn run(params: SimulationParameters, seed: u64) -> Report {
    Simulation::new(params, ExponentialIntervals::seeded(seed))
        .unwrap()
        .execute()
        .unwrap()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    values.iter().sum::<f64>() / values.len() as f64
}

#[test]
fn test_mm1_converges_to_theory() {
    // μ = 500/s, λ = 125/s
    let params = SimulationParameters::new(1000.0, 0.25, 2000.0, 1_000_000.0);
    let reports: Vec<_> = (0..4).map(|seed| run(params, seed)).collect();
    for report in &reports {
        assert_eq!(report.losses, 0);
        assert_eq!(report.arrivals, report.departures + report.occupancy);
    }
    let en = mean(reports.iter().map(|r| r.mean_occupancy));
    let p_idle = mean(reports.iter().map(|r| r.idle_probability));
    assert!(approx_eq!(f64, en, 1.0 / 3.0, epsilon = 0.1 / 3.0), "En = {}", en);
    assert!(approx_eq!(f64, p_idle, 0.75, epsilon = 0.075), "p_idle = {}", p_idle);
}

#[test]
fn test_mm1_scaled_rates_converge() {
    for &rho in &[0.25, 0.5, 0.75] {
        let params = SimulationParameters::new(4000.0, rho, 100.0, 1000.0);
        let reports: Vec<_> = (0..4).map(|seed| run(params, 100 + seed)).collect();
        let en = mean(reports.iter().map(|r| r.mean_occupancy));
        let p_idle = mean(reports.iter().map(|r| r.idle_probability));
        let expected = rho / (1.0 - rho);
        assert!(
            approx_eq!(f64, en, expected, epsilon = 0.15 * expected),
            "rho = {}: En = {}, expected {}",
            rho,
            en,
            expected
        );
        assert!(
            approx_eq!(f64, p_idle, 1.0 - rho, epsilon = 0.05),
            "rho = {}: p_idle = {}",
            rho,
            p_idle
        );
    }
}

#[test]
fn test_unstable_queue_grows() {
    // ρ = 1.2 with μ = 10/s: the backlog grows by about 2 packets per second.
    let en_at = |horizon: f64| {
        let params = SimulationParameters::new(horizon, 1.2, 100.0, 1000.0);
        mean((0..5).map(|seed| run(params, seed).mean_occupancy))
    };
    let short = en_at(200.0);
    let medium = en_at(800.0);
    let long = en_at(2000.0);
    assert!(short < medium, "{} >= {}", short, medium);
    assert!(medium < long, "{} >= {}", medium, long);
    assert!(long > 1000.0, "En = {}", long);
    let params = SimulationParameters::new(2000.0, 1.2, 100.0, 1000.0);
    let report = run(params, 3);
    assert!(report.occupancy > 2000);
    assert!(report.idle_probability < 0.05);
}

#[test]
fn test_stable_queue_does_not_grow() {
    let en_at = |horizon: f64| {
        let params = SimulationParameters::new(horizon, 0.5, 100.0, 1000.0);
        mean((0..5).map(|seed| run(params, seed).mean_occupancy))
    };
    let short = en_at(1000.0);
    let long = en_at(4000.0);
    assert!(approx_eq!(f64, short, long, epsilon = 0.15), "{} vs {}", short, long);
}

#[test]
fn test_loss_probability_is_monotone() {
    let sweep = Sweep {
        horizons: vec![1000.0],
        traffic_intensities: (0..=10).map(|i| 0.5 + f64::from(i) / 10.0).collect(),
        capacities: vec![10],
        runs: 3,
        seed: 5,
        packet_length: 20.0,
        transmission_rate: 1000.0,
        observer_rate: Some(50.0),
    };
    let records = sweep.execute(None).unwrap();
    let p_loss: Vec<f64> = records
        .chunks(3)
        .map(|chunk| mean(chunk.iter().map(|r| r.loss_probability.unwrap())))
        .collect();
    assert_eq!(p_loss.len(), 11);
    for pair in p_loss.windows(2) {
        assert!(pair[0] <= pair[1], "{:?}", p_loss);
    }
    // Theory for K = 10 at ρ = 1 is 1 / (K + 1).
    assert!(approx_eq!(f64, p_loss[5], 1.0 / 11.0, epsilon = 0.025), "{:?}", p_loss);
    for record in &records {
        assert!(record.occupancy <= 10);
        assert_eq!(
            record.arrivals,
            record.departures + record.losses + record.occupancy
        );
    }
}

#[test]
fn test_same_seed_same_counters() {
    let params = SimulationParameters::new(200.0, 0.9, 100.0, 1000.0).with_capacity(5);
    let first = run(params, 1234);
    let second = run(params, 1234);
    assert_eq!(first, second);
    assert_eq!(
        first.mean_occupancy.to_bits(),
        second.mean_occupancy.to_bits()
    );
    let other = run(params, 4321);
    assert_ne!(first, other);
}

#[test]
fn test_zero_horizon_is_degenerate() {
    let params = SimulationParameters::new(0.0, 0.25, 2000.0, 1_000_000.0);
    let mut simulation = Simulation::new(params, ExponentialIntervals::seeded(0)).unwrap();
    assert!(matches!(simulation.execute(), Err(Error::DegenerateRun)));
    assert_eq!(simulation.observations(), 0);
}
