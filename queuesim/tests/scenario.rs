use std::fs::File;
use std::io::{BufWriter, Write};

use queuesim::experiment::{Experiment, Preset};

const SCENARIO: &str = r#"{
    "sweep": {
        "horizons": [100.0],
        "traffic_intensities": [0.5, 1.5],
        "capacities": [4],
        "runs": 2,
        "seed": 7,
        "packet_length": 100.0,
        "transmission_rate": 1000.0
    }
}"#;

fn read_rows(path: &std::path::Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let rows = reader.records().collect::<Result<Vec<_>, _>>().unwrap();
    (headers, rows)
}

#[test]
fn test_scenario_file_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let scenario_path = dir.path().join("scenario.json");
    File::create(&scenario_path)
        .unwrap()
        .write_all(SCENARIO.as_bytes())
        .unwrap();

    let experiment: Experiment =
        serde_json::from_reader(File::open(&scenario_path).unwrap()).unwrap();
    let output = dir.path().join("out.csv");
    let graphs = dir.path().join("graphs");
    let written = experiment
        .execute(
            BufWriter::new(File::create(&output).unwrap()),
            None,
            Some(graphs.as_path()),
        )
        .unwrap();
    assert_eq!(written, 4);
    for name in &["en-T-100.svg", "p_idle-T-100.svg", "p_loss-T-100.svg"] {
        let svg = std::fs::read_to_string(graphs.join(name)).unwrap();
        assert!(svg.contains("K = 4"), "{}", name);
    }

    let (headers, rows) = read_rows(&output);
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "rho",
            "horizon",
            "capacity",
            "run",
            "seed",
            "occupancy",
            "idle_observations",
            "losses",
            "arrivals",
            "departures",
            "observations",
            "En",
            "p_idle",
            "p_loss"
        ]
    );
    assert_eq!(rows.len(), 4);
    let seeds: Vec<&str> = rows.iter().map(|row| &row[4]).collect();
    assert_eq!(seeds, vec!["7", "8", "7", "8"]);
    for row in &rows {
        assert_eq!(&row[2], "4");
        let occupancy: u64 = row[5].parse().unwrap();
        let losses: u64 = row[7].parse().unwrap();
        let arrivals: u64 = row[8].parse().unwrap();
        let departures: u64 = row[9].parse().unwrap();
        assert!(occupancy <= 4);
        assert_eq!(arrivals, departures + losses + occupancy);
        let p_loss: f64 = row[13].parse().unwrap();
        assert!((0.0..=1.0).contains(&p_loss));
    }
}

#[test]
fn test_generator_preset_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("exponential.csv");
    let written = Preset::Exponential
        .experiment()
        .execute(File::create(&output).unwrap(), None, Some(dir.path().join("graphs").as_path()))
        .unwrap();
    assert_eq!(written, 5);
    assert!(!dir.path().join("graphs").exists());
    let (headers, rows) = read_rows(&output);
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["run", "mean", "variance", "expected_mean", "expected_variance"]
    );
    for row in &rows {
        let mean: f64 = row[1].parse().unwrap();
        let expected: f64 = row[3].parse().unwrap();
        assert!((mean - expected).abs() < 0.2 * expected, "{} vs {}", mean, expected);
    }
}

#[test]
fn test_invalid_scenario_fails() {
    let experiment: Experiment = serde_json::from_str(
        r#"{"sweep": {"horizons": [10.0], "traffic_intensities": [-1.0],
            "packet_length": 100.0, "transmission_rate": 1000.0}}"#,
    )
    .unwrap();
    assert!(matches!(
        experiment.execute(Vec::new(), None, None),
        Err(queuesim::Error::InvalidParameter {
            name: "traffic_intensity",
            ..
        })
    ));
}
