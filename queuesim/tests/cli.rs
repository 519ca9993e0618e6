use std::path::Path;
use std::process::Command;

fn queuesim(args: &[&str]) {
    let status = Command::new(env!("CARGO_BIN_EXE_queuesim"))
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "queuesim {:?} failed", args);
}

fn path(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_log_file_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("run.log");
    let output = dir.path().join("exponential.csv");
    let args = [
        "-v",
        "--no-stderr",
        "--log-output",
        path(&log),
        "preset",
        "exponential",
        "--output",
        path(&output),
    ];
    queuesim(&args);
    queuesim(&args);
    let log = std::fs::read_to_string(&log).unwrap();
    assert_eq!(log.matches("Written 5 rows").count(), 1, "{}", log);
    assert!(log.contains("[INFO]"));
}

#[test]
fn test_sweep_with_plots() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("sweep.csv");
    let graphs = dir.path().join("graphs");
    queuesim(&[
        "--no-stderr",
        "sweep",
        "--horizon",
        "50",
        "--rho",
        "0.5,0.9",
        "--capacity",
        "5",
        "--packet-length",
        "100",
        "--transmission-rate",
        "1000",
        "--output",
        path(&output),
        "--plots",
        path(&graphs),
    ]);
    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(csv.lines().count(), 3);
    for name in &["en-T-50.svg", "p_idle-T-50.svg", "p_loss-T-50.svg"] {
        assert!(graphs.join(name).exists(), "{} missing", name);
    }
}
