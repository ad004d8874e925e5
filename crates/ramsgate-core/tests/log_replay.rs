//! Replay of a captured session through the full pipeline.

use std::path::PathBuf;

use ramsgate_core::analyze_log_file;
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn session_replay_counts_every_line() {
    let report = analyze_log_file(&fixture("session.log")).unwrap();

    let traffic = &report.traffic;
    assert_eq!(traffic.frames_total, 10);
    assert_eq!(traffic.malformed_frames, 2);
    assert_eq!(traffic.checksum_failures, 1);
    assert_eq!(traffic.length_mismatches, 1);
    assert_eq!(traffic.unknown_verbs, 0);
    assert_eq!(traffic.undecoded_payloads, 0);
    assert_eq!(traffic.stale_writes, 1);
    assert_eq!(traffic.state_changes, 4);
    assert_eq!(traffic.first_seen.as_deref(), Some("2021-03-14T06:29:00Z"));
    assert_eq!(traffic.last_seen.as_deref(), Some("2021-03-14T06:30:04Z"));
}

#[test]
fn session_replay_builds_the_device_model() {
    let report = analyze_log_file(&fixture("session.log")).unwrap();

    let addresses: Vec<&str> = report
        .devices
        .iter()
        .map(|d| d.address.as_str())
        .collect();
    // The requester whose frame was rejected never becomes a device.
    assert_eq!(addresses, vec!["01:145038", "13:049798", "34:092243"]);

    let controller = &report.devices[0];
    assert_eq!(controller.class, "controller");

    let setpoint = controller
        .codes
        .iter()
        .find(|c| c.code == "2309")
        .expect("controller should hold a setpoint");
    // The stale 17.0 write must not have clobbered the newer 20.0.
    assert_eq!(
        setpoint.value,
        Some(json!({"zone_idx": "01", "setpoint": 20.0}))
    );
    assert_eq!(setpoint.last_seen, "2021-03-14T06:30:03Z");

    let thermostat = &report.devices[2];
    assert_eq!(thermostat.class, "thermostat");
    let temp = thermostat.codes.iter().find(|c| c.code == "30C9").unwrap();
    assert_eq!(
        temp.value,
        Some(json!({"zone_idx": "01", "temperature": 20.9}))
    );
}

#[test]
fn report_serializes_with_stable_shape() {
    let report = analyze_log_file(&fixture("session.log")).unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["report_version"], json!(1));
    assert_eq!(value["tool"]["name"], json!("ramsgate"));
    assert_eq!(value["input"]["path"].as_str().unwrap(), fixture("session.log").display().to_string());
    assert!(value["traffic"]["frames_total"].is_u64());
    assert!(value["devices"].is_array());
}

#[test]
fn missing_input_is_an_error_not_a_panic() {
    let err = analyze_log_file(&fixture("no-such.log")).unwrap_err();
    assert!(err.to_string().contains("read failed"));
}
