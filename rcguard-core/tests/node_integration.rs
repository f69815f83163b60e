//! End-to-end: simulated edges in, published alerts out

mod common;

use std::time::Duration;

use common::{wait_until, TestRig, INPUT, OUTPUT};
use rcguard_core::{
    gpio::PinState, LoopReport, NodeConfig, RearmPolicy, Severity,
};
use tempfile::NamedTempFile;

#[test]
fn reference_sequence_publishes_one_alert() {
    let rig = TestRig::new();
    let handle = rig.start(NodeConfig::default()).unwrap();

    rig.edges_at(&[100, 202, 300, 500]);
    assert!(wait_until(Duration::from_secs(2), || rig.publisher.count() == 1));

    let published = rig.publisher.published();
    let alert = &published[0];
    assert_eq!(alert.name, "gpiotrigger");
    assert_eq!(alert.level, Severity::Warn);
    assert_eq!(alert.message, "Attention!");
    assert_eq!(alert.values.len(), 1);
    assert_eq!(alert.values[0].key, "1");
    assert_eq!(alert.values[0].value, "Default GPIO event message");

    let report = handle.shutdown().unwrap();
    assert_eq!(report, LoopReport { published: 1, failed: 0, discarded: 0 });
}

#[test]
fn steady_intervals_stay_quiet() {
    let rig = TestRig::new();
    let handle = rig.start(NodeConfig::default()).unwrap();

    let timestamps: Vec<u64> = (1..=50).map(|i| i * 100).collect();
    rig.edges_at(&timestamps);

    assert_eq!(handle.queued(), 0);
    assert_eq!(handle.shutdown().unwrap().published, 0);
    assert_eq!(rig.publisher.count(), 0);
}

#[test]
fn alert_file_lines_annotate_with_increasing_keys() {
    let mut file = NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"# maintenance notes\nCheck tank level\n\nCall operator\n").unwrap();

    let rig = TestRig::new();
    let config = NodeConfig::from_remappings([
        format!("__alertfile:={}", file.path().display()),
        "__name:=tank_monitor".to_string(),
    ]);
    let handle = rig.start(config).unwrap();

    // Two anomalies: 100 seeds, 400 deviates, then a sharp drop at 420
    rig.edges_at(&[100, 400, 420]);
    assert!(wait_until(Duration::from_secs(2), || rig.publisher.count() == 2));
    handle.shutdown().unwrap();

    let published = rig.publisher.published();
    assert_eq!(published[0].name, "tank_monitor");
    let first: Vec<_> = published[0].annotation_texts().collect();
    assert_eq!(first, vec!["Check tank level", "", "Call operator"]);

    let keys: Vec<_> = published
        .iter()
        .flat_map(|p| p.values.iter().map(|kv| kv.key.clone()))
        .collect();
    assert_eq!(keys, vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn missing_alert_file_falls_back() {
    let rig = TestRig::new();
    let config = NodeConfig::from_remappings(["__alertfile:=/nonexistent/rcguard/alert.txt"]);
    let handle = rig.start(config).unwrap();

    rig.edges_at(&[100, 400]);
    assert!(wait_until(Duration::from_secs(2), || rig.publisher.count() == 1));
    handle.shutdown().unwrap();

    let published = rig.publisher.published();
    let texts: Vec<_> = published[0].annotation_texts().collect();
    assert_eq!(texts, vec!["Cannot find alert file for GPIO Listener"]);
}

#[test]
fn publish_failures_are_counted() {
    let rig = TestRig::new();
    rig.publisher.set_failing(true);
    let handle = rig.start(NodeConfig::default()).unwrap();

    rig.edges_at(&[100, 400]);
    assert!(wait_until(Duration::from_secs(2), || handle.queued() == 0));
    // the taken payload may still be inside publish(); give it a moment
    std::thread::sleep(Duration::from_millis(20));

    let report = handle.shutdown().unwrap();
    assert_eq!(report, LoopReport { published: 0, failed: 1, discarded: 0 });
}

#[test]
fn pulse_rearm_toggles_output_per_edge() {
    let rig = TestRig::new();
    let config = NodeConfig {
        rearm: RearmPolicy::Pulse,
        ..NodeConfig::default()
    };
    let handle = rig.start(config).unwrap();
    rig.edges_at(&[100, 200]);
    handle.shutdown().unwrap();

    let writes = rig.gpio.writes();
    assert_eq!(
        writes,
        vec![
            (OUTPUT, PinState::High),
            (OUTPUT, PinState::Low),
            (OUTPUT, PinState::High),
            (OUTPUT, PinState::Low),
            (OUTPUT, PinState::High),
            (OUTPUT, PinState::Low),
        ]
    );
}

#[test]
fn shutdown_with_idle_queue_is_prompt() {
    let rig = TestRig::new();
    let handle = rig.start(NodeConfig::default()).unwrap();
    assert!(rig.gpio.has_listener(INPUT));

    let started = std::time::Instant::now();
    handle.shutdown().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(!rig.gpio.has_listener(INPUT));
    assert_eq!(rig.gpio.output_state(OUTPUT), None);
}

#[test]
fn intervals_follow_node_clock_not_controller_stamps() {
    let rig = TestRig::new();
    let handle = rig.start(NodeConfig::default()).unwrap();

    // controller counts from its own boot, a million ms ahead of the node
    for t in [100, 202, 300, 500] {
        rig.clock.set(t);
        assert!(rig.gpio.fire_edge(INPUT, PinState::Low, t + 1_000_000));
    }

    assert!(wait_until(Duration::from_secs(2), || rig.publisher.count() == 1));
    let report = handle.shutdown().unwrap();
    assert_eq!(report, LoopReport { published: 1, failed: 0, discarded: 0 });
}
