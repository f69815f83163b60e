//! Node -> BusPublisher -> MemoryConnector, end to end

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rcguard_connectors::{BusPublisher, Connector, MemoryConnector};
use rcguard_core::{
    gpio::{PinState, SimulatedGpio, WiringPin},
    time::MockTimeSource,
    AlertPayload, NodeConfig, RcTimeNode, Severity,
};

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn anomaly_reaches_status_topic_as_json() {
    let gpio = SimulatedGpio::new();
    let clock = MockTimeSource::new(0);
    let bus = MemoryConnector::new();
    let config = NodeConfig::from_remappings(["__name:=pump_rc"]);
    let publisher = BusPublisher::for_node(bus.clone(), &config);

    let handle = RcTimeNode::new(config, gpio.clone(), publisher)
        .with_clock(Arc::new(clock.clone()))
        .start()
        .unwrap();

    for t in [100, 202, 300, 500] {
        clock.set(t);
        assert!(gpio.fire_edge(WiringPin(3), PinState::Low, t));
    }
    assert!(wait_for(Duration::from_secs(2), || bus.messages().len() == 1));

    let report = handle.shutdown().unwrap();
    assert_eq!(report.published, 1);

    let sent = bus.messages_on("robocore/status");
    assert_eq!(sent.len(), 1);
    let alert: AlertPayload = serde_json::from_slice(&sent[0].payload).unwrap();
    assert_eq!(alert.name, "pump_rc");
    assert_eq!(alert.level, Severity::Warn);
    assert_eq!(alert.values[0].value, "Default GPIO event message");
}

#[test]
fn broken_link_is_counted_not_fatal() {
    let gpio = SimulatedGpio::new();
    let clock = MockTimeSource::new(0);
    let bus = MemoryConnector::new();
    bus.set_connected(false);
    let publisher = BusPublisher::new(bus.clone(), "robocore/status");

    let handle = RcTimeNode::new(NodeConfig::default(), gpio.clone(), publisher)
        .with_clock(Arc::new(clock.clone()))
        .start()
        .unwrap();

    for t in [100, 400] {
        clock.set(t);
        gpio.fire_edge(WiringPin(3), PinState::Low, t);
    }
    assert!(wait_for(Duration::from_secs(2), || bus.stats().messages_failed == 1));

    let report = handle.shutdown().unwrap();
    assert_eq!(report.failed, 1);
    assert!(bus.messages().is_empty());
}
