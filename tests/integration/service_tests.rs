//! Integration tests: RdmService → DiscoveryEngine → simulated bus.

use rdm_discovery::adapters::nvs::NvsAdapter;
use rdm_discovery::adapters::sim_bus::SimulatedBus;
use rdm_discovery::adapters::time::ManualClock;
use rdm_discovery::app::commands::{RdmCommand, RdmReply};
use rdm_discovery::app::events::DiscoveryEvent;
use rdm_discovery::app::ports::{ConfigError, ConfigPort};
use rdm_discovery::app::service::RdmService;
use rdm_discovery::config::DiscoveryConfig;
use rdm_discovery::discovery::Status;
use rdm_discovery::rdm::Uid;

use super::mock_bus::{CONTROLLER, RecordingSink};

const A: Uid = Uid::new(0x0001, 0x0000_0010);
const B: Uid = Uid::new(0x0001, 0x0000_0020);
const C: Uid = Uid::new(0x4D41, 0x1234_5678);

fn enabled() -> DiscoveryConfig {
    DiscoveryConfig {
        enable_rdm: true,
        discovery_at_startup: true,
        pass_deadline_ms: None,
        ..DiscoveryConfig::default()
    }
}

fn service(devices: &[Uid], config: DiscoveryConfig) -> RdmService<SimulatedBus, ManualClock> {
    RdmService::new(
        SimulatedBus::with_devices(devices.iter().copied()),
        ManualClock::new(100),
        CONTROLLER,
        config,
    )
}

#[test]
fn startup_pass_publishes_tod() {
    let mut svc = service(&[C, A, B], enabled());
    let mut sink = RecordingSink::new();

    let reply = svc.start(&mut sink);

    assert_eq!(
        reply,
        Some(RdmReply::TodUpdated {
            devices: 3,
            complete: true
        })
    );
    assert_eq!(svc.tod().iter().collect::<Vec<_>>(), vec![A, B, C]);
    assert_eq!(svc.last_status(), Some(Status::Complete));
    assert!(svc.last_stats().probes > 0);
    assert_eq!(sink.found(), vec![A, B, C]);
}

#[test]
fn startup_pass_is_optional() {
    let mut cfg = enabled();
    cfg.discovery_at_startup = false;
    let mut svc = service(&[A], cfg);
    let mut sink = RecordingSink::new();

    assert_eq!(svc.start(&mut sink), None);
    assert!(svc.tod().is_empty());
    assert!(sink.events.is_empty());
    assert_eq!(svc.last_status(), None);
}

#[test]
fn disabled_service_sends_nothing() {
    let mut svc = service(&[A], DiscoveryConfig::default());
    let mut sink = RecordingSink::new();

    assert_eq!(svc.start(&mut sink), None);
    assert_eq!(
        svc.handle_command(RdmCommand::FullDiscovery, &mut sink),
        RdmReply::Disabled
    );
    assert_eq!(
        svc.handle_command(RdmCommand::QuickFind(A), &mut sink),
        RdmReply::Disabled
    );
    assert!(sink.events.is_empty());
}

#[test]
fn full_discovery_replaces_the_table() {
    let mut svc = service(&[A, B], enabled());
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    assert_eq!(svc.tod().len(), 2);

    svc.engine_mut().transport_mut().remove(A);
    svc.engine_mut().transport_mut().add(C);
    let reply = svc.handle_command(RdmCommand::FullDiscovery, &mut sink);

    assert_eq!(
        reply,
        RdmReply::TodUpdated {
            devices: 2,
            complete: true
        }
    );
    assert_eq!(svc.tod().iter().collect::<Vec<_>>(), vec![B, C]);
}

#[test]
fn incremental_drops_vanished_devices() {
    let mut svc = service(&[A, B, C], enabled());
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);

    svc.engine_mut().transport_mut().remove(B);
    let reply = svc.handle_command(RdmCommand::Incremental, &mut sink);

    assert_eq!(
        reply,
        RdmReply::TodUpdated {
            devices: 2,
            complete: true
        }
    );
    assert_eq!(svc.tod().iter().collect::<Vec<_>>(), vec![A, C]);
    assert_eq!(sink.lost(), vec![B]);
}

#[test]
fn quick_find_reports_presence_and_keeps_table() {
    let mut svc = service(&[A, B], enabled());
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);

    assert_eq!(
        svc.handle_command(RdmCommand::QuickFind(A), &mut sink),
        RdmReply::Presence {
            uid: A,
            present: true
        }
    );

    svc.engine_mut().transport_mut().remove(A);
    assert_eq!(
        svc.handle_command(RdmCommand::QuickFind(A), &mut sink),
        RdmReply::Presence {
            uid: A,
            present: false
        }
    );
    // QuickFind never edits the table; Incremental does.
    assert!(svc.tod().contains(A));
    assert!(sink.lost().is_empty());
}

#[test]
fn partial_pass_is_reported() {
    let mut cfg = enabled();
    cfg.max_iterations = 5;
    let mut svc = service(&[A, B, C], cfg);
    let mut sink = RecordingSink::new();

    let reply = svc.start(&mut sink);

    assert!(matches!(
        reply,
        Some(RdmReply::TodUpdated {
            complete: false,
            ..
        })
    ));
    assert!(matches!(svc.last_status(), Some(Status::Incomplete(_))));
    assert!(matches!(
        sink.events.last(),
        Some(DiscoveryEvent::PassFinished { .. })
    ));
}

#[test]
fn config_is_validated_before_use() {
    let mut svc = service(&[A], enabled());

    let bad = DiscoveryConfig {
        probe_timeout_us: 10,
        ..enabled()
    };
    assert!(matches!(
        svc.apply_config(bad),
        Err(ConfigError::ValidationFailed(_))
    ));

    let good = DiscoveryConfig {
        probe_attempts: 5,
        controller_uid: Some(Uid::new(0x7FF0, 0x99)),
        port: 7,
        ..enabled()
    };
    svc.apply_config(good).unwrap();
    assert_eq!(svc.config().probe_attempts, 5);
    assert_eq!(svc.config().port, 0, "port is fixed at construction");
    assert_eq!(svc.controller_uid(), Uid::new(0x7FF0, 0x99));
}

#[test]
fn stored_config_drives_the_service() {
    let nvs = NvsAdapter::new(0).unwrap();
    let mut stored = enabled();
    stored
        .apply_params("rdm_probe_attempts=2\nrdm_max_iterations=5000\n")
        .unwrap();
    nvs.save(&stored).unwrap();

    let loaded = nvs.load().unwrap();
    assert_eq!(loaded, stored);

    let mut svc = service(&[B], loaded);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);
    assert_eq!(svc.tod().iter().collect::<Vec<_>>(), vec![B]);
    assert_eq!(svc.config().probe_attempts, 2);
}
