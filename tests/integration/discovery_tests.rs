//! Integration tests: DiscoveryEngine against simulated and oracle buses.

use rdm_discovery::adapters::sim_bus::SimulatedBus;
use rdm_discovery::adapters::time::ManualClock;
use rdm_discovery::app::events::DiscoveryEvent;
use rdm_discovery::app::ports::NullSink;
use rdm_discovery::config::DiscoveryConfig;
use rdm_discovery::discovery::{DiscoveryEngine, Status, StopReason};
use rdm_discovery::error::DiscoveryError;
use rdm_discovery::rdm::{PID_DISC_UN_MUTE, PID_DISC_UNIQUE_BRANCH, Uid, UidRange};

use super::mock_bus::{
    AlwaysCollision, CONTROLLER, OracleBus, Phantom, RecordingSink, collision_frame,
};

fn config() -> DiscoveryConfig {
    DiscoveryConfig {
        enable_rdm: true,
        pass_deadline_ms: None,
        ..DiscoveryConfig::default()
    }
}

fn engine<T: rdm_discovery::app::ports::RdmTransport>(
    transport: T,
    config: DiscoveryConfig,
) -> DiscoveryEngine<T, ManualClock> {
    DiscoveryEngine::new(transport, ManualClock::new(100), CONTROLLER, config)
}

fn uids(raw: &[u64]) -> Vec<Uid> {
    raw.iter().map(|&n| Uid::try_from(n).unwrap()).collect()
}

// ── End-to-end ────────────────────────────────────────────────

#[test]
fn three_devices_found_in_ascending_order() {
    let devices = uids(&[0x0001, 0x0005, 0x00FF]);
    let mut e = engine(SimulatedBus::with_devices(devices.clone()), config());
    let mut sink = RecordingSink::new();

    let out = e.full(&mut sink);

    assert_eq!(out.status, Status::Complete);
    assert_eq!(out.tod.iter().collect::<Vec<_>>(), devices);
    assert_eq!(sink.found(), devices);
    assert!(devices.iter().all(|u| !out.tod.is_mute_failed(*u)));
    assert_eq!(sink.anomalies(), 0);
    assert!(matches!(
        sink.events.first(),
        Some(DiscoveryEvent::PassStarted { port: 0 })
    ));
    assert!(matches!(
        sink.events.last(),
        Some(DiscoveryEvent::PassFinished {
            status: Status::Complete,
            devices: 3,
            ..
        })
    ));
}

#[test]
fn pass_unmutes_before_first_probe() {
    let mut e = engine(OracleBus::new(uids(&[0x10])), config());
    e.transport_mut().muted.insert(Uid::try_from(0x10).unwrap());

    let out = e.full(&mut NullSink);

    assert_eq!(e.transport().pids[0], PID_DISC_UN_MUTE);
    assert_eq!(e.transport().pids[1], PID_DISC_UNIQUE_BRANCH);
    assert_eq!(out.tod.len(), 1);
}

#[test]
fn second_pass_finds_the_same_devices() {
    let devices = uids(&[0x1234_5678_9ABC, 0x0000_0000_0001, 0xFFFF_FFFF_FFFE]);
    let mut e = engine(SimulatedBus::with_devices(devices.clone()), config());

    let first = e.full(&mut NullSink);
    let second = e.full(&mut NullSink);

    let mut expected = devices;
    expected.sort();
    assert_eq!(first.tod.iter().collect::<Vec<_>>(), expected);
    assert_eq!(second.tod.iter().collect::<Vec<_>>(), expected);
}

#[test]
fn empty_bus_completes_quickly() {
    let mut e = engine(OracleBus::new([]), config());
    let out = e.full(&mut NullSink);
    assert_eq!(out.status, Status::Complete);
    assert!(out.tod.is_empty());
    assert_eq!(out.stats.iterations, 1);
}

#[test]
fn adjacent_uids_are_separated() {
    let devices = uids(&[0x4D41_0000_0010, 0x4D41_0000_0011]);
    let mut e = engine(SimulatedBus::with_devices(devices.clone()), config());
    let out = e.full(&mut NullSink);
    assert_eq!(out.status, Status::Complete);
    assert_eq!(out.tod.iter().collect::<Vec<_>>(), devices);
    assert!(out.stats.collisions >= 47);
}

// ── Probe cost ────────────────────────────────────────────────

#[test]
fn oracle_probe_count_is_bounded() {
    let devices = uids(&[
        0x0000_0000_0001,
        0x0001_0000_0000,
        0x4D41_0000_1000,
        0x4D41_0000_1001,
        0x7A70_1234_5678,
        0xFFFF_FFFF_FFFE,
    ]);
    let k = devices.len() as u32;
    let mut cfg = config();
    cfg.probe_attempts = 1;
    let mut e = engine(OracleBus::new(devices.clone()), cfg);

    let out = e.full(&mut NullSink);

    assert_eq!(out.status, Status::Complete);
    assert_eq!(out.tod.iter().collect::<Vec<_>>(), devices);
    // 48 levels per device, two children per split, one re-probe per find
    assert!(e.transport().probes <= 97 * k + 1, "{} probes", e.transport().probes);
}

// ── Budget and misbehaving buses ──────────────────────────────

#[test]
fn always_collision_hits_iteration_budget() {
    let mut cfg = config();
    cfg.max_iterations = 250;
    let mut e = engine(AlwaysCollision::new(), cfg);
    let mut sink = RecordingSink::new();

    let out = e.full(&mut sink);

    assert_eq!(out.status, Status::Incomplete(StopReason::IterationBudget));
    assert!(e.transport().probes <= 250);
    assert!(out.tod.is_empty());
    assert!(matches!(
        sink.events.last(),
        Some(DiscoveryEvent::PassFinished {
            status: Status::Incomplete(StopReason::IterationBudget),
            ..
        })
    ));
}

#[test]
fn always_collision_hits_deadline() {
    let mut cfg = config();
    cfg.max_iterations = u32::MAX;
    cfg.pass_deadline_ms = Some(100);
    // 100 µs per clock reading: the deadline trips long before the budget.
    let mut e = engine(AlwaysCollision::new(), cfg);

    let out = e.full(&mut NullSink);

    assert_eq!(out.status, Status::Incomplete(StopReason::Deadline));
    assert!(out.stats.iterations <= 1_000);
}

#[test]
fn collision_on_single_uid_is_discarded() {
    let ghost = Uid::new(0x0000, 0x0000_0040);
    let mut e = engine(Phantom::new(ghost, collision_frame()), config());
    let mut sink = RecordingSink::new();

    let out = e.full(&mut sink);

    assert_eq!(out.status, Status::Complete);
    assert!(out.tod.is_empty());
    assert_eq!(e.transport().singleton_probes, 1);
    assert_eq!(sink.anomalies(), 1);
    assert!(sink.events.contains(&DiscoveryEvent::Anomaly {
        range: UidRange::single(ghost),
        error: DiscoveryError::Collision,
    }));
    // full range plus 48 halvings collide, the 48 siblings stay silent
    assert_eq!(out.stats.collisions, 49);
    assert_eq!(out.stats.iterations, 97);
}

#[test]
fn malformed_on_single_uid_is_discarded() {
    let ghost = Uid::new(0x4D41, 0x0000_1000);
    // separator with a truncated body
    let mut e = engine(Phantom::new(ghost, vec![0xFE, 0xAA, 0xAB]), config());
    let mut sink = RecordingSink::new();

    let out = e.full(&mut sink);

    assert_eq!(out.status, Status::Complete);
    assert!(out.tod.is_empty());
    assert_eq!(sink.anomalies(), 1);
    assert!(sink.events.contains(&DiscoveryEvent::Anomaly {
        range: UidRange::single(ghost),
        error: DiscoveryError::Malformed,
    }));
    assert_eq!(out.stats.collisions, 0);
}

#[test]
fn stubborn_device_is_kept_and_flagged() {
    let stubborn = Uid::new(0x4D41, 0x10);
    let others = uids(&[0x0001_0000_0001, 0x4D41_0000_0020, 0x7000_0000_0000]);
    let mut bus = SimulatedBus::with_devices(others.clone());
    bus.add(stubborn).honours_mute = false;
    let mut e = engine(bus, config());
    let mut sink = RecordingSink::new();

    let out = e.full(&mut sink);

    assert_eq!(out.status, Status::Complete);
    assert_eq!(out.tod.len(), 4);
    assert!(out.tod.is_mute_failed(stubborn));
    assert!(others.iter().all(|u| out.tod.contains(*u) && !out.tod.is_mute_failed(*u)));
    assert_eq!(out.stats.mute_failures, 1);
    assert!(sink.events.contains(&DiscoveryEvent::MuteFailed(stubborn)));
}

#[test]
fn lossy_bus_is_absorbed_by_retries() {
    let devices = uids(&[0x0002, 0x0100, 0x4D41_0000_0001, 0x4D41_0000_0002]);
    let mut bus = SimulatedBus::with_devices(devices.clone());
    bus.set_drop_every(3);
    let mut e = engine(bus, config());

    let out = e.full(&mut NullSink);

    assert_eq!(out.status, Status::Complete);
    assert_eq!(out.tod.iter().collect::<Vec<_>>(), devices);
    assert!(out.stats.retries > 0);
}

#[test]
fn mixed_preambles_bisect_through_malformed_replies() {
    let devices = uids(&[0x0010, 0x0020, 0x0030]);
    let mut bus = SimulatedBus::new();
    for (uid, preamble) in devices.iter().zip([0, 3, 7]) {
        bus.add(*uid).preamble_len = preamble;
    }
    let mut e = engine(bus, config());

    let out = e.full(&mut NullSink);

    assert_eq!(out.status, Status::Complete);
    assert_eq!(out.tod.iter().collect::<Vec<_>>(), devices);
    assert!(out.stats.malformed > 0);
    assert_eq!(out.stats.collisions, 0);
}

#[test]
fn duplicate_uid_is_recorded_once() {
    let twin = Uid::new(0x0101, 0x0202_0303);
    let mut bus = SimulatedBus::new();
    bus.add(twin);
    bus.add(twin);
    let mut e = engine(bus, config());
    let mut sink = RecordingSink::new();

    let out = e.full(&mut sink);

    // Identical frames merge cleanly, so the twins answer as one device.
    // Only the first twin takes the mute; the second re-answers.
    assert_eq!(out.tod.iter().collect::<Vec<_>>(), vec![twin]);
    assert_eq!(out.status, Status::Complete);
    assert!(sink.anomalies() >= 1);
}

// ── QuickFind ─────────────────────────────────────────────────

#[test]
fn quick_find_tracks_presence_without_touching_the_table() {
    let target = Uid::new(0x00A1, 0x0000_0042);
    let mut e = engine(SimulatedBus::with_devices([target, Uid::new(1, 1)]), config());

    let out = e.full(&mut NullSink);
    assert_eq!(out.tod.len(), 2);

    assert!(e.quick_find(target));
    assert!(e.transport_mut().remove(target));
    assert!(!e.quick_find(target));
    assert!(!e.quick_find(Uid::new(0x00A1, 0x0000_0043)));

    assert_eq!(out.tod.len(), 2);
    assert!(out.tod.contains(target));
}

#[test]
fn quick_find_finds_unmuted_device() {
    let target = Uid::new(0x00A1, 7);
    let mut e = engine(SimulatedBus::with_devices([target]), config());
    assert!(e.quick_find(target));
    assert_eq!(e.transport().is_muted(target), Some(true));
}
