use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use tempfile::TempDir;

use super::interfaces::Scope;
use super::*;
use crate::archive::{ArchiveWriter, read_records};
use crate::config::metrics::sample_config;
use crate::snmp::mock::{MockSnmp, run1, run2};
use crate::snmp::{SnmpValue, Varbind};

const TARGET: &str = "s1-abc0t.measurement-lab.org";
const HOSTNAME: &str = "mlab2-abc0t.mlab-sandbox.measurement-lab.org";

const DISCARDS_MACHINE: &str = ".1.3.6.1.2.1.2.2.1.19.524";
const DISCARDS_UPLINK: &str = ".1.3.6.1.2.1.2.2.1.19.568";
const OCTETS_MACHINE: &str = ".1.3.6.1.2.1.31.1.1.1.6.524";
const OCTETS_UPLINK: &str = ".1.3.6.1.2.1.31.1.1.1.6.568";

fn options() -> CollectorOptions {
    CollectorOptions {
        target: TARGET.to_string(),
        hostname: HOSTNAME.to_string(),
        machine: "mlab2".to_string(),
    }
}

async fn setup(snmp: Arc<MockSnmp>) -> (TempDir, SwitchCollector) {
    let dir = TempDir::new().unwrap();
    let collector = SwitchCollector::new(snmp, &sample_config(), options(), ArchiveWriter::new(dir.path()))
        .await
        .unwrap();
    (dir, collector)
}

/// Ответ агента, где каждый счётчик равен `value`
fn uniform_batch(value: u64) -> Vec<Varbind> {
    [DISCARDS_MACHINE, DISCARDS_UPLINK, OCTETS_MACHINE, OCTETS_UPLINK]
        .into_iter()
        .map(|oid| Varbind::new(oid, SnmpValue::Counter64(value)))
        .collect()
}

#[tokio::test]
async fn new_builds_entries_for_both_scopes() {
    let (_dir, collector) = setup(Arc::new(MockSnmp::switch())).await;

    let entries = collector.entries().await;
    assert_eq!(entries.len(), 4);
    assert!(collector.is_first_run());

    let expected = [
        (DISCARDS_MACHINE, "ifOutDiscards", Scope::Machine, "xe-0/0/12", "switch.discards.local.tx"),
        (DISCARDS_UPLINK, "ifOutDiscards", Scope::Uplink, "xe-0/0/45", "switch.discards.uplink.tx"),
        (OCTETS_MACHINE, "ifHCInOctets", Scope::Machine, "xe-0/0/12", "switch.octets.local.rx"),
        (OCTETS_UPLINK, "ifHCInOctets", Scope::Uplink, "xe-0/0/45", "switch.octets.uplink.rx"),
    ];
    for (oid, metric, scope, if_descr, archive_metric) in expected {
        let entry = collector.entry(oid).await.unwrap();
        assert_eq!(entry.metric, metric);
        assert_eq!(entry.scope, scope);
        assert_eq!(entry.if_descr, if_descr);
        assert_eq!(entry.previous_value, 0);
        assert_eq!(entry.series.experiment, TARGET);
        assert_eq!(entry.series.hostname, HOSTNAME);
        assert_eq!(entry.series.metric, archive_metric);
        assert!(entry.series.samples.is_empty());
    }
}

#[tokio::test]
async fn new_fails_when_discovery_fails() {
    let dir = TempDir::new().unwrap();
    let snmp = Arc::new(MockSnmp::switch().with_failing_walk());
    let result = SwitchCollector::new(snmp, &sample_config(), options(), ArchiveWriter::new(dir.path())).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn first_collect_only_records_baseline() {
    let snmp = Arc::new(MockSnmp::switch());
    let (_dir, collector) = setup(snmp.clone()).await;

    snmp.push_batch(run1());
    let summary = collector.collect().await.unwrap();
    assert_eq!(
        summary,
        CycleSummary {
            updated: 4,
            samples: 0,
            baseline: true
        }
    );
    assert!(!collector.is_first_run());

    let expected_prev = [
        (DISCARDS_MACHINE, 0),
        (DISCARDS_UPLINK, 3),
        (OCTETS_MACHINE, 275),
        (OCTETS_UPLINK, 437),
    ];
    for (oid, previous) in expected_prev {
        let entry = collector.entry(oid).await.unwrap();
        assert_eq!(entry.previous_value, previous, "{}", oid);
        assert!(entry.series.samples.is_empty(), "{}", oid);
    }

    let metrics = collector.metrics();
    assert_eq!(metrics.value("ifHCInOctets", HOSTNAME, "xe-0/0/45"), None);
    assert_eq!(metrics.value("ifOutDiscards", HOSTNAME, "xe-0/0/45"), None);
}

#[tokio::test]
async fn second_collect_appends_deltas() {
    let snmp = Arc::new(MockSnmp::switch());
    let (_dir, collector) = setup(snmp.clone()).await;

    snmp.push_batch(run1());
    snmp.push_batch(run2());
    collector.collect().await.unwrap();
    let summary = collector.collect().await.unwrap();
    assert_eq!(summary.samples, 4);
    assert!(!summary.baseline);

    let expected = [
        (DISCARDS_MACHINE, 0, 0),
        (DISCARDS_UPLINK, 8, 5),
        (OCTETS_MACHINE, 511, 236),
        (OCTETS_UPLINK, 624, 187),
    ];
    for (oid, previous, delta) in expected {
        let entry = collector.entry(oid).await.unwrap();
        assert_eq!(entry.previous_value, previous, "{}", oid);
        assert_eq!(entry.series.samples.len(), 1, "{}", oid);
        assert_eq!(entry.series.samples[0].value, delta, "{}", oid);
    }

    let metrics = collector.metrics();
    assert_eq!(metrics.value("ifHCInOctets", HOSTNAME, "xe-0/0/45"), Some(187.0));
    assert_eq!(metrics.value("ifHCInOctets", HOSTNAME, "xe-0/0/12"), Some(236.0));
    assert_eq!(metrics.value("ifOutDiscards", HOSTNAME, "xe-0/0/45"), Some(5.0));
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    let snmp = Arc::new(MockSnmp::switch());
    let (_dir, collector) = setup(snmp.clone()).await;

    snmp.push_failure();
    let err = collector.collect().await.unwrap_err();
    assert!(matches!(err, CollectError::Fetch(_)));
    assert!(!err.is_fatal());
    assert!(collector.is_first_run());
    assert!(collector.entries().await.iter().all(|e| e.previous_value == 0));

    // следующий цикл по-прежнему только запоминает значения
    snmp.push_batch(run1());
    let summary = collector.collect().await.unwrap();
    assert!(summary.baseline);
    assert_eq!(summary.samples, 0);
}

#[tokio::test]
async fn non_counter_value_is_fatal_and_applies_nothing() {
    let snmp = Arc::new(MockSnmp::switch());
    let (_dir, collector) = setup(snmp.clone()).await;

    let mut batch = run1();
    batch[3].value = SnmpValue::OctetString(b"oops".to_vec());
    snmp.push_batch(batch);

    let err = collector.collect().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(collector.is_first_run());
    assert_eq!(collector.entry(DISCARDS_UPLINK).await.unwrap().previous_value, 0);
}

#[tokio::test]
async fn unknown_oids_in_response_are_ignored() {
    let snmp = Arc::new(MockSnmp::switch());
    let (_dir, collector) = setup(snmp.clone()).await;

    let mut batch = run1();
    batch.push(Varbind::new(".1.3.6.1.2.1.1.3.0", SnmpValue::Timeticks(42)));
    snmp.push_batch(batch);

    let summary = collector.collect().await.unwrap();
    assert_eq!(summary.updated, 4);
}

#[tokio::test]
async fn counter32_wrap_produces_small_delta() {
    let snmp = Arc::new(MockSnmp::switch());
    let (_dir, collector) = setup(snmp.clone()).await;

    let mut batch = run1();
    batch[1].value = SnmpValue::Counter32(u32::MAX - 1);
    snmp.push_batch(batch);
    let mut batch = run2();
    batch[1].value = SnmpValue::Counter32(3);
    snmp.push_batch(batch);

    collector.collect().await.unwrap();
    collector.collect().await.unwrap();

    let entry = collector.entry(DISCARDS_UPLINK).await.unwrap();
    assert_eq!(entry.series.samples[0].value, 5);
    assert_eq!(entry.previous_value, 3);
}

#[tokio::test]
async fn flush_drains_buffers_and_keeps_previous_values() {
    let snmp = Arc::new(MockSnmp::switch());
    let (dir, collector) = setup(snmp.clone()).await;

    snmp.push_batch(run1());
    snmp.push_batch(run2());
    collector.collect().await.unwrap();
    collector.collect().await.unwrap();
    let before = collector.entries().await;

    let now = Local.with_ymd_and_hms(2024, 3, 7, 12, 5, 0).unwrap();
    let summary = collector.flush_at(now, Duration::from_secs(300)).await.unwrap();
    assert_eq!(summary.records, 4);
    assert_eq!(summary.samples, 4);
    assert_eq!(
        summary.path,
        dir.path()
            .join("2024/03/07")
            .join(HOSTNAME)
            .join("2024-03-07T12:00:00-to-2024-03-07T12:05:00-switch.json")
    );

    let after = collector.entries().await;
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.previous_value, new.previous_value);
        assert!(new.series.samples.is_empty());
    }

    let written = read_records(&std::fs::read_to_string(&summary.path).unwrap()).unwrap();
    let expected: Vec<_> = before.iter().map(|e| e.series.clone()).collect();
    assert_eq!(written, expected);
}

#[tokio::test]
async fn flush_failure_retains_buffers() {
    let snmp = Arc::new(MockSnmp::switch());
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let collector = SwitchCollector::new(snmp.clone(), &sample_config(), options(), ArchiveWriter::new(&blocker))
        .await
        .unwrap();

    snmp.push_batch(run1());
    snmp.push_batch(run2());
    collector.collect().await.unwrap();
    collector.collect().await.unwrap();

    assert!(collector.flush(Duration::from_secs(60)).await.is_err());
    let entries = collector.entries().await;
    assert!(entries.iter().all(|e| e.series.samples.len() == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_collect_and_flush_never_split_a_cycle() {
    const CYCLES: u64 = 40;

    let snmp = Arc::new(MockSnmp::switch());
    let (dir, collector) = setup(snmp.clone()).await;
    let collector = Arc::new(collector);
    for cycle in 0..CYCLES {
        snmp.push_batch(uniform_batch(cycle * 10));
    }

    let mut handles = Vec::new();
    for i in 0..CYCLES {
        let collecting = Arc::clone(&collector);
        handles.push(tokio::spawn(async move {
            collecting.collect().await.unwrap();
        }));
        if i % 7 == 0 {
            let flushing = Arc::clone(&collector);
            let now = Local.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
            handles.push(tokio::spawn(async move {
                flushing.flush_at(now, Duration::from_secs(60)).await.unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let remaining = collector.entries().await;
    let now = Local.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
    let path = collector.flush_at(now, Duration::from_secs(60)).await.unwrap().path;
    let written = read_records(&std::fs::read_to_string(dir.path().join(&path)).unwrap()).unwrap();

    // каждый цикл после первого дал ровно один прирост на каждый OID
    for entry in &remaining {
        let total: usize = written
            .iter()
            .filter(|r| r.metric == entry.series.metric)
            .map(|r| r.samples.len())
            .sum();
        assert_eq!(total as u64, CYCLES - 1, "{}", entry.oid);
        assert_eq!(entry.previous_value, (CYCLES - 1) * 10);
    }
    assert!(written.iter().flat_map(|r| &r.samples).all(|s| s.value == 10));
    assert_eq!(*snmp.batch_calls.lock().unwrap(), CYCLES as usize);
}
