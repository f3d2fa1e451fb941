//! Property-based tests for rust_event_logger using proptest

use proptest::prelude::*;
use rust_event_logger::prelude::*;
use std::collections::HashSet;

fn any_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Trace),
        Just(Severity::Debug),
        Just(Severity::Information),
        Just(Severity::Warning),
        Just(Severity::Error),
        Just(Severity::Critical),
    ]
}

fn any_timing() -> impl Strategy<Value = ReinitTiming> {
    prop_oneof![Just(ReinitTiming::OnTake), Just(ReinitTiming::OnReturn)]
}

// ============================================================================
// Severity Tests
// ============================================================================

proptest! {
    /// Severity string conversions roundtrip
    #[test]
    fn test_severity_str_roundtrip(severity in any_severity()) {
        let parsed: Severity = severity.to_str().parse().unwrap();
        prop_assert_eq!(severity, parsed);
    }

    /// Parsing ignores case
    #[test]
    fn test_severity_case_insensitive(severity in any_severity(), use_lower in any::<bool>()) {
        let text = if use_lower {
            severity.to_str().to_lowercase()
        } else {
            severity.to_str().to_string()
        };
        prop_assert_eq!(text.parse::<Severity>().unwrap(), severity);
    }

    /// A severity filter keeps exactly the events at or above its minimum
    #[test]
    fn test_severity_filter_threshold(min in any_severity(), severity in any_severity()) {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .pre_filter(SeverityFilter::new(min))
            .build()
            .unwrap();

        logger.log(severity, "probe").unwrap();
        prop_assert_eq!(memory.len() == 1, severity >= min);
    }
}

// ============================================================================
// Event Name Tests
// ============================================================================

proptest! {
    /// Names never contain raw line breaks or tabs
    #[test]
    fn test_name_escaping(name in ".*") {
        let record = EventRecord::new(Severity::Information, &name);
        prop_assert!(!record.name.contains('\n'));
        prop_assert!(!record.name.contains('\r'));
        prop_assert!(!record.name.contains('\t'));
    }

    /// Names without control characters are kept verbatim
    #[test]
    fn test_plain_name_unchanged(name in "[a-zA-Z0-9 ._-]*") {
        let record = EventRecord::new(Severity::Information, &name);
        prop_assert_eq!(record.name, name);
    }
}

// ============================================================================
// Object Pool Tests
// ============================================================================

#[derive(Debug)]
struct Slot(usize);

impl Recyclable for Slot {}

proptest! {
    /// The idle cache never exceeds the pool's maximum size
    #[test]
    fn test_pool_idle_bounded(
        max_size in 1usize..16,
        timing in any_timing(),
        ops in prop::collection::vec(any::<bool>(), 1..200)
    ) {
        let pool = ObjectPool::builder(|| Slot(0))
            .max_size(max_size)
            .timing(timing)
            .build()
            .unwrap();

        let mut held = Vec::new();
        for take in ops {
            if take || held.is_empty() {
                held.push(pool.take().unwrap());
            } else if let Some(value) = held.pop() {
                pool.put(value).unwrap();
            }
            prop_assert!(pool.idle_count() <= max_size);
        }
        for value in held {
            pool.put(value).unwrap();
            prop_assert!(pool.idle_count() <= max_size);
        }
    }

    /// Handles always give back a usable value and return it on drop
    #[test]
    fn test_pool_handles_return(max_size in 1usize..8, count in 1usize..32) {
        let pool = ObjectPool::builder(|| Slot(0))
            .max_size(max_size)
            .reinitializer(|slot: &mut Slot| slot.0 = 0)
            .build()
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..count {
            let mut handle = pool.acquire().unwrap();
            prop_assert_eq!(handle.0, 0);
            handle.0 = i + 1;
            handles.push(handle);
        }
        drop(handles);

        prop_assert_eq!(pool.idle_count(), count.min(max_size));
        prop_assert_eq!(pool.metrics().taken(), count as u64);
    }

    /// Shared instances are never cached twice
    #[test]
    fn test_pool_no_duplicate_shared(returns in 1usize..10) {
        let pool = ObjectPool::builder(|| std::sync::Arc::new(0u8))
            .max_size(16)
            .build()
            .unwrap();
        let value = pool.take().unwrap();
        for _ in 0..returns {
            pool.put(std::sync::Arc::clone(&value)).unwrap();
        }
        prop_assert_eq!(pool.idle_count(), 1);
    }
}

// ============================================================================
// Job Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every job writes exactly two events plus one per recorded fault
    #[test]
    fn test_job_event_count(faults in 0usize..4, cancel in any::<bool>()) {
        let memory = MemoryWriter::new();
        let logger = Logger::builder()
            .writer(WriterHandle::concurrent(memory.clone()))
            .build()
            .unwrap();

        let mut job = logger.begin_job("probe").unwrap();
        for i in 0..faults {
            job.record_fault(std::io::Error::other(format!("fault {}", i))).unwrap();
        }
        if cancel {
            job.cancel();
        }
        job.complete().unwrap();

        let records = memory.records();
        prop_assert_eq!(records.len(), 2 + faults);
        let ids: HashSet<_> = records
            .iter()
            .map(|r| r.property("job_id").and_then(|v| v.as_str()).unwrap().to_string())
            .collect();
        prop_assert_eq!(ids.len(), 1);

        let terminal = records.last().unwrap();
        let expected = match (faults > 0, cancel) {
            (true, _) => Severity::Error,
            (false, true) => Severity::Warning,
            (false, false) => Severity::Information,
        };
        prop_assert_eq!(terminal.severity, expected);
    }
}
