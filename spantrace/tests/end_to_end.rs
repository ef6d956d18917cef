mod common;

use assert2::check;
use common::{FailingSink, begin_in_memory, decode, fast_tracer};
use spantrace::tracer::format::{EVENT_FIXED_SIZE, FOOTER_SIZE, HEADER_SIZE};
use spantrace::tracer::{
    Append, Event, SessionState, TraceError, TraceReader, Tracer, to_chrome_json,
};
use std::collections::BTreeSet;
use std::time::Duration;
use validation::{validate_per_thread_order, validate_trace};

/// Record `count` events whose `time_start` is a per-thread sequence number.
fn record_sequence(tracer: &Tracer, name: &'static str, count: u64) -> u64 {
    let mut stored = 0;
    for seq in 0..count {
        if tracer.record(Event::new(name, seq, seq)).is_stored() {
            stored += 1;
        }
    }
    stored
}

#[test]
fn small_buffer_counts_every_event() {
    // Writer effectively never polls on its own; only capacity can force a swap.
    let tracer = Tracer::builder()
        .with_buffer_capacity(4)
        .with_swap_threshold(1000)
        .with_poll_interval(Duration::from_secs(3600))
        .build()
        .unwrap();
    let bytes = begin_in_memory(&tracer);
    let stored = record_sequence(&tracer, "e", 6);
    let summary = tracer.end_session().unwrap();

    check!(summary.num_profiles == stored);
    check!(summary.num_profiles + summary.missed_profiles == 6);
    check!(summary.num_profiles >= 4);

    let trace = decode(&bytes);
    validate_trace(&trace, 6);
    validate_per_thread_order(&trace);
}

#[test]
fn two_threads_keep_their_order() {
    let tracer = fast_tracer(64, 8);
    let bytes = begin_in_memory(&tracer);

    std::thread::scope(|s| {
        s.spawn(|| record_sequence(&tracer, "left", 100));
        s.spawn(|| record_sequence(&tracer, "right", 100));
    });
    let summary = tracer.end_session().unwrap();
    check!(summary.num_threads == 2);

    let trace = decode(&bytes);
    validate_trace(&trace, 200);
    let by_thread = validate_per_thread_order(&trace);
    check!(by_thread.len() <= 2);
    for r in &trace.records {
        let same_name = trace
            .records_for_thread(r.thread_id)
            .all(|other| other.name == r.name);
        check!(same_name, "thread {} mixes span names", r.thread_id);
    }
}

#[test]
fn concurrent_producers_survive_many_swaps() {
    const THREADS: u64 = 4;
    const PER_THREAD: u64 = 10_000;
    let tracer = fast_tracer(128, 16);
    let bytes = begin_in_memory(&tracer);

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| record_sequence(&tracer, "work", PER_THREAD));
        }
    });
    let summary = tracer.end_session().unwrap();
    check!(summary.num_threads == THREADS as u16);

    let trace = decode(&bytes);
    validate_trace(&trace, THREADS * PER_THREAD);
    validate_per_thread_order(&trace);
}

#[test]
fn thread_ids_are_rederived_per_session() {
    let tracer = fast_tracer(256, 20);
    let mut trace_ids = BTreeSet::new();

    for session in 0..5usize {
        let bytes = begin_in_memory(&tracer);
        check!(trace_ids.insert(tracer.trace_id()));

        let workers = session % 3 + 1;
        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| record_sequence(&tracer, "worker", 3));
            }
        });
        // The main thread joins last, so its id is the highest.
        record_sequence(&tracer, "main", 1);
        let summary = tracer.end_session().unwrap();

        let trace = decode(&bytes);
        validate_trace(&trace, workers as u64 * 3 + 1);
        let ids: BTreeSet<u16> = trace.records.iter().map(|r| r.thread_id).collect();
        let expected: BTreeSet<u16> = (0..=workers as u16).collect();
        check!(ids == expected);
        check!(summary.num_threads as usize == workers + 1);
        let main = trace.records.iter().find(|r| r.name == "main").unwrap();
        check!(main.thread_id == workers as u16);
    }
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("traces").join("session.trace");
    let tracer = Tracer::new();

    tracer.begin_session(&path).unwrap();
    let names = ["parse", "typecheck", "codegen"];
    for name in names {
        let _span = tracer.span(name);
        std::thread::sleep(Duration::from_micros(200));
    }
    let summary = tracer.end_session().unwrap();

    let file_len = std::fs::metadata(&path).unwrap().len() as usize;
    let names_len: usize = names.iter().map(|n| n.len()).sum();
    check!(file_len == HEADER_SIZE + 3 * EVENT_FIXED_SIZE + names_len + FOOTER_SIZE);

    let trace = TraceReader::new(&path).unwrap().read_all().unwrap();
    validate_trace(&trace, 3);
    check!(trace.footer == summary);
    let read_names: Vec<&str> = trace.records.iter().map(|r| r.name.as_str()).collect();
    check!(read_names == names);
    // 200µs of sleep at nanosecond resolution.
    check!(trace.records.iter().all(|r| r.time_end - r.time_start >= 200_000));
    check!(
        trace
            .records
            .windows(2)
            .all(|w| w[0].time_end <= w[1].time_start)
    );
}

#[test]
fn lifecycle_errors_are_typed() {
    let tracer = Tracer::new();
    check!(let Err(TraceError::NotRunning) = tracer.end_session());

    let _bytes = begin_in_memory(&tracer);
    check!(tracer.state() == SessionState::Running);
    check!(let Err(TraceError::AlreadyRunning) = tracer.begin_session("/dev/null"));
    tracer.end_session().unwrap();
    check!(tracer.state() == SessionState::NotRunning);
    check!(tracer.record(Event::new("late", 0, 0)) == Append::Closed);
}

#[test]
fn unopenable_path_leaves_tracer_reusable() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let tracer = Tracer::new();
    check!(let Err(TraceError::Sink(_)) = tracer.begin_session(blocker.join("x.trace")));
    check!(tracer.state() == SessionState::NotRunning);

    let bytes = begin_in_memory(&tracer);
    tracer.end_session().unwrap();
    validate_trace(&decode(&bytes), 0);
}

#[test]
fn sink_failure_surfaces_from_end_session() {
    let tracer = Tracer::new();
    tracer
        .begin_session_with_sink(Box::new(FailingSink { budget: 0 }))
        .unwrap();
    tracer.record(Event::new("lost", 0, 1));
    check!(let Err(TraceError::Sink(_)) = tracer.end_session());
    check!(tracer.state() == SessionState::NotRunning);

    // The failed session does not poison the next one.
    let bytes = begin_in_memory(&tracer);
    record_sequence(&tracer, "ok", 2);
    tracer.end_session().unwrap();
    validate_trace(&decode(&bytes), 2);
}

#[test]
fn flush_instrumentation_records_writer_spans() {
    let tracer = Tracer::builder()
        .with_buffer_capacity(32)
        .with_swap_threshold(4)
        .with_poll_interval(Duration::from_micros(50))
        .with_flush_instrumentation(true)
        .build()
        .unwrap();
    let bytes = begin_in_memory(&tracer);
    for seq in 0..50 {
        tracer.record(Event::new("user", seq, seq));
        if seq % 10 == 9 {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
    let summary = tracer.end_session().unwrap();
    check!(summary.num_threads == 2);

    let trace = decode(&bytes);
    let flushes = trace
        .records
        .iter()
        .filter(|r| r.name == "Flush Trace Buffer")
        .count() as u64;
    let user = trace.records.iter().filter(|r| r.name == "user").count() as u64;
    check!(user + summary.missed_profiles == 50);
    check!(flushes + user == summary.num_profiles);
    // The writer registers first.
    check!(
        trace
            .records
            .iter()
            .filter(|r| r.name == "Flush Trace Buffer")
            .all(|r| r.thread_id == 0)
    );
}

#[test]
fn single_slot_buffer_with_flush_markers_keeps_user_events() {
    const N: u64 = 40;
    let tracer = Tracer::builder()
        .with_buffer_capacity(1)
        .with_swap_threshold(0)
        .with_poll_interval(Duration::from_micros(50))
        .with_flush_instrumentation(true)
        .build()
        .unwrap();
    let bytes = begin_in_memory(&tracer);
    for seq in 0..N {
        tracer.record(Event::new("user", seq, seq));
        std::thread::sleep(Duration::from_millis(2));
    }
    let summary = tracer.end_session().unwrap();

    let trace = decode(&bytes);
    let user = trace.records.iter().filter(|r| r.name == "user").count() as u64;
    let flushes = trace.records.len() as u64 - user;
    check!(user + summary.missed_profiles == N);
    // Each swap is triggered by a user event, never by a marker alone.
    check!(flushes <= user);
    check!(user >= N / 2, "only {user} of {N} user events survived");
}

#[test]
fn chrome_export_of_real_session() {
    let tracer = Tracer::new();
    let bytes = begin_in_memory(&tracer);
    {
        let _outer = tracer.span("outer");
        let _inner = tracer.span("inner");
    }
    tracer.end_session().unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&to_chrome_json(&decode(&bytes)).unwrap()).unwrap();
    let events = json["traceEvents"].as_array().unwrap();
    check!(events.len() == 2);
    check!(events[0]["name"] == "inner");
    check!(events[1]["name"] == "outer");
    check!(events.iter().all(|e| e["ph"] == "X"));
}
