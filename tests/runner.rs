#![cfg(not(feature = "loom"))]

mod common;

use common::{init_test_logging, ms, sleeping};
use cpf::{
    CancelToken, Error, ParallelRunner,
    config::Config,
    error::Cancelled,
    run_filtered, run_ordered,
    runner::{launch, merge, run_cancellable},
    task::{BoxedTask, boxed},
    types::{MergedEvent, TaskOutcome},
};
use crossbeam_channel::RecvError;
use std::{collections::HashSet, thread, time::Instant};

fn event(value: i32, index: usize) -> MergedEvent<TaskOutcome<i32>> {
    MergedEvent {
        value: Ok(value),
        index,
    }
}

fn done<T>(value: T) -> Option<TaskOutcome<T>> {
    Some(Ok(value))
}

#[test]
fn ordered_collects_every_result_in_submission_order() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(1000));
    let tasks = vec![sleeping(10, 1), sleeping(20, 2), sleeping(30, 3)];
    let results = run_ordered(&token, tasks).unwrap();
    assert_eq!(results, [done(1), done(2), done(3)]);
}

#[test]
fn ordered_leaves_unfinished_slots_empty_on_timeout() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(300));
    let tasks = vec![sleeping(200, 1), sleeping(600, 2), sleeping(100, 3)];
    let results = run_ordered(&token, tasks).unwrap();
    assert_eq!(results, [done(1), None, done(3)]);
}

#[test]
fn ordered_with_zero_timeout_is_all_empty() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(0));
    let tasks = vec![sleeping(100, 1), sleeping(200, 2), sleeping(50, 3)];
    let results = run_ordered(&token, tasks).unwrap();
    assert_eq!(results, [None::<TaskOutcome<i32>>, None, None]);
}

#[test]
fn ordered_with_no_tasks_is_empty() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(14));
    let results = run_ordered(&token, Vec::<BoxedTask<i32>>::new()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn ordered_stops_on_explicit_cancel() {
    init_test_logging();
    let token = CancelToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(ms(150));
        canceller.cancel();
    });
    let tasks = vec![sleeping(10, 1), sleeping(2000, 2)];
    let started = Instant::now();
    let results = run_ordered(&token, tasks).unwrap();
    assert!(started.elapsed() < ms(1500));
    assert_eq!(results, [done(1), None]);
    handle.join().unwrap();
}

#[test]
fn ordered_reports_panics_per_task() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(1000));
    let tasks: Vec<BoxedTask<i32>> = vec![boxed(|| 7), boxed(|| panic!("boom"))];
    let results = run_ordered(&token, tasks).unwrap();
    assert_eq!(results[0], done(7));
    let panic = results[1].clone().unwrap().unwrap_err();
    assert_eq!(panic.message(), "boom");
}

#[test]
fn filtered_keeps_arrival_order() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(1000));
    let tasks = vec![sleeping(100, 1), sleeping(200, 2), sleeping(300, 3)];
    let results = run_filtered(&token, tasks).unwrap();
    assert_eq!(results, [event(1, 0), event(2, 1), event(3, 2)]);
}

#[test]
fn filtered_drops_tasks_unfinished_at_timeout() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(300));
    let tasks = vec![sleeping(200, 1), sleeping(600, 2), sleeping(100, 3)];
    let results = run_filtered(&token, tasks).unwrap();
    assert_eq!(results, [event(3, 2), event(1, 0)]);
}

#[test]
fn filtered_with_zero_timeout_is_empty() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(0));
    let tasks = vec![sleeping(10, 1), sleeping(20, 2), sleeping(5, 3)];
    assert!(run_filtered(&token, tasks).unwrap().is_empty());
}

#[test]
fn filtered_indices_are_unique_and_in_range() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(1000));
    let tasks: Vec<_> = (0..16).map(|value| sleeping(value % 4, value)).collect();
    let results = run_filtered(&token, tasks).unwrap();
    assert_eq!(results.len(), 16);
    let indices: HashSet<_> = results.iter().map(|event| event.index).collect();
    assert_eq!(indices, (0..16).collect::<HashSet<usize>>());
    for MergedEvent { value, index } in results {
        assert_eq!(value, Ok(index as u64));
    }
}

#[test]
fn runner_names_its_threads() {
    init_test_logging();
    let runner = ParallelRunner::new(Config::new().thread_name("probe"));
    let token = CancelToken::new().with_timeout(ms(1000));
    let name = || thread::current().name().map(str::to_owned);
    let results = runner.run_ordered(&token, vec![name, name]).unwrap();
    assert_eq!(
        results,
        [
            done(Some("probe-task-0".to_owned())),
            done(Some("probe-task-1".to_owned())),
        ]
    );
}

#[test]
fn launch_delivers_exactly_one_value_then_closes() {
    init_test_logging();
    let token = CancelToken::new();
    let receiver = launch(&Config::default(), &token, 0, || 42).unwrap();
    assert_eq!(receiver.recv(), Ok(Ok(42)));
    assert_eq!(receiver.recv(), Err(RecvError));
}

#[test]
fn launch_discards_result_computed_after_cancellation() {
    init_test_logging();
    let token = CancelToken::new();
    let receiver = launch(&Config::default(), &token, 0, || {
        thread::sleep(ms(50));
        42
    })
    .unwrap();
    token.cancel();
    assert_eq!(receiver.recv(), Err(RecvError));
}

#[test]
fn merge_forwards_every_value_of_multi_value_sources() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(1000));
    let sources = feed(vec![vec![(1, 10), (8, 20)], vec![(2, 5)]]);
    let merged = merge(&Config::default(), &token, sources).unwrap();
    let values: HashSet<_> = merged.iter().map(|event| (event.value, event.index)).collect();
    assert_eq!(values, HashSet::from([(1, 0), (8, 0), (2, 1)]));
}

#[test]
fn merge_stops_at_cancellation() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(150));
    let sources = feed(vec![vec![(1, 10), (3, 600)], vec![(2, 5)], vec![(10, 5)]]);
    let started = Instant::now();
    let merged = merge(&Config::default(), &token, sources).unwrap();
    let values: HashSet<_> = merged.iter().map(|event| event.value).collect();
    assert!(started.elapsed() < ms(500));
    assert_eq!(values, HashSet::from([1, 2, 10]));
}

#[test]
fn merge_of_no_sources_closes_immediately() {
    init_test_logging();
    let token = CancelToken::new();
    let merged = merge::<i32>(&Config::default(), &token, Vec::new()).unwrap();
    assert_eq!(merged.recv(), Err(RecvError));
}

/// Spawns one feeder thread per source; each sends `(value, delay_ms)` pairs
/// in order and then closes its channel.
fn feed(sources: Vec<Vec<(i32, u64)>>) -> Vec<crossbeam_channel::Receiver<i32>> {
    sources
        .into_iter()
        .map(|values| {
            let (sender, receiver) = crossbeam_channel::unbounded();
            thread::spawn(move || {
                for (value, delay) in values {
                    thread::sleep(ms(delay));
                    if sender.send(value).is_err() {
                        return;
                    }
                }
            });
            receiver
        })
        .collect()
}

#[derive(Debug)]
enum ProbeError {
    Refused,
    Runner(Error),
}

impl From<Error> for ProbeError {
    fn from(error: Error) -> Self {
        Self::Runner(error)
    }
}

#[test]
fn run_cancellable_returns_task_result() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(1000));
    let ok = run_cancellable(&token, || -> Result<i32, ProbeError> { Ok(42) });
    assert_eq!(ok.unwrap(), 42);
    let refused = run_cancellable(&token, || -> Result<i32, ProbeError> {
        Err(ProbeError::Refused)
    });
    assert!(matches!(refused, Err(ProbeError::Refused)));
}

#[test]
fn run_cancellable_returns_cancellation_reason() {
    init_test_logging();
    let token = CancelToken::new().with_timeout(ms(10));
    let started = Instant::now();
    let result = run_cancellable(&token, || -> Result<i32, ProbeError> {
        thread::sleep(ms(500));
        Ok(42)
    });
    assert!(started.elapsed() < ms(400));
    assert!(matches!(
        result,
        Err(ProbeError::Runner(Error::Cancelled(Cancelled::DeadlineExceeded)))
    ));

    let token = CancelToken::new();
    token.cancel();
    let result = run_cancellable(&token, || -> Result<i32, Error> { Ok(1) });
    assert!(matches!(result, Err(Error::Cancelled(Cancelled::Cancelled))));
}

#[test]
fn run_cancellable_captures_panics() {
    init_test_logging();
    let token = CancelToken::new();
    let result = run_cancellable(&token, || -> Result<i32, Error> { panic!("kaput") });
    match result {
        Err(Error::Panicked(panic)) => assert_eq!(panic.message(), "kaput"),
        other => panic!("unexpected {other:?}"),
    }
}
