//! Tests for the command layer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_command::{
    AsyncCommand, AsyncCommandWithProgress, BoxError, CancelSignal, Canceled, CommandDelegate,
    CommandError, CommandEvent, FnDelegate, ProgressEvent, ProgressReporter,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::oneshot;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn test_execute_publishes_single_completion() {
    init_logging();
    let command = AsyncCommand::from_fn(|parameter: Option<u32>| async move {
        Ok::<_, BoxError>(parameter.unwrap_or(0) * 2)
    });
    let mut events = command.subscribe();

    command.execute(Some(21)).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => {
            assert_eq!(snapshot.result, Some(42));
            assert!(snapshot.error.is_none());
            assert!(!snapshot.is_executing);
            assert!(snapshot.is_executable);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert!(!command.is_executing());
    assert_eq!(command.result(), Some(42));
    assert!(command.error().is_none());
    // exactly one update was published for the whole execution
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_execute_failure_stores_error() {
    let command = AsyncCommand::from_fn(|_parameter: Option<u32>| async {
        Err::<u32, BoxError>("nope".into())
    });
    let mut events = command.subscribe();

    command.execute(None).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => {
            assert!(snapshot.result.is_none());
            assert_eq!(snapshot.error.unwrap().to_string(), "nope");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(command.result().is_none());
    assert_eq!(command.error().unwrap().to_string(), "nope");
}

#[tokio::test]
async fn test_single_flight_and_result_reset() {
    let (gate_tx, gate_rx) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate_rx)));
    let command = AsyncCommand::from_fn(move |_parameter: Option<u32>| {
        let gate = Arc::clone(&gate);
        async move {
            let gate_rx = gate.lock().take();
            if let Some(gate_rx) = gate_rx {
                let _ = gate_rx.await;
            }
            Ok::<_, BoxError>(1)
        }
    });
    let mut events = command.subscribe();

    command.execute(None).unwrap();
    assert!(command.is_executing());
    assert!(matches!(
        command.execute(None),
        Err(CommandError::AlreadyExecuting)
    ));
    assert!(!command.can_execute(None));

    gate_tx.send(()).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(1)),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!command.is_executing());
    assert_eq!(command.result(), Some(1));

    // a new execution clears the previous outcome while it runs
    command.execute(None).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(1)),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_execute_succeeds_at_most_once() {
    let (gate_tx, gate_rx) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate_rx)));
    let command = Arc::new(AsyncCommand::from_fn(move |_parameter: Option<u32>| {
        let gate = Arc::clone(&gate);
        async move {
            let gate_rx = gate.lock().take();
            if let Some(gate_rx) = gate_rx {
                let _ = gate_rx.await;
            }
            Ok::<_, BoxError>(1)
        }
    }));

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let command = Arc::clone(&command);
            tokio::spawn(async move { command.execute(None).is_ok() })
        })
        .collect();

    let mut successes = 0;
    for attempt in attempts {
        if attempt.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    drop(gate_tx);
}

#[tokio::test]
async fn test_can_execute_change_notification() {
    let allowed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&allowed);
    let command = AsyncCommand::new(FnDelegate::new(
        move |_parameter: Option<&u32>| flag.load(Ordering::SeqCst),
        |_parameter: Option<u32>| async { Ok::<u32, BoxError>(0) },
    ));
    let mut events = command.subscribe();

    // computed false matches the initial cache: no notification
    assert!(!command.can_execute(None));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    allowed.store(true, Ordering::SeqCst);
    assert!(command.can_execute(None));
    assert!(command.is_executable());
    match events.try_recv().unwrap() {
        CommandEvent::CanExecuteChanged(value) => assert!(value),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_execute_changes_nothing() {
    let command = AsyncCommand::new(FnDelegate::new(
        |_parameter: Option<&u32>| false,
        |_parameter: Option<u32>| async { Ok::<u32, BoxError>(9) },
    ));
    let mut events = command.subscribe();

    assert!(matches!(
        command.execute(None),
        Err(CommandError::NotExecutable)
    ));
    assert!(!command.is_executing());
    assert!(command.result().is_none());
    assert!(command.error().is_none());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

struct DoublingDelegate;

#[async_trait]
impl CommandDelegate<u32, u32> for DoublingDelegate {
    fn can_execute(&self, parameter: Option<&u32>) -> bool {
        parameter.is_some()
    }

    async fn execute(&self, parameter: Option<u32>) -> Result<u32, BoxError> {
        Ok(parameter.unwrap_or(0) * 2)
    }
}

#[tokio::test]
async fn test_custom_delegate() {
    let command = AsyncCommand::new(DoublingDelegate);
    assert!(!command.can_execute(None));
    assert!(command.can_execute(Some(&3)));

    let mut events = command.subscribe();
    command.execute(Some(21)).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(42)),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        command.execute(None),
        Err(CommandError::NotExecutable)
    ));
}

#[tokio::test]
async fn test_with_progress_reports_and_result() {
    init_logging();
    let command = AsyncCommandWithProgress::new(
        |parameter: Option<u32>, reporter: ProgressReporter<u32>, signal: CancelSignal| async move {
            let limit = parameter.unwrap_or(3);
            for i in 1..=limit {
                tokio::time::sleep(Duration::from_millis(5)).await;
                reporter.report(i);
                signal.check()?;
            }
            Ok::<_, BoxError>(limit)
        },
    );
    let mut progress_events = command.subscribe_progress();
    let mut events = command.subscribe();

    command.execute(Some(3)).unwrap();

    let mut seen = Vec::new();
    loop {
        match progress_events.recv().await.unwrap() {
            ProgressEvent::Progress(value) => seen.push(value),
            ProgressEvent::Result(result) => {
                assert_eq!(result, 3);
                break;
            }
        }
    }
    assert_eq!(seen, vec![1, 2, 3]);

    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(3)),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(command.final_result(), Some(3));
    assert_eq!(command.current_progress(), Some(3));
    assert!(!command.is_executing());
    assert!(!command.cancel_command().can_execute());
}

#[tokio::test]
async fn test_cancel_command_lifecycle() {
    let command = AsyncCommandWithProgress::new(
        |_parameter: Option<u32>, reporter: ProgressReporter<u32>, signal: CancelSignal| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            reporter.report(1);
            signal.canceled().await;
            Err::<u32, BoxError>(Canceled.into())
        },
    );
    let cancel = command.cancel_command();
    assert!(!cancel.can_execute());
    assert!(matches!(
        cancel.execute(),
        Err(CommandError::NoActiveOperation)
    ));

    let mut progress_events = command.subscribe_progress();
    let mut events = command.subscribe();
    command.execute(None).unwrap();

    match progress_events.recv().await.unwrap() {
        ProgressEvent::Progress(value) => assert_eq!(value, 1),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(cancel.can_execute());
    cancel.execute().unwrap();

    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => {
            assert!(snapshot.result.is_none());
            let err = snapshot.error.expect("canceled execution surfaces as error");
            assert_eq!(err.to_string(), "operation canceled");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!cancel.can_execute());
    assert!(command.final_result().is_none());
}

#[tokio::test]
async fn test_with_progress_resets_between_runs() {
    let command = AsyncCommandWithProgress::new(
        |parameter: Option<u32>, reporter: ProgressReporter<u32>, _signal: CancelSignal| async move {
            match parameter {
                Some(n) => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    reporter.report(n);
                    Ok::<_, BoxError>(n)
                }
                None => Ok::<_, BoxError>(0),
            }
        },
    );
    let mut events = command.subscribe();

    command.execute(Some(7)).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(7)),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(command.current_progress(), Some(7));
    assert_eq!(command.final_result(), Some(7));

    command.execute(None).unwrap();
    match events.recv().await.unwrap() {
        CommandEvent::Completed(snapshot) => assert_eq!(snapshot.result, Some(0)),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(command.current_progress(), None);
    assert_eq!(command.final_result(), Some(0));
}
