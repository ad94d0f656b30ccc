//! Batching behavior of the transition scheduler with a timed animation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use view_router::transition::{
    CallbackError, TimedAnimator, TransitionError, TransitionNotice, TransitionScheduler,
};

mod common;

fn animated(ms: u64) -> TransitionScheduler {
    TransitionScheduler::new(Some(Arc::new(TimedAnimator::new(Duration::from_millis(ms)))), 16)
}

#[tokio::test(start_paused = true)]
async fn test_updates_fold_then_defer() {
    let scheduler = animated(100);
    let log = common::log();

    let a = scheduler.start_transition(common::step(&log, "a", 10), Some("navigate"));
    let b = scheduler.start_transition(common::step(&log, "b", 10), None);
    assert_eq!(a.id(), b.id());

    a.callbacks_done().wait().await.unwrap();
    assert!(a.is_ready());
    assert!(!a.is_finished());

    let overlapped = Arc::new(AtomicBool::new(false));
    let flag = overlapped.clone();
    let a_finished = a.finished();
    let c = scheduler.start_transition(
        move || async move {
            flag.store(!a_finished.is_settled(), Ordering::SeqCst);
            Ok(())
        },
        None,
    );
    assert_ne!(c.id(), a.id());
    assert_eq!(scheduler.next().map(|t| t.id()), Some(c.id()));

    let d = scheduler.start_transition(common::step(&log, "d", 0), None);
    assert_eq!(d.id(), c.id());

    assert_eq!(c.finished().wait().await, Ok(()));
    assert_eq!(a.finished().outcome(), Some(Ok(())));
    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(common::entries(&log), vec!["a", "b", "d"]);
    assert!(!scheduler.transition_is_pending());
}

#[tokio::test]
async fn test_failed_update_rejects_batch_and_next_still_runs() {
    let scheduler = TransitionScheduler::new(None, 16);
    let log = common::log();

    let failing = scheduler.start_transition(|| async { Err::<(), CallbackError>("boom".into()) }, None);
    failing.add_callback(common::step(&log, "dropped", 0)).unwrap();

    let expected = Err(TransitionError::Callback("boom".into()));
    assert_eq!(failing.finished().wait().await, expected);
    assert_eq!(failing.ready().outcome(), Some(expected.clone()));
    assert_eq!(failing.callbacks_done().outcome(), Some(expected));
    assert!(matches!(
        failing.add_callback(common::step(&log, "late", 0)),
        Err(TransitionError::InvalidState { .. })
    ));

    let after = scheduler.start_transition(common::step(&log, "after", 0), None);
    assert_ne!(after.id(), failing.id());
    assert_eq!(after.finished().wait().await, Ok(()));
    assert_eq!(common::entries(&log), vec!["after"]);
}

#[tokio::test(start_paused = true)]
async fn test_skip_cuts_the_animation_short() {
    let scheduler = animated(10_000);
    let log = common::log();
    let start = tokio::time::Instant::now();

    let transition = scheduler.start_transition(common::step(&log, "a", 5), None);
    transition.skip_transition();
    assert_eq!(transition.finished().wait().await, Ok(()));

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(common::entries(&log), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_notices_pair_up() {
    let scheduler = animated(50);
    let log = common::log();
    let mut notices = scheduler.subscribe();

    let transition = scheduler.start_transition(common::step(&log, "a", 0), Some("tab-switch"));
    transition.finished().wait().await.unwrap();

    assert_eq!(
        notices.recv().await.unwrap(),
        TransitionNotice::Started {
            transition: transition.id(),
            transition_type: Some("tab-switch".into()),
        }
    );
    assert_eq!(
        notices.recv().await.unwrap(),
        TransitionNotice::Ended {
            transition: transition.id(),
            transition_type: Some("tab-switch".into()),
            outcome: Ok(()),
        }
    );
}
