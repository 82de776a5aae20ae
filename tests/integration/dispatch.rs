//! Timer-driven dispatch integration tests.

use minicron::testing::{CountingTask, FailingTask, RecordingHandler};
use minicron::{Cron, Event};
use std::time::Duration;

#[tokio::test]
async fn test_every_second_job_fires_once_per_slot() {
    let cron = Cron::new();
    cron.start().await.unwrap();

    let task = CountingTask::new("per-second");
    let _job = cron.create("* * * * * *", task.clone()).await.unwrap();

    // Over ~3.2 seconds an every-second job sees 3 or 4 slots; firing more
    // often than once per slot would exceed that.
    tokio::time::sleep(Duration::from_millis(3200)).await;
    let fired = task.fired();
    assert!((2..=4).contains(&fired), "fired={}", fired);

    cron.stop().await.unwrap();
}

#[tokio::test]
async fn test_two_jobs_due_same_instant_both_fire() {
    let cron = Cron::new();
    cron.start().await.unwrap();

    let a = CountingTask::new("a");
    let b = CountingTask::new("b");
    cron.create("* * * * * *", a.clone()).await.unwrap();
    cron.create("* * * * * *", b.clone()).await.unwrap();

    crate::common::wait_for_fired(&a, 2, Duration::from_secs(5)).await;
    crate::common::wait_for_fired(&b, 2, Duration::from_secs(5)).await;

    cron.stop().await.unwrap();
}

#[tokio::test]
async fn test_failing_callback_does_not_stall_other_jobs() {
    let cron = Cron::new();
    let recorder = RecordingHandler::new();
    cron.event_bus().register(recorder.clone()).await;
    cron.start().await.unwrap();

    let failing = FailingTask::new("always-fails", "intentional failure");
    let healthy = CountingTask::new("healthy");
    cron.create("* * * * * *", failing.clone()).await.unwrap();
    cron.create("* * * * * *", healthy.clone()).await.unwrap();

    // The healthy job keeps firing while its neighbor fails every slot.
    crate::common::wait_for_fired(&healthy, 2, Duration::from_secs(5)).await;
    assert!(failing.attempts() >= 1);
    assert!(
        recorder
            .count_where(|e| matches!(e, Event::DispatchFailed { .. }))
            .await
            >= 1
    );

    // The failing job stays scheduled; failures never unschedule.
    assert_eq!(cron.job_count(), 2);

    cron.stop().await.unwrap();
}

#[tokio::test]
async fn test_dispatch_events_are_emitted() {
    let cron = Cron::new();
    let recorder = RecordingHandler::new();
    cron.event_bus().register(recorder.clone()).await;
    cron.start().await.unwrap();

    let task = CountingTask::new("observed");
    cron.create("* * * * * *", task.clone()).await.unwrap();

    crate::common::wait_for_fired(&task, 1, Duration::from_secs(3)).await;
    // Give the completion event a moment to land.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(
        recorder
            .count_where(|e| matches!(e, Event::JobScheduled { .. }))
            .await
            >= 1
    );
    assert!(
        recorder
            .count_where(|e| matches!(e, Event::DispatchStarted { .. }))
            .await
            >= 1
    );
    assert!(
        recorder
            .count_where(|e| matches!(e, Event::DispatchCompleted { .. }))
            .await
            >= 1
    );

    cron.stop().await.unwrap();
    assert_eq!(
        recorder
            .count_where(|e| matches!(e, Event::SchedulerStopped { .. }))
            .await,
        1
    );
}

#[tokio::test]
async fn test_over_budget_callback_warns_but_completes() {
    let cron = Cron::new().with_callback_budget(Duration::from_millis(20));
    let recorder = RecordingHandler::new();
    cron.event_bus().register(recorder.clone()).await;
    cron.start().await.unwrap();

    let slow = minicron::FnTask::new("slow", |_ctx| async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        Ok(())
    });
    cron.create("* * * * * *", std::sync::Arc::new(slow))
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let warned = recorder
            .count_where(|e| matches!(e, Event::BudgetExceeded { .. }))
            .await;
        if warned >= 1 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for budget warning"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    // The overrun is advisory: the callback still ran to completion.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        recorder
            .count_where(|e| matches!(e, Event::DispatchCompleted { .. }))
            .await
            >= 1
    );

    cron.stop().await.unwrap();
}
