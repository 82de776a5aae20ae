//! Scheduler lifecycle integration tests.

use minicron::testing::CountingTask;
use minicron::{Cron, CronError, JobId};
use std::time::Duration;

#[tokio::test]
async fn test_start_stop_start_cycle() {
    let cron = Cron::new();

    cron.start().await.unwrap();
    assert!(cron.is_running());
    assert!(matches!(cron.start().await, Err(CronError::AlreadyRunning)));

    cron.stop().await.unwrap();
    assert!(!cron.is_running());
    assert!(matches!(cron.stop().await, Err(CronError::NotRunning)));

    cron.start().await.unwrap();
    assert!(cron.is_running());
    cron.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_clears_jobs_and_id_counter_continues() {
    let cron = Cron::new();
    let task = CountingTask::new("cycle");

    let first = cron.create("@hourly", task.clone()).await.unwrap();
    assert_eq!(first.id(), JobId::new(1));
    assert_eq!(cron.job_count(), 1);

    cron.start().await.unwrap();
    cron.stop().await.unwrap();

    // Stop cleared the registry but the id counter never rewinds.
    assert_eq!(cron.job_count(), 0);
    let second = cron.create("@hourly", task).await.unwrap();
    assert_eq!(second.id(), JobId::new(2));
    assert!(second.id() > first.id());
}

#[tokio::test]
async fn test_advisory_seconds_follow_registry() {
    let cron = Cron::new();
    assert_eq!(cron.seconds_until_next_execution(), None);

    let task = CountingTask::new("hourly");
    let job = cron.create("@hourly", task).await.unwrap();
    let advisory = cron.seconds_until_next_execution().unwrap();
    assert!((0..=3600).contains(&advisory));

    cron.destroy(job).await;
    assert_eq!(cron.seconds_until_next_execution(), None);
}

#[tokio::test]
async fn test_clear_all_then_idle() {
    let cron = Cron::new();
    for i in 0..4 {
        let task = CountingTask::new(format!("job{}", i));
        cron.create("@daily", task).await.unwrap();
    }
    assert_eq!(cron.job_count(), 4);

    cron.clear_all().await;
    assert_eq!(cron.job_count(), 0);
    assert_eq!(cron.seconds_until_next_execution(), None);
}

#[tokio::test]
async fn test_jobs_created_before_start_fire_after_start() {
    let cron = Cron::new();
    let task = CountingTask::new("early");
    let _job = cron.create("* * * * * *", task.clone()).await.unwrap();

    // Nothing fires while stopped.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(task.fired(), 0);

    cron.start().await.unwrap();
    crate::common::wait_for_fired(&task, 1, Duration::from_secs(3)).await;

    cron.stop().await.unwrap();
}

#[tokio::test]
async fn test_unschedule_stops_firing() {
    let cron = Cron::new();
    cron.start().await.unwrap();

    let task = CountingTask::new("transient");
    let job = cron.create("* * * * * *", task.clone()).await.unwrap();

    crate::common::wait_for_fired(&task, 1, Duration::from_secs(3)).await;
    assert!(cron.unschedule(&job).await);
    assert!(!cron.is_scheduled(&job));

    // Allow any already-dispatched execution to finish, then verify the
    // count stays put.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let after_unschedule = task.fired();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(task.fired(), after_unschedule);

    cron.stop().await.unwrap();
}
