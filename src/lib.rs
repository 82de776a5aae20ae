//! minicron - a minimal, timer-driven cron job scheduler.
//!
//! Callers register jobs described by cron expressions; the scheduler keeps
//! an ordered registry of due times, sleeps until exactly the next one, and
//! fires each due job once per matching time slot. Due jobs are handed over
//! a bounded channel to a dispatch worker that runs every callback in its
//! own task, so a slow or failing callback never stalls the scheduler.
//!
//! # Example
//!
//! ```no_run
//! use minicron::{Cron, FnTask};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), minicron::CronError> {
//!     let cron = Cron::new();
//!     cron.start().await?;
//!
//!     let task = FnTask::new("heartbeat", |ctx| async move {
//!         println!("job {} fired at {}", ctx.job_id(), ctx.fired_at());
//!         Ok(())
//!     });
//!     let job = cron.create("*/5 * * * * *", Arc::new(task)).await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!
//!     cron.destroy(job).await;
//!     cron.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod events;
pub mod scheduler;
pub mod testing;

pub use self::core::expression::{Expression, ExpressionError};
pub use self::core::job::Job;
pub use self::core::task::{FnTask, JobContext, JobTask, TaskError};
pub use self::core::types::{JobId, RunId};
pub use self::events::{Event, EventBus, EventHandler};
pub use self::scheduler::{Cron, CronConfig, CronError};
