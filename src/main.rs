//! minicron - a minimal, timer-driven cron job scheduler.
//!
//! Usage:
//!   minicron next <EXPRESSION>      Print the upcoming occurrences of an expression
//!   minicron run <EXPRESSION>...    Run demo jobs until Ctrl-C

use clap::{Parser, Subcommand};
use minicron::{Cron, Event, EventHandler, Expression, FnTask};
use std::sync::Arc;
use tracing::{info, warn};

/// minicron - a minimal, timer-driven cron job scheduler
#[derive(Parser)]
#[command(name = "minicron")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the upcoming occurrences of an expression
    Next {
        /// Cron expression, shortcut, or interval (e.g. "*/5 * * * *",
        /// "@daily", "@every 90s")
        #[arg(value_name = "EXPRESSION")]
        expression: String,

        /// Number of occurrences to print
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,

        /// Timezone the expression is evaluated in
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },

    /// Schedule one logging job per expression and run until Ctrl-C
    Run {
        /// Expressions to schedule
        #[arg(value_name = "EXPRESSION", required = true)]
        expressions: Vec<String>,
    },
}

/// Event handler that prints job lifecycle events.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::JobScheduled {
                job_id,
                next_execution,
                ..
            } => {
                info!("job {} scheduled, next execution {}", job_id, next_execution);
            }
            Event::DispatchCompleted {
                job_id, duration, ..
            } => {
                info!("job {} completed in {:?}", job_id, duration);
            }
            Event::DispatchFailed { job_id, error, .. } => {
                warn!("job {} failed: {}", job_id, error);
            }
            Event::DispatchDropped { job_id, .. } => {
                warn!("job {} dispatch dropped (channel full)", job_id);
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Next {
            expression,
            count,
            timezone,
        } => {
            let expr = Expression::parse_with_timezone(&expression, &timezone)?;
            let occurrences = expr.upcoming(chrono::Utc::now(), count);
            if occurrences.is_empty() {
                println!("no upcoming occurrences for '{}'", expression);
            }
            for occurrence in occurrences {
                println!("{}", occurrence);
            }
        }

        Commands::Run { expressions } => {
            let cron = Cron::new();
            cron.event_bus().register(Arc::new(LoggingHandler)).await;
            cron.start().await?;

            for expression in &expressions {
                let name = format!("demo[{}]", expression);
                let label = expression.clone();
                let task = FnTask::new(name, move |ctx| {
                    let label = label.clone();
                    async move {
                        info!("'{}' fired (run {})", label, ctx.run_id());
                        Ok(())
                    }
                });
                let job = cron.create(expression, Arc::new(task)).await?;
                info!(
                    "scheduled job {} for '{}', next execution {:?}",
                    job.id(),
                    expression,
                    job.next_execution()
                );
            }

            info!("running {} job(s), press Ctrl-C to stop", expressions.len());
            tokio::signal::ctrl_c().await?;

            cron.stop().await?;
            info!("scheduler stopped");
        }
    }

    Ok(())
}
