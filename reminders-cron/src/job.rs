//! Job definition and execution.

use crate::error::CronResult;
use crate::expression::CronExpression;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Job execution function type.
pub type JobFn =
    Arc<dyn Fn(JobContext) -> Pin<Box<dyn Future<Output = CronResult<()>> + Send>> + Send + Sync>;

/// What a job body is told about the firing.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub name: String,

    /// When the schedule said to fire
    pub scheduled_time: DateTime<Utc>,

    /// When the tick actually picked the job up
    pub execution_time: DateTime<Utc>,

    /// Execution count (0-based)
    pub execution_count: u64,
}

impl JobContext {
    /// How late the tick was.
    pub fn delay(&self) -> chrono::Duration {
        self.execution_time - self.scheduled_time
    }
}

/// Job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Scheduled,
    Running,
    Completed,
    Failed(String),
}

/// Scheduled job.
pub struct Job {
    pub name: String,
    pub expression: CronExpression,
    pub function: JobFn,
    pub status: JobStatus,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub execution_count: u64,
    pub enabled: bool,
}

impl Job {
    /// Create a job whose first firing is the next match after `now`.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        expression: CronExpression,
        now: DateTime<Utc>,
        function: F,
    ) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CronResult<()>> + Send + 'static,
    {
        let next_run = expression.next_after(now);

        let wrapped_fn = Arc::new(
            move |ctx: JobContext| -> Pin<Box<dyn Future<Output = CronResult<()>> + Send>> {
                Box::pin(function(ctx))
            },
        );

        Self {
            name: name.into(),
            expression,
            function: wrapped_fn,
            status: JobStatus::Scheduled,
            next_run,
            last_run: None,
            execution_count: 0,
            enabled: true,
        }
    }

    /// Enabled, not already running and past its fire time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.status != JobStatus::Running
            && self.next_run.is_some_and(|next| now >= next)
    }

    /// Mark the job running and hand out what is needed to run it.
    ///
    /// Returns `None` when the job is not due.
    pub fn begin(&mut self, now: DateTime<Utc>) -> Option<(JobFn, JobContext)> {
        if !self.is_due(now) {
            return None;
        }

        self.status = JobStatus::Running;
        let context = JobContext {
            name: self.name.clone(),
            scheduled_time: self.next_run.unwrap_or(now),
            execution_time: now,
            execution_count: self.execution_count,
        };
        Some((self.function.clone(), context))
    }

    /// Record the outcome of a run started with [`Job::begin`].
    pub fn finish(&mut self, result: &CronResult<()>, now: DateTime<Utc>) {
        self.last_run = Some(now);
        self.execution_count += 1;
        self.status = match result {
            Ok(()) => JobStatus::Completed,
            Err(e) => JobStatus::Failed(e.to_string()),
        };
        self.next_run = self.expression.next_after(now);
    }

    /// Run the job if it is due.
    pub async fn execute(&mut self, now: DateTime<Utc>) -> CronResult<()> {
        let Some((function, context)) = self.begin(now) else {
            return Ok(());
        };

        let result = function(context).await;
        self.finish(&result, now);
        result
    }

    pub fn enable(&mut self, now: DateTime<Utc>) {
        self.enabled = true;
        if self.next_run.is_none() {
            self.next_run = self.expression.next_after(now);
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }
}
