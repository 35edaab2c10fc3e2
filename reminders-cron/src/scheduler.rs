//! Cron job scheduler.

use crate::error::{CronError, CronResult};
use crate::expression::CronExpression;
use crate::job::{Job, JobContext, JobStatus};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type Jobs = Arc<RwLock<HashMap<String, Job>>>;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often due jobs are checked
    pub tick_interval: Duration,

    /// Offset that job expressions are evaluated in
    pub utc_offset: FixedOffset,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            utc_offset: Utc.fix(),
        }
    }
}

/// Cron job scheduler.
pub struct CronScheduler {
    jobs: Jobs,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        debug!(
            tick_interval = ?config.tick_interval,
            utc_offset = %config.utc_offset,
            "Initializing cron scheduler"
        );
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            config,
            running: Arc::new(RwLock::new(false)),
            handle: None,
        }
    }

    /// Register a job.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reminders_cron::*;
    ///
    /// # async fn example() -> Result<(), CronError> {
    /// let mut scheduler = CronScheduler::new();
    ///
    /// scheduler
    ///     .add_job("reminders", CronPresets::DAILY, |ctx| async move {
    ///         println!("run #{}", ctx.execution_count);
    ///         Ok(())
    ///     })
    ///     .await?;
    ///
    /// scheduler.start().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn add_job<F, Fut>(
        &self,
        name: impl Into<String>,
        expression: &str,
        function: F,
    ) -> CronResult<()>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CronResult<()>> + Send + 'static,
    {
        let name = name.into();
        let expr = CronExpression::parse(expression)?.in_offset(self.config.utc_offset);

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&name) {
            return Err(CronError::JobAlreadyExists(name));
        }

        let job = Job::new(name.clone(), expr, Utc::now(), function);
        info!(job = %name, schedule = expression, next_run = ?job.next_run, "Cron job added");
        jobs.insert(name, job);
        Ok(())
    }

    pub async fn remove_job(&self, name: &str) -> CronResult<()> {
        self.jobs
            .write()
            .await
            .remove(name)
            .ok_or_else(|| CronError::JobNotFound(name.to_string()))?;
        Ok(())
    }

    /// Job names, sorted.
    pub async fn list_jobs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn enable_job(&self, name: &str) -> CronResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| CronError::JobNotFound(name.to_string()))?;
        job.enable(Utc::now());
        Ok(())
    }

    pub async fn disable_job(&self, name: &str) -> CronResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| CronError::JobNotFound(name.to_string()))?;
        job.disable();
        Ok(())
    }

    /// Run every job due at `now`, one after another. Returns how many ran.
    pub async fn run_pending(&self, now: DateTime<Utc>) -> usize {
        run_pending(&self.jobs, now).await
    }

    /// Start ticking in a background task.
    pub async fn start(&mut self) -> CronResult<()> {
        let mut running = self.running.write().await;
        if *running {
            warn!("Cron scheduler already running");
            return Err(CronError::SchedulerAlreadyRunning);
        }
        *running = true;
        drop(running);

        info!("Cron scheduler started");

        let jobs = self.jobs.clone();
        let running = self.running.clone();
        let tick_interval = self.config.tick_interval;

        let handle = tokio::spawn(async move {
            while *running.read().await {
                run_pending(&jobs, Utc::now()).await;
                tokio::time::sleep(tick_interval).await;
            }
        });

        self.handle = Some(handle);
        Ok(())
    }

    pub async fn stop(&mut self) -> CronResult<()> {
        let mut running = self.running.write().await;
        if !*running {
            return Err(CronError::SchedulerNotRunning);
        }
        *running = false;
        drop(running);

        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        info!("Cron scheduler stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn get_stats(&self, name: &str) -> CronResult<JobStats> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(name)
            .ok_or_else(|| CronError::JobNotFound(name.to_string()))?;

        Ok(JobStats {
            name: job.name.clone(),
            enabled: job.enabled,
            execution_count: job.execution_count,
            last_run: job.last_run,
            next_run: job.next_run,
            status: job.status.clone(),
        })
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// The job lock is not held while a job body runs.
async fn run_pending(jobs: &RwLock<HashMap<String, Job>>, now: DateTime<Utc>) -> usize {
    let started: Vec<_> = {
        let mut jobs = jobs.write().await;
        let mut names: Vec<&String> = jobs.keys().collect();
        names.sort();
        let names: Vec<String> = names.into_iter().cloned().collect();

        names
            .into_iter()
            .filter_map(|name| {
                let job = jobs.get_mut(&name)?;
                job.begin(now).map(|(function, ctx)| (name, function, ctx))
            })
            .collect()
    };

    let count = started.len();
    for (name, function, ctx) in started {
        debug!(job = %name, delay = %ctx.delay(), "Executing cron job");
        let result = function(ctx).await;

        match &result {
            Ok(()) => debug!(job = %name, "Cron job completed"),
            Err(e) => error!(job = %name, error = %e, "Cron job failed"),
        }

        if let Some(job) = jobs.write().await.get_mut(&name) {
            job.finish(&result, Utc::now().max(now));
        }
    }
    count
}

/// Job statistics.
#[derive(Debug, Clone)]
pub struct JobStats {
    pub name: String,
    pub enabled: bool,
    pub execution_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub status: JobStatus,
}
