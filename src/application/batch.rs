//! Batch Runner
//!
//! Independent backtests over many pairs and configurations. Configurations
//! are validated when the batch is built; data errors are collected per job
//! and the remaining jobs still run.

use serde::Serialize;

use crate::application::pair_runner::{PairReport, PairRunner};
use crate::domain::error::{EngineError, EngineResult};
use crate::ports::PriceSource;
use crate::strategy::params::StrategyConfig;

/// One pair under one configuration
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub label: String,
    pub y: String,
    pub x: String,
    pub config: StrategyConfig,
}

impl BatchJob {
    pub fn new(y: impl Into<String>, x: impl Into<String>, config: StrategyConfig) -> Self {
        let (y, x) = (y.into(), x.into());
        Self {
            label: format!("{y}/{x}"),
            y,
            x,
            config,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A job that failed on its data
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub label: String,
    pub y: String,
    pub x: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub successes: Vec<PairReport>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

#[derive(Debug)]
pub struct BatchRunner {
    jobs: Vec<(BatchJob, PairRunner)>,
    force_sequential: bool,
}

impl BatchRunner {
    /// Validates every job's configuration; the first invalid one aborts the batch
    pub fn new(jobs: Vec<BatchJob>) -> EngineResult<Self> {
        let jobs = jobs
            .into_iter()
            .map(|job| {
                let runner = PairRunner::new(job.config.clone()).map_err(|e| {
                    tracing::error!(job = %job.label, error = %e, "invalid job configuration");
                    EngineError::from(e)
                })?;
                Ok((job, runner))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            jobs,
            force_sequential: false,
        })
    }

    /// Run jobs one after another even with the `parallel` feature
    pub fn sequential(mut self) -> Self {
        self.force_sequential = true;
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn run<S: PriceSource + ?Sized>(&self, source: &S) -> BatchReport {
        let outcomes = map_slice(
            &self.jobs,
            |(job, runner)| source.pair(&job.y, &job.x).and_then(|pair| runner.run(&pair)),
            self.force_sequential,
        );

        let mut report = BatchReport::default();
        for ((job, _), outcome) in self.jobs.iter().zip(outcomes) {
            match outcome {
                Ok(mut pair_report) => {
                    pair_report.pair = job.label.clone();
                    report.successes.push(pair_report);
                }
                Err(e) => {
                    tracing::warn!(job = %job.label, error = %e, "job failed, continuing");
                    report.failures.push(BatchFailure {
                        label: job.label.clone(),
                        y: job.y.clone(),
                        x: job.x.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.successes.len(),
            failed = report.failures.len(),
            "batch complete"
        );
        report
    }
}

/// Map over a slice, in parallel when the `parallel` feature is enabled.
/// Output order matches input order.
fn map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if force_sequential {
            slice.iter().map(f).collect()
        } else {
            slice.par_iter().map(f).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        slice.iter().map(f).collect()
    }
}
