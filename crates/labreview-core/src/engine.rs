//! Batch review engine.
//!
//! Drives one run over an ordered list of report slots: one slot per tick,
//! strictly in input order, never in parallel. Progress leaves through a
//! channel; a stop handle halts the run between ticks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::ReviewError;
use crate::model::{Course, ReportSlot};
use crate::report::{finalize_run, TaskRunRecord};
use crate::results::ReportRecord;
use crate::simulator::score_slot;
use crate::state::AppState;
use crate::traits::{load_prompt_or_none, ProgressReporter, PromptKey, ReviewStore};

/// Configuration for the review engine.
#[derive(Debug, Clone)]
pub struct ReviewEngineConfig {
    /// Time between two scored reports.
    pub tick_interval: Duration,
    /// Estimated review time per report, used for the remaining-time estimate.
    pub minutes_per_report: f64,
    /// Reject runs that include experiments without a configured prompt.
    pub require_prompts: bool,
}

impl Default for ReviewEngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            minutes_per_report: 0.1,
            require_prompts: true,
        }
    }
}

/// Overall progress of a run after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Rounded percentage of completed reports.
    pub percent: u32,
    /// Estimated minutes left, rounded up.
    pub remaining_minutes: u64,
}

impl Progress {
    fn new(completed: usize, total: usize, minutes_per_report: f64) -> Self {
        let percent = if total == 0 {
            0
        } else {
            (completed as f64 * 100.0 / total as f64).round() as u32
        };
        let remaining = total.saturating_sub(completed) as f64;
        Self {
            completed,
            total,
            percent,
            remaining_minutes: (remaining * minutes_per_report).ceil() as u64,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Progress of one experiment within a run. `done` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentProgress {
    pub experiment_id: String,
    pub name: String,
    pub done: usize,
    pub total: usize,
}

impl ExperimentProgress {
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}

/// Events emitted while a run is driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started {
        run_id: String,
        course_id: String,
        total: usize,
    },
    ReportScored {
        record: ReportRecord,
        progress: Progress,
        experiment: ExperimentProgress,
    },
    Finished {
        run_id: String,
        completed: usize,
        persisted: bool,
    },
    Stopped {
        run_id: String,
        completed: usize,
        total: usize,
    },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every slot was scored and the run was finalized.
    /// `persisted` is `false` when the store rejected the record.
    Completed {
        record: TaskRunRecord,
        persisted: bool,
    },
    /// A stop request halted the run. Records scored so far stay in the state;
    /// nothing is finalized or persisted.
    Stopped {
        run_id: String,
        completed: usize,
        total: usize,
    },
}

impl RunOutcome {
    pub fn completed(&self) -> usize {
        match self {
            RunOutcome::Completed { record, .. } => record.total,
            RunOutcome::Stopped { completed, .. } => *completed,
        }
    }
}

/// Requests a running review to stop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    /// Halt the run before its next tick. Idempotent.
    pub fn stop(&self) {
        self.0.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }
}

/// The engine's side of a [`StopHandle`].
#[derive(Debug)]
pub struct StopSignal(watch::Receiver<bool>);

impl StopSignal {
    /// Resolves once a stop was requested. Never resolves if every handle
    /// was dropped without stopping.
    async fn stopped(&mut self) {
        let closed = self.0.wait_for(|stopped| *stopped).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected stop handle and signal.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle(Arc::new(tx)), StopSignal(rx))
}

/// The batch review engine.
pub struct ReviewEngine {
    store: Arc<dyn ReviewStore>,
    config: ReviewEngineConfig,
}

impl ReviewEngine {
    pub fn new(store: Arc<dyn ReviewStore>, config: ReviewEngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ReviewEngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ReviewStore> {
        &self.store
    }

    /// Check a selection without scoring anything.
    pub async fn validate(&self, course: &Course, slots: &[ReportSlot]) -> Result<(), ReviewError> {
        if slots.is_empty() {
            return Err(ReviewError::EmptySelection);
        }

        let mut selected: Vec<&str> = Vec::new();
        for slot in slots {
            if course.experiment(&slot.experiment_id).is_none() {
                return Err(ReviewError::UnknownExperiment {
                    course_id: course.id.clone(),
                    experiment_id: slot.experiment_id.clone(),
                });
            }
            if !selected.contains(&slot.experiment_id.as_str()) {
                selected.push(&slot.experiment_id);
            }
        }

        if self.config.require_prompts {
            let mut names = Vec::new();
            for exp_id in selected {
                let key = PromptKey::new(&course.id, exp_id);
                let configured = load_prompt_or_none(self.store.as_ref(), &key)
                    .await
                    .is_some_and(|p| p.is_configured());
                if !configured {
                    let name = course
                        .experiment(exp_id)
                        .map(|e| e.name.clone())
                        .unwrap_or_else(|| exp_id.to_string());
                    names.push(name);
                }
            }
            if !names.is_empty() {
                return Err(ReviewError::UnconfiguredExperiments { names });
            }
        }

        Ok(())
    }

    /// Drive a run over `slots` for the course selected in `state`.
    ///
    /// Rejected selections return an error before any record is created.
    /// Storage failures while persisting the finished run are logged and
    /// reported through [`RunOutcome::Completed::persisted`].
    pub async fn run(
        &self,
        state: &mut AppState,
        slots: Vec<ReportSlot>,
        progress: mpsc::UnboundedSender<ProgressEvent>,
        mut stop: StopSignal,
    ) -> Result<RunOutcome, ReviewError> {
        let course = state
            .current_course()
            .cloned()
            .ok_or(ReviewError::MissingCourse)?;
        self.validate(&course, &slots).await?;

        if let Some(stale) = state.active_run() {
            tracing::warn!("discarding stale active run {}", stale.run_id);
        }
        let run = state.begin_run(&course.id);
        let total = slots.len();
        tracing::info!(
            "starting review run {} for {}: {total} report(s)",
            run.run_id,
            course.id
        );
        let _ = progress.send(ProgressEvent::Started {
            run_id: run.run_id.clone(),
            course_id: course.id.clone(),
            total,
        });

        let mut per_experiment: HashMap<&str, ExperimentProgress> = HashMap::new();
        for slot in &slots {
            per_experiment
                .entry(slot.experiment_id.as_str())
                .or_insert_with(|| ExperimentProgress {
                    experiment_id: slot.experiment_id.clone(),
                    name: course
                        .experiment(&slot.experiment_id)
                        .map(|e| e.name.clone())
                        .unwrap_or_default(),
                    done: 0,
                    total: 0,
                })
                .total += 1;
        }

        let period = self.config.tick_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for (completed, slot) in slots.iter().enumerate() {
            tokio::select! {
                biased;
                _ = stop.stopped() => {
                    state.end_run();
                    tracing::info!("review run {} stopped after {completed}/{total}", run.run_id);
                    let _ = progress.send(ProgressEvent::Stopped {
                        run_id: run.run_id.clone(),
                        completed,
                        total,
                    });
                    return Ok(RunOutcome::Stopped {
                        run_id: run.run_id,
                        completed,
                        total,
                    });
                }
                _ = ticker.tick() => {}
            }

            let score = score_slot(slot);
            let record = ReportRecord::from_slot(&course.id, &run.run_id, slot, score);
            state.push_record(record.clone());

            let experiment = match per_experiment.get_mut(slot.experiment_id.as_str()) {
                Some(exp) => {
                    exp.done += 1;
                    exp.clone()
                }
                None => continue,
            };
            tracing::debug!(
                "scored {}:{}:{} = {score} ({}/{})",
                slot.experiment_id,
                slot.report_type,
                slot.index,
                completed + 1,
                total
            );
            let _ = progress.send(ProgressEvent::ReportScored {
                record,
                progress: Progress::new(completed + 1, total, self.config.minutes_per_report),
                experiment,
            });
        }

        state.end_run();
        let record = finalize_run(&run.run_id, &course, state.records(), run.started_at);
        let persisted = match self.store.prepend_task_record(record.clone()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to save task record {}: {e}", record.id);
                false
            }
        };
        tracing::info!(
            "review run {} finished: {} report(s), avg {:.1}",
            record.id,
            record.total,
            record.avg_score
        );
        let _ = progress.send(ProgressEvent::Finished {
            run_id: record.id.clone(),
            completed: record.total,
            persisted,
        });

        Ok(RunOutcome::Completed { record, persisted })
    }

    /// Like [`ReviewEngine::run`], forwarding every event to `reporter`.
    pub async fn run_with_reporter(
        &self,
        state: &mut AppState,
        slots: Vec<ReportSlot>,
        reporter: &dyn ProgressReporter,
        stop: StopSignal,
    ) -> Result<RunOutcome, ReviewError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let drive = self.run(state, slots, tx, stop);
        let forward = async {
            while let Some(event) = rx.recv().await {
                reporter.on_event(&event);
            }
        };
        let (outcome, ()) = tokio::join!(drive, forward);
        outcome
    }
}
