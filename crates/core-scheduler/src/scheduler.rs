//! Scheduler (component I, spec §4.I): single-writer loop consulting a
//! state-keyed task table, generalized from the teacher's `Daemon` shape
//! (JoinSet + CancellationToken + `tokio::select!`) to dispatch by
//! MarketClock state instead of by a fixed set of named loops.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};
use core_models::MarketState;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::market_clock::MarketClock;

/// How often a task fires once it becomes due for its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Every(StdDuration),
    DailyAt { hour: u32, minute: u32 },
    WeeklyAt { weekday: Weekday, hour: u32, minute: u32 },
}

/// One entry of the authoritative task table (spec §4.I). Priority order
/// within a state is declaration order in `Scheduler::new`'s task list.
pub struct ScheduledTask {
    pub id: String,
    pub state: MarketState,
    pub cadence: Cadence,
    /// When true, the task is handed to the bounded worker pool instead of
    /// being awaited before the next clock read (spec §4.I step 3).
    pub background_safe: bool,
    last_fired: Option<chrono::DateTime<Utc>>,
}

impl ScheduledTask {
    pub fn new(id: impl Into<String>, state: MarketState, cadence: Cadence, background_safe: bool) -> Self {
        Self {
            id: id.into(),
            state,
            cadence,
            background_safe,
            last_fired: None,
        }
    }

    fn is_due(&self, now: chrono::DateTime<Utc>) -> bool {
        match self.cadence {
            Cadence::Every(period) => match self.last_fired {
                None => true,
                Some(last) => now - last >= Duration::from_std(period).unwrap_or(Duration::zero()),
            },
            Cadence::DailyAt { hour, minute } => daily_due(self.last_fired, now, hour, minute),
            Cadence::WeeklyAt { weekday, hour, minute } => {
                now.weekday() == weekday && daily_due(self.last_fired, now, hour, minute)
            }
        }
    }
}

fn daily_due(last_fired: Option<chrono::DateTime<Utc>>, now: chrono::DateTime<Utc>, hour: u32, minute: u32) -> bool {
    let boundary = NaiveTime::from_hms_opt(hour, minute, 0).expect("static hh:mm is always valid");
    if now.time() < boundary {
        return false;
    }
    match last_fired {
        None => true,
        Some(last) => last.date_naive() != now.date_naive(),
    }
}

/// A concrete task body. Implementations live in the `core` crate, which
/// wires TradingAgent, NewsPipeline, OvernightPipeline, and UniverseManager
/// calls into named handlers registered on the Scheduler.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self) -> Result<(), SchedulerError>;
}

pub struct Scheduler {
    clock: MarketClock,
    tasks: Vec<ScheduledTask>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(clock: MarketClock, tasks: Vec<ScheduledTask>) -> Self {
        Self {
            clock,
            tasks,
            handlers: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn register(&mut self, task_id: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(task_id.into(), handler);
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// One scheduler tick (spec §4.I steps 1-4): read the clock, dispatch
    /// every due task for the current state in table order, then return how
    /// long the caller may sleep before the next tick is worth taking.
    pub async fn tick(&mut self, join_set: &mut JoinSet<()>) -> StdDuration {
        let now = Utc::now();
        let state = self.clock.now_state(now).await;

        let due_ids: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state == state && t.is_due(now))
            .map(|(i, _)| i)
            .collect();

        for idx in due_ids {
            let task_id = self.tasks[idx].id.clone();
            let background_safe = self.tasks[idx].background_safe;
            self.tasks[idx].last_fired = Some(now);

            let Some(handler) = self.handlers.get(&task_id).cloned() else {
                warn!(task = %task_id, "due task has no registered handler, skipping");
                continue;
            };

            if background_safe {
                let task_id_for_join = task_id.clone();
                join_set.spawn(async move {
                    if let Err(e) = handler.run().await {
                        warn!(task = %task_id_for_join, error = %e, "background task failed");
                    }
                });
            } else {
                info!(task = %task_id, %state, "dispatching task");
                if let Err(e) = handler.run().await {
                    warn!(task = %task_id, error = %e, "task failed");
                }
            }
        }

        let next_boundary = self.next_state_boundary_sleep(now, state);
        let next_task = self.next_task_sleep(now);
        next_boundary.min(next_task).min(StdDuration::from_secs(60))
    }

    fn next_state_boundary_sleep(&self, now: chrono::DateTime<Utc>, state: MarketState) -> StdDuration {
        let next_state = match state {
            MarketState::ActiveTrading => MarketState::MarketClosing,
            MarketState::MarketClosing => MarketState::EveningAnalysis,
            MarketState::EveningAnalysis => MarketState::OvernightSleep,
            MarketState::OvernightSleep => MarketState::PremarketPrep,
            MarketState::PremarketPrep => MarketState::ActiveTrading,
            MarketState::Unknown => return StdDuration::from_secs(60),
        };
        self.clock
            .time_until(now, next_state)
            .to_std()
            .unwrap_or(StdDuration::from_secs(60))
    }

    fn next_task_sleep(&self, now: chrono::DateTime<Utc>) -> StdDuration {
        self.tasks
            .iter()
            .filter_map(|t| match t.cadence {
                Cadence::Every(period) => {
                    let elapsed = t.last_fired.map(|last| now - last).unwrap_or(Duration::max_value());
                    let period = Duration::from_std(period).unwrap_or(Duration::seconds(60));
                    (period - elapsed).to_std().ok()
                }
                _ => None,
            })
            .min()
            .unwrap_or(StdDuration::from_secs(60))
    }

    /// Runs ticks until cancelled. Mirrors the teacher's
    /// `Daemon::run`/`tokio::select!` shutdown shape: every suspending wait
    /// races the cancellation token so shutdown is prompt even mid-sleep.
    pub async fn run(mut self) -> Result<(), SchedulerError> {
        let mut join_set: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("scheduler cancelled, draining background tasks");
                    while join_set.join_next().await.is_some() {}
                    return Ok(());
                }
                sleep_for = async { self.tick(&mut join_set).await } => {
                    tokio::select! {
                        _ = tokio::time::sleep(sleep_for) => {}
                        _ = self.cancel.cancelled() => {
                            while join_set.join_next().await.is_some() {}
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskHandler for CountingHandler {
        async fn run(&self) -> Result<(), SchedulerError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn due_task_in_current_state_dispatches_once_per_tick() {
        let clock = MarketClock::new("America/New_York".parse().unwrap(), None);
        let current_state = clock.now_state(Utc::now()).await;

        let tasks = vec![
            ScheduledTask::new("matching", current_state, Cadence::Every(StdDuration::from_secs(1)), false),
            ScheduledTask::new(
                "non_matching",
                if current_state == MarketState::ActiveTrading {
                    MarketState::OvernightSleep
                } else {
                    MarketState::ActiveTrading
                },
                Cadence::Every(StdDuration::from_secs(1)),
                false,
            ),
        ];
        let mut scheduler = Scheduler::new(clock, tasks);
        let matching_count = Arc::new(AtomicUsize::new(0));
        let non_matching_count = Arc::new(AtomicUsize::new(0));
        scheduler.register("matching", Arc::new(CountingHandler { count: matching_count.clone() }));
        scheduler.register("non_matching", Arc::new(CountingHandler { count: non_matching_count.clone() }));

        let mut join_set = JoinSet::new();
        scheduler.tick(&mut join_set).await;

        assert_eq!(matching_count.load(Ordering::SeqCst), 1);
        assert_eq!(non_matching_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn is_due_fires_on_first_check_then_waits_out_the_period() {
        let mut task = ScheduledTask::new(
            "t",
            MarketState::ActiveTrading,
            Cadence::Every(StdDuration::from_secs(300)),
            false,
        );
        let now = Utc::now();
        assert!(task.is_due(now));
        task.last_fired = Some(now);
        assert!(!task.is_due(now));
        assert!(task.is_due(now + Duration::seconds(301)));
    }

    #[test]
    fn daily_at_fires_once_per_day_after_the_boundary() {
        let mut task = ScheduledTask::new(
            "daily",
            MarketState::PremarketPrep,
            Cadence::DailyAt { hour: 6, minute: 0 },
            false,
        );
        let before_boundary = Utc::now()
            .date_naive()
            .and_hms_opt(5, 0, 0)
            .unwrap()
            .and_utc();
        assert!(!task.is_due(before_boundary));

        let after_boundary = before_boundary + Duration::hours(2);
        assert!(task.is_due(after_boundary));
        task.last_fired = Some(after_boundary);
        assert!(!task.is_due(after_boundary + Duration::minutes(10)));
    }
}
