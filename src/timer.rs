//! Segment-by-segment workout countdown.
//!
//! [`WorkoutTimerEngine`] is a plain state machine driven by [`tick`]
//! calls; [`WorkoutRunner`] drives it once per second on a tokio task and
//! records the finished workout.
//!
//! [`tick`]: WorkoutTimerEngine::tick

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::progress::DailyStatsTracker;

/// Remaining seconds at which the countdown warning is spoken.
pub const COUNTDOWN_WARNING_SECS: u32 = 5;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub name: String,
    pub duration_secs: u32,
    pub is_rest: bool,
    /// Estimated kcal for completing the segment
    #[serde(default)]
    pub calories: f64,
}

impl Segment {
    pub fn exercise(name: &str, duration_secs: u32, calories: f64) -> Self {
        Self {
            name: name.to_string(),
            duration_secs,
            is_rest: false,
            calories,
        }
    }

    pub fn rest(duration_secs: u32) -> Self {
        Self {
            name: "Rest".to_string(),
            duration_secs,
            is_rest: true,
            calories: 0.0,
        }
    }
}

/// Routine used when the user has no generated plan for today.
pub fn default_routine() -> Vec<Segment> {
    vec![
        Segment::exercise("Jumping Jacks", 30, 25.0),
        Segment::rest(15),
        Segment::exercise("Squats", 45, 40.0),
        Segment::rest(15),
        Segment::exercise("Plank", 60, 30.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Paused,
    Running,
    Finished,
}

/// Spoken feedback. Purely cosmetic.
pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str);
}

/// Announcer that stays silent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnnouncer;

impl Announcer for NoopAnnouncer {
    fn announce(&self, _text: &str) {}
}

/// Announcer that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, text: &str) {
        info!(target: "fitfem_api::announce", "{text}");
    }
}

/// Totals shown when a routine is done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub total_secs: u32,
    pub total_calories: f64,
    /// Segments that are not rest
    pub exercises: usize,
}

impl WorkoutSummary {
    pub fn of(routine: &[Segment]) -> Self {
        Self {
            total_secs: routine.iter().map(|s| s.duration_secs).sum(),
            total_calories: routine.iter().map(|s| s.calories).sum(),
            exercises: routine.iter().filter(|s| !s.is_rest).count(),
        }
    }

    /// "{m}m {s}s"
    pub fn total_time_label(&self) -> String {
        format!("{}m {}s", self.total_secs / 60, self.total_secs % 60)
    }
}

/// What a state change produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    Counted { remaining: u32 },
    Advanced { index: usize },
    Finished(WorkoutSummary),
}

/// Read-only view for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub index: usize,
    pub segment: Option<Segment>,
    pub remaining_secs: u32,
    /// Share of the current segment elapsed, 0..=100
    pub progress: f64,
}

pub struct WorkoutTimerEngine {
    original: Vec<Segment>,
    routine: Vec<Segment>,
    index: usize,
    remaining: u32,
    state: TimerState,
    muted: bool,
    announcer: Arc<dyn Announcer>,
}

impl WorkoutTimerEngine {
    pub fn new(routine: Vec<Segment>) -> Self {
        Self::with_announcer(routine, Arc::new(NoopAnnouncer))
    }

    pub fn with_announcer(routine: Vec<Segment>, announcer: Arc<dyn Announcer>) -> Self {
        let remaining = routine.first().map_or(0, |s| s.duration_secs);
        let state = if routine.is_empty() {
            TimerState::Finished
        } else {
            TimerState::Paused
        };
        Self {
            original: routine.clone(),
            routine,
            index: 0,
            remaining,
            state,
            muted: false,
            announcer,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    pub fn routine(&self) -> &[Segment] {
        &self.routine
    }

    pub fn current(&self) -> Option<&Segment> {
        self.routine.get(self.index)
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn summary(&self) -> WorkoutSummary {
        WorkoutSummary::of(&self.routine)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let segment = self.current().cloned();
        let progress = match &segment {
            Some(s) if s.duration_secs > 0 => {
                let elapsed = s.duration_secs.saturating_sub(self.remaining);
                f64::from(elapsed) / f64::from(s.duration_secs) * 100.0
            }
            _ => 0.0,
        };
        TimerSnapshot {
            state: self.state,
            index: self.index,
            segment,
            remaining_secs: self.remaining,
            progress,
        }
    }

    /// Start or pause. Remaining time is kept either way; a finished
    /// workout ignores the toggle.
    pub fn toggle(&mut self) -> TimerState {
        match self.state {
            TimerState::Finished => {}
            TimerState::Paused => {
                self.state = TimerState::Running;
                if let Some(name) = self.current().map(|s| s.name.clone()) {
                    self.say(&format!("Starting {name}"));
                }
            }
            TimerState::Running => {
                self.state = TimerState::Paused;
                self.say("Workout paused");
            }
        }
        self.state
    }

    /// One second of countdown. Does nothing unless running.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            return None;
        }
        if self.remaining <= 1 {
            return Some(self.advance(true));
        }
        if self.remaining == COUNTDOWN_WARNING_SECS + 1 {
            self.say(&format!("{COUNTDOWN_WARNING_SECS} seconds left"));
        }
        self.remaining -= 1;
        Some(TimerEvent::Counted {
            remaining: self.remaining,
        })
    }

    /// Jump to the next segment, or finish on the last one.
    pub fn skip(&mut self) -> Option<TimerEvent> {
        if self.state == TimerState::Finished {
            return None;
        }
        Some(self.advance(false))
    }

    /// Change a segment's duration. The active segment restarts its
    /// countdown at the new length; others apply when reached.
    pub fn set_duration(&mut self, index: usize, duration_secs: u32) -> bool {
        let Some(segment) = self.routine.get_mut(index) else {
            return false;
        };
        segment.duration_secs = duration_secs;
        if index == self.index && self.state != TimerState::Finished {
            self.remaining = duration_secs;
        }
        true
    }

    /// Reload the routine as first given and wait paused at its start.
    pub fn restart(&mut self) {
        self.routine = self.original.clone();
        self.index = 0;
        self.remaining = self.routine.first().map_or(0, |s| s.duration_secs);
        self.state = if self.routine.is_empty() {
            TimerState::Finished
        } else {
            TimerState::Paused
        };
    }

    fn advance(&mut self, announce_next: bool) -> TimerEvent {
        if self.index + 1 < self.routine.len() {
            self.index += 1;
            let next = &self.routine[self.index];
            self.remaining = next.duration_secs;
            if announce_next {
                let text = format!("Next exercise: {}", next.name);
                self.say(&text);
            }
            TimerEvent::Advanced { index: self.index }
        } else {
            self.remaining = 0;
            self.state = TimerState::Finished;
            self.say("Workout complete! Well done.");
            TimerEvent::Finished(self.summary())
        }
    }

    fn say(&self, text: &str) {
        if !self.muted {
            self.announcer.announce(text);
        }
    }
}

/// Drives a [`WorkoutTimerEngine`] in real time.
///
/// The tick task only exists while running; pausing, finishing, closing
/// or dropping the runner stops it.
pub struct WorkoutRunner {
    engine: Arc<Mutex<WorkoutTimerEngine>>,
    tracker: Option<DailyStatsTracker>,
    snapshots: watch::Sender<TimerSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl WorkoutRunner {
    pub fn new(engine: WorkoutTimerEngine, tracker: Option<DailyStatsTracker>) -> Self {
        let (snapshots, _) = watch::channel(engine.snapshot());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tracker,
            snapshots,
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn summary(&self) -> WorkoutSummary {
        self.engine.lock().await.summary()
    }

    pub async fn set_muted(&self, muted: bool) {
        self.engine.lock().await.set_muted(muted);
    }

    pub async fn toggle(&mut self) -> TimerState {
        let state = {
            let mut engine = self.engine.lock().await;
            let state = engine.toggle();
            self.snapshots.send_replace(engine.snapshot());
            state
        };
        match state {
            TimerState::Running => self.arm(),
            _ => self.disarm(),
        }
        state
    }

    /// Jump ahead. A running countdown restarts its one-second tick so the
    /// new segment gets a full first second.
    pub async fn skip(&mut self) {
        let (event, state) = {
            let mut engine = self.engine.lock().await;
            let event = engine.skip();
            self.snapshots.send_replace(engine.snapshot());
            (event, engine.state())
        };
        let Some(event) = event else {
            return;
        };
        match state {
            TimerState::Running => self.arm(),
            _ => self.disarm(),
        }
        handle_event(&event, self.tracker.as_ref()).await;
    }

    /// Change a segment's duration. Editing the active segment while
    /// running restarts the tick along with the countdown.
    pub async fn set_duration(&mut self, index: usize, duration_secs: u32) -> bool {
        let (changed, rearm) = {
            let mut engine = self.engine.lock().await;
            let changed = engine.set_duration(index, duration_secs);
            self.snapshots.send_replace(engine.snapshot());
            let active = index == engine.index() && engine.state() == TimerState::Running;
            (changed, changed && active)
        };
        if rearm {
            self.arm();
        }
        changed
    }

    pub async fn restart(&mut self) {
        self.disarm();
        let mut engine = self.engine.lock().await;
        engine.restart();
        self.snapshots.send_replace(engine.snapshot());
    }

    /// Stop ticking and leave the engine where it is.
    pub fn close(&mut self) {
        self.disarm();
    }

    pub fn is_ticking(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn arm(&mut self) {
        self.disarm();
        let engine = self.engine.clone();
        let tracker = self.tracker.clone();
        let snapshots = self.snapshots.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let event = {
                    let mut engine = engine.lock().await;
                    let event = engine.tick();
                    snapshots.send_replace(engine.snapshot());
                    event
                };
                match event {
                    Some(event @ TimerEvent::Finished(_)) => {
                        handle_event(&event, tracker.as_ref()).await;
                        break;
                    }
                    Some(event) => handle_event(&event, tracker.as_ref()).await,
                    None => break,
                }
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WorkoutRunner {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn handle_event(event: &TimerEvent, tracker: Option<&DailyStatsTracker>) {
    match event {
        TimerEvent::Counted { .. } => {}
        TimerEvent::Advanced { index } => debug!(index, "segment advanced"),
        TimerEvent::Finished(summary) => {
            info!(
                total = %summary.total_time_label(),
                calories = summary.total_calories,
                exercises = summary.exercises,
                "workout finished"
            );
            if let Some(tracker) = tracker {
                tracker.record_workout(summary.total_calories).await;
            }
        }
    }
}
