//! Periodic room scan driving the lifecycle controller.

use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use super::{
    config::EngineConfig,
    controller::{LifecycleController, REASON_INSUFFICIENT_PLAYERS, StartOutcome, StopOutcome},
};
use crate::{
    game::{
        errors::{EngineError, EngineResult},
        models::{FieldValue, Game},
        phase::GamePhase,
        repository::GameRepository,
    },
    metrics,
};

/// What the decision rule asks for, given a seated count and a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomDecision {
    Start,
    Stop,
    NoAction,
}

/// Apply the start/stop rule; exactly one outcome per evaluation
///
/// A phase that is missing or unrecognized counts as "not waiting": such a
/// room is stopped when under the threshold and otherwise left alone.
pub fn decide(players: usize, phase: &FieldValue<GamePhase>, min_players: usize) -> RoomDecision {
    let waiting = phase.is(&GamePhase::Waiting);
    if players >= min_players && waiting {
        RoomDecision::Start
    } else if players < min_players && !waiting {
        RoomDecision::Stop
    } else {
        RoomDecision::NoAction
    }
}

/// What happened to one room during a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    Started { game_id: String },
    Stopped { previous_phase: String },
    NoAction,
    /// Room has no game record
    Skipped,
}

/// Summary of one scan over every active room
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub rooms_checked: usize,
    pub games_started: usize,
    pub games_stopped: usize,
    pub failures: usize,
    /// Scan ended early because the monitor was stopped
    pub cancelled: bool,
}

/// Point-in-time monitor statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStatistics {
    pub running: bool,
    pub check_interval: Duration,
    pub min_players_to_start: usize,
    pub ticks: u64,
    pub rooms_checked: u64,
    pub games_started: u64,
    pub games_stopped: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    rooms_checked: AtomicU64,
    games_started: AtomicU64,
    games_stopped: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn record(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.rooms_checked
            .fetch_add(report.rooms_checked as u64, Ordering::Relaxed);
        self.games_started
            .fetch_add(report.games_started as u64, Ordering::Relaxed);
        self.games_stopped
            .fetch_add(report.games_stopped as u64, Ordering::Relaxed);
        self.failures
            .fetch_add(report.failures as u64, Ordering::Relaxed);
    }
}

struct MonitorInner {
    repo: GameRepository,
    controller: LifecycleController,
    config: EngineConfig,
    counters: Counters,
    running: AtomicBool,
}

struct RunningTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background loop that starts and stops hands as players come and go
///
/// `start` spawns the loop on the current tokio runtime; `stop` signals
/// cancellation and waits for the loop to exit. A scan in progress stops
/// between rooms, but a transition that has begun always completes.
pub struct RoomMonitor {
    inner: Arc<MonitorInner>,
    task: Mutex<Option<RunningTask>>,
}

impl RoomMonitor {
    pub fn new(controller: LifecycleController, config: EngineConfig) -> Self {
        let repo = controller.repository().clone();
        Self {
            inner: Arc::new(MonitorInner {
                repo,
                controller,
                config,
                counters: Counters::default(),
                running: AtomicBool::new(false),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Spawn the scan loop; no-op if it is already running
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            log::debug!("Room monitor already running");
            return;
        }

        let (cancel, cancelled) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        inner.running.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(async move { inner.run(cancelled).await });
        *task = Some(RunningTask { cancel, handle });

        log::info!(
            "Room monitor started (interval {:?}, min players {})",
            self.inner.config.check_interval,
            self.inner.config.min_players_to_start
        );
    }

    /// Signal the loop to stop and wait for it to finish; no-op if not running
    pub async fn stop(&self) {
        let Some(RunningTask { cancel, handle }) = self.task.lock().await.take() else {
            return;
        };
        let _ = cancel.send(true);
        if let Err(e) = handle.await {
            log::error!("Room monitor task ended abnormally: {}", e);
        }
        self.inner.running.store(false, Ordering::SeqCst);
        log::info!("Room monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run one scan immediately, whether or not the loop is running
    pub async fn force_check(&self) -> TickReport {
        log::info!("Forced room check requested");
        self.inner.tick(None).await
    }

    /// Evaluate a single room now
    ///
    /// Fails with `RoomNotFound` when the room has no game record.
    pub async fn check_specific_room(&self, club_id: &str, room_id: &str) -> EngineResult<RoomAction> {
        let game = self
            .inner
            .repo
            .get_game(club_id, room_id)
            .await?
            .ok_or_else(|| EngineError::RoomNotFound {
                club_id: club_id.to_string(),
                room_id: room_id.to_string(),
            })?;
        let players = self.inner.repo.get_players_count(club_id, room_id).await?;
        self.inner.evaluate(club_id, room_id, players, &game).await
    }

    pub fn statistics(&self) -> MonitorStatistics {
        let counters = &self.inner.counters;
        MonitorStatistics {
            running: self.is_running(),
            check_interval: self.inner.config.check_interval,
            min_players_to_start: self.inner.config.min_players_to_start,
            ticks: counters.ticks.load(Ordering::Relaxed),
            rooms_checked: counters.rooms_checked.load(Ordering::Relaxed),
            games_started: counters.games_started.load(Ordering::Relaxed),
            games_stopped: counters.games_stopped.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Fails with `MonitorNotRunning` or the store's connectivity error
    pub async fn health_check(&self) -> EngineResult<()> {
        if !self.is_running() {
            return Err(EngineError::MonitorNotRunning);
        }
        self.inner.repo.store().ping().await?;
        Ok(())
    }
}

impl MonitorInner {
    async fn run(&self, mut cancelled: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Some(&cancelled)).await;
                    if *cancelled.borrow() {
                        break;
                    }
                }

                changed = cancelled.changed() => {
                    if changed.is_err() || *cancelled.borrow() {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        log::debug!("Room monitor loop exited");
    }

    /// Scan every club's active rooms once
    async fn tick(&self, cancelled: Option<&watch::Receiver<bool>>) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        let index_keys = match self.repo.scan_active_room_indexes().await {
            Ok(keys) => keys,
            Err(e) => {
                log::error!("Failed to scan active room indexes: {}", e);
                metrics::transition_failure("evaluate");
                report.failures += 1;
                self.finish_tick(&report, started);
                return report;
            }
        };

        'clubs: for index_key in &index_keys {
            let Some(club_id) = self.repo.keys().extract_club_id(index_key) else {
                log::warn!("Skipping malformed room index key {}", index_key);
                continue;
            };

            let room_ids = match self.repo.active_room_ids(club_id).await {
                Ok(ids) => ids,
                Err(e) => {
                    log::error!("Failed to read active rooms of club {}: {}", club_id, e);
                    metrics::transition_failure("evaluate");
                    report.failures += 1;
                    continue;
                }
            };

            for room_id in &room_ids {
                if cancelled.is_some_and(|rx| *rx.borrow()) {
                    log::info!("Room scan cancelled");
                    report.cancelled = true;
                    break 'clubs;
                }

                report.rooms_checked += 1;
                match self.check_room(club_id, room_id).await {
                    Ok(RoomAction::Started { .. }) => report.games_started += 1,
                    Ok(RoomAction::Stopped { .. }) => report.games_stopped += 1,
                    Ok(RoomAction::NoAction | RoomAction::Skipped) => {}
                    Err(e) => {
                        log::error!("Error checking room {}:{}: {}", club_id, room_id, e);
                        report.failures += 1;
                    }
                }
            }
        }

        self.finish_tick(&report, started);
        report
    }

    fn finish_tick(&self, report: &TickReport, started: Instant) {
        self.counters.record(report);
        metrics::monitor_tick(started.elapsed());
        metrics::rooms_checked(report.rooms_checked);
        log::debug!(
            "Room scan: {} checked, {} started, {} stopped, {} failed",
            report.rooms_checked,
            report.games_started,
            report.games_stopped,
            report.failures
        );
    }

    async fn check_room(&self, club_id: &str, room_id: &str) -> EngineResult<RoomAction> {
        let players = self.repo.get_players_count(club_id, room_id).await?;
        let Some(game) = self.repo.get_game(club_id, room_id).await? else {
            log::debug!("Room {}:{} has no game record, skipping", club_id, room_id);
            return Ok(RoomAction::Skipped);
        };
        self.evaluate(club_id, room_id, players, &game).await
    }

    async fn evaluate(
        &self,
        club_id: &str,
        room_id: &str,
        players: usize,
        game: &Game,
    ) -> EngineResult<RoomAction> {
        let min_players = self.config.min_players_to_start;
        match decide(players, &game.phase, min_players) {
            RoomDecision::Start => {
                log::info!(
                    "Room {}:{} has {} players (min {}), starting game",
                    club_id,
                    room_id,
                    players,
                    min_players
                );
                let outcome = self
                    .controller
                    .start_game(club_id, room_id, players)
                    .await
                    .inspect_err(|_| metrics::transition_failure("start"))?;
                Ok(match outcome {
                    StartOutcome::Started { game_id } => RoomAction::Started { game_id },
                    StartOutcome::AlreadyInProgress => RoomAction::NoAction,
                })
            }
            RoomDecision::Stop => {
                log::info!(
                    "Room {}:{} has {} players (min {}), stopping game",
                    club_id,
                    room_id,
                    players,
                    min_players
                );
                let outcome = self
                    .controller
                    .stop_game(club_id, room_id, REASON_INSUFFICIENT_PLAYERS)
                    .await
                    .inspect_err(|_| metrics::transition_failure("stop"))?;
                Ok(match outcome {
                    StopOutcome::Stopped { previous_phase } => {
                        RoomAction::Stopped { previous_phase }
                    }
                    StopOutcome::AlreadyWaiting => RoomAction::NoAction,
                })
            }
            RoomDecision::NoAction => {
                if !game.phase.is_known() {
                    log::warn!(
                        "Room {}:{} has phase {} with {} players, leaving it alone",
                        club_id,
                        room_id,
                        game.phase,
                        players
                    );
                }
                Ok(RoomAction::NoAction)
            }
        }
    }
}
