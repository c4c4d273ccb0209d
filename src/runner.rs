//! Idle loop that drives the ambient engine.
//!
//! [`AmbientLoop::spawn`] moves an [`AmbientEngine`] into a tokio task. The
//! task counts idle ticks, occasionally emits a spontaneous behavior, and
//! applies [`AmbientCommand`]s in arrival order. Because ticks and commands
//! are handled on the same task, no two draws ever race on the cooldown
//! history.

use crate::config::AmbientConfig;
use crate::engine::AmbientEngine;
use crate::error::{MeiLinError, Result};
use meilin_ambient::{AmbientClip, Clock, IdleResponse, ModeId, Selection, Timestamp};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Context tag used for draws on idle ticks.
pub const IDLE_CONTEXT: &str = "idle";
/// Context tag used for draws right after chat activity.
pub const ACTIVE_CONTEXT: &str = "active";

/// Clock backed by tokio's monotonic time, so paused-time tests move it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        let millis = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp::from_millis(millis)
    }

    fn local_hour(&self) -> u32 {
        use chrono::Timelike;
        chrono::Local::now().hour()
    }
}

/// Commands accepted by a running loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AmbientCommand {
    /// Chat or voice activity happened; restart the idle count.
    Activity,
    SwitchMode(String),
    CycleMode,
    SetEnabled(bool),
    ResetHistory,
    /// Look up a pre-generated response for this context.
    IdleResponse(String),
    /// Pick an ambient clip, e.g. `waiting_api` or `after_command`.
    Clip(String),
}

impl AmbientCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::SwitchMode(_) => "switch_mode",
            Self::CycleMode => "cycle_mode",
            Self::SetEnabled(_) => "set_enabled",
            Self::ResetHistory => "reset_history",
            Self::IdleResponse(_) => "idle_response",
            Self::Clip(_) => "clip",
        }
    }
}

/// Line syntax used by the `run` console: an empty line or `activity`,
/// `mode <id>`, `cycle`, `enable`, `disable`, `reset`, `idle <context>`,
/// `clip <context>`.
impl std::str::FromStr for AmbientCommand {
    type Err = MeiLinError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next()) {
            (None, _) | (Some("activity"), None) => Self::Activity,
            (Some("mode"), Some(mode)) => Self::SwitchMode(mode.to_owned()),
            (Some("cycle"), None) => Self::CycleMode,
            (Some("enable"), None) => Self::SetEnabled(true),
            (Some("disable"), None) => Self::SetEnabled(false),
            (Some("reset"), None) => Self::ResetHistory,
            (Some("idle"), Some(context)) => Self::IdleResponse(context.to_owned()),
            (Some("clip"), Some(context)) => Self::Clip(context.to_owned()),
            _ => return Err(MeiLinError::Runtime(format!("unrecognised command: {line:?}"))),
        };
        if words.next().is_some() {
            return Err(MeiLinError::Runtime(format!("trailing input in command: {line:?}")));
        }
        Ok(command)
    }
}

/// What caused a behavior event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    IdleTick,
    Activity,
}

/// Output of a running loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AmbientEvent {
    Behavior {
        selection: Selection,
        trigger: Trigger,
    },
    ModeChanged {
        mode: ModeId,
    },
    IdleResponse {
        response: IdleResponse,
    },
    Clip {
        clip: AmbientClip,
    },
    CommandFailed {
        command: &'static str,
        reason: String,
    },
    Stopped,
}

/// Tick timing for [`AmbientLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientLoopConfig {
    pub tick_interval: Duration,
    /// Idle ticks between ambient checks. Zero is treated as one.
    pub check_every_ticks: u32,
}

impl Default for AmbientLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            check_every_ticks: 6,
        }
    }
}

impl From<&AmbientConfig> for AmbientLoopConfig {
    fn from(config: &AmbientConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            check_every_ticks: config.check_every_ticks,
        }
    }
}

/// Sending side of a running loop.
#[derive(Debug, Clone)]
pub struct AmbientHandle {
    commands: mpsc::UnboundedSender<AmbientCommand>,
    cancel: CancellationToken,
}

impl AmbientHandle {
    /// Queue a command. Returns `false` once the loop has stopped.
    pub fn send(&self, command: AmbientCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn activity(&self) -> bool {
        self.send(AmbientCommand::Activity)
    }

    pub fn switch_mode(&self, mode: impl Into<String>) -> bool {
        self.send(AmbientCommand::SwitchMode(mode.into()))
    }

    /// Stop the loop after the command it is currently applying.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// The task side of the idle loop.
pub struct AmbientLoop {
    engine: AmbientEngine,
    config: AmbientLoopConfig,
    commands: mpsc::UnboundedReceiver<AmbientCommand>,
    events: mpsc::UnboundedSender<AmbientEvent>,
    cancel: CancellationToken,
    idle_ticks: u32,
}

impl AmbientLoop {
    /// Start the loop on the current tokio runtime.
    ///
    /// The join handle yields the engine back once the loop stops, either
    /// through [`AmbientHandle::shutdown`] or because every handle was dropped.
    pub fn spawn(
        engine: AmbientEngine,
        config: AmbientLoopConfig,
        cancel: CancellationToken,
    ) -> (
        AmbientHandle,
        mpsc::UnboundedReceiver<AmbientEvent>,
        JoinHandle<AmbientEngine>,
    ) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = AmbientHandle {
            commands: command_tx,
            cancel: cancel.clone(),
        };
        let runner = Self {
            engine,
            config,
            commands: command_rx,
            events: event_tx,
            cancel,
            idle_ticks: 0,
        };
        (handle, event_rx, tokio::spawn(runner.run()))
    }

    async fn run(mut self) -> AmbientEngine {
        let period = self.config.tick_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            tick_ms = period.as_millis() as u64,
            check_every = self.config.check_every_ticks,
            mode = %self.engine.current_mode().id,
            "ambient loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("ambient loop cancelled");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("ambient command channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }

        self.emit(AmbientEvent::Stopped);
        self.engine
    }

    fn on_tick(&mut self) {
        self.idle_ticks += 1;
        if self.idle_ticks < self.config.check_every_ticks.max(1) {
            return;
        }
        self.idle_ticks = 0;
        if self.engine.should_trigger() {
            self.draw(IDLE_CONTEXT, Trigger::IdleTick);
        }
    }

    fn apply(&mut self, command: AmbientCommand) {
        let name = command.name();
        match command {
            AmbientCommand::Activity => {
                self.idle_ticks = 0;
                if self.engine.should_trigger() {
                    self.draw(ACTIVE_CONTEXT, Trigger::Activity);
                }
            }
            AmbientCommand::SwitchMode(mode) => match self.engine.switch_mode(&mode) {
                Ok(()) => {
                    let mode = self.engine.current_mode().id.clone();
                    self.emit(AmbientEvent::ModeChanged { mode });
                }
                Err(e) => self.fail(name, e.to_string()),
            },
            AmbientCommand::CycleMode => {
                let mode = self.engine.cycle_mode().id.clone();
                self.emit(AmbientEvent::ModeChanged { mode });
            }
            AmbientCommand::SetEnabled(enabled) => self.engine.set_enabled(enabled),
            AmbientCommand::ResetHistory => self.engine.reset_history(),
            AmbientCommand::IdleResponse(context) => match self.engine.idle_response(&context) {
                Some(response) => self.emit(AmbientEvent::IdleResponse { response }),
                None => self.fail(name, format!("no idle response for context {context}")),
            },
            AmbientCommand::Clip(context) => match self.engine.clip(&context) {
                Some(clip) => self.emit(AmbientEvent::Clip { clip }),
                None => self.fail(name, format!("no ready clip for context {context}")),
            },
        }
    }

    fn draw(&mut self, context: &str, trigger: Trigger) {
        match self.engine.behavior(context) {
            Ok(Some(selection)) => self.emit(AmbientEvent::Behavior { selection, trigger }),
            Ok(None) => debug!(context, "every behavior is cooling down"),
            Err(e) => self.fail("draw", e.to_string()),
        }
    }

    fn fail(&self, command: &'static str, reason: String) {
        warn!(command, %reason, "ambient command failed");
        self.emit(AmbientEvent::CommandFailed { command, reason });
    }

    fn emit(&self, event: AmbientEvent) {
        if self.events.send(event).is_err() {
            debug!("ambient event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use meilin_ambient::{AmbientPack, StdRandom};

    fn engine(probability: f64) -> AmbientEngine {
        let parts = AmbientPack::builtin().unwrap().into_parts().unwrap();
        let clips = parts.clips.clone();
        let (selector, idle, _) = parts.into_selector().unwrap();
        AmbientEngine::new(
            selector,
            idle,
            Box::new(TokioClock::new()),
            Box::new(StdRandom::seeded(17)),
        )
        .with_clips(clips)
        .with_trigger_probability(probability)
    }

    fn fast(check_every_ticks: u32) -> AmbientLoopConfig {
        AmbientLoopConfig {
            tick_interval: Duration::from_secs(1),
            check_every_ticks,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_ticks_produce_behavior() {
        let start = Instant::now();
        let (_handle, mut events, _task) =
            AmbientLoop::spawn(engine(1.0), fast(3), CancellationToken::new());

        let event = events.recv().await.expect("event");
        match event {
            AmbientEvent::Behavior { selection, trigger } => {
                assert_eq!(trigger, Trigger::IdleTick);
                assert_eq!(selection.mode_id.as_str(), "normal");
            }
            other => panic!("expected behavior, got {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_restarts_idle_count() {
        let start = Instant::now();
        let (handle, mut events, _task) =
            AmbientLoop::spawn(engine(1.0), fast(3), CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(handle.activity());
        match events.recv().await.expect("activity event") {
            AmbientEvent::Behavior { trigger, .. } => assert_eq!(trigger, Trigger::Activity),
            other => panic!("expected behavior, got {other:?}"),
        }

        match events.recv().await.expect("idle event") {
            AmbientEvent::Behavior { trigger, .. } => assert_eq!(trigger, Trigger::IdleTick),
            other => panic!("expected behavior, got {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn mode_commands_report_outcome() {
        let (handle, mut events, _task) =
            AmbientLoop::spawn(engine(0.0), fast(1), CancellationToken::new());

        assert!(handle.switch_mode("sleepy"));
        assert!(handle.switch_mode("hyper"));
        assert!(handle.send(AmbientCommand::CycleMode));

        assert_eq!(
            events.recv().await,
            Some(AmbientEvent::ModeChanged {
                mode: "sleepy".into()
            })
        );
        match events.recv().await {
            Some(AmbientEvent::CommandFailed { command, reason }) => {
                assert_eq!(command, "switch_mode");
                assert!(reason.contains("hyper"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(
            events.recv().await,
            Some(AmbientEvent::ModeChanged {
                mode: "playful".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_loop_stays_quiet() {
        let (handle, mut events, task) =
            AmbientLoop::spawn(engine(1.0), fast(1), CancellationToken::new());
        handle.send(AmbientCommand::SetEnabled(false));
        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.shutdown();

        assert_eq!(events.recv().await, Some(AmbientEvent::Stopped));
        let engine = task.await.unwrap();
        assert!(!engine.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_response_command() {
        let (handle, mut events, _task) =
            AmbientLoop::spawn(engine(0.0), fast(1), CancellationToken::new());
        handle.send(AmbientCommand::IdleResponse("goodbye".into()));
        handle.send(AmbientCommand::IdleResponse("no_such_context".into()));

        match events.recv().await {
            Some(AmbientEvent::IdleResponse { response }) => {
                assert!(response.contexts.iter().any(|c| c == "goodbye"));
            }
            other => panic!("expected idle response, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await,
            Some(AmbientEvent::CommandFailed {
                command: "idle_response",
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn clip_command_falls_back_then_runs_dry() {
        let (handle, mut events, _task) =
            AmbientLoop::spawn(engine(0.0), fast(1), CancellationToken::new());
        handle.send(AmbientCommand::Clip("after_command".into()));
        handle.send(AmbientCommand::Clip("after_command".into()));
        handle.send(AmbientCommand::Clip("after_command".into()));

        // Two clip types are tagged after_command; the third pick falls back to idle.
        let mut kinds = Vec::new();
        for _ in 0..3 {
            match events.recv().await {
                Some(AmbientEvent::Clip { clip }) => kinds.push((clip.kind, clip.matched_context)),
                other => panic!("expected clip, got {other:?}"),
            }
        }
        assert!(kinds[0].1 && kinds[1].1);
        assert_ne!(kinds[0].0, kinds[1].0);
        assert!(!kinds[2].1);

        for _ in 0..4 {
            handle.send(AmbientCommand::Clip("idle".into()));
        }
        let mut last = None;
        for _ in 0..4 {
            last = events.recv().await;
        }
        assert!(matches!(
            last,
            Some(AmbientEvent::CommandFailed {
                command: "clip",
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_loop_and_returns_engine() {
        let (handle, mut events, task) =
            AmbientLoop::spawn(engine(0.0), fast(1), CancellationToken::new());
        handle.switch_mode("calm");
        drop(handle);

        let engine = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop should stop")
            .unwrap();
        assert_eq!(engine.current_mode().id.as_str(), "calm");
        assert_eq!(
            events.recv().await,
            Some(AmbientEvent::ModeChanged {
                mode: "calm".into()
            })
        );
        assert_eq!(events.recv().await, Some(AmbientEvent::Stopped));
    }

    #[test]
    fn console_lines_parse() {
        assert_eq!("".parse::<AmbientCommand>().unwrap(), AmbientCommand::Activity);
        assert_eq!(
            "mode sleepy".parse::<AmbientCommand>().unwrap(),
            AmbientCommand::SwitchMode("sleepy".into())
        );
        assert_eq!(
            "  idle goodbye ".parse::<AmbientCommand>().unwrap(),
            AmbientCommand::IdleResponse("goodbye".into())
        );
        assert_eq!(
            "disable".parse::<AmbientCommand>().unwrap(),
            AmbientCommand::SetEnabled(false)
        );
        assert_eq!(
            "clip waiting_api".parse::<AmbientCommand>().unwrap(),
            AmbientCommand::Clip("waiting_api".into())
        );
        assert!("mode".parse::<AmbientCommand>().is_err());
        assert!("reset now".parse::<AmbientCommand>().is_err());
        assert!("dance".parse::<AmbientCommand>().is_err());
    }

    #[test]
    fn loop_config_follows_ambient_config() {
        let config = AmbientConfig {
            tick_interval_secs: 4,
            check_every_ticks: 2,
            ..AmbientConfig::default()
        };
        let loop_config = AmbientLoopConfig::from(&config);
        assert_eq!(loop_config.tick_interval, Duration::from_secs(4));
        assert_eq!(loop_config.check_every_ticks, 2);
        assert_eq!(
            AmbientLoopConfig::default(),
            AmbientLoopConfig::from(&AmbientConfig::default())
        );
    }
}
