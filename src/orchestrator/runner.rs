use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::machine::{self, Effect, Event, InterviewState, Stage, TimerPurpose};
use super::view::SessionView;
use crate::config::Config;
use crate::device::{CaptureBackend, CaptureProfile, DeviceStream};
use crate::error::{ConflictCode, SessionError};
use crate::gateway::{resolve_with_retry, SessionGateway};
use crate::presence::{FrameDetector, PresenceMonitor};
use crate::recording::RecordingPipeline;
use crate::timer::CountdownTimer;

/// User actions from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Retry,
    Leave,
}

/// Completions raised by background tasks the runner owns
enum Signal {
    Timer { generation: u64, fired: TimerFired },
    Recorder { index: usize, error: SessionError },
    Presence(bool),
}

enum TimerFired {
    Tick(u32),
    Elapsed,
}

/// Cloneable control surface for a running interview
///
/// Dropping every handle counts as leaving the flow.
#[derive(Clone)]
pub struct InterviewHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SessionView>,
}

impl InterviewHandle {
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn retry(&self) -> Result<()> {
        self.send(Command::Retry)
    }

    pub fn leave(&self) -> Result<()> {
        self.send(Command::Leave)
    }

    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("interview runner is no longer running"))
    }

    /// Latest published view
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Wait until the published view satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionView>
    where
        F: FnMut(&SessionView) -> bool,
    {
        let mut view = self.view.clone();
        let matched = view
            .wait_for(|v| predicate(v))
            .await
            .map_err(|_| anyhow!("interview runner is no longer running"))?;
        Ok(matched.clone())
    }
}

/// Drives one candidate through one interview session
///
/// Owns every resource of the flow (device stream, countdown, recording
/// pipeline, presence monitor) and processes one event at a time.
pub struct InterviewRunner {
    access_token: String,
    config: Config,
    gateway: Arc<dyn SessionGateway>,
    detector: Arc<dyn FrameDetector>,
    stream: DeviceStream,
    timer: CountdownTimer,
    timer_generation: u64,
    pipeline: Option<RecordingPipeline>,
    monitor: Option<PresenceMonitor>,
    preparation_started: Option<Instant>,
    state: InterviewState,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Commands that arrived while an effect was in flight
    deferred: VecDeque<Command>,
    left: bool,
    signals_tx: mpsc::UnboundedSender<Signal>,
    signals_rx: mpsc::UnboundedReceiver<Signal>,
    view: watch::Sender<SessionView>,
}

impl InterviewRunner {
    pub fn new(
        access_token: impl Into<String>,
        config: Config,
        gateway: Arc<dyn SessionGateway>,
        backend: Arc<dyn CaptureBackend>,
        detector: Arc<dyn FrameDetector>,
    ) -> (Self, InterviewHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(SessionView::default());

        let runner = Self {
            access_token: access_token.into(),
            config,
            gateway,
            detector,
            stream: DeviceStream::new(backend),
            timer: CountdownTimer::new(),
            timer_generation: 0,
            pipeline: None,
            monitor: None,
            preparation_started: None,
            state: InterviewState::default(),
            commands: commands_rx,
            deferred: VecDeque::new(),
            left: false,
            signals_tx,
            signals_rx,
            view: view_tx,
        };

        let handle = InterviewHandle {
            commands: commands_tx,
            view: view_rx,
        };

        (runner, handle)
    }

    /// Build a runner and spawn it on the current runtime
    pub fn spawn(
        access_token: impl Into<String>,
        config: Config,
        gateway: Arc<dyn SessionGateway>,
        backend: Arc<dyn CaptureBackend>,
        detector: Arc<dyn FrameDetector>,
    ) -> (InterviewHandle, JoinHandle<()>) {
        let (runner, handle) = Self::new(access_token, config, gateway, backend, detector);
        (handle, tokio::spawn(runner.run()))
    }

    pub async fn run(mut self) {
        info!("Interview runner started");

        self.dispatch(Event::Begin).await;

        while !self.left {
            let event = match self.deferred.pop_front() {
                Some(command) => command_event(Some(command)),
                None => tokio::select! {
                    Some(signal) = self.signals_rx.recv() => match self.accept(signal) {
                        Some(event) => event,
                        None => continue,
                    },
                    command = self.commands.recv() => command_event(command),
                },
            };

            self.dispatch(event).await;
        }

        info!("Interview runner stopped");
    }

    /// Translate a background signal, dropping ticks from cancelled timers
    fn accept(&self, signal: Signal) -> Option<Event> {
        match signal {
            Signal::Timer { generation, .. } if generation != self.timer_generation => {
                debug!("Dropping signal from stale timer {}", generation);
                None
            }
            Signal::Timer {
                fired: TimerFired::Tick(remaining),
                ..
            } => Some(Event::Tick(remaining)),
            Signal::Timer {
                fired: TimerFired::Elapsed,
                ..
            } => Some(Event::TimerElapsed),
            Signal::Recorder { index, error } => Some(Event::RecorderFailed { index, error }),
            Signal::Presence(warning) => Some(Event::PresenceChanged(warning)),
        }
    }

    async fn dispatch(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            if matches!(event, Event::Leave) {
                self.left = true;
            }

            let before = self.state.stage.kind();
            let state = std::mem::take(&mut self.state);
            let (next, effects) = machine::transition(state, event);
            self.state = next;

            let after = self.state.stage.kind();
            if after != before {
                match &self.state.stage {
                    Stage::Error(e) => error!("Interview failed in {:?}: {}", before, e),
                    stage => info!(
                        "Stage {:?} -> {:?} (question {:?})",
                        before,
                        after,
                        stage.question_index()
                    ),
                }
            }

            self.publish();

            for effect in effects {
                let Some(follow_up) = self.perform(effect).await else {
                    continue;
                };

                // Leaving drops whatever the interrupted effect would have led to
                let leaving = matches!(follow_up, Event::Leave);
                if leaving {
                    pending.clear();
                }
                pending.push_back(follow_up);
                if leaving {
                    break;
                }
            }
        }
    }

    fn publish(&self) {
        self.view.send_replace(SessionView::from(&self.state));
    }

    async fn perform(&mut self, effect: Effect) -> Option<Event> {
        debug!("Effect: {:?}", effect);

        match effect {
            Effect::AcquireDevice(profile) => {
                let constraints = match profile {
                    CaptureProfile::Preview => &self.config.capture.preview,
                    CaptureProfile::Recording => &self.config.capture.recording,
                };

                let acquired = unless_left(
                    &mut self.commands,
                    &mut self.deferred,
                    self.stream.acquire(profile, constraints),
                )
                .await;

                Some(match acquired {
                    None => Event::Leave,
                    Some(Ok(())) => Event::DeviceReady(profile),
                    Some(Err(e)) => Event::Failed(e),
                })
            }

            Effect::ReleaseDevice => {
                self.stream.release();
                None
            }

            Effect::ResolveSession => {
                let resolved = unless_left(
                    &mut self.commands,
                    &mut self.deferred,
                    resolve_with_retry(
                        self.gateway.as_ref(),
                        &self.access_token,
                        self.config.gateway.resolve_attempts,
                        self.config.gateway.resolve_backoff(),
                    ),
                )
                .await;

                Some(match resolved {
                    None => Event::Leave,
                    Some(Ok(descriptor)) => Event::Resolved(descriptor),
                    Some(Err(e)) => Event::Failed(e),
                })
            }

            Effect::StartSession => {
                let started = unless_left(
                    &mut self.commands,
                    &mut self.deferred,
                    self.gateway.start(&self.access_token),
                )
                .await;

                Some(match started {
                    None => Event::Leave,
                    Some(Ok(receipt)) => Event::Started(receipt),
                    Some(Err(e)) => Event::Failed(e),
                })
            }

            Effect::StartTimer { seconds, purpose } => {
                self.start_timer(seconds, purpose);
                None
            }

            Effect::CancelTimer => {
                self.timer.cancel();
                self.timer_generation += 1;
                None
            }

            Effect::BeginCapture { index } => Some(self.begin_capture(index).await),

            Effect::FinishCapture => {
                let Some(pipeline) = self.pipeline.as_ref() else {
                    return Some(Event::Failed(SessionError::RecorderFailure(
                        "no active recording to stop".to_string(),
                    )));
                };

                debug!("Finishing capture for question {}", pipeline.question_id());
                let stopped =
                    unless_left(&mut self.commands, &mut self.deferred, pipeline.stop()).await;

                // An interrupted stop leaves the pipeline for the teardown to abort
                let Some(result) = stopped else {
                    return Some(Event::Leave);
                };
                self.pipeline = None;

                match result {
                    Ok(Some(artifact)) => Some(Event::ArtifactReady(artifact)),
                    Ok(None) => None,
                    Err(e) => Some(Event::Failed(e)),
                }
            }

            Effect::Submit(artifact) => {
                let Some(session_id) = self.state.session.as_ref().map(|s| s.id.clone()) else {
                    return Some(Event::Failed(SessionError::conflict(
                        ConflictCode::SessionNotFound,
                        "no session to submit to",
                    )));
                };

                let submitted = unless_left(
                    &mut self.commands,
                    &mut self.deferred,
                    self.gateway.submit(&session_id, &artifact),
                )
                .await;

                Some(match submitted {
                    None => {
                        warn!("Left during upload of question {}", artifact.question_id);
                        Event::Leave
                    }
                    Some(Ok(())) => Event::Submitted,
                    Some(Err(e)) => Event::Failed(e),
                })
            }

            Effect::AbortCapture => {
                if let Some(pipeline) = self.pipeline.take() {
                    pipeline.abort();
                }
                None
            }

            Effect::StartPresence => {
                if self.monitor.is_none() {
                    let signals = self.signals_tx.clone();
                    self.monitor = Some(PresenceMonitor::spawn(
                        self.stream.frame_feed(),
                        Arc::clone(&self.detector),
                        &self.config.presence,
                        move |warning| {
                            let _ = signals.send(Signal::Presence(warning));
                        },
                    ));
                }
                None
            }

            Effect::StopPresence => {
                if let Some(monitor) = self.monitor.take() {
                    monitor.stop();
                }
                None
            }
        }
    }

    fn start_timer(&mut self, seconds: u32, purpose: TimerPurpose) {
        self.timer.cancel();
        self.timer_generation += 1;
        let generation = self.timer_generation;

        if purpose == TimerPurpose::Preparation {
            self.preparation_started = Some(Instant::now());
        }

        let ticks = self.signals_tx.clone();
        let done = self.signals_tx.clone();

        self.timer.start(
            seconds,
            move |remaining| {
                let _ = ticks.send(Signal::Timer {
                    generation,
                    fired: TimerFired::Tick(remaining),
                });
            },
            move || {
                let _ = done.send(Signal::Timer {
                    generation,
                    fired: TimerFired::Elapsed,
                });
            },
        );
    }

    async fn begin_capture(&mut self, index: usize) -> Event {
        let Some(question_id) = self
            .state
            .session
            .as_ref()
            .and_then(|s| s.question(index))
            .map(|q| q.id)
        else {
            return Event::Failed(SessionError::RecorderFailure(format!(
                "no question at index {}",
                index
            )));
        };

        let preparation_ms_used = self
            .preparation_started
            .take()
            .map_or(0, |started| started.elapsed().as_millis() as u64);

        let signals = self.signals_tx.clone();
        let started = unless_left(
            &mut self.commands,
            &mut self.deferred,
            RecordingPipeline::start(
                &mut self.stream,
                question_id,
                preparation_ms_used,
                &self.config.capture,
                move |error| {
                    let _ = signals.send(Signal::Recorder { index, error });
                },
            ),
        )
        .await;

        match started {
            None => Event::Leave,
            Some(Ok(pipeline)) => {
                self.pipeline = Some(pipeline);
                Event::CaptureStarted
            }
            Some(Err(e)) => Event::Failed(e),
        }
    }
}

fn command_event(command: Option<Command>) -> Event {
    match command {
        Some(Command::Start) => Event::StartRequested,
        Some(Command::Stop) => Event::StopRequested,
        Some(Command::Retry) => Event::RetryRequested,
        Some(Command::Leave) | None => Event::Leave,
    }
}

/// Drive `effect` to completion unless the candidate leaves first
///
/// Returns `None` on Leave or when every handle is gone. Other commands that
/// arrive meanwhile are queued in `deferred` for the main loop.
async fn unless_left<F: Future>(
    commands: &mut mpsc::UnboundedReceiver<Command>,
    deferred: &mut VecDeque<Command>,
    effect: F,
) -> Option<F::Output> {
    tokio::pin!(effect);

    loop {
        tokio::select! {
            output = &mut effect => return Some(output),
            command = commands.recv() => match command {
                Some(Command::Leave) | None => return None,
                Some(command) => deferred.push_back(command),
            },
        }
    }
}
