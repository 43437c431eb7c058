// src/session/runner.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval};
use uuid::Uuid;

use super::{AttemptSession, Phase, SessionError, SessionEvent, SessionView, Step};

type Reply = oneshot::Sender<Result<SessionView, SessionError>>;

enum Command {
    Select { option: usize, reply: Reply },
    Advance { reply: Reply },
    Retry { reply: Reply },
    Reload { reply: Reply },
}

/// Cloneable handle to a session running on its own task.
///
/// The task owns the [`AttemptSession`] and its countdown. Commands and ticks
/// are handled one at a time, so a tick can never interleave with an advance
/// or a pending write. The task stops once the session is finished or every
/// handle has been dropped; the countdown stops with it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    user_id: String,
    test_id: String,
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    last_activity: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    /// Starts the session task. Events are delivered on the returned receiver,
    /// beginning with `Started`.
    pub fn spawn(
        session: AttemptSession,
        tick_every: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (view_tx, view_rx) = watch::channel(session.view());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let handle = SessionHandle {
            id: Uuid::new_v4(),
            user_id: session.user_id().to_string(),
            test_id: session.test_id().to_string(),
            commands: command_tx,
            view: view_rx,
            last_activity: Arc::new(Mutex::new(Instant::now())),
        };

        let _ = event_tx.send(session.started_event());
        tokio::spawn(run(session, command_rx, view_tx, event_tx, tick_every));

        (handle, event_rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Latest published view. Stays readable after the task stops.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// True until the session reaches a terminal phase.
    pub fn is_live(&self) -> bool {
        matches!(
            self.view.borrow().phase,
            Phase::InProgress | Phase::Submitting
        )
    }

    /// True when the session is parked in `Submitting` and nobody has sent it
    /// a command for `idle_for`. Nothing but a manual retry can move it on.
    pub fn is_stalled(&self, idle_for: Duration) -> bool {
        let idle = self
            .last_activity
            .lock()
            .map(|at| at.elapsed() >= idle_for)
            .unwrap_or(true);
        idle && self.view.borrow().phase == Phase::Submitting
    }

    pub async fn select_option(&self, option: usize) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::Select { option, reply }).await
    }

    pub async fn advance(&self) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::Advance { reply }).await
    }

    pub async fn retry_submission(&self) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::Retry { reply }).await
    }

    pub async fn reload_test(&self) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::Reload { reply }).await
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> Command,
    ) -> Result<SessionView, SessionError> {
        if let Ok(mut at) = self.last_activity.lock() {
            *at = Instant::now();
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }
}

async fn run(
    mut session: AttemptSession,
    mut commands: mpsc::Receiver<Command>,
    view_tx: watch::Sender<SessionView>,
    events: mpsc::UnboundedSender<SessionEvent>,
    tick_every: Duration,
) {
    let mut ticker = session
        .is_counting_down()
        .then(|| time::interval_at(Instant::now() + tick_every, tick_every));

    loop {
        tokio::select! {
            _ = next_tick(&mut ticker) => {
                if session.tick() == Step::Submit {
                    view_tx.send_replace(session.view());
                    match session.submit().await {
                        Ok(event) => emit(&events, event),
                        Err(e) => emit_error(&events, &e),
                    }
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("All handles dropped for session on test {}", session.test_id());
                    break;
                };
                handle_command(&mut session, command, &events, &view_tx).await;
            }
        }

        if !session.is_counting_down() {
            ticker = None;
        }
        view_tx.send_replace(session.view());

        if matches!(
            session.phase(),
            Phase::Terminal { .. } | Phase::AlreadyAttempted
        ) {
            break;
        }
    }
}

async fn handle_command(
    session: &mut AttemptSession,
    command: Command,
    events: &mpsc::UnboundedSender<SessionEvent>,
    view_tx: &watch::Sender<SessionView>,
) {
    let (result, reply) = match command {
        Command::Select { option, reply } => (session.select_option(option), reply),
        Command::Advance { reply } => {
            let result = match session.advance() {
                Ok(Step::Submit) => {
                    // Observers see the frozen state while the write is pending.
                    view_tx.send_replace(session.view());
                    session.submit().await.map(|event| emit(events, event))
                }
                Ok(Step::Moved(event)) => {
                    emit(events, event);
                    Ok(())
                }
                Ok(Step::Idle) => Ok(()),
                Err(e) => Err(e),
            };
            (result, reply)
        }
        Command::Retry { reply } => {
            let result = session.submit().await.map(|event| emit(events, event));
            (result, reply)
        }
        Command::Reload { reply } => (session.reload_test().await, reply),
    };

    if let Err(e) = &result {
        emit_error(events, e);
    }

    // Publish before replying so callers never read a stale view.
    let view = session.view();
    view_tx.send_replace(view.clone());
    let _ = reply.send(result.map(|_| view));
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn emit(events: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    let _ = events.send(event);
}

fn emit_error(events: &mpsc::UnboundedSender<SessionEvent>, error: &SessionError) {
    emit(
        events,
        SessionEvent::Errored {
            message: error.to_string(),
        },
    );
}
