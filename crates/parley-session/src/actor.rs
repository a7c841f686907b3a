//! Session actor: a Tokio task that owns a [`Session`] and drives it.
//!
//! All state changes happen inside one task, one event at a time: commands
//! from [`SessionHandle`]s, transport events, announcement ticks and presence
//! sweeps. After each event the actor publishes a fresh [`SessionSnapshot`]
//! on a `watch` channel.

use std::sync::Arc;

use parley_discovery::{AnnounceDue, AnnouncerSet};
use parley_protocol::{Clock, Codec, RoomName};
use parley_tick::TickScheduler;
use parley_transport::{EventStream, PubSub, TransportEvent};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::{Effect, Session, SessionConfig, SessionError, SessionSnapshot};

type Reply = oneshot::Sender<Result<(), SessionError>>;

/// Commands sent from handles to the actor.
enum Command {
    OpenRoom { room: String, reply: Reply },
    AddRoom { room: String, reply: Reply },
    SendDraft { reply: Reply },
    ChangeDraft { text: String, reply: Reply },
    ChangeAccountName { name: String, reply: Reply },
    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone. The actor stops once every handle is dropped or
/// [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Moves into `room`, creating it if unknown.
    pub async fn open_room(&self, room: impl Into<String>) -> Result<(), SessionError> {
        let room = room.into();
        self.request(|reply| Command::OpenRoom { room, reply }).await
    }

    /// Creates `room` and moves into it. No-op if it exists.
    pub async fn add_room(&self, room: impl Into<String>) -> Result<(), SessionError> {
        let room = room.into();
        self.request(|reply| Command::AddRoom { room, reply }).await
    }

    /// Sends the current draft.
    pub async fn send_draft(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::SendDraft { reply }).await
    }

    /// Replaces the draft.
    pub async fn change_draft(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::ChangeDraft { text, reply }).await
    }

    /// Renames the local account.
    pub async fn change_account_name(&self, name: impl Into<String>) -> Result<(), SessionError> {
        let name = name.into();
        self.request(|reply| Command::ChangeAccountName { name, reply })
            .await
    }

    /// The latest snapshot. Reflects every command that has already
    /// returned.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified after every processed event.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stops the actor and all of its announcers.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| SessionError::Unavailable)
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<T, C> {
    session: Session<C>,
    transport: T,
    events: EventStream,
    events_open: bool,
    commands: mpsc::Receiver<Command>,
    announcers: AnnouncerSet,
    due: mpsc::UnboundedReceiver<AnnounceDue>,
    sweep: TickScheduler,
    clock: Arc<dyn Clock>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<T: PubSub, C: Codec> SessionActor<T, C> {
    /// Runs the actor loop until shutdown.
    async fn run(mut self) {
        info!(account = %self.session.account(), "session actor started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => self.handle_transport(event),
                    None => {
                        warn!("transport event stream closed");
                        self.events_open = false;
                        let effects = self.session.on_disconnected();
                        self.execute(effects);
                    }
                },
                Some(AnnounceDue(room)) = self.due.recv() => self.handle_announce_due(room),
                _ = self.sweep.wait_for_tick() => self.handle_sweep(),
            }
            self.snapshots.send_replace(self.session.snapshot());
        }

        self.announcers.stop_all();
        info!(account = %self.session.account(), "session actor stopped");
    }

    fn handle_command(&mut self, command: Command) {
        let now = self.clock.now();
        let (result, reply) = match command {
            Command::OpenRoom { room, reply } => (self.session.open_room(&room), reply),
            Command::AddRoom { room, reply } => (self.session.add_room(&room), reply),
            Command::SendDraft { reply } => (self.session.send_draft(now), reply),
            Command::ChangeDraft { text, reply } => {
                self.session.change_draft(text);
                (Ok(Vec::new()), reply)
            }
            Command::ChangeAccountName { name, reply } => (
                self.session.change_account_name(&name).map(|()| Vec::new()),
                reply,
            ),
            Command::Shutdown => return,
        };

        let result = match result {
            Ok(effects) => {
                self.execute(effects);
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "command rejected");
                Err(e)
            }
        };
        // Reply only after the snapshot reflects the command.
        self.snapshots.send_replace(self.session.snapshot());
        let _ = reply.send(result);
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("transport connected");
                let effects = self.session.on_connected();
                self.execute(effects);
            }
            TransportEvent::Disconnected(reason) => {
                warn!(%reason, "transport disconnected");
                let effects = self.session.on_disconnected();
                self.execute(effects);
            }
            TransportEvent::Error(e) => {
                warn!(error = %e, "transport error");
            }
            TransportEvent::Message { topic, payload } => {
                let effects = self.session.on_message(&topic, &payload, self.clock.now());
                self.execute(effects);
            }
        }
    }

    fn handle_announce_due(&mut self, room: RoomName) {
        if !self.announcers.contains(room.as_str()) {
            trace!(%room, "ignoring announcement for a room no longer announced");
            return;
        }
        let effects = self.session.on_announce_due(&room, self.clock.now());
        self.execute(effects);
    }

    fn handle_sweep(&mut self) {
        let report = self.session.on_sweep(self.clock.now());
        if !report.is_empty() {
            debug!(
                came_online = report.came_online.len(),
                went_offline = report.went_offline.len(),
                purged = report.purged.len(),
                "presence sweep"
            );
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Subscribe(filter) => {
                    if let Err(e) = self.transport.subscribe(&filter) {
                        warn!(%filter, error = %e, "subscribe failed");
                    }
                }
                Effect::Publish { topic, payload } => {
                    trace!(%topic, bytes = payload.len(), "publishing");
                    if let Err(e) = self.transport.publish(&topic, payload) {
                        warn!(%topic, error = %e, "publish failed");
                    }
                }
                Effect::StartAnnouncing(room) => self.announcers.start(room),
                Effect::StopAnnouncing(room) => {
                    self.announcers.stop(room.as_str());
                }
            }
        }
    }
}

/// Spawns a session actor on `transport` and returns a handle to it.
///
/// `events` must be the event stream paired with `transport`. The session
/// subscribes and starts announcing when the stream reports
/// [`TransportEvent::Connected`].
///
/// # Errors
/// Fails if `config` names an invalid default room or a blank account.
pub fn spawn_session<T, C>(
    config: SessionConfig,
    transport: T,
    events: EventStream,
    codec: C,
    clock: Arc<dyn Clock>,
) -> Result<SessionHandle, SessionError>
where
    T: PubSub,
    C: Codec,
{
    let session = Session::new(&config, codec, clock.now())?;
    let (commands_tx, commands_rx) = mpsc::channel(config.command_buffer.max(1));
    let (due_tx, due_rx) = mpsc::unbounded_channel();
    let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

    let actor = SessionActor {
        sweep: session.presence().scheduler(),
        session,
        transport,
        events,
        events_open: true,
        commands: commands_rx,
        announcers: AnnouncerSet::new(config.discovery, due_tx),
        due: due_rx,
        clock,
        snapshots: snapshots_tx,
    };

    tokio::spawn(actor.run());

    Ok(SessionHandle {
        commands: commands_tx,
        snapshots: snapshots_rx,
    })
}
