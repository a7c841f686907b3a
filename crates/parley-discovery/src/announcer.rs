//! Announcer tasks and their cancellation handles.

use std::collections::HashMap;
use std::time::Duration;

use parley_protocol::RoomName;
use parley_tick::{TickConfig, TickScheduler};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Announcement cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Time between announcements for one room.
    pub announce_interval: Duration,
    /// Upper bound of a random delay before the first announcement.
    pub initial_jitter: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            announce_interval: Duration::from_millis(500),
            initial_jitter: Duration::from_millis(50),
        }
    }
}

impl DiscoveryConfig {
    /// Clamps out-of-range values.
    pub fn validated(self) -> Self {
        let tick = self.tick_config().validated();
        Self {
            announce_interval: tick.period,
            initial_jitter: tick.initial_jitter,
        }
    }

    fn tick_config(&self) -> TickConfig {
        TickConfig::every(self.announce_interval).with_jitter(self.initial_jitter)
    }
}

/// "Time to announce `room`", enqueued by an announcer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceDue(pub RoomName);

/// Owns a running announcer task. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct AnnouncerHandle {
    room: RoomName,
    task: JoinHandle<()>,
}

impl AnnouncerHandle {
    /// The announced room.
    pub fn room(&self) -> &RoomName {
        &self.room
    }

    /// Stops the announcer. Same as dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }

    /// Whether the task has exited, e.g. because the queue was closed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AnnouncerHandle {
    fn drop(&mut self) {
        self.task.abort();
        trace!(room = %self.room, "announcer cancelled");
    }
}

/// Spawns a task that enqueues [`AnnounceDue`] for `room` on every tick.
///
/// The task ends on its own once `sink` is closed.
pub fn spawn_announcer(
    room: RoomName,
    config: &DiscoveryConfig,
    sink: mpsc::UnboundedSender<AnnounceDue>,
) -> AnnouncerHandle {
    let mut scheduler = TickScheduler::new(config.tick_config());
    let task_room = room.clone();
    let task = tokio::spawn(async move {
        loop {
            let tick = scheduler.wait_for_tick().await;
            trace!(room = %task_room, tick = tick.tick, "announcement due");
            if sink.send(AnnounceDue(task_room.clone())).is_err() {
                debug!(room = %task_room, "event queue closed, announcer exiting");
                break;
            }
        }
    });
    AnnouncerHandle { room, task }
}

/// The `room -> announcer` table of a session.
///
/// At most one announcer runs per room: [`start`](Self::start) cancels any
/// previous one first.
#[derive(Debug)]
pub struct AnnouncerSet {
    config: DiscoveryConfig,
    sink: mpsc::UnboundedSender<AnnounceDue>,
    handles: HashMap<RoomName, AnnouncerHandle>,
}

impl AnnouncerSet {
    /// Creates an empty set whose announcers all feed `sink`.
    pub fn new(config: DiscoveryConfig, sink: mpsc::UnboundedSender<AnnounceDue>) -> Self {
        Self {
            config: config.validated(),
            sink,
            handles: HashMap::new(),
        }
    }

    /// (Re)starts announcing `room`.
    pub fn start(&mut self, room: RoomName) {
        self.stop(room.as_str());
        debug!(%room, "announcer started");
        let handle = spawn_announcer(room.clone(), &self.config, self.sink.clone());
        self.handles.insert(room, handle);
    }

    /// Stops announcing `room`. Returns `false` if it wasn't announced.
    pub fn stop(&mut self, room: &str) -> bool {
        self.handles.remove(room).is_some()
    }

    /// Stops every announcer.
    pub fn stop_all(&mut self) {
        self.handles.clear();
    }

    /// Whether `room` is currently announced.
    ///
    /// Used to discard an [`AnnounceDue`] that was queued before its
    /// announcer was cancelled.
    pub fn contains(&self, room: &str) -> bool {
        self.handles.contains_key(room)
    }

    /// Announced rooms, sorted.
    pub fn rooms(&self) -> Vec<&RoomName> {
        let mut rooms: Vec<&RoomName> = self.handles.keys().collect();
        rooms.sort();
        rooms
    }

    /// Number of running announcers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if nothing is announced.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
