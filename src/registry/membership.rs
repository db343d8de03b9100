use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::types::{
    ConnectionId, EvictedConnection, JoinOutcome, LeaveOutcome, LivenessSweep, OutboundFrame,
    Recipient, RoomSnapshot,
};

/// Bookkeeping for one registered connection
struct ConnectionEntry {
    sender: mpsc::UnboundedSender<OutboundFrame>,
    alive: bool,
    user_id: Option<String>,
    room_id: Option<String>,
}

#[derive(Default)]
struct RegistryInner {
    rooms: HashMap<String, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl RegistryInner {
    /// Removes a connection from a room's member set, deleting the room when
    /// it empties. Returns whether the room was deleted.
    fn remove_member(&mut self, room_id: &str, conn: ConnectionId) -> bool {
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(room_id);
                info!(room_id = %room_id, "Room is now empty, deleting");
                return true;
            }
        }
        false
    }

    fn leave(&mut self, conn: ConnectionId) -> LeaveOutcome {
        let room_id = match self.connections.get_mut(&conn) {
            Some(entry) => entry.room_id.take(),
            None => return LeaveOutcome::NotInRoom,
        };
        let Some(room_id) = room_id else {
            return LeaveOutcome::NotInRoom;
        };
        let room_deleted = self.remove_member(&room_id, conn);
        LeaveOutcome::Left {
            room_id,
            room_deleted,
        }
    }
}

/// Room membership and connection bookkeeping for the relay.
///
/// Explicitly owned and internally synchronized: every connection task holds a
/// shared handle, and parallel tests instantiate their own. All mutations go
/// through one mutex, which is never held across sends to a socket or awaits;
/// broadcast callers snapshot the member list and send outside the lock.
pub struct RoomRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Registers a freshly accepted connection and hands back its id.
    /// The connection has no room membership until it joins.
    pub fn register(&self, sender: mpsc::UnboundedSender<OutboundFrame>) -> ConnectionId {
        let id = ConnectionId::new();
        let mut inner = self.inner.lock().unwrap();
        inner.connections.insert(
            id,
            ConnectionEntry {
                sender,
                alive: true,
                user_id: None,
                room_id: None,
            },
        );
        debug!(connection_id = %id, "Connection registered");
        id
    }

    /// Inserts a connection into a room, creating the room if absent.
    ///
    /// A connection already in a different room is atomically migrated: it is
    /// removed from the old room (deleting it if emptied) and inserted into
    /// the new one under a single lock acquisition. The user id is recorded on
    /// the first join and never overwritten.
    pub fn join(&self, conn: ConnectionId, room_id: &str, user_id: &str) -> JoinOutcome {
        let mut inner = self.inner.lock().unwrap();

        let previous_room = match inner.connections.get_mut(&conn) {
            Some(entry) => {
                if entry.room_id.as_deref() == Some(room_id) {
                    debug!(connection_id = %conn, room_id = %room_id, "Connection already in room");
                    return JoinOutcome::Rejoined;
                }
                if entry.user_id.is_none() {
                    entry.user_id = Some(user_id.to_string());
                }
                entry.room_id.replace(room_id.to_string())
            }
            None => return JoinOutcome::UnknownConnection,
        };

        if let Some(previous) = &previous_room {
            inner.remove_member(previous, conn);
        }

        let members = inner.rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!(room_id = %room_id, "Creating room");
            HashSet::new()
        });
        members.insert(conn);

        match previous_room {
            Some(previous_room) => JoinOutcome::Migrated { previous_room },
            None => JoinOutcome::Joined,
        }
    }

    /// Removes a connection from its current room, deleting the room when it
    /// empties. No-op for connections without membership.
    pub fn leave(&self, conn: ConnectionId) -> LeaveOutcome {
        self.inner.lock().unwrap().leave(conn)
    }

    /// `leave` plus side-table removal. Dropping the stored sender is what
    /// lets an orphaned outbound pump wind down.
    pub fn unregister(&self, conn: ConnectionId) -> LeaveOutcome {
        let mut inner = self.inner.lock().unwrap();
        let outcome = inner.leave(conn);
        if inner.connections.remove(&conn).is_some() {
            debug!(connection_id = %conn, "Connection unregistered");
        }
        outcome
    }

    /// Snapshot of a room's member list minus the given connection, with
    /// cloned sender handles so callers iterate outside the lock.
    pub fn members_excluding(&self, room_id: &str, conn: ConnectionId) -> Vec<Recipient> {
        let inner = self.inner.lock().unwrap();
        let Some(members) = inner.rooms.get(room_id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|id| **id != conn)
            .filter_map(|id| {
                inner.connections.get(id).map(|entry| Recipient {
                    id: *id,
                    sender: entry.sender.clone(),
                })
            })
            .collect()
    }

    /// Read-only view of every open room, sorted by room id
    pub fn room_snapshot(&self) -> Vec<RoomSnapshot> {
        let inner = self.inner.lock().unwrap();
        let mut snapshot: Vec<RoomSnapshot> = inner
            .rooms
            .iter()
            .map(|(room_id, members)| RoomSnapshot {
                room_id: room_id.clone(),
                participants: members.len(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        snapshot
    }

    /// Member count for one room; 0 when the room does not exist
    pub fn participant_count(&self, room_id: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.rooms.get(room_id).map_or(0, HashSet::len)
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.inner.lock().unwrap().connections.len()
    }

    /// Delivers one frame directly to a connection. Returns false when the
    /// connection is unknown or its pump is gone.
    pub fn send_to(&self, conn: ConnectionId, frame: OutboundFrame) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.connections.get(&conn) {
            Some(entry) => entry.sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Resets a connection's liveness flag. Called for any inbound traffic.
    pub fn mark_alive(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.connections.get_mut(&conn) {
            entry.alive = true;
        }
    }

    /// One liveness cycle: connections whose flag is still down are
    /// hard-terminated and removed from bookkeeping; the rest have their flag
    /// lowered and a probe enqueued. A connection is evicted only after
    /// staying silent for one full cycle.
    pub fn sweep_liveness(&self) -> LivenessSweep {
        let mut inner = self.inner.lock().unwrap();

        let stale: Vec<ConnectionId> = inner
            .connections
            .iter()
            .filter(|(_, entry)| !entry.alive)
            .map(|(id, _)| *id)
            .collect();

        let mut sweep = LivenessSweep::default();
        for id in stale {
            if let Some(entry) = inner.connections.remove(&id) {
                let _ = entry.sender.send(OutboundFrame::Terminate);
                if let Some(room_id) = &entry.room_id {
                    inner.remove_member(room_id, id);
                }
                sweep.evicted.push(EvictedConnection {
                    id,
                    user_id: entry.user_id,
                    room_id: entry.room_id,
                });
            }
        }

        for entry in inner.connections.values_mut() {
            entry.alive = false;
            let _ = entry.sender.send(OutboundFrame::Ping);
            sweep.probed += 1;
        }

        sweep
    }

    /// Shutdown path: hard-terminates every open connection and clears all
    /// bookkeeping. Returns how many connections were closed.
    pub fn terminate_all(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let count = inner.connections.len();
        for entry in inner.connections.values() {
            let _ = entry.sender.send(OutboundFrame::Terminate);
        }
        inner.connections.clear();
        inner.rooms.clear();
        count
    }
}
