//! The observable session store.
//!
//! Holds the aggregate client state behind a `watch` channel so readers get a
//! consistent snapshot synchronously, and publishes one [`StoreEvent`] per
//! mutation on a `broadcast` channel. Only the gateway session writes to it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use clawdash_core::{ChannelStatusMap, Direction, Message, MessageId};

/// Capacity of the per-mutation event channel.
const EVENT_CAPACITY: usize = 256;

/// Lifecycle of the gateway link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    ConnectedUnauthenticated,
    Ready,
    /// The last attempt could not even construct a transport.
    Error,
}

impl ConnectionState {
    /// Whether a transport exists or is being established.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::ConnectedUnauthenticated | Self::Ready
        )
    }
}

/// Outcome of the authenticate call for the current connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Pending,
    Accepted,
    Rejected(String),
    /// No answer before the call timeout or the link dropped first.
    Unconfirmed,
}

/// Delivery of a locally echoed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Confirmed,
    Rejected(String),
    Unconfirmed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Messages received from the gateway this session.
    pub messages_today: u64,
    /// Distinct remote senders seen this session.
    pub active_chats: u64,
}

/// A consistent view of the store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub connection_state: ConnectionState,
    /// Transcript in arrival/send order.
    pub messages: Vec<Message>,
    pub channel_status: ChannelStatusMap,
    pub counters: Counters,
    pub auth: AuthState,
    pub delivery: HashMap<MessageId, DeliveryStatus>,
    pub last_error: Option<String>,
    remote_senders: HashSet<String>,
}

impl Snapshot {
    pub fn delivery_of(&self, id: &MessageId) -> Option<&DeliveryStatus> {
        self.delivery.get(id)
    }
}

/// One store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ConnectionChanged(ConnectionState),
    MessageAppended(Message),
    ChannelStatusReplaced(ChannelStatusMap),
    DeliveryChanged {
        id: MessageId,
        status: DeliveryStatus,
    },
    AuthChanged(AuthState),
    ErrorRecorded(String),
}

/// Shared handle onto the session state. Cloning yields another handle to
/// the same store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Snapshot>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(watch::Sender::new(Snapshot::default())),
            events,
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().connection_state
    }

    pub fn channel_status(&self) -> ChannelStatusMap {
        self.state.borrow().channel_status.clone()
    }

    pub fn counters(&self) -> Counters {
        self.state.borrow().counters
    }

    /// Receiver that is marked changed on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Stream of individual mutations.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ── Mutations (gateway session only) ─────────────────────────────
    //
    // Events are published while the watch lock is held, so the event stream
    // is ordered exactly like the snapshots.

    pub(crate) fn set_connection_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|s| {
            if s.connection_state == next {
                return false;
            }
            s.connection_state = next;
            tracing::debug!(state = ?next, "connection state changed");
            self.emit(StoreEvent::ConnectionChanged(next));
            true
        });
    }

    /// Enter `Connecting` for a fresh attempt, resetting the auth outcome.
    pub(crate) fn begin_connection(&self) {
        self.state.send_modify(|s| {
            s.connection_state = ConnectionState::Connecting;
            s.auth = AuthState::Pending;
            self.emit(StoreEvent::ConnectionChanged(ConnectionState::Connecting));
            self.emit(StoreEvent::AuthChanged(AuthState::Pending));
        });
    }

    /// Append a message normalized from an inbound frame.
    pub(crate) fn record_received(&self, message: Message) {
        self.state.send_modify(|s| {
            s.counters.messages_today += 1;
            if message.direction == Direction::Incoming
                && s.remote_senders.insert(message.sender.clone())
            {
                s.counters.active_chats = s.remote_senders.len() as u64;
            }
            s.messages.push(message.clone());
            self.emit(StoreEvent::MessageAppended(message));
        });
    }

    /// Append a locally echoed message whose delivery is still pending.
    pub(crate) fn record_sent(&self, message: Message) {
        self.state.send_modify(|s| {
            s.delivery.insert(message.id.clone(), DeliveryStatus::Pending);
            s.messages.push(message.clone());
            self.emit(StoreEvent::MessageAppended(message));
        });
    }

    pub(crate) fn replace_channel_status(&self, status: ChannelStatusMap) {
        self.state.send_modify(|s| {
            s.channel_status = status.clone();
            self.emit(StoreEvent::ChannelStatusReplaced(status));
        });
    }

    pub(crate) fn set_delivery(&self, id: &MessageId, status: DeliveryStatus) {
        self.state.send_if_modified(|s| match s.delivery.get_mut(id) {
            Some(current) if *current != status => {
                *current = status.clone();
                self.emit(StoreEvent::DeliveryChanged {
                    id: id.clone(),
                    status,
                });
                true
            }
            _ => false,
        });
    }

    pub(crate) fn set_auth(&self, auth: AuthState) {
        self.state.send_modify(|s| {
            s.auth = auth.clone();
            self.emit(StoreEvent::AuthChanged(auth));
        });
    }

    pub(crate) fn record_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.state.send_modify(|s| {
            s.last_error = Some(error.clone());
            self.emit(StoreEvent::ErrorRecorded(error));
        });
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(text: &str, sender: &str) -> Message {
        Message {
            id: MessageId::generate(),
            text: text.into(),
            sender: sender.into(),
            timestamp: 1,
            direction: Direction::Incoming,
        }
    }

    #[test]
    fn starts_disconnected_with_default_status() {
        let store = SessionStore::new();
        let snap = store.snapshot();
        assert_eq!(snap.connection_state, ConnectionState::Disconnected);
        assert!(snap.messages.is_empty());
        assert_eq!(snap.channel_status, ChannelStatusMap::default());
        assert_eq!(snap.counters, Counters::default());
        assert_eq!(snap.auth, AuthState::Pending);
    }

    #[test]
    fn transcript_is_append_only() {
        let store = SessionStore::new();
        store.record_received(incoming("one", "+1"));
        let first = store.snapshot().messages[0].clone();

        store.record_sent(Message::outgoing("two", 2));
        store.record_received(incoming("three", "+2"));

        let snap = store.snapshot();
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.messages[0], first);
        let texts: Vec<_> = snap.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn counters_track_received_messages() {
        let store = SessionStore::new();
        store.record_received(incoming("a", "+1"));
        store.record_received(incoming("b", "+1"));
        store.record_received(incoming("c", "+2"));
        store.record_sent(Message::outgoing("d", 0));

        let counters = store.counters();
        assert_eq!(counters.messages_today, 3);
        assert_eq!(counters.active_chats, 2);
    }

    #[test]
    fn sent_messages_start_pending() {
        let store = SessionStore::new();
        let msg = Message::outgoing("hello", 0);
        store.record_sent(msg.clone());
        assert_eq!(
            store.snapshot().delivery_of(&msg.id),
            Some(&DeliveryStatus::Pending)
        );

        store.set_delivery(&msg.id, DeliveryStatus::Confirmed);
        let snap = store.snapshot();
        assert_eq!(snap.delivery_of(&msg.id), Some(&DeliveryStatus::Confirmed));
        assert_eq!(snap.messages[0], msg);
    }

    #[test]
    fn delivery_for_unknown_message_is_ignored() {
        let store = SessionStore::new();
        let mut events = store.events();
        store.set_delivery(&MessageId::new("ghost"), DeliveryStatus::Confirmed);
        assert!(store.snapshot().delivery.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn every_mutation_emits_an_event() {
        let store = SessionStore::new();
        let mut events = store.events();

        store.set_connection_state(ConnectionState::Ready);
        store.set_connection_state(ConnectionState::Ready);
        let status: ChannelStatusMap = [("whatsapp", "linked")].into_iter().collect();
        store.replace_channel_status(status.clone());
        let msg = incoming("hi", "+1");
        store.record_received(msg.clone());

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::ConnectionChanged(ConnectionState::Ready)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::ChannelStatusReplaced(status)
        );
        assert_eq!(events.try_recv().unwrap(), StoreEvent::MessageAppended(msg));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn events_follow_snapshot_order_across_writers() {
        let store = SessionStore::new();
        let mut events = store.events();

        let writers: Vec<_> = (0..2)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let msg = incoming(&format!("{w}-{i}"), "+1");
                        if w == 0 {
                            store.record_received(msg);
                        } else {
                            store.record_sent(msg);
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut appended = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::MessageAppended(msg) = event {
                appended.push(msg.id);
            }
        }
        let transcript: Vec<_> = store.snapshot().messages.into_iter().map(|m| m.id).collect();
        assert_eq!(transcript.len(), 200);
        assert_eq!(appended, transcript);
    }

    #[test]
    fn watchers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.replace_channel_status(ChannelStatusMap::default());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        store.set_connection_state(ConnectionState::Disconnected);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn live_states() {
        assert!(ConnectionState::Connecting.is_live());
        assert!(ConnectionState::ConnectedUnauthenticated.is_live());
        assert!(ConnectionState::Ready.is_live());
        assert!(!ConnectionState::Disconnected.is_live());
        assert!(!ConnectionState::Error.is_live());
    }
}
