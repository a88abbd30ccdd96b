//! The gateway session.
//!
//! `GatewaySession` drives the connection lifecycle (connect, authenticate,
//! ready, disconnect), routes inbound frames into the [`SessionStore`], and
//! performs sends with an optimistic local echo.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use clawdash_core::codec::{decode_frame, encode_request};
use clawdash_core::error::{DashError, DashResult};
use clawdash_core::normalize::{is_message_event, normalize, now_millis, Message};
use clawdash_core::rpc::{FrameKind, Request, AUTH_CALL_ID};
use clawdash_core::status::status_update;

use crate::config::SessionConfig;
use crate::pending::{CallIds, CallOutcome, PendingCalls};
use crate::store::{AuthState, ConnectionState, DeliveryStatus, SessionStore};
use crate::transport::{self, OutboundHandle, TransportEvent};

/// How long `disconnect` waits for the close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(3);

/// A live transport and the tasks serving it.
struct Link {
    generation: u64,
    outbound: OutboundHandle,
    pending: PendingCalls,
    runtime: Handle,
    router: JoinHandle<()>,
    pump: JoinHandle<()>,
}

type SharedLink = Arc<Mutex<Option<Link>>>;

fn lock_link(link: &SharedLink) -> MutexGuard<'_, Option<Link>> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The single gateway session of a client.
pub struct GatewaySession {
    config: SessionConfig,
    store: SessionStore,
    call_ids: CallIds,
    link: SharedLink,
    /// Bumped on every successful open; stale tasks compare against it.
    generation: Arc<AtomicU64>,
    /// Serializes `connect` so at most one transport is ever dialed.
    connect_lock: tokio::sync::Mutex<()>,
}

impl GatewaySession {
    pub fn new(config: SessionConfig, store: SessionStore) -> Self {
        Self {
            config,
            store,
            call_ids: CallIds::default(),
            link: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Open the gateway link and authenticate.
    ///
    /// A no-op while a link is already open or being opened. The session is
    /// `Ready` as soon as the authenticate call is on the wire; its outcome is
    /// reported through [`AuthState`] without blocking traffic.
    pub async fn connect(&self) -> DashResult<()> {
        let _guard = self.connect_lock.lock().await;

        if self.store.connection_state().is_live() && lock_link(&self.link).is_some() {
            tracing::debug!("connect ignored: link already open");
            return Ok(());
        }

        if let Err(e) = transport::validate_url(&self.config.gateway_url) {
            return Err(self.fail_attempt(e));
        }
        let auth = encode_request(&Request::authenticate(&self.config.auth_token))?;

        self.store.begin_connection();
        let conn = match transport::websocket::connect(
            &self.config.gateway_url,
            self.config.connect_timeout,
        )
        .await
        {
            Ok(conn) => conn,
            Err(e) => return Err(self.fail_attempt(e)),
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.set_connection_state(ConnectionState::ConnectedUnauthenticated);

        let pending = PendingCalls::default();
        let auth_rx = pending.register(AUTH_CALL_ID);
        if let Err(e) = conn.outbound.send_text(auth) {
            conn.pump.abort();
            return Err(self.fail_attempt(e));
        }
        self.store.set_connection_state(ConnectionState::Ready);
        tracing::info!(url = %self.config.gateway_url, "gateway session ready");

        let runtime = Handle::current();
        runtime.spawn(track_auth(
            pending.clone(),
            auth_rx,
            self.config.call_timeout,
            self.store.clone(),
            self.generation.clone(),
            generation,
        ));

        // Hold the lock while spawning so the router cannot tear down a link
        // that has not been stored yet.
        let mut slot = lock_link(&self.link);
        let router = runtime.spawn(route_events(
            conn.events,
            self.store.clone(),
            pending.clone(),
            self.link.clone(),
            self.generation.clone(),
            generation,
        ));
        *slot = Some(Link {
            generation,
            outbound: conn.outbound,
            pending,
            runtime,
            router,
            pump: conn.pump,
        });

        Ok(())
    }

    /// Close the link. The session ends `Disconnected`; nothing reconnects.
    pub async fn disconnect(&self) -> DashResult<()> {
        let Some(link) = lock_link(&self.link).take() else {
            return Ok(());
        };
        link.outbound.close();

        let Link {
            mut router,
            pump,
            pending,
            generation,
            ..
        } = link;
        if time::timeout(CLOSE_GRACE, &mut router).await.is_err() {
            tracing::warn!("close handshake timed out, dropping link");
            router.abort();
            pump.abort();
            pending.fail_all();
            if self.generation.load(Ordering::SeqCst) == generation {
                self.store.set_connection_state(ConnectionState::Disconnected);
            }
        }
        Ok(())
    }

    /// Send `text` to the configured default peer.
    pub fn send(&self, text: &str) -> DashResult<Message> {
        let peer = self.config.peer.as_deref().ok_or(DashError::NoRecipient)?;
        self.send_message(peer, text)
    }

    /// Send `text` to `to` over the WhatsApp channel.
    ///
    /// Returns as soon as the call is queued. The outgoing message is appended
    /// to the store immediately with a pending delivery status that follows
    /// the gateway's response.
    pub fn send_message(&self, to: &str, text: &str) -> DashResult<Message> {
        if text.trim().is_empty() {
            return Err(DashError::EmptyMessage);
        }
        if to.trim().is_empty() {
            return Err(DashError::NoRecipient);
        }

        let (outbound, pending, runtime) = self.ready_link()?;
        let id = self.call_ids.next();
        let frame = encode_request(&Request::whatsapp_send(id, to, text))?;

        let rx = pending.register(id);
        if let Err(e) = outbound.send_text(frame) {
            pending.forget(id);
            return Err(e);
        }

        let message = Message::outgoing(text, now_millis());
        self.store.record_sent(message.clone());
        tracing::debug!(call = %id, message = %message.id, "send queued");

        let store = self.store.clone();
        let timeout = self.config.call_timeout;
        let message_id = message.id.clone();
        runtime.spawn(async move {
            let status = match pending.wait(id, rx, timeout).await {
                Ok(_) => DeliveryStatus::Confirmed,
                Err(DashError::Rpc { message: reason, .. }) => {
                    tracing::warn!(call = %id, "send rejected: {}", reason);
                    DeliveryStatus::Rejected(reason)
                }
                Err(e) => {
                    tracing::debug!(call = %id, "send unconfirmed: {}", e);
                    DeliveryStatus::Unconfirmed
                }
            };
            store.set_delivery(&message_id, status);
        });

        Ok(message)
    }

    /// Issue an arbitrary call and wait for its response.
    pub async fn call(&self, method: &str, params: Value) -> DashResult<Value> {
        let (outbound, pending, _) = self.ready_link()?;
        let id = self.call_ids.next();
        let frame = encode_request(&Request::new(id, method, params))?;

        let rx = pending.register(id);
        if let Err(e) = outbound.send_text(frame) {
            pending.forget(id);
            return Err(e);
        }
        pending.wait(id, rx, self.config.call_timeout).await
    }

    fn ready_link(&self) -> DashResult<(OutboundHandle, PendingCalls, Handle)> {
        if self.store.connection_state() != ConnectionState::Ready {
            return Err(DashError::NotConnected);
        }
        let guard = lock_link(&self.link);
        let link = guard.as_ref().ok_or(DashError::NotConnected)?;
        Ok((
            link.outbound.clone(),
            link.pending.clone(),
            link.runtime.clone(),
        ))
    }

    /// Record a failed connection attempt and hand the error back.
    fn fail_attempt(&self, error: DashError) -> DashError {
        tracing::warn!("gateway connect failed: {}", error);
        self.store.record_error(error.to_string());
        let state = match error {
            DashError::TransportConstruction(_) => ConnectionState::Error,
            _ => ConnectionState::Disconnected,
        };
        self.store.set_connection_state(state);
        error
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        let Some(link) = lock_link(&self.link).take() else {
            return;
        };
        link.router.abort();
        link.pump.abort();
        link.pending.fail_all();
        // The store may outlive the session.
        if self.generation.load(Ordering::SeqCst) == link.generation {
            self.store.set_connection_state(ConnectionState::Disconnected);
        }
    }
}

/// Follow the authenticate call of connection `generation`.
async fn track_auth(
    pending: PendingCalls,
    rx: oneshot::Receiver<CallOutcome>,
    timeout: Duration,
    store: SessionStore,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    let outcome = pending.wait(AUTH_CALL_ID, rx, timeout).await;
    if current.load(Ordering::SeqCst) != generation {
        return;
    }
    let auth = match outcome {
        Ok(_) => {
            tracing::info!("gateway accepted authentication");
            AuthState::Accepted
        }
        Err(DashError::Rpc { message, .. }) => {
            let err = DashError::Authentication(message.clone());
            tracing::warn!("{}", err);
            store.record_error(err.to_string());
            AuthState::Rejected(message)
        }
        Err(e) => {
            let err = DashError::Authentication(format!("no acknowledgement: {e}"));
            tracing::warn!("{}", err);
            store.record_error(err.to_string());
            AuthState::Unconfirmed
        }
    };
    store.set_auth(auth);
}

/// Route transport events of connection `generation` until the link ends.
async fn route_events(
    mut events: mpsc::Receiver<TransportEvent>,
    store: SessionStore,
    pending: PendingCalls,
    link: SharedLink,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Frame(text) => route_frame(&text, &store, &pending),
            TransportEvent::Closed(reason) => {
                tracing::info!(reason = ?reason, "gateway connection closed");
                break;
            }
            TransportEvent::Failed(e) => {
                let err = DashError::Transport(e);
                tracing::warn!("{}", err);
                store.record_error(err.to_string());
                break;
            }
        }
    }

    {
        let mut slot = lock_link(&link);
        if slot.as_ref().is_some_and(|l| l.generation == generation) {
            *slot = None;
        }
    }
    pending.fail_all();
    if current.load(Ordering::SeqCst) == generation {
        store.set_connection_state(ConnectionState::Disconnected);
    }
}

/// Decode one inbound frame and apply it. The status and message checks are
/// independent: a frame matching both updates both.
pub(crate) fn route_frame(text: &str, store: &SessionStore, pending: &PendingCalls) {
    let frame = match decode_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(raw = %text, "discarding frame: {}", e);
            return;
        }
    };

    let mut routed = false;

    if frame.kind() == FrameKind::Response {
        if let (Some(id), Some(outcome)) = (frame.call_id(), frame.outcome()) {
            routed |= pending.resolve(id, outcome);
        }
    }

    if let Some(status) = status_update(&frame) {
        tracing::debug!(channels = status.len(), "channel status replaced");
        store.replace_channel_status(status);
        routed = true;
    }

    if is_message_event(&frame) {
        match normalize(&frame) {
            Some(message) => {
                tracing::debug!(id = %message.id, sender = %message.sender, "message received");
                store.record_received(message);
            }
            None => tracing::debug!("message event without payload"),
        }
        routed = true;
    }

    if !routed {
        tracing::trace!(kind = ?frame.kind(), "ignoring unroutable frame");
    }
}
