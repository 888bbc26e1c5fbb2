// ── Controller abstraction ──
//
// Full lifecycle management for one logical RRCS server: link setup,
// notification listeners, keepalive/failover, definition publishing and
// feedback flushing. Domain operations live in `ops/` as further
// `impl Controller` blocks.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rrcs_api::{Notification, NotificationListener, TransportConfig, Value};

use crate::config::{ControllerConfig, LinkConfig};
use crate::debounce::Debouncer;
use crate::definitions::{
    build_action_definitions, build_feedback_definitions, build_variable_definitions,
    variable_values,
};
use crate::error::CoreError;
use crate::failover::{self, LinkHealth, Snapshot};
use crate::host::{HostSink, NullHost};
use crate::link::{LinkId, LinkSet, LinkStatus};
use crate::notification::{DecodeError, DeviceEvent};
use crate::protocol::{self, method};
use crate::queue::CommandQueue;
use crate::recorder::{Origin, Recorder, TranscriptEntry};
use crate::store::DataStore;

const MIN_FEEDBACK_INTERVAL: Duration = Duration::from_millis(1);

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Active link healthy, every configured link healthy.
    Ok,
    /// Active link healthy, standby link down.
    Degraded,
    /// Active link down and no healthy link to switch to.
    ConnectionFailure,
    /// Configuration cannot reach a server. No RPC is attempted.
    BadConfig,
}

impl ConnectionState {
    fn message(self) -> Option<&'static str> {
        match self {
            Self::Degraded => Some("standby link is down"),
            Self::ConnectionFailure => Some("no reachable RRCS server"),
            _ => None,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Everything built by `connect` and torn down by `disconnect`.
pub(crate) struct Session {
    pub(crate) links: Arc<LinkSet>,
    pub(crate) queue: CommandQueue,
    listeners: Mutex<Vec<NotificationListener>>,
    cancel: CancellationToken,
}

impl Session {
    /// Queue `method` on whichever link is active when it is dispatched.
    pub(crate) async fn call(&self, method: &'static str, params: Vec<Value>) -> Option<Value> {
        let links = Arc::clone(&self.links);
        self.queue
            .enqueue(move || async move { links.active().call(method, params).await })
            .await
            .flatten()
    }

    /// Queue `method` on a specific link.
    async fn call_on(&self, id: LinkId, method: &'static str, params: Vec<Value>) -> Option<Value> {
        let link = Arc::clone(self.links.get(id)?);
        self.queue
            .enqueue(move || async move { link.call(method, params).await })
            .await
            .flatten()
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Domain operations never
/// fail loudly: they return `None` and log when nothing changed.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ArcSwap<ControllerConfig>,
    store: Arc<DataStore>,
    host: Arc<dyn HostSink>,
    session: ArcSwapOption<Session>,
    connection_state: watch::Sender<ConnectionState>,
    recorder: Recorder,
    definitions: Arc<Debouncer>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Serializes connect/disconnect.
    lifecycle: Mutex<()>,
    /// Serializes keepalive cycles.
    cycle: Mutex<()>,
}

impl Controller {
    /// Create a new Controller. Does NOT connect -- call
    /// [`connect()`](Self::connect) to build links and start background tasks.
    pub fn new(config: ControllerConfig, host: Arc<dyn HostSink>) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ControllerInner {
                config: ArcSwap::from_pointee(config),
                store: Arc::new(DataStore::new()),
                host,
                session: ArcSwapOption::empty(),
                connection_state,
                recorder: Recorder::default(),
                definitions: Arc::new(Debouncer::new()),
                task_handles: Mutex::new(Vec::new()),
                lifecycle: Mutex::new(()),
                cycle: Mutex::new(()),
            }),
        }
    }

    /// The current configuration.
    pub fn config(&self) -> Arc<ControllerConfig> {
        self.inner.config.load_full()
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Validate the configuration, build links and listeners, and spawn
    /// the background tasks. A second call while connected is a no-op.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.inner.session.load().is_some() {
            return Ok(());
        }

        let config = self.config();
        if let Err(e) = config.validate() {
            warn!(error = %e, "refusing to connect");
            self.set_state(ConnectionState::BadConfig, Some(&e.to_string()));
            return Err(e);
        }
        self.set_state(ConnectionState::Connecting, None);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut listeners = Vec::new();
        let mut local_ports = [None, None];
        if config.notifications {
            let wanted = [
                (LinkId::Primary, Some(&config.primary)),
                (LinkId::Secondary, config.secondary_link()),
            ];
            for (slot, (id, link)) in wanted.into_iter().enumerate() {
                let Some(link) = link else { continue };
                match bind_listener(id, link, event_tx.clone()).await {
                    Ok(listener) => {
                        if let Some(port) = local_ports.get_mut(slot) {
                            *port = Some(listener.local_addr().port());
                        }
                        listeners.push(listener);
                    }
                    Err(e) => {
                        self.set_state(ConnectionState::ConnectionFailure, Some(&e.to_string()));
                        return Err(e);
                    }
                }
            }
        }
        drop(event_tx);

        let transport = TransportConfig::default().with_timeout(config.timeout);
        let links = match LinkSet::new(&config, &transport, local_ports) {
            Ok(links) => Arc::new(links),
            Err(e) => {
                self.set_state(ConnectionState::BadConfig, Some(&e.to_string()));
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let session = Arc::new(Session {
            links,
            queue: CommandQueue::new(config.min_call_interval),
            listeners: Mutex::new(listeners),
            cancel: cancel.clone(),
        });
        self.inner.session.store(Some(session));

        // Spawn background tasks
        let mut handles = self.inner.task_handles.lock().await;

        if config.notifications {
            handles.push(tokio::spawn(notification_task(
                self.clone(),
                event_rx,
                cancel.clone(),
            )));
        }

        let ctrl = self.clone();
        handles.push(self.inner.definitions.spawn(
            config.definitions_debounce,
            cancel.clone(),
            move || {
                let ctrl = ctrl.clone();
                async move { ctrl.publish_definitions() }
            },
        ));

        handles.push(tokio::spawn(feedback_task(
            self.clone(),
            config.feedback_interval.max(MIN_FEEDBACK_INTERVAL),
            cancel.clone(),
        )));

        if !config.keepalive_interval.is_zero() {
            handles.push(tokio::spawn(keepalive_task(
                self.clone(),
                config.keepalive_interval,
                cancel,
            )));
        }
        drop(handles);

        self.inner
            .host
            .set_variable_definitions(build_variable_definitions());
        self.schedule_definitions_rebuild();

        info!(
            host = %config.primary.host,
            port = config.primary.port,
            redundant = config.redundant,
            "controller started"
        );
        Ok(())
    }

    /// Tear everything down. Idempotent.
    ///
    /// Order: cancel tasks, discard queued work, unregister registered
    /// links, stop listeners, drop the session.
    pub async fn disconnect(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        let Some(session) = self.inner.session.swap(None) else {
            self.set_state(ConnectionState::Disconnected, None);
            return;
        };

        session.cancel.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        session.queue.clear();
        for link in session.links.iter().filter(|l| l.is_registered()) {
            let id = link.id();
            let args = link.notification_args();
            if session
                .call_on(id, method::UNREGISTER_FOR_ALL_EVENTS, args)
                .await
                .is_none()
            {
                debug!(link = %id, "unregister got no reply");
            }
            link.set_registered(false);
        }
        session.queue.shutdown().await;

        for listener in session.listeners.lock().await.drain(..) {
            listener.shutdown().await;
        }
        drop(session);

        self.set_state(ConnectionState::Disconnected, None);
        debug!("disconnected");
    }

    /// Apply a new configuration: disconnect, forget all device state,
    /// connect again. Requests in flight are abandoned.
    pub async fn reconfigure(&self, config: ControllerConfig) -> Result<(), CoreError> {
        self.disconnect().await;
        self.inner.store.reset();
        self.inner.config.store(Arc::new(config));
        self.connect().await
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Optimized for CLI: no listeners, no registration and no keepalive
    /// monitor. Calls go to the primary link.
    pub async fn oneshot<F, Fut, T>(
        config: ControllerConfig,
        host: Arc<dyn HostSink>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.notifications = false;
        cfg.keepalive_interval = Duration::ZERO;

        let controller = Controller::new(cfg, host);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    /// [`oneshot`](Self::oneshot) with a [`NullHost`].
    pub async fn oneshot_quiet<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        Self::oneshot(config, Arc::new(NullHost), f).await
    }

    // ── Keepalive / failover ─────────────────────────────────────

    /// Run one keepalive cycle: probe every link, register where needed,
    /// switch the active link if required, resync on transitions.
    ///
    /// Returns the resulting state, or `None` when not connected.
    pub async fn check_links(&self) -> Option<ConnectionState> {
        let session = self.session()?;
        let _cycle = self.inner.cycle.lock().await;

        let mut links = Vec::new();
        for link in session.links.iter() {
            let id = link.id();
            let healthy = session
                .call_on(id, method::GET_ALIVE, Vec::new())
                .await
                .is_some();
            let was_healthy = link.set_healthy(healthy);
            if !healthy {
                // the server drops registrations when it restarts
                link.set_registered(false);
            }
            match (was_healthy, healthy) {
                (false, true) => info!(link = %id, "link up"),
                (true, false) => warn!(link = %id, "link down"),
                _ => {}
            }
            links.push(LinkHealth {
                id,
                was_healthy,
                healthy,
                registered: link.is_registered(),
            });
        }

        let decision = failover::decide(&Snapshot {
            active: session.links.active_id(),
            redundant: session.links.is_redundant(),
            links,
        });

        if self.config().notifications {
            for id in &decision.register {
                self.register(&session, *id).await;
            }
        }

        if decision.switched {
            let from = session.links.active_id();
            session.links.set_active(decision.active);
            warn!(%from, to = %decision.active, "active link switched");
        }

        self.set_state(decision.state, decision.state.message());

        if decision.resync {
            self.resync().await;
        } else if decision.switched {
            self.push_variables();
        }
        Some(decision.state)
    }

    async fn register(&self, session: &Session, id: LinkId) {
        let Some(link) = session.links.get(id) else {
            return;
        };
        let args = link.notification_args();
        let Some(resp) = session
            .call_on(id, method::REGISTER_FOR_ALL_EVENTS, args)
            .await
        else {
            return;
        };
        match protocol::positional(&resp, None) {
            Ok(_) => {
                link.set_registered(true);
                info!(
                    link = %id,
                    local_host = %link.config().local_host,
                    local_port = link.config().local_port,
                    "registered for notifications"
                );
            }
            Err(e) => warn!(link = %id, "notification registration failed: {}", e.describe()),
        }
    }

    /// Rebuild the mirror from the active link.
    pub async fn resync(&self) {
        debug!("full resync");
        self.get_all_ports().await;
        self.get_all_active_crosspoints().await;
        self.get_all_logic_sources().await;
    }

    // ── Recording ────────────────────────────────────────────────

    pub fn set_recording(&self, enabled: bool) {
        self.inner.recorder.set_enabled(enabled);
        info!(enabled, "action recording");
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recorder.is_enabled()
    }

    pub(crate) fn record(&self, origin: Origin, entry: impl FnOnce() -> TranscriptEntry) {
        if self.inner.recorder.should_record(origin) {
            let entry = entry();
            debug!(action = %entry.action_id, description = %entry.description, "recorded action");
            self.inner.host.record_action(&entry);
        }
    }

    // ── Host publishing ──────────────────────────────────────────

    pub(crate) fn schedule_definitions_rebuild(&self) {
        self.inner.definitions.trigger();
    }

    fn publish_definitions(&self) {
        let store = &self.inner.store;
        self.inner
            .host
            .set_action_definitions(build_action_definitions(store));
        self.inner
            .host
            .set_feedback_definitions(build_feedback_definitions(store));
        debug!("definitions published");
    }

    pub(crate) fn push_variables(&self) {
        let active = self.active_link().unwrap_or(LinkId::Primary);
        self.inner
            .host
            .set_variable_values(variable_values(&self.inner.store, active));
    }

    /// Hand dirty feedback groups to the host. Returns how many there were.
    pub fn flush_feedbacks(&self) -> usize {
        let groups = self.inner.store.take_dirty();
        if !groups.is_empty() {
            self.inner.host.check_feedbacks(&groups);
        }
        groups.len()
    }

    fn set_state(&self, state: ConnectionState, message: Option<&str>) {
        let changed = self.inner.connection_state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
        if changed {
            debug!(%state, "connection state");
            self.inner.host.set_connection_status(state, message);
        }
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.connection_state.borrow()
    }

    /// The link commands are currently routed through.
    pub fn active_link(&self) -> Option<LinkId> {
        self.inner
            .session
            .load()
            .as_ref()
            .map(|s| s.links.active_id())
    }

    pub fn link_status(&self) -> Vec<LinkStatus> {
        self.inner
            .session
            .load()
            .as_ref()
            .map(|s| s.links.status())
            .unwrap_or_default()
    }

    pub(crate) fn session(&self) -> Option<Arc<Session>> {
        let session = self.inner.session.load_full();
        if session.is_none() {
            debug!("not connected, call dropped");
        }
        session
    }
}

// ── Listener setup ───────────────────────────────────────────────

/// Listen on all interfaces; `local_host` is only what we announce.
async fn bind_listener(
    id: LinkId,
    link: &LinkConfig,
    sender: mpsc::UnboundedSender<Notification>,
) -> Result<NotificationListener, CoreError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], link.local_port));
    NotificationListener::bind(addr, id.to_string(), sender)
        .await
        .map_err(|e| CoreError::Listener {
            addr: addr.to_string(),
            reason: e.to_string(),
        })
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically probe the links. The first tick fires immediately.
async fn keepalive_task(controller: Controller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = controller.check_links() => {}
        }
    }
}

/// Drain pushed notifications into the store, in arrival order.
async fn notification_task(
    controller: Controller,
    mut rx: mpsc::UnboundedReceiver<Notification>,
    cancel: CancellationToken,
) {
    loop {
        let notification = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            n = rx.recv() => {
                let Some(n) = n else { break };
                n
            }
        };

        match DeviceEvent::decode(&notification) {
            Ok(event) => {
                let applied = event.apply(controller.store(), controller.is_recording());
                for entry in applied.recorded {
                    controller.record(Origin::Device, move || entry);
                }
                if applied.resync {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = controller.resync() => {}
                    }
                }
            }
            Err(DecodeError::Unhandled(method)) => {
                debug!(origin = %notification.origin, %method, "notification ignored");
            }
            Err(e) => warn!(origin = %notification.origin, error = %e, "bad notification"),
        }
    }
}

/// Periodically hand dirty feedback groups to the host.
async fn feedback_task(controller: Controller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                controller.flush_feedbacks();
            }
        }
    }
}
