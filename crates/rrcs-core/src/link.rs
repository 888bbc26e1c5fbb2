// ── Links to the RRCS server ──
//
// One `Link` per configured server endpoint. The keepalive monitor is
// the only writer of `healthy` and `registered`; everyone else reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::watch;
use tracing::{debug, warn};

use rrcs_api::{RpcClient, TransportConfig, Value};

use crate::config::{ControllerConfig, LinkConfig};
use crate::error::CoreError;

/// Which of the (up to) two links.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
pub enum LinkId {
    #[serde(rename = "pri")]
    #[strum(serialize = "pri")]
    Primary,
    #[serde(rename = "sec")]
    #[strum(serialize = "sec")]
    Secondary,
}

impl LinkId {
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

// ── Link ────────────────────────────────────────────────────────────

pub struct Link {
    id: LinkId,
    config: LinkConfig,
    client: RpcClient,
    healthy: AtomicBool,
    registered: AtomicBool,
    verbose: bool,
}

impl Link {
    pub(crate) fn new(
        id: LinkId,
        config: LinkConfig,
        transport: &TransportConfig,
        verbose: bool,
    ) -> Result<Self, CoreError> {
        let client = RpcClient::for_host(&config.host, config.port, transport)?;
        Ok(Self {
            id,
            config,
            client,
            healthy: AtomicBool::new(false),
            registered: AtomicBool::new(false),
            verbose,
        })
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub(crate) fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::AcqRel)
    }

    pub(crate) fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::Release);
    }

    /// Invoke `method` on this link.
    ///
    /// Transport failures, faults and undecodable replies are logged and
    /// collapse to `None`. No retry.
    pub(crate) async fn call(&self, method: &str, params: Vec<Value>) -> Option<Value> {
        match self.client.call(method, params).await {
            Ok(response) => {
                if self.verbose {
                    debug!(link = %self.id, method, ?response, "rpc response");
                }
                Some(response)
            }
            Err(e) => {
                warn!(link = %self.id, method, error = %e, "rpc call failed");
                None
            }
        }
    }

    /// `[localPort, localHost]` for the registration handshake.
    pub(crate) fn notification_args(&self) -> Vec<Value> {
        vec![
            Value::from(self.config.local_port),
            Value::from(self.config.local_host.as_str()),
        ]
    }
}

// ── LinkSet ─────────────────────────────────────────────────────────

/// Both links plus the active selector.
pub struct LinkSet {
    primary: Arc<Link>,
    secondary: Option<Arc<Link>>,
    active: watch::Sender<LinkId>,
}

impl LinkSet {
    /// Build the links. `local_ports` overrides each link's announced
    /// port with the one its listener actually bound.
    pub(crate) fn new(
        config: &ControllerConfig,
        transport: &TransportConfig,
        local_ports: [Option<u16>; 2],
    ) -> Result<Self, CoreError> {
        let with_port = |link: &LinkConfig, port: Option<u16>| {
            let mut link = link.clone();
            if let Some(port) = port {
                link.local_port = port;
            }
            link
        };

        let primary = Link::new(
            LinkId::Primary,
            with_port(&config.primary, local_ports[0]),
            transport,
            config.verbose,
        )?;
        let secondary = config
            .secondary_link()
            .map(|link| {
                Link::new(
                    LinkId::Secondary,
                    with_port(link, local_ports[1]),
                    transport,
                    config.verbose,
                )
            })
            .transpose()?;

        let (active, _) = watch::channel(LinkId::Primary);
        Ok(Self {
            primary: Arc::new(primary),
            secondary: secondary.map(Arc::new),
            active,
        })
    }

    pub fn get(&self, id: LinkId) -> Option<&Arc<Link>> {
        match id {
            LinkId::Primary => Some(&self.primary),
            LinkId::Secondary => self.secondary.as_ref(),
        }
    }

    pub fn active_id(&self) -> LinkId {
        *self.active.borrow()
    }

    /// The link commands are routed through right now.
    pub fn active(&self) -> &Arc<Link> {
        self.get(self.active_id()).unwrap_or(&self.primary)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Link>> {
        std::iter::once(&self.primary).chain(self.secondary.as_ref())
    }

    pub fn is_redundant(&self) -> bool {
        self.secondary.is_some()
    }

    /// Returns `true` if the selector changed.
    pub(crate) fn set_active(&self, id: LinkId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active.send_if_modified(|current| {
            let changed = *current != id;
            *current = id;
            changed
        })
    }

    pub fn subscribe_active(&self) -> watch::Receiver<LinkId> {
        self.active.subscribe()
    }

    pub fn status(&self) -> Vec<LinkStatus> {
        let active = self.active_id();
        self.iter()
            .map(|link| LinkStatus {
                id: link.id,
                host: link.config.host.clone(),
                port: link.config.port,
                local_host: link.config.local_host.clone(),
                local_port: link.config.local_port,
                healthy: link.is_healthy(),
                registered: link.is_registered(),
                active: link.id == active,
            })
            .collect()
    }
}

/// Point-in-time view of one link, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct LinkStatus {
    pub id: LinkId,
    pub host: String,
    pub port: u16,
    pub local_host: String,
    pub local_port: u16,
    pub healthy: bool,
    pub registered: bool,
    pub active: bool,
}
