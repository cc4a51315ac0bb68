//! In-process real-time event relay.
//!
//! Three independently addressable namespaces mirror the public socket
//! contract: ROOT (global listeners such as the mobile app), ORDER
//! (order-producing clients and the worker) and ORDER_WEB (web dashboard).
//! Events are fire-and-forget: delivery is at-most-once to listeners
//! connected at emission time, and nothing is persisted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::domain::order::OrderOrigin;

pub const EVENT_ORDER_CREATE: &str = "order:create";
pub const EVENT_ORDER_CREATED: &str = "order-created";
pub const EVENT_ORDER_WEB: &str = "order-web";
pub const EVENT_ORDER_NEW: &str = "order:new";
pub const EVENT_ORDER_STATUS: &str = "order:status";
pub const EVENT_ORDER_UPDATE: &str = "order:update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Root,
    Order,
    OrderWeb,
}

impl Namespace {
    fn as_str(&self) -> &'static str {
        match self {
            Namespace::Root => "/",
            Namespace::Order => "/order",
            Namespace::OrderWeb => "/order-web",
        }
    }
}

/// One broadcast message: event name plus opaque JSON payload. Lives only
/// for the duration of the broadcast call.
#[derive(Debug, Clone)]
pub struct RelayEvent {
    pub name: String,
    pub payload: Value,
}

pub struct Relay {
    root: broadcast::Sender<RelayEvent>,
    order: broadcast::Sender<RelayEvent>,
    order_web: broadcast::Sender<RelayEvent>,
    next_conn_id: AtomicU64,
}

impl Relay {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (root, _) = broadcast::channel(capacity);
        let (order, _) = broadcast::channel(capacity);
        let (order_web, _) = broadcast::channel(capacity);
        Arc::new(Self {
            root,
            order,
            order_web,
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Listener side: subscribe to a namespace's broadcasts. Events emitted
    /// before subscription are never replayed.
    pub fn subscribe(&self, namespace: Namespace) -> broadcast::Receiver<RelayEvent> {
        self.sender(namespace).subscribe()
    }

    /// Producer side: open a transient connection to a namespace. The
    /// connection logs its lifecycle and routes inbound events; dropping it
    /// is the disconnect.
    pub fn connect(self: &Arc<Self>, namespace: Namespace) -> RelayConnection {
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        info!("{} namespace connected: conn-{}", namespace.as_str(), id);
        RelayConnection {
            relay: Arc::clone(self),
            namespace,
            id,
        }
    }

    fn sender(&self, namespace: Namespace) -> &broadcast::Sender<RelayEvent> {
        match namespace {
            Namespace::Root => &self.root,
            Namespace::Order => &self.order,
            Namespace::OrderWeb => &self.order_web,
        }
    }

    fn broadcast(&self, namespace: Namespace, name: &str, payload: Value) {
        // send() errs only when no listener is connected; that is the
        // normal fire-and-forget case.
        let _ = self.sender(namespace).send(RelayEvent {
            name: name.to_string(),
            payload,
        });
    }

    /// Route one client-submitted event according to its namespace.
    fn handle(&self, namespace: Namespace, name: &str, payload: Value) {
        match (namespace, name) {
            (Namespace::Order, EVENT_ORDER_CREATE) => self.handle_order_create(payload),
            (Namespace::OrderWeb, EVENT_ORDER_STATUS) => {
                debug!("status update relayed to {}", Namespace::Order.as_str());
                self.broadcast(Namespace::Order, EVENT_ORDER_UPDATE, payload);
            }
            // ROOT takes no client-submitted events; unknown names have no
            // handler anywhere.
            _ => debug!("dropping unhandled event '{}' on {}", name, namespace.as_str()),
        }
    }

    /// `order:create` ingress: classify origin by correlation id presence,
    /// broadcast to ROOT under the origin-specific name, and always fan the
    /// raw payload out to ORDER_WEB as `order:new`.
    fn handle_order_create(&self, payload: Value) {
        match OrderOrigin::classify(&payload) {
            OrderOrigin::Text { correlation_id } => {
                info!("text-origin order received (correlation {})", correlation_id);
                self.broadcast(Namespace::Root, EVENT_ORDER_CREATED, payload.clone());
            }
            OrderOrigin::Direct => {
                info!("direct-origin order received");
                self.broadcast(Namespace::Root, EVENT_ORDER_WEB, payload.clone());
            }
        }
        self.broadcast(Namespace::OrderWeb, EVENT_ORDER_NEW, payload);
    }
}

/// Scoped producer handle to one namespace. Emission routes through the
/// relay's classification; dropping the handle disconnects.
pub struct RelayConnection {
    relay: Arc<Relay>,
    namespace: Namespace,
    id: u64,
}

impl RelayConnection {
    pub fn emit(&self, name: &str, payload: Value) {
        self.relay.handle(self.namespace, name, payload);
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        info!(
            "{} namespace disconnected: conn-{}",
            self.namespace.as_str(),
            self.id
        );
    }
}
