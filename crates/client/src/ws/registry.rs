//! Typed event routing for the channel.

use std::collections::HashSet;

use postlive_shared::{EventName, InboundEvent};

use super::ChannelEvent;
use crate::page::Page;

/// A channel event that passed the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Connected { sid: Option<String>, connection: u64 },
    Disconnected { reason: String },
    ConnectError { message: String },
    Domain(InboundEvent),
}

/// The set of domain events the current page listens to.
///
/// Lifecycle events always pass. Event frames whose name is not subscribed
/// are dropped before their payload is looked at.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    subscribed: HashSet<EventName>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_page(page: &Page) -> Self {
        let mut registry = Self::new();
        for name in page.subscriptions() {
            registry.subscribe(*name);
        }
        registry
    }

    pub fn subscribe(&mut self, name: EventName) {
        if !name.is_lifecycle() {
            self.subscribed.insert(name);
        }
    }

    pub fn is_subscribed(&self, name: EventName) -> bool {
        name.is_lifecycle() || self.subscribed.contains(&name)
    }

    pub fn route(&self, event: ChannelEvent) -> Option<Routed> {
        match event {
            ChannelEvent::Connected { sid, connection } => {
                Some(Routed::Connected { sid, connection })
            }
            ChannelEvent::Disconnected { reason } => Some(Routed::Disconnected { reason }),
            ChannelEvent::ConnectError { message } => Some(Routed::ConnectError { message }),
            ChannelEvent::Message { name, args } => {
                let subscribed = EventName::parse(&name)
                    .map(|known| !known.is_lifecycle() && self.subscribed.contains(&known))
                    .unwrap_or(false);
                if !subscribed {
                    crate::log_debug!("No subscription for '{}', dropping", name);
                    return None;
                }

                match InboundEvent::decode(&name, &args) {
                    Ok(event) => Some(Routed::Domain(event)),
                    Err(e) => {
                        crate::log_warn!("Dropping '{}' event: {}", name, e);
                        None
                    }
                }
            }
        }
    }
}
