//! The realtime session of one page.
//!
//! Owns the channel handle, the event registry, the room manager and the
//! reconciler of the current page. Channel events are handled one at a
//! time, each to completion, in the order the connection delivered them.

use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use futures_util::{Stream, StreamExt};
use postlive_shared::{InboundEvent, OutboundEvent, Post, TestEventPayload};
use serde_json::Value;

use crate::api_client::{ApiClient, PostsSource};
use crate::config::{ClientConfig, PROBE_MESSAGE};
use crate::page::Page;
use crate::render::Shell;
use crate::rooms::RoomManager;
use crate::stores::{DetailOutcome, DetailReconciler, ListOutcome, ListReconciler};
use crate::ws::{ChannelEvent, Emitter, EventRegistry, Routed, WsConnection};

/// Whether the session keeps consuming events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

enum View {
    List(ListReconciler),
    Detail(DetailReconciler),
    Passive,
}

pub struct RealtimeSession {
    page: Page,
    emitter: Box<dyn Emitter>,
    posts: Box<dyn PostsSource>,
    shell: Shell,
    registry: EventRegistry,
    rooms: RoomManager,
    view: View,
    closed: bool,
}

impl RealtimeSession {
    pub fn new(
        page: Page,
        config: &ClientConfig,
        emitter: Box<dyn Emitter>,
        posts: Box<dyn PostsSource>,
        shell: Shell,
    ) -> Self {
        let view = match page {
            Page::List => View::List(ListReconciler::new(config.list_path.clone())),
            Page::Detail { post_id } => {
                View::Detail(DetailReconciler::new(post_id, config.list_path.clone()))
            }
            Page::Other => View::Passive,
        };

        Self {
            page,
            emitter,
            posts,
            shell,
            registry: EventRegistry::for_page(&page),
            rooms: RoomManager::new(page.room()),
            view,
            closed: false,
        }
    }

    /// Open the channel for `location` and build the session around it.
    ///
    /// Natively this must run inside a tokio runtime.
    pub fn init(
        config: &ClientConfig,
        location: &str,
        shell: Shell,
    ) -> (Self, UnboundedReceiver<ChannelEvent>) {
        let page = Page::from_location(location, &config.list_path);
        crate::log_info!("Realtime session for {:?} ({})", page, location);

        let (events_tx, events_rx) = unbounded();
        let connection = WsConnection::open(config.socket_url(), config.reconnect.clone(), events_tx);
        let session = Self::new(
            page,
            config,
            Box::new(connection.handle()),
            Box::new(ApiClient::from_config(config)),
            shell,
        );

        (session, events_rx)
    }

    /// Seed the list with what is already on screen.
    pub fn with_initial_posts(mut self, posts: Vec<Post>) -> Self {
        if let View::List(list) = &mut self.view {
            list.seed(posts);
        }
        self
    }

    pub fn with_detail_post(mut self, post: Post) -> Self {
        self.view = match std::mem::replace(&mut self.view, View::Passive) {
            View::Detail(detail) => View::Detail(detail.with_post(post)),
            other => other,
        };
        self
    }

    /// Load what the page already shows from the server without redrawing it.
    ///
    /// On failure the list starts empty and the next refresh catches up; a
    /// detail page still applies patches to the screen, just without a model.
    pub async fn prime(&mut self) {
        match &mut self.view {
            View::List(list) => match self.posts.fetch_posts().await {
                Ok(posts) => {
                    crate::log_debug!("Primed list with {} posts", posts.len());
                    list.seed(posts);
                }
                Err(e) => crate::log_warn!("Could not prime the posts list: {}", e),
            },
            View::Detail(detail) => match self.posts.fetch_post(detail.post_id()).await {
                Ok(post) => {
                    crate::log_debug!("Primed detail view with post {}", post.id);
                    detail.seed(post);
                }
                Err(e) => crate::log_warn!("Could not prime post {}: {}", detail.post_id(), e),
            },
            View::Passive => {}
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn list(&self) -> Option<&ListReconciler> {
        match &self.view {
            View::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&DetailReconciler> {
        match &self.view {
            View::Detail(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub async fn handle(&mut self, event: ChannelEvent) -> Flow {
        if self.closed {
            return Flow::Stop;
        }
        let Some(routed) = self.registry.route(event) else {
            return Flow::Continue;
        };

        match routed {
            Routed::Connected { sid, connection } => {
                crate::log_info!("Connected to server (sid {:?}, connection {})", sid, connection);
                self.emitter.bind(connection);
                self.send_probe();
                self.rooms.on_connect(self.emitter.as_ref());
                Flow::Continue
            }
            Routed::Disconnected { reason } => {
                crate::log_info!("Disconnected from server: {}", reason);
                self.rooms.on_disconnect();
                Flow::Continue
            }
            Routed::ConnectError { message } => {
                crate::log_warn!("Connection error: {}", message);
                Flow::Continue
            }
            Routed::Domain(event) => self.dispatch(event).await,
        }
    }

    async fn dispatch(&mut self, event: InboundEvent) -> Flow {
        match (event, &mut self.view) {
            (InboundEvent::PostsListUpdate, View::List(list)) => {
                match self.posts.fetch_posts().await {
                    Ok(posts) => {
                        let outcome = list.full_refresh(posts, self.shell.renderer.as_mut());
                        crate::log_debug!("List refresh: {:?}", outcome);
                    }
                    Err(e) => crate::log_error!("Failed to refresh posts list: {}", e),
                }
                Flow::Continue
            }
            (InboundEvent::NewPost(payload), View::List(list)) => {
                let id = payload.post.id;
                if list.new_entry(payload.post, self.shell.renderer.as_mut()) == ListOutcome::Inserted {
                    crate::log_info!("New post {} listed", id);
                }
                Flow::Continue
            }
            (InboundEvent::PostUpdate(update), View::Detail(detail)) => {
                match detail.on_update(update, &mut self.shell) {
                    DetailOutcome::Deleted | DetailOutcome::Closed => Flow::Stop,
                    DetailOutcome::Updated | DetailOutcome::Ignored => Flow::Continue,
                }
            }
            (event, _) => {
                crate::log_debug!("'{}' has no handler on {:?}", event.name(), self.page);
                Flow::Continue
            }
        }
    }

    fn send_probe(&self) {
        let probe = OutboundEvent::TestEvent(TestEventPayload {
            message: PROBE_MESSAGE.to_string(),
        });
        let ack = Box::new(|args: Vec<Value>| {
            crate::log_debug!(
                "Server answered the probe: {}",
                args.first().cloned().unwrap_or(Value::Null)
            );
        });
        if let Err(e) = self.emitter.emit_with_ack(probe, ack) {
            crate::log_warn!("Probe not sent: {}", e);
        }
    }

    /// Drain `events` until the stream ends or the view is left.
    pub async fn run<S>(&mut self, mut events: S)
    where
        S: Stream<Item = ChannelEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            if self.handle(event).await == Flow::Stop {
                break;
            }
        }
        self.teardown();
    }

    /// Close the channel. Idempotent.
    pub fn teardown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.emitter.close();
        }
    }
}
