//! Session behavior against recording fakes of every collaborator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use postlive_client::render::{DetailPatch, PostRow, StatusBadge, LIST_COLUMNS};
use postlive_client::stores::DELETED_NOTICE;
use postlive_client::ws::{AckCallback, ChannelError, ChannelEvent, Emitter};
use postlive_client::{
    ClientConfig, Flow, Navigator, Notifier, Page, PostsSource, RealtimeSession, Renderer, Shell,
};
use postlive_shared::{ApiError, OutboundEvent, Post, PostId};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Replace(Vec<PostRow>),
    Placeholder(usize),
    Prepend(PostRow),
    RemovePlaceholder,
    Patch(DetailPatch),
    Alert(String),
    Navigate(String),
}

#[derive(Clone, Default)]
struct Screen(Rc<RefCell<Vec<Op>>>);

impl Screen {
    fn ops(&self) -> Vec<Op> {
        self.0.borrow().clone()
    }

    fn push(&self, op: Op) {
        self.0.borrow_mut().push(op);
    }
}

impl Renderer for Screen {
    fn replace_list(&mut self, rows: &[PostRow]) {
        self.push(Op::Replace(rows.to_vec()));
    }
    fn show_placeholder(&mut self, colspan: usize) {
        self.push(Op::Placeholder(colspan));
    }
    fn prepend_row(&mut self, row: &PostRow) {
        self.push(Op::Prepend(row.clone()));
    }
    fn remove_placeholder(&mut self) {
        self.push(Op::RemovePlaceholder);
    }
    fn patch_detail(&mut self, patch: &DetailPatch) {
        self.push(Op::Patch(patch.clone()));
    }
}

impl Notifier for Screen {
    fn alert(&mut self, message: &str) {
        self.push(Op::Alert(message.into()));
    }
}

impl Navigator for Screen {
    fn navigate(&mut self, path: &str) {
        self.push(Op::Navigate(path.into()));
    }
}

#[derive(Clone, Default)]
struct Wire {
    emitted: Rc<RefCell<Vec<OutboundEvent>>>,
    closed: Rc<RefCell<bool>>,
    bound: Rc<RefCell<Vec<u64>>>,
}

impl Wire {
    fn joins(&self) -> Vec<PostId> {
        self.emitted
            .borrow()
            .iter()
            .filter_map(|e| match e {
                OutboundEvent::JoinPostRoom(join) => Some(join.post_id),
                _ => None,
            })
            .collect()
    }

    fn probes(&self) -> usize {
        self.emitted
            .borrow()
            .iter()
            .filter(|e| matches!(e, OutboundEvent::TestEvent(_)))
            .count()
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Emitter for Wire {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.emitted.borrow_mut().push(event);
        Ok(())
    }

    fn emit_with_ack(&self, event: OutboundEvent, ack: AckCallback) -> Result<(), ChannelError> {
        self.emit(event)?;
        ack(vec![json!({"status": "success", "message": "Event received"})]);
        Ok(())
    }

    fn close(&self) {
        *self.closed.borrow_mut() = true;
    }

    fn bind(&self, connection: u64) {
        self.bound.borrow_mut().push(connection);
    }
}

#[derive(Clone, Default)]
struct Server {
    responses: Rc<RefCell<VecDeque<Result<Vec<Post>, ApiError>>>>,
    fetches: Rc<RefCell<usize>>,
    detail: Rc<RefCell<Option<Post>>>,
}

impl Server {
    fn will_return(&self, response: Result<Vec<Post>, ApiError>) {
        self.responses.borrow_mut().push_back(response);
    }

    fn serves_post(&self, post: Post) {
        *self.detail.borrow_mut() = Some(post);
    }
}

#[async_trait(?Send)]
impl PostsSource for Server {
    async fn fetch_posts(&self) -> Result<Vec<Post>, ApiError> {
        *self.fetches.borrow_mut() += 1;
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no response queued".into())))
    }

    async fn fetch_post(&self, post_id: PostId) -> Result<Post, ApiError> {
        self.detail
            .borrow()
            .clone()
            .filter(|p| p.id == post_id)
            .ok_or_else(|| ApiError::Http {
                status: 404,
                body: format!(r#"{{"detail":"Post with id {post_id} not found"}}"#),
            })
    }
}

struct Harness {
    session: RealtimeSession,
    screen: Screen,
    wire: Wire,
    server: Server,
}

fn harness(location: &str) -> Harness {
    let config = ClientConfig::default();
    let screen = Screen::default();
    let wire = Wire::default();
    let server = Server::default();
    let page = Page::from_location(location, &config.list_path);
    let session = RealtimeSession::new(
        page,
        &config,
        Box::new(wire.clone()),
        Box::new(server.clone()),
        Shell::new(screen.clone(), screen.clone(), screen.clone()),
    );
    Harness {
        session,
        screen,
        wire,
        server,
    }
}

fn post(id: PostId, title: &str) -> Post {
    Post {
        id,
        title: title.into(),
        author: Some("alice".into()),
        published: true,
        created_at: "2024-01-01T10:00:00Z".into(),
        content: None,
        author_id: None,
        updated_at: None,
    }
}

fn message(name: &str, payload: Value) -> ChannelEvent {
    ChannelEvent::Message {
        name: name.into(),
        args: vec![payload],
    }
}

fn connected() -> ChannelEvent {
    connected_as(1)
}

fn connected_as(connection: u64) -> ChannelEvent {
    ChannelEvent::Connected {
        sid: Some("abc".into()),
        connection,
    }
}

#[tokio::test]
async fn new_post_without_author_renders_placeholder_author_and_draft() {
    let mut h = harness("/web/posts");
    h.session = h.session.with_initial_posts(vec![post(1, "old")]);

    let flow = h
        .session
        .handle(message(
            "new_post",
            json!({"post": {"id": 7, "title": "X", "published": false,
                            "created_at": "2024-01-01T10:00:00Z"}}),
        ))
        .await;
    assert_eq!(flow, Flow::Continue);

    let ops = h.screen.ops();
    assert_eq!(ops.len(), 1);
    let Op::Prepend(row) = &ops[0] else {
        panic!("expected a prepended row, got {ops:?}");
    };
    assert_eq!(row.id, 7);
    assert_eq!(row.author, "Unknown");
    assert_eq!(row.badge, StatusBadge::Draft);

    let ids: Vec<_> = h.session.list().unwrap().entries().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![7, 1]);
}

#[tokio::test]
async fn duplicate_new_post_is_rendered_once() {
    let mut h = harness("/web/posts");
    let event = message(
        "new_post",
        json!({"post": {"id": 3, "title": "t", "created_at": "2024-01-01T10:00:00Z"}}),
    );
    h.session.handle(event.clone()).await;
    h.session.handle(event).await;

    let prepends = h
        .screen
        .ops()
        .iter()
        .filter(|op| matches!(op, Op::Prepend(_)))
        .count();
    assert_eq!(prepends, 1);
    assert_eq!(h.session.list().unwrap().entries().len(), 1);
}

#[tokio::test]
async fn list_update_fetches_and_renders_in_server_order() {
    let mut h = harness("/web/posts");
    h.server
        .will_return(Ok(vec![post(3, "A"), post(1, "B"), post(2, "C")]));

    h.session.handle(message("posts_list_update", Value::Null)).await;

    assert_eq!(*h.server.fetches.borrow(), 1);
    let ops = h.screen.ops();
    let Some(Op::Replace(rows)) = ops.last() else {
        panic!("expected a list replacement, got {ops:?}");
    };
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    assert_eq!(rows[0].author, "alice");
}

#[tokio::test]
async fn failed_fetch_leaves_the_list_alone() {
    let mut h = harness("/web/posts");
    h.session = h.session.with_initial_posts(vec![post(1, "a"), post(2, "b")]);
    h.server.will_return(Err(ApiError::Http {
        status: 500,
        body: "boom".into(),
    }));

    h.session.handle(message("posts_list_update", Value::Null)).await;

    assert!(h.screen.ops().is_empty());
    assert_eq!(h.session.list().unwrap().entries().len(), 2);
}

#[tokio::test]
async fn empty_refresh_shows_placeholder_until_a_post_arrives() {
    let mut h = harness("/web/posts");
    h.session = h.session.with_initial_posts(vec![post(1, "a")]);
    h.server.will_return(Ok(vec![]));

    h.session.handle(message("posts_list_update", Value::Null)).await;
    h.session
        .handle(message(
            "new_post",
            json!({"post": {"id": 5, "title": "n", "created_at": "2024-01-01T10:00:00Z"}}),
        ))
        .await;

    let ops = h.screen.ops();
    assert_eq!(ops[0], Op::Placeholder(LIST_COLUMNS));
    assert_eq!(ops[1], Op::RemovePlaceholder);
    assert!(matches!(&ops[2], Op::Prepend(row) if row.id == 5));
    assert!(!h.session.list().unwrap().placeholder_shown());
}

#[tokio::test]
async fn list_page_ignores_detail_events() {
    let mut h = harness("/web/posts");
    h.session
        .handle(message("post_update", json!({"post_id": 1, "type": "delete"})))
        .await;
    assert!(h.screen.ops().is_empty());
}

#[tokio::test]
async fn connect_probes_and_joins_the_detail_room() {
    let mut h = harness("/web/posts/42");
    h.session.handle(connected()).await;

    assert_eq!(h.wire.probes(), 1);
    assert_eq!(h.wire.joins(), vec![42]);
    assert_eq!(h.session.rooms().joined_room(), Some(42));
}

#[tokio::test]
async fn reconnect_rejoins_exactly_once() {
    let mut h = harness("/web/posts/42");

    h.session.handle(connected()).await;
    h.session
        .handle(ChannelEvent::Disconnected {
            reason: "transport close".into(),
        })
        .await;
    assert_eq!(h.session.rooms().joined_room(), None);

    h.session.handle(connected_as(2)).await;
    h.session.handle(connected_as(2)).await;

    assert_eq!(h.wire.joins(), vec![42, 42]);
    assert_eq!(*h.wire.bound.borrow(), vec![1, 2, 2]);
}

#[tokio::test]
async fn list_page_never_joins_a_room() {
    let mut h = harness("/web/posts");
    h.session.handle(connected()).await;
    assert_eq!(h.wire.probes(), 1);
    assert!(h.wire.joins().is_empty());
}

#[tokio::test]
async fn title_only_update_patches_only_the_title() {
    let mut h = harness("/web/posts/42");
    h.session
        .handle(message(
            "post_update",
            json!({"post_id": 42, "type": "update", "data": {"title": "Renamed"}}),
        ))
        .await;

    assert_eq!(
        h.screen.ops(),
        vec![Op::Patch(DetailPatch {
            title: Some("Renamed".into()),
            content_html: None,
            badge: None,
        })]
    );
}

#[tokio::test]
async fn updates_for_other_posts_change_nothing() {
    let mut h = harness("/web/posts/42");
    h.session
        .handle(message(
            "post_update",
            json!({"post_id": 43, "type": "update", "data": {"title": "Nope"}}),
        ))
        .await;
    h.session
        .handle(message("post_update", json!({"post_id": 43, "type": "delete"})))
        .await;

    assert!(h.screen.ops().is_empty());
    assert!(!h.wire.is_closed());
}

#[tokio::test]
async fn deletion_alerts_navigates_and_stops() {
    let mut h = harness("/web/posts/42");
    let events = futures_util::stream::iter(vec![
        connected(),
        message("post_update", json!({"post_id": 42, "type": "delete"})),
        message(
            "post_update",
            json!({"post_id": 42, "type": "update", "data": {"title": "late"}}),
        ),
    ]);

    h.session.run(events).await;

    assert_eq!(
        h.screen.ops(),
        vec![
            Op::Alert(DELETED_NOTICE.into()),
            Op::Navigate("/web/posts".into())
        ]
    );
    assert!(h.session.is_closed());
    assert!(h.wire.is_closed());
    assert_eq!(h.session.handle(connected()).await, Flow::Stop);
}

#[tokio::test]
async fn other_pages_only_observe_lifecycle() {
    let mut h = harness("/web/posts/42/edit");
    assert_eq!(h.session.page(), Page::Other);

    h.session.handle(connected()).await;
    h.session.handle(message("posts_list_update", Value::Null)).await;

    assert_eq!(*h.server.fetches.borrow(), 0);
    assert!(h.wire.joins().is_empty());
    assert!(h.screen.ops().is_empty());
}

#[tokio::test]
async fn prime_seeds_without_rendering() {
    let mut h = harness("/web/posts");
    h.server.will_return(Ok(vec![post(1, "a"), post(2, "b")]));

    h.session.prime().await;
    assert!(h.screen.ops().is_empty());
    assert_eq!(h.session.list().unwrap().entries().len(), 2);

    h.session
        .handle(message(
            "new_post",
            json!({"post": {"id": 2, "title": "b", "created_at": "2024-01-01T10:00:00Z"}}),
        ))
        .await;
    assert!(h.screen.ops().is_empty());
}

#[tokio::test]
async fn run_tears_down_when_the_channel_ends() {
    let mut h = harness("/web/posts");
    h.session.run(futures_util::stream::iter(Vec::new())).await;
    assert!(h.wire.is_closed());
}

#[tokio::test]
async fn prime_seeds_the_detail_post_and_patches_keep_it_current() {
    let mut h = harness("/web/posts/42");
    let mut seeded = post(42, "Old");
    seeded.content = Some("body".into());
    h.server.serves_post(seeded);

    h.session.prime().await;
    assert!(h.screen.ops().is_empty());
    assert_eq!(h.session.detail().unwrap().post().unwrap().title, "Old");

    h.session
        .handle(message(
            "post_update",
            json!({"post_id": 42, "type": "update", "data": {"title": "New"}}),
        ))
        .await;
    let post = h.session.detail().unwrap().post().unwrap();
    assert_eq!(post.title, "New");
    assert_eq!(post.content.as_deref(), Some("body"));
}

#[tokio::test]
async fn failed_detail_prime_still_patches_the_screen() {
    let mut h = harness("/web/posts/42");
    h.session.prime().await;
    assert!(h.session.detail().unwrap().post().is_none());

    h.session
        .handle(message(
            "post_update",
            json!({"post_id": 42, "type": "update", "data": {"title": "New"}}),
        ))
        .await;
    assert_eq!(h.screen.ops().len(), 1);
}
