//! Browser shell: patches the server-rendered posts pages in place.

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element};

use crate::config::ClientConfig;
use crate::render::{placeholder_html, DetailPatch, Navigator, Notifier, PostRow, Renderer, Shell};
use crate::session::RealtimeSession;

const TABLE_BODY: &str = ".table tbody";
/// The server renders its own placeholder row without a class.
const PLACEHOLDER_CELL: &str = ".table tbody tr td[colspan]";
const DETAIL_TITLE: &str = ".card-header h5";
const DETAIL_CONTENT: &str = ".post-content";
const DETAIL_BADGE: &str = ".badge";

fn document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

fn select(selector: &str) -> Option<Element> {
    let element = document()?.query_selector(selector).ok().flatten();
    if element.is_none() {
        crate::log_debug!("No element matches '{}'", selector);
    }
    element
}

#[derive(Debug, Default)]
pub struct DomRenderer;

impl Renderer for DomRenderer {
    fn replace_list(&mut self, rows: &[PostRow]) {
        let Some(tbody) = select(TABLE_BODY) else {
            return;
        };
        let html: String = rows.iter().map(PostRow::to_html).collect();
        tbody.set_inner_html(&html);
    }

    fn show_placeholder(&mut self, colspan: usize) {
        let Some(tbody) = select(TABLE_BODY) else {
            return;
        };
        tbody.set_inner_html(&placeholder_html(colspan));
    }

    fn prepend_row(&mut self, row: &PostRow) {
        let Some(tbody) = select(TABLE_BODY) else {
            return;
        };
        if let Err(e) = tbody.insert_adjacent_html("afterbegin", &row.to_html()) {
            crate::log_error!("Failed to insert row for post {}: {:?}", row.id, e);
        }
    }

    fn remove_placeholder(&mut self) {
        let Some(cell) = select(PLACEHOLDER_CELL) else {
            return;
        };
        if let Ok(Some(row)) = cell.closest("tr") {
            row.remove();
        }
    }

    fn patch_detail(&mut self, patch: &DetailPatch) {
        if let Some(title) = &patch.title {
            if let Some(el) = select(DETAIL_TITLE) {
                el.set_text_content(Some(title));
            }
        }
        if let Some(content) = &patch.content_html {
            if let Some(el) = select(DETAIL_CONTENT) {
                el.set_inner_html(content);
            }
        }
        if let Some(badge) = patch.badge {
            if let Some(el) = select(DETAIL_BADGE) {
                el.set_class_name(badge.css_class());
                el.set_text_content(Some(badge.label()));
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct DomNotifier;

impl Notifier for DomNotifier {
    fn alert(&mut self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }
}

#[derive(Debug, Default)]
pub struct DomNavigator;

impl Navigator for DomNavigator {
    fn navigate(&mut self, path: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Err(e) = window.location().set_href(path) {
            crate::log_error!("Navigation to {} failed: {:?}", path, e);
        }
    }
}

/// Attach the realtime layer to the current page.
#[wasm_bindgen]
pub fn bootstrap() {
    let config = ClientConfig::from_location();
    let location = web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_default();

    let shell = Shell::new(DomRenderer, DomNotifier, DomNavigator);
    let (mut session, events) = RealtimeSession::init(&config, &location, shell);

    spawn_local(async move {
        session.prime().await;
        session.run(events).await;
    });
}
