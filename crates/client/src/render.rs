//! Renderer contract and the view models handed to it.
//!
//! Reconcilers decide *what* changes; a [`Renderer`] decides how that looks.
//! The browser shell patches the DOM, the terminal shell prints.

use postlive_shared::{parse_timestamp, Post, PostId, PostPatch};

/// Columns of the posts table, actions included.
pub const LIST_COLUMNS: usize = 6;
pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const EMPTY_LIST_TEXT: &str = "No posts found";

const DATE_FORMAT: &str = "%m/%d/%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBadge {
    Published,
    Draft,
}

impl StatusBadge {
    pub fn from_published(published: bool) -> Self {
        if published {
            StatusBadge::Published
        } else {
            StatusBadge::Draft
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusBadge::Published => "Published",
            StatusBadge::Draft => "Draft",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            StatusBadge::Published => "badge bg-success",
            StatusBadge::Draft => "badge bg-warning",
        }
    }
}

/// One row of the posts table.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub id: PostId,
    pub title: String,
    pub author: String,
    pub badge: StatusBadge,
    pub created_label: String,
    pub view_href: String,
    pub edit_href: String,
    /// Target of the POST form behind the Delete button.
    pub delete_action: String,
}

impl PostRow {
    pub fn from_post(post: &Post, list_path: &str) -> Self {
        let base = format!("{}/{}", list_path.trim_end_matches('/'), post.id);
        Self {
            id: post.id,
            title: post.title.clone(),
            author: post
                .author
                .clone()
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            badge: StatusBadge::from_published(post.published),
            created_label: format_created(&post.created_at),
            edit_href: format!("{base}/edit"),
            delete_action: format!("{base}/delete"),
            view_href: base,
        }
    }

    /// Table row markup, escaped.
    ///
    /// Delete opens a confirmation modal whose form POSTs to `delete_action`;
    /// the server has no GET route for it.
    pub fn to_html(&self) -> String {
        format!(
            concat!(
                r#"<tr data-post-id="{id}">"#,
                "<td>{id}</td>",
                "<td>{title}</td>",
                "<td>{author}</td>",
                r#"<td><span class="{class}">{label}</span></td>"#,
                "<td>{created}</td>",
                "<td>",
                r#"<div class="btn-group btn-group-sm" role="group">"#,
                r#"<a href="{view}" class="btn btn-info">View</a>"#,
                r#"<a href="{edit}" class="btn btn-warning">Edit</a>"#,
                r##"<button class="btn btn-danger" data-bs-toggle="modal" data-bs-target="#deleteModal{id}">Delete</button>"##,
                "</div>",
                r#"<div class="modal fade" id="deleteModal{id}" tabindex="-1" aria-hidden="true">"#,
                r#"<div class="modal-dialog"><div class="modal-content">"#,
                r#"<div class="modal-header"><h5 class="modal-title">Confirm Delete</h5>"#,
                r#"<button type="button" class="btn-close" data-bs-dismiss="modal" aria-label="Close"></button></div>"#,
                r#"<div class="modal-body">Are you sure you want to delete "{title}"? This action cannot be undone.</div>"#,
                r#"<div class="modal-footer">"#,
                r#"<button type="button" class="btn btn-secondary" data-bs-dismiss="modal">Cancel</button>"#,
                r#"<form action="{delete}" method="post"><button type="submit" class="btn btn-danger">Delete</button></form>"#,
                "</div></div></div></div>",
                "</td>",
                "</tr>"
            ),
            id = self.id,
            view = escape_html(&self.view_href),
            edit = escape_html(&self.edit_href),
            delete = escape_html(&self.delete_action),
            title = escape_html(&self.title),
            author = escape_html(&self.author),
            class = self.badge.css_class(),
            label = self.badge.label(),
            created = escape_html(&self.created_label),
        )
    }
}

/// Placeholder row markup for an empty table.
pub fn placeholder_html(colspan: usize) -> String {
    format!(
        r#"<tr class="no-posts"><td colspan="{colspan}" class="text-center">{EMPTY_LIST_TEXT}</td></tr>"#
    )
}

/// `MM/DD/YYYY HH:MM`, in the browser's local time and in UTC elsewhere.
/// Unparseable timestamps are shown as-is.
pub fn format_created(raw: &str) -> String {
    let Some(dt) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    #[cfg(target_arch = "wasm32")]
    let dt = dt.with_timezone(&chrono::Local);
    dt.format(DATE_FORMAT).to_string()
}

/// Field-level changes for the detail view. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPatch {
    pub title: Option<String>,
    /// Already converted to markup.
    pub content_html: Option<String>,
    pub badge: Option<StatusBadge>,
}

impl DetailPatch {
    pub fn from_patch(patch: &PostPatch) -> Self {
        Self {
            title: patch.title.clone(),
            content_html: patch.content.as_deref().map(content_to_html),
            badge: patch.published.map(StatusBadge::from_published),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content_html.is_none() && self.badge.is_none()
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Plain text with newlines to markup with `<br>` line breaks.
pub fn content_to_html(content: &str) -> String {
    escape_html(content)
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

/// Presentation side of the list and detail views.
pub trait Renderer {
    /// Replace the whole table body with `rows`, in order.
    fn replace_list(&mut self, rows: &[PostRow]);

    /// Replace the table body with a single "no posts" row.
    fn show_placeholder(&mut self, colspan: usize);

    /// Insert `row` above every other row.
    fn prepend_row(&mut self, row: &PostRow);

    fn remove_placeholder(&mut self);

    fn patch_detail(&mut self, patch: &DetailPatch);
}

/// Blocking user notification.
pub trait Notifier {
    fn alert(&mut self, message: &str);
}

pub trait Navigator {
    fn navigate(&mut self, path: &str);
}

/// The platform collaborators a session renders through.
pub struct Shell {
    pub renderer: Box<dyn Renderer>,
    pub notifier: Box<dyn Notifier>,
    pub navigator: Box<dyn Navigator>,
}

impl Shell {
    pub fn new(
        renderer: impl Renderer + 'static,
        notifier: impl Notifier + 'static,
        navigator: impl Navigator + 'static,
    ) -> Self {
        Self {
            renderer: Box::new(renderer),
            notifier: Box::new(notifier),
            navigator: Box::new(navigator),
        }
    }
}
