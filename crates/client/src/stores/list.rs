//! The posts list, newest first.
//!
//! Entries are unique by id. A duplicate insert is a no-op, and a full
//! refresh replaces everything, so duplicated deliveries and refresh races
//! converge on the same table.

use std::collections::HashSet;

use postlive_shared::{Post, PostId};

use crate::render::{PostRow, Renderer, LIST_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Refreshed { count: usize },
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct ListReconciler {
    list_path: String,
    entries: Vec<Post>,
    placeholder_shown: bool,
}

impl ListReconciler {
    /// An empty list, as the server renders it: placeholder row only.
    pub fn new(list_path: impl Into<String>) -> Self {
        Self {
            list_path: list_path.into(),
            entries: Vec::new(),
            placeholder_shown: true,
        }
    }

    /// Seed from the list the server already rendered. Nothing is redrawn.
    pub fn with_initial(list_path: impl Into<String>, posts: Vec<Post>) -> Self {
        let mut list = Self::new(list_path);
        list.seed(posts);
        list
    }

    /// Take `posts` as what is currently on screen.
    pub fn seed(&mut self, posts: Vec<Post>) {
        self.entries = dedupe(posts);
        self.placeholder_shown = self.entries.is_empty();
    }

    pub fn entries(&self) -> &[Post] {
        &self.entries
    }

    pub fn contains(&self, id: PostId) -> bool {
        self.entries.iter().any(|p| p.id == id)
    }

    pub fn placeholder_shown(&self) -> bool {
        self.placeholder_shown
    }

    /// Replace the list wholesale, keeping the server's order.
    pub fn full_refresh(&mut self, posts: Vec<Post>, renderer: &mut dyn Renderer) -> ListOutcome {
        let received = posts.len();
        self.entries = dedupe(posts);
        if self.entries.len() != received {
            crate::log_debug!(
                "Refresh carried {} duplicated ids",
                received - self.entries.len()
            );
        }

        if self.entries.is_empty() {
            renderer.show_placeholder(LIST_COLUMNS);
            self.placeholder_shown = true;
        } else {
            let rows: Vec<PostRow> = self
                .entries
                .iter()
                .map(|post| PostRow::from_post(post, &self.list_path))
                .collect();
            renderer.replace_list(&rows);
            self.placeholder_shown = false;
        }

        ListOutcome::Refreshed {
            count: self.entries.len(),
        }
    }

    /// Insert a pushed post at the top unless its id is already listed.
    pub fn new_entry(&mut self, post: Post, renderer: &mut dyn Renderer) -> ListOutcome {
        if self.contains(post.id) {
            crate::log_debug!("Post {} already listed", post.id);
            return ListOutcome::Duplicate;
        }

        if self.placeholder_shown {
            renderer.remove_placeholder();
            self.placeholder_shown = false;
        }
        renderer.prepend_row(&PostRow::from_post(&post, &self.list_path));
        self.entries.insert(0, post);

        ListOutcome::Inserted
    }
}

/// Keep the first occurrence of every id.
fn dedupe(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::with_capacity(posts.len());
    posts.into_iter().filter(|p| seen.insert(p.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DetailPatch;

    /// Keeps a model of the table body so tests can assert on what is visible.
    #[derive(Debug, Default)]
    struct TableRenderer {
        rows: Vec<PostRow>,
        placeholder: Option<usize>,
    }

    impl Renderer for TableRenderer {
        fn replace_list(&mut self, rows: &[PostRow]) {
            self.rows = rows.to_vec();
            self.placeholder = None;
        }

        fn show_placeholder(&mut self, colspan: usize) {
            self.rows.clear();
            self.placeholder = Some(colspan);
        }

        fn prepend_row(&mut self, row: &PostRow) {
            self.rows.insert(0, row.clone());
        }

        fn remove_placeholder(&mut self) {
            self.placeholder = None;
        }

        fn patch_detail(&mut self, _patch: &DetailPatch) {}
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

    fn ids(renderer: &TableRenderer) -> Vec<PostId> {
        renderer.rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut renderer = TableRenderer::default();
        let mut list = ListReconciler::with_initial("/web/posts", vec![post(1, "a")]);

        assert_eq!(list.new_entry(post(2, "b"), &mut renderer), ListOutcome::Inserted);
        assert_eq!(list.new_entry(post(2, "b"), &mut renderer), ListOutcome::Duplicate);
        assert_eq!(list.entries().iter().filter(|p| p.id == 2).count(), 1);
        assert_eq!(ids(&renderer), vec![2]);
    }

    #[test]
    fn refresh_keeps_server_order() {
        let mut renderer = TableRenderer::default();
        let mut list = ListReconciler::new("/web/posts");

        let outcome = list.full_refresh(vec![post(3, "A"), post(1, "B"), post(2, "C")], &mut renderer);
        assert_eq!(outcome, ListOutcome::Refreshed { count: 3 });
        assert_eq!(ids(&renderer), vec![3, 1, 2]);
        assert_eq!(
            list.entries().iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![3, 1, 2]
        );
    }

    #[test]
    fn refresh_drops_repeated_ids() {
        let mut renderer = TableRenderer::default();
        let mut list = ListReconciler::new("/web/posts");
        list.full_refresh(vec![post(1, "first"), post(2, "x"), post(1, "second")], &mut renderer);
        assert_eq!(ids(&renderer), vec![1, 2]);
        assert_eq!(list.entries()[0].title, "first");
    }

    #[test]
    fn empty_refresh_shows_one_placeholder() {
        let mut renderer = TableRenderer::default();
        let mut list = ListReconciler::with_initial("/web/posts", vec![post(1, "a")]);
        assert!(!list.placeholder_shown());

        list.full_refresh(vec![], &mut renderer);
        assert!(renderer.rows.is_empty());
        assert_eq!(renderer.placeholder, Some(LIST_COLUMNS));
        assert!(list.placeholder_shown());

        list.full_refresh(vec![post(4, "d")], &mut renderer);
        assert_eq!(renderer.placeholder, None);
        assert!(!list.placeholder_shown());
    }

    #[test]
    fn insert_removes_placeholder() {
        let mut renderer = TableRenderer::default();
        let mut list = ListReconciler::new("/web/posts");
        list.full_refresh(vec![], &mut renderer);

        list.new_entry(post(9, "n"), &mut renderer);
        assert_eq!(renderer.placeholder, None);
        assert_eq!(ids(&renderer), vec![9]);
        assert!(!list.placeholder_shown());
    }

    #[test]
    fn insert_then_refresh_converges() {
        let mut renderer = TableRenderer::default();
        let mut list = ListReconciler::with_initial("/web/posts", vec![post(1, "a")]);

        list.new_entry(post(2, "b"), &mut renderer);
        list.full_refresh(vec![post(2, "b"), post(1, "a")], &mut renderer);
        assert_eq!(list.new_entry(post(2, "b"), &mut renderer), ListOutcome::Duplicate);
        assert_eq!(ids(&renderer), vec![2, 1]);
    }
}
