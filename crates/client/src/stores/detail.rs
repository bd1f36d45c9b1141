//! The single-post detail view.

use postlive_shared::{Post, PostId, PostUpdateKind, PostUpdatePayload};

use crate::render::{DetailPatch, Shell};

/// Shown before leaving a post that somebody else deleted.
pub const DELETED_NOTICE: &str = "This post has been deleted by another user.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailState {
    Viewing,
    /// Terminal: navigation away has started.
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    /// Not this page's post, or not an update/delete.
    Ignored,
    Updated,
    Deleted,
    /// Arrived after the view was already left.
    Closed,
}

#[derive(Debug, Clone)]
pub struct DetailReconciler {
    post_id: PostId,
    list_path: String,
    post: Option<Post>,
    state: DetailState,
}

impl DetailReconciler {
    pub fn new(post_id: PostId, list_path: impl Into<String>) -> Self {
        Self {
            post_id,
            list_path: list_path.into(),
            post: None,
            state: DetailState::Viewing,
        }
    }

    /// Seed with the post the server rendered.
    pub fn with_post(mut self, post: Post) -> Self {
        self.seed(post);
        self
    }

    /// Take `post` as what is currently on screen. Nothing is redrawn.
    pub fn seed(&mut self, post: Post) {
        if post.id == self.post_id {
            self.post = Some(post);
        } else {
            crate::log_warn!(
                "Ignoring seed post {} on the page of post {}",
                post.id,
                self.post_id
            );
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    pub fn state(&self) -> DetailState {
        self.state
    }

    pub fn on_update(&mut self, update: PostUpdatePayload, shell: &mut Shell) -> DetailOutcome {
        if self.state == DetailState::Deleted {
            crate::log_debug!("Post {} view already closed", self.post_id);
            return DetailOutcome::Closed;
        }
        if update.post_id != self.post_id {
            crate::log_debug!(
                "Update for post {} on the page of post {}",
                update.post_id,
                self.post_id
            );
            return DetailOutcome::Ignored;
        }

        match update.kind {
            PostUpdateKind::Update => {
                let Some(patch) = update.data else {
                    return DetailOutcome::Updated;
                };
                if let Some(post) = self.post.as_mut() {
                    post.apply_patch(&patch);
                }

                let view = DetailPatch::from_patch(&patch);
                if !view.is_empty() {
                    shell.renderer.patch_detail(&view);
                }
                DetailOutcome::Updated
            }
            PostUpdateKind::Delete => {
                self.state = DetailState::Deleted;
                crate::log_info!("Post {} was deleted, leaving", self.post_id);
                shell.notifier.alert(DELETED_NOTICE);
                shell.navigator.navigate(&self.list_path);
                DetailOutcome::Deleted
            }
            PostUpdateKind::Other => DetailOutcome::Ignored,
        }
    }
}
