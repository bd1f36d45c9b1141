//! Page identity: which view the current location shows.

use postlive_shared::{EventName, PostId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    List,
    Detail { post_id: PostId },
    /// Any page without realtime behavior (forms, users, ...).
    Other,
}

impl Page {
    /// Classify `location`, which may be a bare path or an absolute URL.
    ///
    /// Matches `<list_path>` exactly and `<list_path>/<digits>`; nothing else.
    pub fn from_location(location: &str, list_path: &str) -> Self {
        let path = match url::Url::parse(location) {
            Ok(url) => url.path().to_string(),
            Err(_) => location
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        let list_path = list_path.trim_end_matches('/');

        if path == list_path {
            return Page::List;
        }

        let Some(rest) = path
            .strip_prefix(list_path)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Page::Other;
        };

        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Page::Other;
        }

        match rest.parse::<PostId>() {
            Ok(post_id) => Page::Detail { post_id },
            Err(_) => Page::Other,
        }
    }

    /// Room the page must join after every connect.
    pub fn room(&self) -> Option<PostId> {
        match self {
            Page::Detail { post_id } => Some(*post_id),
            _ => None,
        }
    }

    /// Domain events this page reacts to.
    pub fn subscriptions(&self) -> &'static [EventName] {
        match self {
            Page::List => &[EventName::PostsListUpdate, EventName::NewPost],
            Page::Detail { .. } => &[EventName::PostUpdate],
            Page::Other => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "/web/posts";

    #[test]
    fn list_and_detail_paths() {
        assert_eq!(Page::from_location("/web/posts", LIST), Page::List);
        assert_eq!(
            Page::from_location("/web/posts/42", LIST),
            Page::Detail { post_id: 42 }
        );
    }

    #[test]
    fn absolute_urls_and_queries() {
        assert_eq!(
            Page::from_location("http://localhost:8000/web/posts?page=2", LIST),
            Page::List
        );
        assert_eq!(
            Page::from_location("https://example.com/web/posts/7#comments", LIST),
            Page::Detail { post_id: 7 }
        );
        assert_eq!(
            Page::from_location("/web/posts/7?x=1", LIST),
            Page::Detail { post_id: 7 }
        );
    }

    #[test]
    fn everything_else_is_other() {
        for path in [
            "/",
            "/web/posts/",
            "/web/posts/42/edit",
            "/web/posts/create",
            "/web/posts/-1",
            "/web/posts/+1",
            "/web/postsx",
            "/web/posts/99999999999999999999",
            "/web/users",
        ] {
            assert_eq!(Page::from_location(path, LIST), Page::Other, "{path}");
        }
    }

    #[test]
    fn subscriptions_follow_page_kind() {
        assert_eq!(
            Page::List.subscriptions(),
            &[EventName::PostsListUpdate, EventName::NewPost]
        );
        assert_eq!(
            Page::Detail { post_id: 1 }.subscriptions(),
            &[EventName::PostUpdate]
        );
        assert!(Page::Other.subscriptions().is_empty());
        assert_eq!(Page::Detail { post_id: 3 }.room(), Some(3));
        assert_eq!(Page::List.room(), None);
    }
}
