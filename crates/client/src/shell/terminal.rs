//! Terminal shell for the native binary. Views are printed, not drawn.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::render::{placeholder_html, DetailPatch, Navigator, Notifier, PostRow, Renderer};

fn print_row(out: &mut impl Write, row: &PostRow) {
    let _ = writeln!(
        out,
        "  #{:<5} {:<40} {:<16} {:<9} {}",
        row.id,
        row.title,
        row.author,
        row.badge.label(),
        row.created_label
    );
}

#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn replace_list(&mut self, rows: &[PostRow]) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "posts ({}):", rows.len());
        for row in rows {
            print_row(&mut out, row);
        }
    }

    fn show_placeholder(&mut self, colspan: usize) {
        crate::log_debug!("Placeholder: {}", placeholder_html(colspan));
        println!("posts: {}", crate::render::EMPTY_LIST_TEXT);
    }

    fn prepend_row(&mut self, row: &PostRow) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "new post:");
        print_row(&mut out, row);
    }

    fn remove_placeholder(&mut self) {}

    fn patch_detail(&mut self, patch: &DetailPatch) {
        let mut out = std::io::stdout().lock();
        if let Some(title) = &patch.title {
            let _ = writeln!(out, "title   -> {title}");
        }
        if let Some(badge) = patch.badge {
            let _ = writeln!(out, "status  -> {}", badge.label());
        }
        if let Some(content) = &patch.content_html {
            let _ = writeln!(out, "content -> {content}");
        }
    }
}

#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&mut self, message: &str) {
        eprintln!("!! {message}");
    }
}

/// Remembers where the page was sent; the binary exits after a navigation.
#[derive(Debug, Clone, Default)]
pub struct TerminalNavigator {
    last: Rc<RefCell<Option<String>>>,
}

impl TerminalNavigator {
    pub fn last(&self) -> Option<String> {
        self.last.borrow().clone()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&mut self, path: &str) {
        println!("navigate -> {path}");
        *self.last.borrow_mut() = Some(path.to_string());
    }
}
