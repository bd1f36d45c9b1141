//! Platform shells: where rendering, alerts and navigation actually land.

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
pub use dom::{bootstrap, DomNavigator, DomNotifier, DomRenderer};

#[cfg(not(target_arch = "wasm32"))]
mod terminal;
#[cfg(not(target_arch = "wasm32"))]
pub use terminal::{TerminalNavigator, TerminalNotifier, TerminalRenderer};
