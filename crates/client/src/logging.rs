//! Cross-platform logging.
//!
//! The `log_*!` macros format their arguments and hand them to [`write`]:
//! - Web: `web_sys::console`
//! - Native: `tracing`, under the `postlive_client` target

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(target_arch = "wasm32")]
pub fn write(level: Level, msg: &str) {
    let msg = wasm_bindgen::JsValue::from_str(msg);
    match level {
        Level::Debug => web_sys::console::debug_1(&msg),
        Level::Info => web_sys::console::log_1(&msg),
        Level::Warn => web_sys::console::warn_1(&msg),
        Level::Error => web_sys::console::error_1(&msg),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn write(level: Level, msg: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "postlive_client", "{}", msg),
        Level::Info => tracing::info!(target: "postlive_client", "{}", msg),
        Level::Warn => tracing::warn!(target: "postlive_client", "{}", msg),
        Level::Error => tracing::error!(target: "postlive_client", "{}", msg),
    }
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Error, &format!($($arg)*))
    };
}
