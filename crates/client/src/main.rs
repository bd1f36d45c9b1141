//! Postlive Client - native entry point
//!
//! Attaches to a posts server like a browser tab on `POSTLIVE_PAGE` would,
//! and prints every change it reconciles. The browser build starts through
//! `postlive_client::shell::bootstrap` instead.

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("postlive_client=debug")),
        )
        .init();

    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use anyhow::Context;
    use postlive_client::shell::{TerminalNavigator, TerminalNotifier, TerminalRenderer};
    use postlive_client::{ClientConfig, Page, RealtimeSession, Shell};

    pub async fn run() -> anyhow::Result<()> {
        let config = ClientConfig::from_env();
        url::Url::parse(&config.base_url)
            .with_context(|| format!("invalid POSTLIVE_BASE_URL {:?}", config.base_url))?;

        let location =
            std::env::var("POSTLIVE_PAGE").unwrap_or_else(|_| config.list_path.clone());
        if Page::from_location(&location, &config.list_path) == Page::Other {
            tracing::warn!(
                "{} is neither the posts list nor a post; only lifecycle events will show",
                location
            );
        }

        let navigator = TerminalNavigator::default();
        let shell = Shell::new(TerminalRenderer, TerminalNotifier, navigator.clone());
        let (mut session, events) = RealtimeSession::init(&config, &location, shell);

        session.prime().await;
        if let Some(list) = session.list() {
            tracing::info!(
                "Watching {} listed posts at {}",
                list.entries().len(),
                config.base_url
            );
        }

        let interrupted = tokio::select! {
            _ = session.run(events) => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            tracing::info!("Interrupted");
            session.teardown();
        }

        if let Some(path) = navigator.last() {
            tracing::info!("Page left for {}", path);
        }
        Ok(())
    }
}
