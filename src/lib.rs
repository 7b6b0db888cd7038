pub mod config;
pub mod harness;
pub mod launch;
pub mod protocol;
pub mod store;
pub mod surface;
pub mod utils;
pub mod widget;
pub mod zones;

pub use config::WidgetConfig;
pub use launch::{EmbeddedContext, EnvironmentQuery, LaunchDirectives, SameContext};
pub use protocol::{HostChannel, InboundCommand, OutboundKind, OutboundMessage};
pub use store::{ClaimBackend, OutcomeStore};
pub use surface::{AudioOutput, DecorVariant, PresentationSurface};
pub use widget::{HitResult, WidgetController, WidgetDeps, WidgetState};

/// Entry point for the console harness binary.
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    utils::init_logging();

    log::info!("Santa widget harness starting up...");

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(harness::run_console()));

    if let Err(err) = result {
        log::error!("harness failed: {err:#}");
        std::process::exit(1);
    }
}
