//! Run the frame against a real manifest with the desktop bridges.
//!
//! Slides are decoded by the headless image surface; nothing is drawn, but
//! every transition shows up in the log.
//!
//! ```bash
//! cargo run -p core-service --example headless_frame -- \
//!     https://frames.example/manifest.json /tmp/frame.db
//! ```

use std::env;

use bridge_traits::LogLevel;
use core_runtime::{
    config::FrameConfig,
    events::FrameEvent,
    logging::{init_logging, LogFormat, LoggingConfig},
};
use core_service::{FrameContext, FrameService, Shutdown};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let mut args = env::args().skip(1);
    let manifest_url = args.next();
    let database_path = args.next().unwrap_or_else(|| "frame.db".to_string());

    if let Err(e) = init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    ) {
        eprintln!("{}", e);
        return;
    }

    let mut config = FrameConfig::builder().database_path(database_path);
    if let Some(url) = manifest_url {
        config = config.manifest_url_override(url);
    }
    let config = match config.build() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Bad configuration");
            return;
        }
    };

    let mut builder = FrameContext::builder(config);
    let mut events = builder.event_bus().subscribe();
    let service = match FrameService::bootstrap(builder).await {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Frame failed to start");
            return;
        }
    };

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let FrameEvent::Playback(_) | FrameEvent::Sync(_) = event {
                info!(event = event.description(), "{:?}", event);
            }
        }
    });

    let shutdown = Shutdown::new();
    let signal = shutdown.signal();
    tokio::select! {
        _ = service.run(signal) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            shutdown.trigger();
        }
    }

    let status = service.status().await;
    info!(
        state = %status.state,
        photos = status.cached_photos,
        last_error = ?status.last_error,
        "Stopped"
    );
}
