//! Core types and utilities for the Kerala Travel admin client

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod config;
pub mod error;
pub mod session;
pub mod types;
pub mod upload;

// Re-export commonly used types
pub use crate::config::Config;
pub use error::{Error, Result};
pub use session::{Session, SessionStore, User};
pub use types::{
    AboutCard, AboutContent, BannerSlide, BannerSlot, BlockId, Booking, GalleryBlock, ImageRef,
    TourPackage,
};
pub use upload::{ImageType, ImageUpload, UploadPolicy};

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over the configured level. When a log file is
/// configured, output goes there through a non-blocking writer whose guard
/// must be kept alive for the life of the process.
///
/// # Errors
///
/// Returns an error if the log file location is unusable or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let json = config.format == "json";

    let (writer, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().ok_or_else(|| Error::Configuration {
                message: format!("logging.file has no file name: {}", path.display()),
            })?;
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (fmt::writer::BoxMakeWriter::new(std::io::stderr), None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        registry
            .with(fmt::layer().pretty().with_writer(writer))
            .try_init()
    };

    result.map_err(|e| Error::Configuration {
        message: format!("failed to install logger: {e}"),
    })?;

    Ok(guard)
}
