//! Kerala Travel admin panel
//!
//! Command-line front-end for editing the About section, banner, gallery and
//! tour bookings of the Kerala Travel site through its REST backend.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kerala_core::{BlockId, Config};
use std::path::PathBuf;
use tracing::info;

/// Command line interface for the admin panel
#[derive(Debug, Parser)]
#[command(
    name = "kerala-admin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Admin panel for the Kerala Travel site",
    long_about = "Edit the About section, upload banners, manage the gallery and book tours against the Kerala Travel backend."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable structured JSON logging
    #[arg(long, global = true)]
    json: bool,

    /// Backend base URL (overrides config)
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Store the signed-in admin
    Login {
        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Contact email
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the signed-in admin
    Logout,

    /// Show the signed-in admin
    Whoami,

    /// Greeting and overview of the content areas
    Dashboard,

    /// About section
    About {
        /// About subcommand
        #[command(subcommand)]
        action: AboutCommands,
    },

    /// Banner carousel
    Banner {
        /// Banner subcommand
        #[command(subcommand)]
        action: BannerCommands,
    },

    /// Gallery blocks
    Gallery {
        /// Gallery subcommand
        #[command(subcommand)]
        action: GalleryCommands,
    },

    /// Tour packages and bookings
    Tours {
        /// Tours subcommand
        #[command(subcommand)]
        action: TourCommands,
    },

    /// Configuration
    Config {
        /// Config subcommand
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// About section commands
#[derive(Debug, Subcommand)]
enum AboutCommands {
    /// Print the About section
    Show,

    /// Change fields and save the whole section
    Edit {
        /// New heading
        #[arg(long)]
        heading: Option<String>,

        /// New paragraph
        #[arg(long)]
        paragraph: Option<String>,

        /// New background image
        #[arg(long, value_name = "FILE")]
        background: Option<PathBuf>,

        /// Card title, as INDEX=TITLE
        #[arg(long = "card-title", value_name = "INDEX=TITLE", value_parser = parse_indexed::<String>)]
        card_titles: Vec<(usize, String)>,

        /// Card image, as INDEX=FILE
        #[arg(long = "card-image", value_name = "INDEX=FILE", value_parser = parse_indexed::<PathBuf>)]
        card_images: Vec<(usize, PathBuf)>,
    },

    /// Append a card
    AddCard {
        /// Card title
        #[arg(long)]
        title: String,

        /// Card image
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },

    /// Delete a card
    DeleteCard {
        /// Zero-based card index
        #[arg(value_name = "INDEX")]
        index: usize,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Banner commands
#[derive(Debug, Subcommand)]
enum BannerCommands {
    /// Upload one to three slides
    Upload {
        /// Slide as HEADING|SUBHEADING|FILE, in slot order
        #[arg(long = "slide", value_name = "HEADING|SUBHEADING|FILE", required = true, value_parser = parse_slide)]
        slides: Vec<SlideArg>,
    },
}

/// Gallery commands
#[derive(Debug, Subcommand)]
enum GalleryCommands {
    /// List the blocks
    List,

    /// Update a block, creating it if it does not exist
    Update {
        /// Block identifier, e.g. img1
        #[arg(value_name = "BLOCK")]
        block: BlockId,

        /// New caption
        #[arg(long)]
        title: Option<String>,

        /// New image
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },

    /// Delete a block
    Delete {
        /// Block identifier
        #[arg(value_name = "BLOCK")]
        block: BlockId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Tour commands
#[derive(Debug, Subcommand)]
enum TourCommands {
    /// List the packages
    List,

    /// Book a package
    Book {
        /// Package title or key
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Customer name
        #[arg(long)]
        name: String,

        /// Contact phone
        #[arg(long)]
        phone: String,

        /// Travel date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Number of people
        #[arg(long)]
        people: String,
    },
}

/// Configuration commands
#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration as TOML
    Show,
}

/// One `--slide` argument
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlideArg {
    heading: String,
    subheading: String,
    image: PathBuf,
}

/// Parse `INDEX=VALUE`
fn parse_indexed<T: From<String>>(raw: &str) -> std::result::Result<(usize, T), String> {
    let (index, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got '{raw}'"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("'{index}' is not a card index"))?;
    Ok((index, T::from(value.to_string())))
}

/// Parse `HEADING|SUBHEADING|FILE`
fn parse_slide(raw: &str) -> std::result::Result<SlideArg, String> {
    let mut parts = raw.splitn(3, '|');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(heading), Some(subheading), Some(image)) if !image.trim().is_empty() => Ok(SlideArg {
            heading: heading.to_string(),
            subheading: subheading.to_string(),
            image: PathBuf::from(image.trim()),
        }),
        _ => Err(format!("expected HEADING|SUBHEADING|FILE, got '{raw}'")),
    }
}

/// Main entry point for the admin panel
///
/// # Errors
///
/// Returns error if configuration, logging or the chosen command fails
#[tokio::main]
async fn main() -> Result<()> {
    // It's okay if .env doesn't exist
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let _log_guard =
        kerala_core::init_logging(&config.logging).context("Failed to initialize logging")?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.api.base_url,
        "Kerala admin starting"
    );

    commands::run(cli.command, &config).await
}

/// Load configuration and apply command-line overrides
///
/// # Errors
///
/// Returns error if the configuration cannot be read or is invalid
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(ref level) = cli.log_level {
        config.logging.level.clone_from(level);
    }
    if cli.json {
        config.logging.format = "json".to_string();
    }
    if let Some(ref base_url) = cli.base_url {
        config.api.base_url.clone_from(base_url);
        config.validate().context("Invalid --base-url")?;
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_indexed() {
        assert_eq!(
            parse_indexed::<String>("1=Tea gardens").unwrap(),
            (1, "Tea gardens".to_string())
        );
        assert_eq!(
            parse_indexed::<String>("0=a=b").unwrap(),
            (0, "a=b".to_string())
        );
        assert!(parse_indexed::<String>("Tea").is_err());
        assert!(parse_indexed::<String>("x=Tea").is_err());
    }

    #[test]
    fn test_parse_slide() {
        assert_eq!(
            parse_slide("Backwaters|Cruise Alleppey|slides/one.jpg").unwrap(),
            SlideArg {
                heading: "Backwaters".to_string(),
                subheading: "Cruise Alleppey".to_string(),
                image: PathBuf::from("slides/one.jpg"),
            }
        );
    }

    #[rstest]
    #[case("only heading")]
    #[case("heading|sub")]
    #[case("heading|sub|  ")]
    fn test_parse_slide_rejects(#[case] raw: &str) {
        assert!(parse_slide(raw).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kerala-admin",
            "gallery",
            "delete",
            "img2",
            "--yes",
            "--base-url",
            "http://backend:5000",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://backend:5000"));
        match cli.command {
            Commands::Gallery {
                action: GalleryCommands::Delete { block, yes },
            } => {
                assert_eq!(block.as_str(), "img2");
                assert!(yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_block_id_is_rejected() {
        assert!(Cli::try_parse_from(["kerala-admin", "gallery", "delete", "../etc"]).is_err());
    }

    #[test]
    fn test_banner_needs_a_slide() {
        assert!(Cli::try_parse_from(["kerala-admin", "banner", "upload"]).is_err());
    }
}
