//! Typed configuration for the Feather request pipeline.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`FEATHER__SECTION__KEY`)
//! - Strict validation: unknown fields and invalid regexes fail at load time
//!
//! # Example
//!
//! ```no_run
//! use feather_config::ConfigLoader;
//!
//! # fn main() -> Result<(), feather_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("feather.toml")?
//!     .with_env_prefix("FEATHER")
//!     .load()?;
//!
//! println!("serving from {}", config.public_root.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! publicRoot = "public"
//! debug = false
//!
//! [pageRoutes]
//! "^/about/?$" = "aboutPage"
//!
//! [connect]
//! 404 = "/404.html"
//!
//! [connect.bodyParser.ignorePaths]
//! "^/upload" = "post"
//!
//! [resources.publish]
//! gzip = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [logging.categories]
//! "http.access" = "info"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
