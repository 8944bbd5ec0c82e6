//! Pipeline stages.
//!
//! Stages run in this order; [`PipelineBuilder`](crate::PipelineBuilder)
//! assembles them:
//!
//! 1. [`access_log`] - access line once the response is known (info level only)
//! 2. [`compression`] - gzip (when enabled)
//! 3. [`cookies`] - cookie parsing
//! 4. [`session`] - session id cookie
//! 5. [`body_parser`] - request bodies, skipped for ignored paths
//! 6. [`page`] - templated page classification
//! 7. extension stages, if any
//! 8. [`router`] - URL rewriting
//! 9. [`redirect`] - 303 after a rewrite
//! 10. [`rest`] - REST sub-router
//! 11. [`static_files`] - files under the public root
//! 12. [`redirect`] - 404 redirect, then static files again
//! 13. [`redirect`] - resource missing
//!
//! Failures go through the [`errors`] stages.

pub mod access_log;
pub mod body_parser;
pub mod compression;
pub mod cookies;
pub mod errors;
pub mod page;
pub mod redirect;
pub mod rest;
pub mod router;
pub mod session;
pub mod static_files;

pub use access_log::AccessLogMiddleware;
pub use body_parser::{BodyParser, BodyParserGate, ParsedBody};
pub use compression::CompressionMiddleware;
pub use cookies::{CookieParser, Cookies};
pub use errors::{ErrorReporter, ErrorResponder};
pub use page::PageResolver;
pub use redirect::{NotFoundRedirect, ResourceMissing, RewriteRedirect};
pub use rest::{RestHandler, RestResource, RestRoute, RestRouter, RestRoutes};
pub use router::RewriteRouter;
pub use session::{Session, SessionMiddleware};
pub use static_files::StaticFiles;
