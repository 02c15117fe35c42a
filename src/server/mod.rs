//! Static File Server: serves a build output directory over plain HTTP.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial module structure

pub mod files;
pub mod http;
pub mod mime;

pub use http::{validate_root, BoundServer, StaticServer};
pub use mime::{configure_mime_overrides, MimeTable};
