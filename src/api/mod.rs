//! Presentation surfaces: the HTTP server with its HTML form and JSON API.

pub mod http;
pub mod page;

pub use http::{routes, serve};
