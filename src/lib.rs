//! Bookshelf application library
//!
//! The book catalog module plus the bootstrap that wires settings, the
//! database, and the HTTP server together.

pub mod app;
pub mod modules;

pub use app::{migrate, serve, App};
