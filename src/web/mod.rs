//! HTTP API for the gallery.
//!
//! Registration, folder listing and bulk download endpoints, plus optional
//! serving of the built frontend.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
