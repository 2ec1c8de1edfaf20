#![warn(clippy::unwrap_used)]

pub mod account_rest;
pub mod admin_rest;
pub mod auth;
pub mod catalog_rest;
pub mod error;
pub mod kiosk_rest;
pub mod orders_rest;
pub mod recs_rest;
pub mod rest;
pub mod router;
pub mod server;
pub mod state;

pub use router::api_router;
pub use server::ApiServer;
pub use state::AppState;
