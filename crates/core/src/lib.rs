pub mod catalog;
pub mod config;
pub mod customer;
pub mod error;
pub mod kiosk;
pub mod orders;
pub mod recommendations;

pub use config::AppConfig;
pub use error::{FreshmartError, FreshmartResult};
