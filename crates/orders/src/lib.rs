pub mod store;

pub use store::{CategorySales, DailySales, OrderStore, SalesStats};
