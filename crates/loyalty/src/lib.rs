pub mod customers;
pub mod engine;

pub use customers::CustomerStore;
pub use engine::RewardsEngine;
