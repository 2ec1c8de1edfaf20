pub mod engine;
pub mod store;

pub use engine::{blend, BatchOutcome, Candidate, RankedCandidate, RecommendationEngine, Signal};
pub use store::{RecommendationStats, RecommendationStore};
