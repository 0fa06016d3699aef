pub mod badge_api;
pub mod errors;
pub mod gamification_api;
pub mod leaderboard_api;
pub mod points;
pub mod propagation_api;
pub mod reconciliation_api;
pub mod settlement_api;
pub mod settlement_objects;
