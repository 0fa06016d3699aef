//! # Storage contracts
//!
//! The engine never talks to a database directly. Durable storage is a collaborator that offers entity reads,
//! per-field atomic increments, conditional updates and keyed upserts. The traits in this module define that contract.
//! A backend (currently [`crate::SqliteDatabase`]) implements all of them.
//!
//! * [`DonationManagement`] covers the donation records and their payment status transitions.
//! * [`AggregateStore`] covers the materialised campaign, team and fundraiser totals.
//! * [`GamificationStore`] covers user points, levels, the badge catalog and awarded badges.
//! * [`LeaderboardStore`] covers the ranking queries and the snapshot cache.
//! * [`EngineStore`] is the union of the above, and is what the settlement path requires.
mod aggregate_store;
mod donation_management;
mod errors;
mod gamification_store;
mod leaderboard_store;

pub use aggregate_store::AggregateStore;
pub use donation_management::DonationManagement;
pub use errors::StoreError;
pub use gamification_store::GamificationStore;
pub use leaderboard_store::LeaderboardStore;

/// Everything the settlement path touches. Backends get this for free by implementing the individual traits.
pub trait EngineStore: Clone + DonationManagement + AggregateStore + GamificationStore + LeaderboardStore {}

impl<T> EngineStore for T where T: Clone + DonationManagement + AggregateStore + GamificationStore + LeaderboardStore {}
