//! FundAction Engine
//!
//! The FundAction Engine is the donation settlement and gamification core of the FundAction peer-to-peer fundraising
//! platform. It turns an asynchronous payment-completion notification into a consistent set of state changes: the
//! donation is finalised, the campaign, team and fundraiser aggregates are updated, the donor earns points and
//! badges, and the leaderboards are refreshed.
//!
//! The library is divided into three main sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). The engine treats durable storage
//!    as a collaborator offering entity reads, atomic increments and conditional updates. The data types stored in the
//!    database are defined in the [`mod@db_types`] module and are public.
//! 2. The engine public API ([`SettlementApi`], [`PropagationApi`], [`PointsApi`], [`BadgeApi`], [`LeaderboardApi`],
//!    [`ReconciliationApi`] and [`GamificationApi`]). Each API is generic over its storage backend.
//! 3. A set of events that can be subscribed to ([`mod@events`]). Donation settlement, donation failure and badge awards
//!    are published so that notification systems can hook into them without touching the engine's state.
pub mod db_types;
pub mod events;
mod fa_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use fa_api::{
    badge_api::{BadgeApi, BadgeFilter, EarnedBadge, UserProgress},
    errors::{GamificationError, LeaderboardError, SettlementError},
    gamification_api::{ActivityReward, GamificationApi},
    leaderboard_api::{LeaderboardApi, DEFAULT_STALENESS, LEADERBOARD_SIZE},
    points,
    points::{PointsApi, PointsAward},
    propagation_api::{PropagationApi, PropagationSummary},
    reconciliation_api::{ReconciliationApi, ReconciliationResult, DEFAULT_GRACE_PERIOD},
    settlement_api::{SettlementApi, SettlementOptions},
    settlement_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
