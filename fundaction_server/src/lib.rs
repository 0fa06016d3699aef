//! # FundAction server
//! This crate hosts the HTTP service for the FundAction engine. It is responsible for:
//! * Receiving payment webhooks from the payment gateway, verifying their signatures, and handing them to the
//!   settlement processor.
//! * Serving leaderboards and the badge catalog.
//! * Recording non-donation activity (campaign creation and shares) for gamification.
//! * Running the reconciliation worker, which repairs donations whose aggregates were never propagated.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /webhooks/payments`: Payment gateway webhooks. Requests must carry a valid signature header.
//! * `GET /api/leaderboards?type=&period=`: A leaderboard snapshot.
//! * `GET /api/badges?category=&rarity=`: The badge catalog.
//! * `GET /api/users/{user_id}/badges`: The badges a user has earned.
//! * `POST /api/shares`: Records a campaign share.
//! * `POST /api/campaigns/created`: Records that a campaign was created.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
