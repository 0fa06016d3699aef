mod fundaction_world;
mod setups;
mod steps;

pub use fundaction_world::{FundActionWorld, SettlementSystem};
