use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
pub use fundaction_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      Upserted       ---------------------------------------------------------
/// The two named outcomes of a create-or-update store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upserted<T> {
    /// No record existed for the key. A new one was created.
    Created(T),
    /// A record already existed for the key, and was updated in place.
    Updated(T),
}

impl<T> Upserted<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn inner(&self) -> &T {
        match self {
            Upserted::Created(v) | Upserted::Updated(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Created(v) | Upserted::Updated(v) => v,
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// The donation has been initiated, and we are waiting to hear from the payment gateway.
    Pending,
    /// The gateway has confirmed the payment. This is a terminal state.
    Completed,
    /// The payment failed or was canceled. This is a terminal state.
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Completed => write!(f, "COMPLETED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------      Donation       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    /// Immutable once the donation has been created. Always positive.
    pub amount: Money,
    pub currency: String,
    pub campaign_id: String,
    /// `None` for guest donations
    pub donor_id: Option<String>,
    pub payment_status: PaymentStatus,
    /// The external payment reference assigned by the gateway (e.g. a payment intent id)
    pub payment_ref: Option<String>,
    pub is_anonymous: bool,
    pub is_recurring: bool,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the donation reached a terminal payment status
    pub settled_at: Option<DateTime<Utc>>,
    /// When every aggregate increment for this donation was known to have been applied
    pub propagated_at: Option<DateTime<Utc>>,
}

impl Donation {
    pub fn is_propagated(&self) -> bool {
        self.propagated_at.is_some()
    }
}

/// A new PENDING donation, as written by the donation initiation flow.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub campaign_id: String,
    pub donor_id: Option<String>,
    pub payment_ref: Option<String>,
    pub is_anonymous: bool,
    pub is_recurring: bool,
    pub message: Option<String>,
}

impl NewDonation {
    pub fn new<S1: Into<String>, S2: Into<String>>(id: S1, campaign_id: S2, amount: Money) -> Self {
        Self {
            id: id.into(),
            amount,
            currency: fundaction_common::DEFAULT_CURRENCY.to_string(),
            campaign_id: campaign_id.into(),
            donor_id: None,
            payment_ref: None,
            is_anonymous: false,
            is_recurring: false,
            message: None,
        }
    }

    pub fn with_donor<S: Into<String>>(mut self, donor_id: S) -> Self {
        self.donor_id = Some(donor_id.into());
        self
    }

    pub fn with_payment_ref<S: Into<String>>(mut self, payment_ref: S) -> Self {
        self.payment_ref = Some(payment_ref.into());
        self
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.is_anonymous = true;
        self
    }

    pub fn recurring(mut self) -> Self {
        self.is_recurring = true;
        self
    }
}

//--------------------------------------      Campaign       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub goal_amount: Money,
    pub raised_amount: Money,
    pub donation_count: i64,
    pub currency: String,
    pub team_id: Option<String>,
    pub creator_id: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub goal_amount: Money,
    pub currency: String,
    pub team_id: Option<String>,
    pub creator_id: String,
    pub status: CampaignStatus,
}

impl NewCampaign {
    pub fn new<S1: Into<String>, S2: Into<String>>(id: S1, creator_id: S2, goal_amount: Money) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            title: id.clone(),
            id,
            goal_amount,
            currency: fundaction_common::DEFAULT_CURRENCY.to_string(),
            team_id: None,
            creator_id: creator_id.into(),
            status: CampaignStatus::Active,
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_team<S: Into<String>>(mut self, team_id: S) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = status;
        self
    }
}

//--------------------------------------        Team         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub avatar: Option<String>,
    pub status: TeamStatus,
    pub raised_amount: Money,
    pub member_count: i64,
    pub campaign_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  FundraiserStats    ---------------------------------------------------------
/// Per-user fundraising aggregates. One row per user, created lazily on the first fundraising activity.
#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraiserStats {
    pub user_id: String,
    pub total_raised: Money,
    pub total_donations: i64,
    pub average_donation: Money,
    pub total_campaigns: i64,
    pub active_campaigns: i64,
    pub total_shares: i64,
    pub total_views: i64,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The campaign, team and fundraiser aggregates after they were rederived from COMPLETED donations in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputedAggregates {
    pub campaign: Campaign,
    pub team: Option<Team>,
    pub fundraiser: FundraiserStats,
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub total_points: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Badges        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeCategory {
    Donation,
    Fundraising,
    SocialSharing,
    Community,
}

impl FromStr for BadgeCategory {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DONATION" => Ok(Self::Donation),
            "FUNDRAISING" => Ok(Self::Fundraising),
            "SOCIAL_SHARING" => Ok(Self::SocialSharing),
            "COMMUNITY" => Ok(Self::Community),
            _ => Err(ConversionError(format!("Invalid badge category: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl FromStr for BadgeRarity {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COMMON" => Ok(Self::Common),
            "RARE" => Ok(Self::Rare),
            "EPIC" => Ok(Self::Epic),
            "LEGENDARY" => Ok(Self::Legendary),
            _ => Err(ConversionError(format!("Invalid badge rarity: {s}"))),
        }
    }
}

/// The unlock condition of a badge: a requirement kind and its threshold.
///
/// Money thresholds are stored in the catalog in major units and converted to [`Money`] when the catalog is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BadgeRequirement {
    /// Number of completed donations made by the user
    DonationCount(i64),
    /// Largest single completed donation made by the user
    SingleDonation(Money),
    /// Sum of all completed donations made by the user
    TotalDonated(Money),
    /// Total raised across all of the user's campaigns
    TotalRaised(Money),
    /// Number of campaigns created by the user
    CampaignCount(i64),
    /// Number of times the user has shared a campaign
    ShareCount(i64),
}

impl BadgeRequirement {
    pub fn from_descriptor(kind: &str, value: i64) -> Result<Self, ConversionError> {
        match kind {
            "donation_count" => Ok(Self::DonationCount(value)),
            "single_donation" => Ok(Self::SingleDonation(Money::from_major(value))),
            "total_donated" => Ok(Self::TotalDonated(Money::from_major(value))),
            "total_raised" => Ok(Self::TotalRaised(Money::from_major(value))),
            "campaign_count" => Ok(Self::CampaignCount(value)),
            "share_count" => Ok(Self::ShareCount(value)),
            _ => Err(ConversionError(format!("Unknown badge requirement kind: {kind}"))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DonationCount(_) => "donation_count",
            Self::SingleDonation(_) => "single_donation",
            Self::TotalDonated(_) => "total_donated",
            Self::TotalRaised(_) => "total_raised",
            Self::CampaignCount(_) => "campaign_count",
            Self::ShareCount(_) => "share_count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub category: BadgeCategory,
    pub rarity: BadgeRarity,
    pub points_reward: i64,
    pub requirement: BadgeRequirement,
}

/// The badge catalog as it is stored. The requirement descriptor is validated when converting into a [`Badge`].
#[derive(Debug, Clone, FromRow)]
pub struct BadgeRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub category: BadgeCategory,
    pub rarity: BadgeRarity,
    pub points_reward: i64,
    pub requirement_type: String,
    pub requirement_value: i64,
}

impl TryFrom<BadgeRow> for Badge {
    type Error = ConversionError;

    fn try_from(row: BadgeRow) -> Result<Self, Self::Error> {
        let requirement = BadgeRequirement::from_descriptor(&row.requirement_type, row.requirement_value)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            category: row.category,
            rarity: row.rarity,
            points_reward: row.points_reward,
            requirement,
        })
    }
}

#[derive(Debug, Clone, FromRow, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: String,
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

//--------------------------------------    Leaderboards     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderboardType {
    TopFundraisers,
    TopDonors,
    TopTeams,
}

impl LeaderboardType {
    pub const ALL: [LeaderboardType; 3] =
        [LeaderboardType::TopFundraisers, LeaderboardType::TopDonors, LeaderboardType::TopTeams];
}

impl Display for LeaderboardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaderboardType::TopFundraisers => write!(f, "TOP_FUNDRAISERS"),
            LeaderboardType::TopDonors => write!(f, "TOP_DONORS"),
            LeaderboardType::TopTeams => write!(f, "TOP_TEAMS"),
        }
    }
}

impl FromStr for LeaderboardType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TOP_FUNDRAISERS" => Ok(Self::TopFundraisers),
            "TOP_DONORS" => Ok(Self::TopDonors),
            "TOP_TEAMS" => Ok(Self::TopTeams),
            _ => Err(ConversionError(format!("Unknown leaderboard type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderboardPeriod {
    AllTime,
    Monthly,
    Weekly,
    Daily,
}

impl LeaderboardPeriod {
    /// The start of the trailing window that this period covers, or `None` for [`LeaderboardPeriod::AllTime`].
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            LeaderboardPeriod::AllTime => None,
            LeaderboardPeriod::Monthly => Some(now - Duration::days(30)),
            LeaderboardPeriod::Weekly => Some(now - Duration::days(7)),
            LeaderboardPeriod::Daily => Some(now - Duration::days(1)),
        }
    }
}

impl Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaderboardPeriod::AllTime => write!(f, "ALL_TIME"),
            LeaderboardPeriod::Monthly => write!(f, "MONTHLY"),
            LeaderboardPeriod::Weekly => write!(f, "WEEKLY"),
            LeaderboardPeriod::Daily => write!(f, "DAILY"),
        }
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL_TIME" => Ok(Self::AllTime),
            "MONTHLY" => Ok(Self::Monthly),
            "WEEKLY" => Ok(Self::Weekly),
            "DAILY" => Ok(Self::Daily),
            _ => Err(ConversionError(format!("Unknown leaderboard period: {s}"))),
        }
    }
}

/// A fundraiser's standing, as computed by the ranking query (before ranks are assigned).
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct FundraiserStanding {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub amount: Money,
    pub campaigns: i64,
    pub donations: i64,
}

#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct DonorStanding {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub amount: Money,
    pub donation_count: i64,
}

#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct TeamStanding {
    pub team_id: String,
    pub name: String,
    pub slug: String,
    pub avatar: Option<String>,
    pub amount: Money,
    pub members: i64,
    pub campaigns: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraiserEntry {
    pub rank: u32,
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub amount: Money,
    pub campaigns: i64,
    pub donations: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorEntry {
    pub rank: u32,
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub amount: Money,
    pub donation_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub rank: u32,
    pub team_id: String,
    pub name: String,
    pub slug: String,
    pub avatar: Option<String>,
    pub amount: Money,
    pub members: i64,
    pub campaigns: i64,
}

/// The ranked payload of a leaderboard snapshot. The shape of each entry depends on the leaderboard type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entries", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderboardEntries {
    TopFundraisers(Vec<FundraiserEntry>),
    TopDonors(Vec<DonorEntry>),
    TopTeams(Vec<TeamEntry>),
}

impl LeaderboardEntries {
    pub fn kind(&self) -> LeaderboardType {
        match self {
            LeaderboardEntries::TopFundraisers(_) => LeaderboardType::TopFundraisers,
            LeaderboardEntries::TopDonors(_) => LeaderboardType::TopDonors,
            LeaderboardEntries::TopTeams(_) => LeaderboardType::TopTeams,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LeaderboardEntries::TopFundraisers(v) => v.len(),
            LeaderboardEntries::TopDonors(v) => v.len(),
            LeaderboardEntries::TopTeams(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub kind: LeaderboardType,
    pub period: LeaderboardPeriod,
    pub data: LeaderboardEntries,
    pub last_computed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    /// A snapshot is fresh while it is strictly younger than the staleness window.
    pub fn is_fresh(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        now - self.last_computed < staleness
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardSnapshotRow {
    pub kind: LeaderboardType,
    pub period: LeaderboardPeriod,
    pub data: String,
    pub last_computed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LeaderboardSnapshotRow> for LeaderboardSnapshot {
    type Error = ConversionError;

    fn try_from(row: LeaderboardSnapshotRow) -> Result<Self, Self::Error> {
        let data: LeaderboardEntries = serde_json::from_str(&row.data)
            .map_err(|e| ConversionError(format!("Invalid {} {} snapshot data. {e}", row.kind, row.period)))?;
        if data.kind() != row.kind {
            return Err(ConversionError(format!("Snapshot for {} holds {} entries", row.kind, data.kind())));
        }
        Ok(Self { kind: row.kind, period: row.period, data, last_computed: row.last_computed, created_at: row.created_at })
    }
}
