use std::{env, fmt::Display, net::IpAddr, str::FromStr, time::Duration};

use fundaction_common::{helpers::parse_boolean_flag, Secret};
use log::*;
use rand::{thread_rng, RngCore};

const DEFAULT_FA_HOST: &str = "127.0.0.1";
const DEFAULT_FA_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/fundaction.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_SIGNATURE_HEADER: &str = "Stripe-Signature";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_LEADERBOARD_STALENESS_SECS: i64 = 300;
const DEFAULT_STEP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONCILIATION_INTERVAL_SECS: u64 = 300;
const DEFAULT_RECONCILIATION_GRACE_SECS: i64 = 600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub webhook: WebhookConfig,
    /// How long a leaderboard snapshot is served before it is recomputed.
    pub leaderboard_staleness: chrono::Duration,
    /// Refresh the all-time leaderboards inline after every settlement.
    pub refresh_leaderboards_on_settle: bool,
    /// Upper bound on each downstream step of a settlement.
    pub step_timeout: Duration,
    /// How often the reconciliation worker sweeps for drifted donations.
    pub reconciliation_interval: Duration,
    /// How long a settled donation may stay unpropagated before the sweep repairs it.
    pub reconciliation_grace: chrono::Duration,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The payment gateway's webhook signing secret.
    pub secret: Secret<String>,
    pub signature_header: String,
    /// If false, webhook signatures are not checked at all. **DANGER**
    pub signature_checks: bool,
    /// Maximum distance, in seconds, between a signature's timestamp and the server clock.
    pub tolerance_secs: i64,
    /// If supplied, requests against the webhook endpoints will be checked against a whitelist of gateway IP
    /// addresses. To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FA_HOST.to_string(),
            port: DEFAULT_FA_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook: WebhookConfig::default(),
            leaderboard_staleness: chrono::Duration::seconds(DEFAULT_LEADERBOARD_STALENESS_SECS),
            refresh_leaderboards_on_settle: true,
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            reconciliation_interval: Duration::from_secs(DEFAULT_RECONCILIATION_INTERVAL_SECS),
            reconciliation_grace: chrono::Duration::seconds(DEFAULT_RECONCILIATION_GRACE_SECS),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: Secret::default(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            signature_checks: true,
            tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
            whitelist: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FA_HOST").ok().unwrap_or_else(|| DEFAULT_FA_HOST.into());
        let port = env_or_default("FA_PORT", DEFAULT_FA_PORT);
        let database_url = env::var("FA_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FA_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env_or_default("FA_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let use_x_forwarded_for = parse_boolean_flag(env::var("FA_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("FA_USE_FORWARDED").ok(), false);
        let webhook = WebhookConfig::from_env_or_defaults();
        let staleness = env_or_default("FA_LEADERBOARD_STALENESS_SECS", DEFAULT_LEADERBOARD_STALENESS_SECS);
        let refresh_leaderboards_on_settle =
            parse_boolean_flag(env::var("FA_REFRESH_LEADERBOARDS_ON_SETTLE").ok(), true);
        if !refresh_leaderboards_on_settle {
            info!("🪛️ Leaderboards will not be refreshed on settlement. They are refreshed every {staleness}s.");
        }
        let step_timeout = env_or_default("FA_STEP_TIMEOUT_SECS", DEFAULT_STEP_TIMEOUT_SECS);
        let interval = env_or_default("FA_RECONCILIATION_INTERVAL_SECS", DEFAULT_RECONCILIATION_INTERVAL_SECS);
        let grace = env_or_default("FA_RECONCILIATION_GRACE_SECS", DEFAULT_RECONCILIATION_GRACE_SECS);
        Self {
            host,
            port,
            database_url,
            max_connections,
            use_x_forwarded_for,
            use_forwarded,
            webhook,
            leaderboard_staleness: chrono::Duration::seconds(staleness),
            refresh_leaderboards_on_settle,
            step_timeout: Duration::from_secs(step_timeout),
            reconciliation_interval: Duration::from_secs(interval),
            reconciliation_grace: chrono::Duration::seconds(grace),
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret = match env::var("FA_WEBHOOK_SECRET") {
            Ok(s) if !s.is_empty() => Secret::new(s),
            _ => {
                warn!(
                    "🚨️🚨️🚨️ FA_WEBHOOK_SECRET is not set. I'm using a random value for this session. No payment \
                     gateway will be able to deliver webhooks. DO NOT operate on production like this. 🚨️🚨️🚨️"
                );
                random_secret()
            },
        };
        let signature_header =
            env::var("FA_WEBHOOK_SIGNATURE_HEADER").ok().unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.into());
        let signature_checks = parse_boolean_flag(env::var("FA_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can settle donations on this server.");
        }
        let tolerance_secs = env_or_default("FA_WEBHOOK_TOLERANCE_SECS", DEFAULT_WEBHOOK_TOLERANCE_SECS);
        let whitelist = env::var("FA_GATEWAY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The gateway IP whitelist was configured, but is empty.  The server will run, but won't \
                     authorise any incoming webhooks."
                );
            },
            None => {
                info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Gateway IP whitelist: {addrs}");
            },
        }
        Self { secret, signature_header, signature_checks, tolerance_secs, whitelist }
    }
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set FA_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in FA_GATEWAY_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

/// Reads and parses `name`, falling back to `default` (with a log message) if it is unset or invalid.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

fn random_secret() -> Secret<String> {
    let mut bytes = [0u8; 32];
    thread_rng().fill_bytes(&mut bytes);
    Secret::new(format!("whsec_{}", hex::encode(bytes)))
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
