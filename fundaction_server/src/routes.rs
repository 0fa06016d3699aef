//! HTTP handlers for the FundAction server.
//!
//! Handlers are thin: they parse the request, call one engine API and map the result onto a response. Anything more
//! involved belongs in the engine.
//!
//! Every handler that touches storage is generic over its backend, so that endpoint tests can run them against mocks.
//! Actix cannot register generic handlers directly, so each one is wrapped in a route struct by the `route!` macro.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use fundaction_engine::{
    db_types::{BadgeCategory, BadgeRarity, LeaderboardPeriod, LeaderboardType},
    traits::{EngineStore, GamificationStore, LeaderboardStore},
    BadgeApi,
    BadgeFilter,
    GamificationApi,
    LeaderboardApi,
    SettlementApi,
};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{
        ActivityResponse,
        BadgeQuery,
        CampaignCreatedRequest,
        LeaderboardQuery,
        PaymentWebhookEvent,
        ShareRequest,
        WebhookAck,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payment webhook  ----------------------------------------------------
route!(payment_webhook => Post "/payments" impl EngineStore);
/// Route handler for payment gateway webhooks.
///
/// The signature has already been checked by the time the handler runs. Every delivery is acknowledged with a `200`
/// so that the gateway does not redeliver it, including duplicates, contradictions, unknown event types and payments
/// that match no donation. The one exception is a storage failure before anything was committed: that returns a `500`
/// so that the gateway tries again later.
pub async fn payment_webhook<B: EngineStore>(
    req: HttpRequest,
    body: web::Json<PaymentWebhookEvent>,
    api: web::Data<SettlementApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let event = body.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    debug!(
        "🪝️ Received {} webhook {} for payment {} from {}",
        event.event_type,
        event.id,
        event.payment_ref(),
        peer.map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown address".into())
    );
    let metadata = event.notification_metadata();
    match api.settle(event.outcome(), event.payment_ref(), &metadata).await {
        Ok(outcome) => {
            info!("🪝️ Webhook {} processed. {outcome}", event.id);
            Ok(HttpResponse::Ok().json(WebhookAck::for_outcome(&event.id, &outcome)))
        },
        Err(e) if e.is_transient() => {
            error!("🪝️ Webhook {} could not be processed and will be redelivered. {e}", event.id);
            Err(ServerError::BackendError(e.to_string()))
        },
        Err(e) => {
            warn!("🪝️ Webhook {} was acknowledged without effect. {e}", event.id);
            Ok(HttpResponse::Ok().json(WebhookAck::new(&event.id, "unresolved")))
        },
    }
}

//----------------------------------------------   Leaderboards  -------------------------------------------------------
route!(leaderboard => Get "/leaderboards" impl LeaderboardStore);
/// `GET /leaderboards?type=TOP_DONORS&period=WEEKLY`
///
/// Defaults to the all-time top fundraisers.
pub async fn leaderboard<B: LeaderboardStore>(
    query: web::Query<LeaderboardQuery>,
    api: web::Data<LeaderboardApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    let kind = match query.kind.as_deref() {
        Some(s) => s.parse::<LeaderboardType>().map_err(|e| ServerError::InvalidQueryParameter(e.to_string()))?,
        None => LeaderboardType::TopFundraisers,
    };
    let period = match query.period.as_deref() {
        Some(s) => s.parse::<LeaderboardPeriod>().map_err(|e| ServerError::InvalidQueryParameter(e.to_string()))?,
        None => LeaderboardPeriod::AllTime,
    };
    debug!("💻️ GET leaderboard {kind} {period}");
    let snapshot = api.get(kind, period).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

//----------------------------------------------   Badges  -------------------------------------------------------------
route!(badge_catalog => Get "/badges" impl GamificationStore);
/// `GET /badges?category=DONATION&rarity=RARE`. Both filters are optional.
pub async fn badge_catalog<B: GamificationStore>(
    query: web::Query<BadgeQuery>,
    api: web::Data<BadgeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    let category = query
        .category
        .as_deref()
        .map(str::parse::<BadgeCategory>)
        .transpose()
        .map_err(|e| ServerError::InvalidQueryParameter(e.to_string()))?;
    let rarity = query
        .rarity
        .as_deref()
        .map(str::parse::<BadgeRarity>)
        .transpose()
        .map_err(|e| ServerError::InvalidQueryParameter(e.to_string()))?;
    debug!("💻️ GET badge catalog. category: {category:?}, rarity: {rarity:?}");
    let badges = api.catalog(&BadgeFilter { category, rarity }).await?;
    Ok(HttpResponse::Ok().json(badges))
}

route!(user_badges => Get "/users/{user_id}/badges" impl GamificationStore);
pub async fn user_badges<B: GamificationStore>(
    path: web::Path<String>,
    api: web::Data<BadgeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    debug!("💻️ GET badges for {user_id}");
    let badges = api.badges_for_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(badges))
}

//----------------------------------------------   Activity  -----------------------------------------------------------
route!(track_share => Post "/shares" impl EngineStore);
/// Records that a user shared a campaign, and awards their share points.
pub async fn track_share<B: EngineStore>(
    body: web::Json<ShareRequest>,
    api: web::Data<GamificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ShareRequest { user_id, platform } = body.into_inner();
    debug!("💻️ POST share by {user_id} on {platform}");
    let reward = api.track_share(&user_id, &platform).await?;
    Ok(HttpResponse::Ok().json(ActivityResponse { success: true, reward }))
}

route!(campaign_created => Post "/campaigns/created" impl EngineStore);
/// Called by the campaign service once a campaign has been created.
pub async fn campaign_created<B: EngineStore>(
    body: web::Json<CampaignCreatedRequest>,
    api: web::Data<GamificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let campaign_id = body.into_inner().campaign_id;
    debug!("💻️ POST campaign created: {campaign_id}");
    let reward = api.record_campaign_created(&campaign_id).await?;
    Ok(HttpResponse::Ok().json(ActivityResponse { success: true, reward }))
}
