use std::{net::IpAddr, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ok, Either};
use fundaction_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    BadgeApi,
    GamificationApi,
    LeaderboardApi,
    SettlementApi,
    SettlementOptions,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    helpers::get_remote_ip,
    middleware::SignatureMiddlewareFactory,
    reconciliation_worker::start_reconciliation_worker,
    routes::{
        health,
        BadgeCatalogRoute,
        CampaignCreatedRoute,
        LeaderboardRoute,
        PaymentWebhookRoute,
        TrackShareRoute,
        UserBadgesRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _worker = start_reconciliation_worker(
        db.clone(),
        producers.clone(),
        config.reconciliation_interval,
        config.reconciliation_grace,
    );
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Donor and fundraiser notifications are delivered by a separate service. Until it subscribes, the events are logged.
fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_donation_settled(|ev| {
            Box::pin(async move {
                info!("📬️ Donation {} of {} to {} settled", ev.donation.id, ev.donation.amount, ev.donation.campaign_id);
            })
        })
        .on_donation_failed(|ev| {
            Box::pin(async move {
                info!("📬️ Donation {} to {} failed", ev.donation.id, ev.donation.campaign_id);
            })
        })
        .on_badge_awarded(|ev| {
            Box::pin(async move {
                info!("📬️ {} earned the {} badge", ev.user_id, ev.badge.name);
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let options = SettlementOptions {
            step_timeout: config.step_timeout,
            refresh_leaderboards: config.refresh_leaderboards_on_settle,
        };
        let settlement_api = SettlementApi::new(db.clone(), producers.clone()).with_options(options);
        let leaderboard_api = LeaderboardApi::new(db.clone()).with_staleness(config.leaderboard_staleness);
        let badge_api = BadgeApi::new(db.clone(), producers.clone());
        let gamification_api = GamificationApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fa::access_log"))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(leaderboard_api))
            .app_data(web::Data::new(badge_api))
            .app_data(web::Data::new(gamification_api))
            .app_data(web::Data::new(ServerOptions::from_config(&config)));
        let api_scope = web::scope("/api")
            .service(LeaderboardRoute::<SqliteDatabase>::new())
            .service(BadgeCatalogRoute::<SqliteDatabase>::new())
            .service(UserBadgesRoute::<SqliteDatabase>::new())
            .service(TrackShareRoute::<SqliteDatabase>::new())
            .service(CampaignCreatedRoute::<SqliteDatabase>::new());
        let webhook = &config.webhook;
        let signatures = SignatureMiddlewareFactory::new(
            &webhook.signature_header,
            webhook.secret.clone(),
            webhook.tolerance_secs,
            webhook.signature_checks,
        );
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = webhook.whitelist.clone();
        let webhook_scope = web::scope("/webhooks")
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .wrap(signatures)
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                if is_whitelisted(peer_ip, whitelist.as_deref()) {
                    Either::Left(srv.call(req))
                } else {
                    let peer = peer_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".into());
                    Either::Right(ok(req.error_response(ServerError::ForbiddenPeer(peer))))
                }
            });
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_addr)?
    .run();
    Ok(srv)
}

fn is_whitelisted(peer_ip: Option<IpAddr>, whitelist: Option<&[IpAddr]>) -> bool {
    match (peer_ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(whitelist)) => {
            let allowed = whitelist.contains(&ip);
            if !allowed {
                warn!("🪝️ Webhook from {ip} is not on the gateway whitelist. Denying access.");
            }
            allowed
        },
        (None, Some(_)) => {
            warn!("🪝️ No IP address found in the webhook request. Denying access.");
            false
        },
    }
}
