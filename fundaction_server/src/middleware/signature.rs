//! Webhook signature middleware for Actix Web.
//!
//! The payment gateway signs every webhook delivery. The signature header (`Stripe-Signature` by default) carries a
//! unix timestamp and one or more HMAC-SHA256 signatures, keyed with the webhook signing secret, over
//! `"{timestamp}.{raw body}"`. See [`crate::helpers::verify_signature`].
//!
//! Wrap the webhook scope with this middleware. Requests with a missing, malformed, stale or mismatched signature are
//! rejected with `400 Bad Request` before the handler ever sees them. The raw body is put back on the request
//! afterwards, so the handler can deserialize it as usual.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use chrono::Utc;
use fundaction_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    errors::{ServerError, SignatureError},
    helpers::verify_signature,
};

pub struct SignatureMiddlewareFactory {
    signature_header: String,
    secret: Secret<String>,
    tolerance_secs: i64,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(signature_header: &str, secret: Secret<String>, tolerance_secs: i64, enabled: bool) -> Self {
        Self { signature_header: signature_header.into(), secret, tolerance_secs, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            signature_header: self.signature_header.clone(),
            secret: self.secret.clone(),
            tolerance_secs: self.tolerance_secs,
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    signature_header: String,
    secret: Secret<String>,
    tolerance_secs: i64,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let signature_header = self.signature_header.clone();
        let tolerance_secs = self.tolerance_secs;
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🪝️ Checking webhook signature");
            if !enabled {
                trace!("🪝️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🪝️ Failed to extract request data: {e:?}");
                ServerError::InvalidRequestBody(e.to_string())
            })?;
            let header = req
                .headers()
                .get(&signature_header)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or_else(|| {
                    warn!("🪝️ No {signature_header} header found in webhook request. Denying access.");
                    ServerError::InvalidSignature(SignatureError::MissingHeader)
                })?;
            let now = Utc::now().timestamp();
            match verify_signature(&header, data.as_ref(), &secret, tolerance_secs, now) {
                Ok(()) => {
                    trace!("🪝️ Webhook signature check ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🪝️ Webhook signature rejected. {e}");
                    Err(ServerError::InvalidSignature(e).into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
