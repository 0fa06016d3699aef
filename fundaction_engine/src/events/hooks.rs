use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{BadgeAwardedEvent, DonationFailedEvent, DonationSettledEvent, EventHandler, EventProducer, Handler};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub donation_settled_producer: Vec<EventProducer<DonationSettledEvent>>,
    pub donation_failed_producer: Vec<EventProducer<DonationFailedEvent>>,
    pub badge_awarded_producer: Vec<EventProducer<BadgeAwardedEvent>>,
}

impl EventProducers {
    pub async fn publish_donation_settled(&self, event: DonationSettledEvent) {
        for producer in &self.donation_settled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_donation_failed(&self, event: DonationFailedEvent) {
        for producer in &self.donation_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_badge_awarded(&self, event: BadgeAwardedEvent) {
        for producer in &self.badge_awarded_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_donation_settled: Option<EventHandler<DonationSettledEvent>>,
    pub on_donation_failed: Option<EventHandler<DonationFailedEvent>>,
    pub on_badge_awarded: Option<EventHandler<BadgeAwardedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_donation_settled = hooks.on_donation_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_donation_failed = hooks.on_donation_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_badge_awarded = hooks.on_badge_awarded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_donation_settled, on_donation_failed, on_badge_awarded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_donation_settled {
            result.donation_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_donation_failed {
            result.donation_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_badge_awarded {
            result.badge_awarded_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_donation_settled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_donation_failed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_badge_awarded {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_donation_settled: Option<Handler<DonationSettledEvent>>,
    pub on_donation_failed: Option<Handler<DonationFailedEvent>>,
    pub on_badge_awarded: Option<Handler<BadgeAwardedEvent>>,
}

impl EventHooks {
    pub fn on_donation_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationSettledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_donation_settled = Some(Arc::new(f));
        self
    }

    pub fn on_donation_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DonationFailedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_donation_failed = Some(Arc::new(f));
        self
    }

    pub fn on_badge_awarded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BadgeAwardedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_badge_awarded = Some(Arc::new(f));
        self
    }
}
