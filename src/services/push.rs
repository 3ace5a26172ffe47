//! Web Push delivery: VAPID-signed fan-out over a user's stored
//! subscriptions. Failures are counted, never propagated; endpoints the
//! push service reports as gone are pruned so they are not retried forever.

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

use crate::config::Config;
use crate::models::subscription::PushSubscription;
use crate::models::supplement::SupplementItem;

/// Per-subscription delivery timeout, so a single unresponsive endpoint
/// cannot stall the whole fan-out. A timeout is a transient failure.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PushSendError {
    #[error("endpoint is permanently gone")]
    EndpointGone,
    #[error("delivery timed out")]
    Timeout,
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl PushSendError {
    /// Only a confirmed-dead endpoint justifies pruning the subscription.
    pub fn is_permanent(&self) -> bool {
        matches!(self, PushSendError::EndpointGone)
    }
}

impl From<WebPushError> for PushSendError {
    fn from(err: WebPushError) -> Self {
        match err {
            WebPushError::EndpointNotValid | WebPushError::EndpointNotFound => {
                PushSendError::EndpointGone
            }
            other => PushSendError::Delivery(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl ReminderPayload {
    pub fn supplement_reminder(supplements: &[SupplementItem]) -> Self {
        let names: Vec<&str> = supplements.iter().map(|s| s.name.as_str()).collect();
        Self {
            title: "Supplement Reminder".into(),
            body: format!("Time to take: {}", names.join(", ")),
            url: "/dashboard".into(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DispatchOutcome {
    pub sent: u32,
    pub failed: u32,
}

/// Delivery transport seam. The production impl signs and sends over Web
/// Push; tests substitute a scripted fake.
pub(crate) trait PushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &str)
        -> Result<(), PushSendError>;
}

pub struct PushClient {
    client: IsahcWebPushClient,
    private_key: String,
    subject: String,
}

impl PushClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        if config.vapid_private_key.is_empty() {
            tracing::warn!("VAPID_PRIVATE_KEY is not set; push delivery will fail");
        }
        Ok(Self {
            client: IsahcWebPushClient::new()?,
            private_key: config.vapid_private_key.clone(),
            subject: config.vapid_subject.clone(),
        })
    }

    async fn send_payload(
        &self,
        subscription: &PushSubscription,
        payload: &str,
    ) -> Result<(), PushSendError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.private_key, web_push::URL_SAFE_NO_PAD, &info)
                .map_err(PushSendError::from)?;
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature.build().map_err(PushSendError::from)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(PushSendError::from)?;

        match tokio::time::timeout(SEND_TIMEOUT, self.client.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(PushSendError::Timeout),
        }
    }
}

impl PushSender for PushClient {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &str,
    ) -> Result<(), PushSendError> {
        self.send_payload(subscription, payload).await
    }
}

/// Fan-out broadcast, not a transaction: every subscription is attempted,
/// partial failure is aggregated into the counts, and this never errors.
pub async fn dispatch(
    db: &PgPool,
    push: &PushClient,
    subscriptions: &[PushSubscription],
    payload: &ReminderPayload,
) -> DispatchOutcome {
    if subscriptions.is_empty() {
        return DispatchOutcome::default();
    }

    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize push payload");
            return DispatchOutcome {
                sent: 0,
                failed: subscriptions.len() as u32,
            };
        }
    };

    let (outcome, dead_endpoints) = fan_out(push, subscriptions, &body).await;

    for endpoint in &dead_endpoints {
        match delete_subscription(db, endpoint).await {
            Ok(()) => tracing::info!("Pruned dead push subscription"),
            Err(err) => tracing::warn!(error = %err, "Failed to prune dead push subscription"),
        }
    }

    outcome
}

async fn fan_out<S: PushSender>(
    sender: &S,
    subscriptions: &[PushSubscription],
    body: &str,
) -> (DispatchOutcome, Vec<String>) {
    let mut outcome = DispatchOutcome::default();
    let mut dead = Vec::new();

    for subscription in subscriptions {
        match sender.send(subscription, body).await {
            Ok(()) => outcome.sent += 1,
            Err(err) => {
                outcome.failed += 1;
                if err.is_permanent() {
                    dead.push(subscription.endpoint.clone());
                } else {
                    tracing::debug!(
                        error = %err,
                        user_id = %subscription.user_id,
                        "Push delivery failed"
                    );
                }
            }
        }
    }

    (outcome, dead)
}

pub async fn fetch_subscriptions(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Vec<PushSubscription>, sqlx::Error> {
    sqlx::query_as::<_, PushSubscription>("SELECT * FROM push_subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(db)
        .await
}

pub async fn delete_subscription(db: &PgPool, endpoint: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
        .bind(endpoint)
        .execute(db)
        .await?;
    Ok(())
}
