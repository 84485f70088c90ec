//! Webhook subscription registry.
//!
//! Subscriptions are simple rows; matching against an event is a pure
//! set-membership check (`inkpress_sdk::objects::matches_event`) done in
//! process, so the registry query only filters on the active flag.

use crate::framework::DatabaseProcessor;
use inkpress_sdk::objects::matches_event;
use kanau::processor::Processor;
use uuid::Uuid;

/// A registered webhook delivery target.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct WebhookSubscription {
    pub id: Uuid,
    pub name: String,
    pub target_url: String,
    /// Exact event names or the `*` wildcard.
    pub events: Vec<String>,
    pub active: bool,
    /// Per-delivery timeout, clamped to 5–60 s at write time.
    pub timeout_secs: i32,
    /// Signing secret; never exposed through read DTOs.
    pub secret: String,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl WebhookSubscription {
    /// Whether this subscription wants the given event.
    pub fn matches(&self, event_type: &str) -> bool {
        matches_event(&self.events, event_type)
    }
}

/// Data for registering a subscription.
#[derive(Debug, Clone)]
pub struct NewWebhookSubscription {
    pub name: String,
    pub target_url: String,
    pub events: Vec<String>,
    pub active: bool,
    pub timeout_secs: i32,
    pub secret: String,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct WebhookSubscriptionUpdate {
    pub name: Option<String>,
    pub target_url: Option<String>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
    pub timeout_secs: Option<i32>,
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
/// Register a new subscription.
pub struct InsertWebhookSubscription {
    pub new: NewWebhookSubscription,
}

impl Processor<InsertWebhookSubscription> for DatabaseProcessor {
    type Output = WebhookSubscription;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertWebhookSubscription")]
    async fn process(
        &self,
        cmd: InsertWebhookSubscription,
    ) -> Result<WebhookSubscription, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(
            r#"
            INSERT INTO webhook_subscriptions
                (id, name, target_url, events, active, timeout_secs, secret)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&cmd.new.name)
        .bind(&cmd.new.target_url)
        .bind(&cmd.new.events)
        .bind(cmd.new.active)
        .bind(cmd.new.timeout_secs)
        .bind(&cmd.new.secret)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Apply a partial update; returns the updated row, `None` if missing.
pub struct UpdateWebhookSubscription {
    pub id: Uuid,
    pub update: WebhookSubscriptionUpdate,
}

impl Processor<UpdateWebhookSubscription> for DatabaseProcessor {
    type Output = Option<WebhookSubscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateWebhookSubscription")]
    async fn process(
        &self,
        cmd: UpdateWebhookSubscription,
    ) -> Result<Option<WebhookSubscription>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(
            r#"
            UPDATE webhook_subscriptions
            SET name = COALESCE($2, name),
                target_url = COALESCE($3, target_url),
                events = COALESCE($4, events),
                active = COALESCE($5, active),
                timeout_secs = COALESCE($6, timeout_secs),
                secret = COALESCE($7, secret),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(cmd.id)
        .bind(&cmd.update.name)
        .bind(&cmd.update.target_url)
        .bind(&cmd.update.events)
        .bind(cmd.update.active)
        .bind(cmd.update.timeout_secs)
        .bind(&cmd.update.secret)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// Hard-delete a subscription; returns whether a row was removed.
pub struct DeleteWebhookSubscription {
    pub id: Uuid,
}

impl Processor<DeleteWebhookSubscription> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteWebhookSubscription")]
    async fn process(&self, cmd: DeleteWebhookSubscription) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM webhook_subscriptions WHERE id = $1")
            .bind(cmd.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Copy)]
/// Fetch one subscription by id.
pub struct GetWebhookSubscription {
    pub id: Uuid,
}

impl Processor<GetWebhookSubscription> for DatabaseProcessor {
    type Output = Option<WebhookSubscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWebhookSubscription")]
    async fn process(
        &self,
        query: GetWebhookSubscription,
    ) -> Result<Option<WebhookSubscription>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(
            "SELECT * FROM webhook_subscriptions WHERE id = $1",
        )
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Copy)]
/// List all subscriptions, newest first.
pub struct ListWebhookSubscriptions;

impl Processor<ListWebhookSubscriptions> for DatabaseProcessor {
    type Output = Vec<WebhookSubscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWebhookSubscriptions")]
    async fn process(
        &self,
        _query: ListWebhookSubscriptions,
    ) -> Result<Vec<WebhookSubscription>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(
            "SELECT * FROM webhook_subscriptions ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Active subscriptions whose pattern set matches the event.
///
/// The active filter happens in SQL; pattern matching stays in process so
/// the wildcard semantics live in exactly one tested function.
pub struct ActiveSubscriptionsForEvent {
    pub event_type: String,
}

impl Processor<ActiveSubscriptionsForEvent> for DatabaseProcessor {
    type Output = Vec<WebhookSubscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ActiveSubscriptionsForEvent")]
    async fn process(
        &self,
        query: ActiveSubscriptionsForEvent,
    ) -> Result<Vec<WebhookSubscription>, sqlx::Error> {
        let active = sqlx::query_as::<_, WebhookSubscription>(
            "SELECT * FROM webhook_subscriptions WHERE active = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(active
            .into_iter()
            .filter(|s| s.matches(&query.event_type))
            .collect())
    }
}
