//! # Find Records Action
//!
//! Criteria parsing, the dual fetch and the subscription side effect,
//! wired to injected collaborators.
//!
//! ```text
//! RequestContext ─► parse_plan ─┬─► store.find(plan)     ─┐
//!                               └─► store.count(filter)  ─┴─► FoundRecords ─► subscriptions
//! ```
//!
//! The two store calls are joined, not raced: both run to completion even
//! when one fails. A fetch error takes precedence over a count error.

use std::sync::Arc;

use serde_json::Value;

use super::config::BlueprintConfig;
use super::errors::{FindError, FindResult};
use super::model::{ModelDef, ModelRegistry};
use super::parser::{parse_pk, parse_plan, parse_populate};
use super::plan::QueryPlan;
use super::request::RequestContext;
use super::response::{FindOutcome, FoundRecords};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::realtime::{RealtimeResult, SubscriptionHook};
use crate::store::{RecordStore, StoreError};

/// The find records action
pub struct RecordFinder {
    models: Arc<ModelRegistry>,
    store: Arc<dyn RecordStore>,
    subscriptions: Option<Arc<dyn SubscriptionHook>>,
    config: BlueprintConfig,
    metrics: Arc<MetricsRegistry>,
}

impl RecordFinder {
    pub fn new(models: Arc<ModelRegistry>, store: Arc<dyn RecordStore>, config: BlueprintConfig) -> Self {
        Self {
            models,
            store,
            subscriptions: None,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Register socket requests for change notifications through `hook`
    pub fn with_subscriptions(mut self, hook: Arc<dyn SubscriptionHook>) -> Self {
        self.subscriptions = Some(hook);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    pub fn config(&self) -> &BlueprintConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Answer a find request.
    ///
    /// A request addressing a primary key is delegated to the single-record
    /// lookup and never reaches the criteria parser or the dual fetch.
    pub async fn find(&self, ctx: &RequestContext) -> FindResult<FindOutcome> {
        log_event_with_fields(
            Event::FindReceived,
            &[("model", ctx.model.as_str()), ("transport", transport_name(ctx))],
        );

        let model = self.models.resolve(&ctx.model).map_err(|e| self.rejected(&ctx.model, e))?;

        if let Some(key) = parse_pk(&model, ctx) {
            return self.find_one(&model, &key, ctx).await;
        }

        let plan = parse_plan(&model, &ctx.params, &self.config)
            .map_err(|e| self.rejected(&model.identity, e))?;

        let found = self.fetch(&model, &plan).await?;

        if let Some(connection_id) = ctx.connection_id() {
            self.register_subscriptions(connection_id, &model, &found.records, self.config.auto_watch);
        }

        self.metrics.record_find(found.records.len());
        let returned = found.records.len().to_string();
        let total = found.total_count.to_string();
        log_event_with_fields(
            Event::FindComplete,
            &[("model", model.identity.as_str()), ("records", returned.as_str()), ("total_count", total.as_str())],
        );

        Ok(FindOutcome::Many(found))
    }

    /// Fetch the page and count the matches concurrently
    async fn fetch(&self, model: &ModelDef, plan: &QueryPlan) -> FindResult<FoundRecords> {
        let (records, total_count) = tokio::join!(
            self.store.find(model, plan),
            self.store.count(model, &plan.filter),
        );

        let records = records.map_err(|e| self.storage_failed(model, "find", e))?;
        let total_count = total_count.map_err(|e| self.storage_failed(model, "count", e))?;

        Ok(FoundRecords { records, total_count })
    }

    async fn find_one(&self, model: &ModelDef, key: &Value, ctx: &RequestContext) -> FindResult<FindOutcome> {
        let key_text = key_to_string(key);
        log_event_with_fields(
            Event::FindBypassPrimaryKey,
            &[("model", model.identity.as_str()), ("primary_key", key_text.as_str())],
        );
        self.metrics.increment_single_lookups();

        let populate = parse_populate(model, &ctx.params, &self.config)
            .map_err(|e| self.rejected(&model.identity, e))?;

        let record = self
            .store
            .find_one(model, key, &populate)
            .await
            .map_err(|e| self.storage_failed(model, "find_one", e))?
            .ok_or_else(|| FindError::NotFound {
                primary_key: model.primary_key.clone(),
                value: key_text,
            })?;

        if let Some(connection_id) = ctx.connection_id() {
            self.register_subscriptions(connection_id, model, std::slice::from_ref(&record), false);
        }

        Ok(FindOutcome::One(record))
    }

    /// Subscription side effect. Failures are logged and swallowed.
    fn register_subscriptions(&self, connection_id: &str, model: &ModelDef, records: &[Value], watch: bool) {
        let Some(hook) = &self.subscriptions else {
            return;
        };
        if !self.config.pubsub || !model.pubsub {
            return;
        }

        match subscribe_all(hook.as_ref(), connection_id, model, records, watch) {
            Ok(rooms) => {
                self.metrics.add_subscriptions(rooms);
                let rooms = rooms.to_string();
                log_event_with_fields(
                    Event::SubscriptionRegistered,
                    &[("connection_id", connection_id), ("model", model.identity.as_str()), ("rooms", rooms.as_str())],
                );
            }
            Err(e) => {
                self.metrics.increment_subscription_failures();
                let reason = e.to_string();
                log_event_with_fields(
                    Event::SubscriptionFailed,
                    &[("connection_id", connection_id), ("model", model.identity.as_str()), ("reason", reason.as_str())],
                );
            }
        }
    }

    fn rejected(&self, model: &str, err: FindError) -> FindError {
        self.metrics.increment_finds_rejected();
        let reason = err.to_string();
        log_event_with_fields(Event::FindRejected, &[("model", model), ("reason", reason.as_str())]);
        err
    }

    fn storage_failed(&self, model: &ModelDef, operation: &str, err: StoreError) -> FindError {
        self.metrics.increment_finds_failed();
        let reason = err.to_string();
        log_event_with_fields(
            Event::FindStorageFailed,
            &[("model", model.identity.as_str()), ("operation", operation), ("reason", reason.as_str())],
        );
        FindError::Storage(err)
    }
}

fn subscribe_all(
    hook: &dyn SubscriptionHook,
    connection_id: &str,
    model: &ModelDef,
    records: &[Value],
    watch: bool,
) -> RealtimeResult<usize> {
    let mut rooms = hook.subscribe(connection_id, model, records)?;
    if watch {
        hook.watch(connection_id, model)?;
    }
    for record in records {
        rooms += hook.subscribe_deep(connection_id, model, record)?;
    }
    Ok(rooms)
}

fn transport_name(ctx: &RequestContext) -> &'static str {
    if ctx.is_socket() {
        "socket"
    } else {
        "http"
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
