//! In-memory implementations of the engine's collaborators.
//!
//! Used by the engine and API test suites, and handy for local runs without
//! Landivo or Postgres.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mailivo_core::automation::{Automation, AutomationUpdate, NewAutomation};
use mailivo_core::campaign::{CreatedCampaign, MultiCampaignPayload, SingleCampaignPayload};
use mailivo_core::execution::ExecutionRecord;
use mailivo_core::records::{Buyer, EmailTemplate, Property};
use mailivo_core::services::{
    AutomationStore, BuyerSource, CampaignService, ExecutionLog, PropertyQuery, PropertySource, ServiceError,
    TemplateSource,
};
use mailivo_core::trigger::TriggerType;
use mailivo_core::types::{DbId, PropertyId, Timestamp};
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// Landivo data
// ---------------------------------------------------------------------------

/// Properties plus the buyers interested in each of them.
#[derive(Default)]
pub struct InMemoryListings {
    properties: RwLock<Vec<Property>>,
    buyers: RwLock<Vec<Buyer>>,
    interest: RwLock<BTreeMap<PropertyId, Vec<String>>>,
}

impl InMemoryListings {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_property(&self, property: Property) {
        self.properties.write().await.push(property);
    }

    /// Add a buyer interested in `property_ids`.
    pub async fn add_buyer(&self, buyer: Buyer, property_ids: &[&str]) {
        let mut interest = self.interest.write().await;
        for id in property_ids {
            interest.entry((*id).to_string()).or_default().push(buyer.id.clone());
        }
        self.buyers.write().await.push(buyer);
    }
}

#[async_trait]
impl PropertySource for InMemoryListings {
    async fn find(&self, query: &PropertyQuery) -> Result<Vec<Property>, ServiceError> {
        let properties = self.properties.read().await;
        let mut found: Vec<Property> = properties
            .iter()
            .filter(|p| query.ids.is_empty() || query.ids.contains(&p.id))
            .filter(|p| {
                query.statuses.is_empty() || query.statuses.iter().any(|s| s.eq_ignore_ascii_case(&p.status))
            })
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }
}

#[async_trait]
impl BuyerSource for InMemoryListings {
    async fn find_by_property(&self, property_id: &str) -> Result<Vec<Buyer>, ServiceError> {
        let interest = self.interest.read().await;
        let Some(ids) = interest.get(property_id) else {
            return Ok(Vec::new());
        };
        let buyers = self.buyers.read().await;
        Ok(buyers.iter().filter(|b| ids.contains(&b.id)).cloned().collect())
    }

    async fn find_by_id(&self, buyer_id: &str) -> Result<Option<Buyer>, ServiceError> {
        Ok(self.buyers.read().await.iter().find(|b| b.id == buyer_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryTemplates {
    templates: RwLock<Vec<EmailTemplate>>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, template: EmailTemplate) {
        self.templates.write().await.push(template);
    }
}

#[async_trait]
impl TemplateSource for InMemoryTemplates {
    async fn find_template(&self, template_id: &str) -> Result<Option<EmailTemplate>, ServiceError> {
        Ok(self.templates.read().await.iter().find(|t| t.id == template_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Campaign service
// ---------------------------------------------------------------------------

/// Records every payload it receives. Optionally slow or failing.
#[derive(Default)]
pub struct RecordingCampaignService {
    single: RwLock<Vec<SingleCampaignPayload>>,
    multi: RwLock<Vec<MultiCampaignPayload>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl RecordingCampaignService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn single_calls(&self) -> Vec<SingleCampaignPayload> {
        self.single.read().await.clone()
    }

    pub async fn multi_calls(&self) -> Vec<MultiCampaignPayload> {
        self.multi.read().await.clone()
    }

    async fn answer(&self) -> Result<CreatedCampaign, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(ServiceError::Unavailable(message.clone())),
            None => Ok(CreatedCampaign {
                id: format!("campaign-{n}"),
            }),
        }
    }
}

#[async_trait]
impl CampaignService for RecordingCampaignService {
    async fn create_campaign(&self, payload: &SingleCampaignPayload) -> Result<CreatedCampaign, ServiceError> {
        self.single.write().await.push(payload.clone());
        self.answer().await
    }

    async fn create_multi_property_campaign(
        &self,
        payload: &MultiCampaignPayload,
    ) -> Result<CreatedCampaign, ServiceError> {
        self.multi.write().await.push(payload.clone());
        self.answer().await
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Append-only execution history held in memory.
#[derive(Default)]
pub struct InMemoryExecutionLog {
    entries: RwLock<Vec<ExecutionRecord>>,
    fail_writes: bool,
}

impl InMemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every `record` call.
    pub fn rejecting_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub async fn entries(&self) -> Vec<ExecutionRecord> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl ExecutionLog for InMemoryExecutionLog {
    async fn record(&self, entry: &ExecutionRecord) -> Result<(), ServiceError> {
        if self.fail_writes {
            return Err(ServiceError::Storage("execution log is read-only".into()));
        }
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_for_workflow(
        &self,
        workflow_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionRecord>, ServiceError> {
        let mut matching: Vec<ExecutionRecord> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn last_started_at(&self, workflow_id: DbId) -> Result<Option<Timestamp>, ServiceError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .map(|e| e.started_at)
            .max())
    }
}

#[derive(Default)]
pub struct InMemoryAutomationStore {
    automations: RwLock<Vec<Automation>>,
    next_id: AtomicUsize,
}

impl InMemoryAutomationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AutomationStore for InMemoryAutomationStore {
    async fn active_for_trigger(&self, trigger: TriggerType) -> Result<Vec<Automation>, ServiceError> {
        Ok(self
            .automations
            .read()
            .await
            .iter()
            .filter(|a| a.is_active && a.trigger_type() == trigger)
            .cloned()
            .collect())
    }

    async fn create(&self, automation: &NewAutomation) -> Result<Automation, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as DbId + 1;
        let now = Utc::now();
        let created = Automation {
            id,
            user_id: automation.user_id,
            name: automation.name.clone(),
            description: automation.description.clone(),
            is_active: automation.is_active,
            trigger: automation.trigger.clone(),
            conditions: automation.conditions.clone(),
            action: automation.action.clone(),
            created_at: now,
            updated_at: now,
        };
        self.automations.write().await.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Automation>, ServiceError> {
        Ok(self.automations.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Automation>, ServiceError> {
        let mut all = self.automations.read().await.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update(&self, id: DbId, update: &AutomationUpdate) -> Result<Option<Automation>, ServiceError> {
        let mut automations = self.automations.write().await;
        let Some(existing) = automations.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            existing.name = name.clone();
        }
        if let Some(description) = &update.description {
            existing.description = Some(description.clone());
        }
        if let Some(conditions) = &update.conditions {
            existing.conditions = conditions.clone();
        }
        if let Some(action) = &update.action {
            existing.action = Some(action.clone());
        }
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn set_active(&self, id: DbId, is_active: bool) -> Result<Option<Automation>, ServiceError> {
        let mut automations = self.automations.write().await;
        let Some(existing) = automations.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        existing.is_active = is_active;
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }
}
