//! Collaborator contracts used by the automation engine.
//!
//! The engine only ever talks to these traits. Concrete implementations live
//! in `mailivo-clients` (Landivo and the Mailivo campaign API over HTTP),
//! `mailivo-db` (Postgres stores) and the engine's in-memory adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::automation::{Automation, AutomationUpdate, NewAutomation};
use crate::campaign::{CreatedCampaign, MultiCampaignPayload, SingleCampaignPayload};
use crate::execution::ExecutionRecord;
use crate::records::{Buyer, EmailTemplate, Property};
use crate::trigger::TriggerType;
use crate::types::{DbId, PropertyId, Timestamp};

/// Failure of an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored automation that no longer decodes into a runnable rule.
    #[error("Stored automation {id} is malformed: {reason}")]
    MalformedAutomation { id: DbId, reason: String },
}

// ---------------------------------------------------------------------------
// Landivo data
// ---------------------------------------------------------------------------

/// Property lookup. Empty `ids` and empty `statuses` are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyQuery {
    #[serde(default)]
    pub ids: Vec<PropertyId>,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PropertyQuery {
    pub fn by_ids(ids: Vec<PropertyId>) -> Self {
        Self {
            ids,
            ..Default::default()
        }
    }

    pub fn by_status(status: impl Into<String>) -> Self {
        Self {
            statuses: vec![status.into()],
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn find(&self, query: &PropertyQuery) -> Result<Vec<Property>, ServiceError>;
}

#[async_trait]
pub trait BuyerSource: Send + Sync {
    /// Buyers interested in a property.
    async fn find_by_property(&self, property_id: &str) -> Result<Vec<Buyer>, ServiceError>;

    async fn find_by_id(&self, buyer_id: &str) -> Result<Option<Buyer>, ServiceError>;
}

// ---------------------------------------------------------------------------
// Mailivo campaign API
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn find_template(&self, template_id: &str) -> Result<Option<EmailTemplate>, ServiceError>;
}

/// Campaign creation. Not idempotent; callers must not retry.
#[async_trait]
pub trait CampaignService: Send + Sync {
    async fn create_campaign(
        &self,
        payload: &SingleCampaignPayload,
    ) -> Result<CreatedCampaign, ServiceError>;

    async fn create_multi_property_campaign(
        &self,
        payload: &MultiCampaignPayload,
    ) -> Result<CreatedCampaign, ServiceError>;
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Append-only execution history.
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    async fn record(&self, entry: &ExecutionRecord) -> Result<(), ServiceError>;

    /// Newest first.
    async fn list_for_workflow(
        &self,
        workflow_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionRecord>, ServiceError>;

    async fn last_started_at(&self, workflow_id: DbId) -> Result<Option<Timestamp>, ServiceError>;
}

#[async_trait]
pub trait AutomationStore: Send + Sync {
    /// Active automations whose trigger has the given type.
    async fn active_for_trigger(&self, trigger: TriggerType) -> Result<Vec<Automation>, ServiceError>;

    async fn create(&self, automation: &NewAutomation) -> Result<Automation, ServiceError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Automation>, ServiceError>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Automation>, ServiceError>;

    /// Update the editable fields. Returns `None` if the automation does not exist.
    async fn update(&self, id: DbId, update: &AutomationUpdate) -> Result<Option<Automation>, ServiceError>;

    async fn set_active(&self, id: DbId, is_active: bool) -> Result<Option<Automation>, ServiceError>;
}
