//! Turns a matched record set into a campaign.

use std::sync::Arc;
use std::time::Duration;

use mailivo_core::action::Action;
use mailivo_core::campaign::{build_campaign, CampaignMetadata, CampaignRequest, CreatedCampaign};
use mailivo_core::records::RecordSet;
use mailivo_core::services::CampaignService;
use mailivo_core::trigger::TriggerType;
use mailivo_core::types::{DbId, Timestamp};
use serde_json::json;
use tokio::time::Instant;

use crate::error::ExecutionError;
use crate::trace::ExecutionTrace;

/// Who and what a campaign is created for.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub workflow_id: DbId,
    pub user_id: Option<DbId>,
    pub automation_name: String,
    pub started_at: Timestamp,
    pub trigger_type: TriggerType,
}

/// Result of a successful action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    pub affected_records: u64,
    pub campaign_id: Option<String>,
    pub data: Option<serde_json::Value>,
}

pub struct ActionExecutor {
    campaigns: Arc<dyn CampaignService>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(campaigns: Arc<dyn CampaignService>, timeout: Duration) -> Self {
        Self { campaigns, timeout }
    }

    /// Execute `action` against `matched`.
    ///
    /// An empty match is a successful no-op and never reaches the campaign
    /// service. The campaign call is bounded by the configured timeout and is
    /// never retried.
    pub async fn execute(
        &self,
        action: &Action,
        matched: &RecordSet,
        ctx: &ExecutionContext,
        trace: &mut ExecutionTrace,
    ) -> Result<ActionOutcome, ExecutionError> {
        if matched.is_empty() {
            trace.info("No matching properties; no campaign created");
            return Ok(ActionOutcome::default());
        }
        if !action.action_type.is_supported() {
            return Err(ExecutionError::UnsupportedAction(action.action_type.to_string()));
        }

        let metadata = CampaignMetadata {
            workflow_id: ctx.workflow_id,
            user_id: ctx.user_id,
            trigger_type: ctx.trigger_type,
        };
        let Some(request) = build_campaign(&action.config, matched, &ctx.automation_name, ctx.started_at, metadata)
        else {
            return Ok(ActionOutcome::default());
        };

        if request.recipient_count() == 0 {
            trace.warn("Campaign has no recipients after filtering");
        }
        let excluded = request.financing_excluded();
        if !excluded.is_empty() {
            trace.warn(format!(
                "No payment plan resolved for {} propert(ies); shown without financing: {}",
                excluded.len(),
                excluded.join(", ")
            ));
        }

        let created = self.create(&request).await?;
        trace.info(format!(
            "Created {} campaign {} with {} propert(ies) and {} recipient(s)",
            request.campaign_type().as_str(),
            created.id,
            request.property_count(),
            request.recipient_count()
        ));

        Ok(ActionOutcome {
            affected_records: request.property_count() as u64,
            data: Some(json!({
                "campaignId": created.id,
                "campaignType": request.campaign_type().as_str(),
                "propertyCount": request.property_count(),
                "recipientCount": request.recipient_count(),
            })),
            campaign_id: Some(created.id),
        })
    }

    async fn create(&self, request: &CampaignRequest) -> Result<CreatedCampaign, ExecutionError> {
        let started = Instant::now();
        let call = async {
            match request {
                CampaignRequest::Single(payload) => self.campaigns.create_campaign(payload).await,
                CampaignRequest::Multi(payload) => self.campaigns.create_multi_property_campaign(payload).await,
            }
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(ExecutionError::CampaignService),
            Err(_) => Err(ExecutionError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }
}
