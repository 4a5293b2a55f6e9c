//! Campaign-creation payloads assembled from a matched record set.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::action::{ActionConfig, CampaignType};
use crate::payment_plan::{select_plan, PaymentPlan, PlanStrategy};
use crate::records::{Buyer, Property, RecordSet};
use crate::trigger::TriggerType;
use crate::types::{BuyerId, DbId, PropertyId, Timestamp};

/// Provenance attached to every campaign created by an automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetadata {
    pub workflow_id: DbId,
    pub user_id: Option<DbId>,
    pub trigger_type: TriggerType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub id: BuyerId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

impl From<&Buyer> for Recipient {
    fn from(b: &Buyer) -> Self {
        Self {
            id: b.id.clone(),
            email: b.email.clone(),
            first_name: b.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPlan {
    pub property_id: PropertyId,
    pub plan: PaymentPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCampaignPayload {
    pub name: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub property_id: PropertyId,
    pub buyers: Vec<Recipient>,
    /// `None` when financing is off or no plan could be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_plan: Option<PaymentPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<Timestamp>,
    pub metadata: CampaignMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCampaignPayload {
    pub name: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub property_ids: Vec<PropertyId>,
    pub buyers: Vec<Recipient>,
    pub financing_enabled: bool,
    pub plan_strategy: PlanStrategy,
    pub selected_plans: Vec<SelectedPlan>,
    /// Properties shown without financing because no plan resolved.
    pub financing_excluded: Vec<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<Timestamp>,
    pub metadata: CampaignMetadata,
}

/// A campaign ready to hand to the campaign service.
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignRequest {
    Single(SingleCampaignPayload),
    Multi(MultiCampaignPayload),
}

impl CampaignRequest {
    pub fn campaign_type(&self) -> CampaignType {
        match self {
            Self::Single(_) => CampaignType::SingleProperty,
            Self::Multi(_) => CampaignType::MultiProperty,
        }
    }

    pub fn property_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(p) => p.property_ids.len(),
        }
    }

    pub fn recipient_count(&self) -> usize {
        match self {
            Self::Single(p) => p.buyers.len(),
            Self::Multi(p) => p.buyers.len(),
        }
    }

    /// Properties in scope that have no financing plan on display.
    pub fn financing_excluded(&self) -> Vec<PropertyId> {
        match self {
            Self::Single(_) => Vec::new(),
            Self::Multi(p) => p.financing_excluded.clone(),
        }
    }
}

/// Identifier returned by the campaign service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCampaign {
    #[serde(alias = "_id")]
    pub id: String,
}

/// `config.name`, or `"{automation name} - {YYYY-MM-DD}"`.
pub fn campaign_name(config: &ActionConfig, automation_name: &str, started_at: Timestamp) -> String {
    match config.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{automation_name} - {}", started_at.format("%Y-%m-%d")),
    }
}

/// Build the campaign payload for `matched`.
///
/// Returns `None` when no property survived filtering. Single-property
/// campaigns use the first matched property; recipients are restricted to
/// the audience of the properties in scope.
pub fn build_campaign(
    config: &ActionConfig,
    matched: &RecordSet,
    automation_name: &str,
    started_at: Timestamp,
    metadata: CampaignMetadata,
) -> Option<CampaignRequest> {
    let first = matched.properties.first()?;
    let name = campaign_name(config, automation_name, started_at);
    let scheduled_date = config
        .delay_minutes
        .map(|m| started_at + Duration::minutes(i64::from(m)));
    let resolve = |p: &Property| -> Option<PaymentPlan> {
        if !config.financing_enabled {
            return None;
        }
        select_plan(&p.payment_plans, config.plan_strategy).cloned()
    };

    let request = match config.campaign_type {
        CampaignType::SingleProperty => CampaignRequest::Single(SingleCampaignPayload {
            name,
            template_id: config.template_id.clone(),
            subject: config.subject.clone(),
            property_id: first.id.clone(),
            buyers: matched
                .recipients_for(std::iter::once(first))
                .into_iter()
                .map(Recipient::from)
                .collect(),
            selected_plan: resolve(first),
            scheduled_date,
            metadata,
        }),
        CampaignType::MultiProperty => {
            let mut selected_plans = Vec::new();
            let mut financing_excluded = Vec::new();
            if config.financing_enabled {
                for p in &matched.properties {
                    match resolve(p) {
                        Some(plan) => selected_plans.push(SelectedPlan {
                            property_id: p.id.clone(),
                            plan,
                        }),
                        None => financing_excluded.push(p.id.clone()),
                    }
                }
            }
            CampaignRequest::Multi(MultiCampaignPayload {
                name,
                template_id: config.template_id.clone(),
                subject: config.subject.clone(),
                property_ids: matched.properties.iter().map(|p| p.id.clone()).collect(),
                buyers: matched
                    .recipients_for(matched.properties.iter())
                    .into_iter()
                    .map(Recipient::from)
                    .collect(),
                financing_enabled: config.financing_enabled,
                plan_strategy: config.plan_strategy,
                selected_plans,
                financing_excluded,
                scheduled_date,
                metadata,
            })
        }
    };
    Some(request)
}
