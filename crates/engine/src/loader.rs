//! Builds the initial record set an automation's conditions run against.

use std::sync::Arc;

use mailivo_core::automation::Automation;
use mailivo_core::records::{Buyer, CampaignRecord, RecordSet};
use mailivo_core::services::{BuyerSource, PropertyQuery, PropertySource, TemplateSource};
use mailivo_core::trigger::{EventPayload, TriggerType};
use mailivo_events::TriggerEvent;

use crate::error::ExecutionError;

/// Listing status scanned by scheduled automations.
pub const SCHEDULED_PROPERTY_STATUS: &str = "Available";

pub struct RecordLoader {
    properties: Arc<dyn PropertySource>,
    buyers: Arc<dyn BuyerSource>,
    templates: Arc<dyn TemplateSource>,
}

impl RecordLoader {
    pub fn new(
        properties: Arc<dyn PropertySource>,
        buyers: Arc<dyn BuyerSource>,
        templates: Arc<dyn TemplateSource>,
    ) -> Self {
        Self {
            properties,
            buyers,
            templates,
        }
    }

    /// Load properties, their interested buyers, the triggering campaign and
    /// the action's template.
    pub async fn load(&self, automation: &Automation, event: &TriggerEvent) -> Result<RecordSet, ExecutionError> {
        let payload = &event.payload;
        let mut records = RecordSet::default();

        // -- properties --
        let property_ids = payload.referenced_property_ids();
        let query = if event.trigger_type == TriggerType::TimeBased {
            Some(PropertyQuery::by_status(SCHEDULED_PROPERTY_STATUS))
        } else if !property_ids.is_empty() {
            Some(PropertyQuery::by_ids(property_ids.clone()))
        } else {
            None
        };
        if let Some(query) = query {
            records.properties = self
                .properties
                .find(&query)
                .await
                .map_err(ExecutionError::DataSource)?;
        }

        // -- buyers and audience --
        for property in &records.properties {
            let interested = self
                .buyers
                .find_by_property(&property.id)
                .await
                .map_err(ExecutionError::DataSource)?;
            let ids = interested.iter().map(|b| b.id.clone()).collect();
            records.audience.insert(property.id.clone(), ids);
            for buyer in interested {
                add_buyer(&mut records.buyers, buyer);
            }
        }
        if let Some(buyer_id) = &payload.buyer_id {
            match self
                .buyers
                .find_by_id(buyer_id)
                .await
                .map_err(ExecutionError::DataSource)?
            {
                Some(buyer) => add_buyer(&mut records.buyers, buyer),
                None => tracing::debug!(%buyer_id, "Payload buyer not found"),
            }
        }

        // -- campaigns --
        if event.trigger_type == TriggerType::CampaignStatusChanged {
            records.campaigns.push(campaign_from_payload(payload, property_ids)?);
        }

        // -- templates --
        if let Some(action) = &automation.action {
            let template_id = action.config.template_id.trim();
            if !template_id.is_empty() {
                if let Some(template) = self
                    .templates
                    .find_template(template_id)
                    .await
                    .map_err(ExecutionError::DataSource)?
                {
                    records.templates.push(template);
                }
            }
        }

        Ok(records)
    }
}

fn add_buyer(buyers: &mut Vec<Buyer>, buyer: Buyer) {
    if !buyers.iter().any(|b| b.id == buyer.id) {
        buyers.push(buyer);
    }
}

fn campaign_from_payload(payload: &EventPayload, property_ids: Vec<String>) -> Result<CampaignRecord, ExecutionError> {
    let id = payload
        .campaign_id
        .clone()
        .ok_or_else(|| ExecutionError::InvalidPayload("campaign_status_changed requires campaignId".into()))?;

    let number = |key: &str| payload.extra.get(key).and_then(serde_json::Value::as_f64);
    let string = |key: &str| payload.extra.get(key).and_then(|v| v.as_str()).map(str::to_string);

    Ok(CampaignRecord {
        id,
        name: payload.campaign_name.clone().unwrap_or_default(),
        status: payload.status.clone().unwrap_or_default(),
        campaign_type: string("campaignType"),
        open_rate: number("openRate"),
        click_rate: number("clickRate"),
        total_sent: payload.extra.get("totalSent").and_then(serde_json::Value::as_u64),
        created_at: None,
        sent_at: payload
            .extra
            .get("sentAt")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        property_ids,
    })
}
