//! Automation rows and their conversion to domain automations.
//!
//! Trigger, conditions and action are stored as JSONB in their wire format.
//! `trigger_type` is duplicated into its own column so active automations can
//! be selected by trigger without decoding JSON.

use mailivo_core::action::Action;
use mailivo_core::automation::{Automation, AutomationUpdate, NewAutomation};
use mailivo_core::conditions::Condition;
use mailivo_core::trigger::Trigger;
use mailivo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `automations` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationRow {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub trigger_type: String,
    pub trigger_json: serde_json::Value,
    pub conditions_json: serde_json::Value,
    pub action_json: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AutomationRow> for Automation {
    type Error = serde_json::Error;

    fn try_from(row: AutomationRow) -> Result<Self, Self::Error> {
        let trigger: Trigger = serde_json::from_value(row.trigger_json)?;
        let conditions: Vec<Condition> = serde_json::from_value(row.conditions_json)?;
        let action: Option<Action> = row.action_json.map(serde_json::from_value).transpose()?;

        Ok(Automation {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            trigger,
            conditions,
            action,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Column values for inserting an automation.
#[derive(Debug, Clone)]
pub struct CreateAutomationRow {
    pub user_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub trigger_type: String,
    pub trigger_json: serde_json::Value,
    pub conditions_json: serde_json::Value,
    pub action_json: Option<serde_json::Value>,
}

impl TryFrom<&NewAutomation> for CreateAutomationRow {
    type Error = serde_json::Error;

    fn try_from(a: &NewAutomation) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: a.user_id,
            name: a.name.clone(),
            description: a.description.clone(),
            is_active: a.is_active,
            trigger_type: a.trigger.trigger_type().as_str().to_string(),
            trigger_json: serde_json::to_value(&a.trigger)?,
            conditions_json: serde_json::to_value(&a.conditions)?,
            action_json: a.action.as_ref().map(serde_json::to_value).transpose()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Column values for a partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateAutomationRow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub conditions_json: Option<serde_json::Value>,
    pub action_json: Option<serde_json::Value>,
}

impl TryFrom<&AutomationUpdate> for UpdateAutomationRow {
    type Error = serde_json::Error;

    fn try_from(u: &AutomationUpdate) -> Result<Self, Self::Error> {
        Ok(Self {
            name: u.name.clone(),
            description: u.description.clone(),
            conditions_json: u.conditions.as_ref().map(serde_json::to_value).transpose()?,
            action_json: u.action.as_ref().map(serde_json::to_value).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mailivo_core::action::ActionConfig;
    use serde_json::json;

    fn row(trigger: serde_json::Value) -> AutomationRow {
        AutomationRow {
            id: 4,
            user_id: Some(1),
            name: "Texas uploads".into(),
            description: None,
            is_active: true,
            trigger_type: "property_uploaded".into(),
            trigger_json: trigger,
            conditions_json: json!([{ "category": "property_data", "filters": { "state": ["TX"] } }]),
            action_json: Some(json!({ "type": "send_campaign", "config": { "templateId": "t1" } })),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_decodes_into_automation() {
        let automation = Automation::try_from(row(json!({ "type": "property_uploaded", "config": {} }))).unwrap();
        assert_eq!(automation.id, 4);
        assert_eq!(automation.conditions.len(), 1);
        assert_eq!(automation.action.unwrap().config.template_id, "t1");
    }

    #[test]
    fn malformed_trigger_json_is_an_error() {
        assert!(Automation::try_from(row(json!({ "type": "property_sold" }))).is_err());
    }

    #[test]
    fn new_automation_stores_trigger_type_column() {
        let new = NewAutomation {
            user_id: None,
            name: "Weekly".into(),
            description: None,
            is_active: false,
            trigger: serde_json::from_value(json!({
                "type": "time_based",
                "config": { "schedule": "weekly", "time": "08:30", "dayOfWeek": 1 }
            }))
            .unwrap(),
            conditions: Vec::new(),
            action: Some(Action::send_campaign(ActionConfig {
                template_id: "t1".into(),
                ..Default::default()
            })),
        };
        let row = CreateAutomationRow::try_from(&new).unwrap();
        assert_eq!(row.trigger_type, "time_based");
        assert_eq!(row.trigger_json["type"], json!("time_based"));
        assert_eq!(row.conditions_json, json!([]));
    }
}
