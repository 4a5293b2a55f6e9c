//! Automation rules and the payloads used to create and edit them.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::action::{Action, CampaignType};
use crate::conditions::{Condition, ConditionCategory};
use crate::trigger::{Trigger, TriggerType};
use crate::types::{DbId, Timestamp};

/// A saved trigger + conditions + action rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub trigger: Trigger,
    pub conditions: Vec<Condition>,
    pub action: Option<Action>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Automation {
    pub fn trigger_type(&self) -> TriggerType {
        self.trigger.trigger_type()
    }
}

/// Builder payload for a new automation, as submitted by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AutomationDraft {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<DbId>,
    #[serde(default)]
    pub is_active: bool,
    pub trigger: Trigger,
    #[serde(default)]
    #[validate(length(max = 20, message = "An automation may have at most 20 conditions"))]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub action: Option<Action>,
}

impl AutomationDraft {
    /// Apply builder normalizations. Time-based automations always send
    /// multi-property campaigns.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        if self.trigger.trigger_type() == TriggerType::TimeBased {
            if let Some(action) = self.action.as_mut() {
                action.config.campaign_type = CampaignType::MultiProperty;
            }
        }
    }

    pub fn has_condition(&self, category: ConditionCategory) -> bool {
        self.conditions.iter().any(|c| c.category() == category)
    }
}

impl From<&Automation> for AutomationDraft {
    fn from(a: &Automation) -> Self {
        Self {
            name: a.name.clone(),
            description: a.description.clone(),
            user_id: a.user_id,
            is_active: a.is_active,
            trigger: a.trigger.clone(),
            conditions: a.conditions.clone(),
            action: a.action.clone(),
        }
    }
}

/// A draft that passed validation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAutomation {
    pub user_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub trigger: Trigger,
    pub conditions: Vec<Condition>,
    pub action: Option<Action>,
}

impl From<AutomationDraft> for NewAutomation {
    fn from(d: AutomationDraft) -> Self {
        Self {
            user_id: d.user_id,
            name: d.name,
            description: d.description,
            is_active: d.is_active,
            trigger: d.trigger,
            conditions: d.conditions,
            action: d.action,
        }
    }
}

/// Editable fields of an existing automation. The trigger is fixed at
/// creation and has no counterpart here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AutomationUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default)]
    pub action: Option<Action>,
}

impl AutomationUpdate {
    /// The draft that results from applying this update to `existing`.
    pub fn apply_to(&self, existing: &Automation) -> AutomationDraft {
        let mut draft = AutomationDraft::from(existing);
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(description) = &self.description {
            draft.description = Some(description.clone());
        }
        if let Some(conditions) = &self.conditions {
            draft.conditions = conditions.clone();
        }
        if let Some(action) = &self.action {
            draft.action = Some(action.clone());
        }
        draft
    }
}

impl From<NewAutomation> for AutomationUpdate {
    fn from(a: NewAutomation) -> Self {
        Self {
            name: Some(a.name),
            description: a.description,
            conditions: Some(a.conditions),
            action: a.action,
        }
    }
}
