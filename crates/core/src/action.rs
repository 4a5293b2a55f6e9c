use serde::{Deserialize, Serialize};

use crate::payment_plan::PlanStrategy;

/// Longest allowed campaign delay: 30 days.
pub const MAX_DELAY_MINUTES: u32 = 43_200;

/// The action an automation performs once its conditions pass.
///
/// Only `send_campaign` is executable. Other type strings still deserialize
/// so that stored automations can be listed and rejected at dispatch time
/// rather than failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    SendCampaign,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SendCampaign => "send_campaign",
            Self::Other(s) => s,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::SendCampaign)
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "send_campaign" => Self::SendCampaign,
            _ => Self::Other(s),
        }
    }
}

impl From<ActionType> for String {
    fn from(t: ActionType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    #[default]
    SingleProperty,
    MultiProperty,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleProperty => "single_property",
            Self::MultiProperty => "multi_property",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub campaign_type: CampaignType,
    /// Campaign name; defaults to `"{automation name} - {YYYY-MM-DD}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub financing_enabled: bool,
    #[serde(default)]
    pub plan_strategy: PlanStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<u32>,
}

/// `{ "type": "send_campaign", "config": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub config: ActionConfig,
}

impl Action {
    pub fn send_campaign(config: ActionConfig) -> Self {
        Self {
            action_type: ActionType::SendCampaign,
            config,
        }
    }

    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.action_type.is_supported() {
            errors.push(format!("Unsupported action type: '{}'", self.action_type));
        }
        if self.config.template_id.trim().is_empty() {
            errors.push("templateId is required".to_string());
        }
        if let Some(delay) = self.config.delay_minutes {
            if delay > MAX_DELAY_MINUTES {
                errors.push(format!(
                    "delayMinutes must be at most {MAX_DELAY_MINUTES} (30 days), got {delay}"
                ));
            }
        }
        errors
    }
}
