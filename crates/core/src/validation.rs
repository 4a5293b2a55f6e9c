//! Save- and activate-time validation of automation drafts.
//!
//! Validation never runs at execution time; an active automation is assumed
//! to be structurally valid.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::action::CampaignType;
use crate::automation::{AutomationDraft, NewAutomation};
use crate::conditions::ConditionCategory;
use crate::error::CoreError;
use crate::trigger::TriggerType;

/// Problems found in a draft, grouped by the part of the rule they concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub trigger_errors: Vec<String>,
    pub condition_errors: Vec<String>,
    pub action_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub general_errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.trigger_errors.is_empty()
            && self.condition_errors.is_empty()
            && self.action_errors.is_empty()
            && self.general_errors.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.general_errors
            .iter()
            .chain(&self.trigger_errors)
            .chain(&self.condition_errors)
            .chain(&self.action_errors)
            .map(String::as_str)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.messages().collect();
        f.write_str(&messages.join("; "))
    }
}

/// Check a draft against every structural rule.
pub fn validate(draft: &AutomationDraft) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Err(errors) = draft.validate() {
        for (field, field_errors) in errors.field_errors() {
            let bucket = match &*field {
                "conditions" => &mut report.condition_errors,
                _ => &mut report.general_errors,
            };
            bucket.extend(field_errors.iter().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", e.code),
            }));
        }
    }

    // -- trigger --
    report.trigger_errors.extend(draft.trigger.errors());

    // -- conditions --
    let time_based = draft.trigger.trigger_type() == TriggerType::TimeBased;
    if time_based && !draft.has_condition(ConditionCategory::PropertyData) {
        report.condition_errors.push(
            "Time-based automations require at least one property_data condition".to_string(),
        );
    }
    for (index, condition) in draft.conditions.iter().enumerate() {
        report.condition_errors.extend(
            condition
                .errors()
                .into_iter()
                .map(|e| format!("Condition {} ({}): {e}", index + 1, condition.category())),
        );
    }

    // -- action --
    match &draft.action {
        None if draft.is_active => report
            .action_errors
            .push("An action is required to activate an automation".to_string()),
        None => {}
        Some(action) => {
            report.action_errors.extend(action.errors());
            if time_based && action.config.campaign_type != CampaignType::MultiProperty {
                report
                    .action_errors
                    .push("Time-based automations must send multi_property campaigns".to_string());
            }
        }
    }

    report
}

/// Normalize then validate a draft, producing the automation to persist.
pub fn build(mut draft: AutomationDraft) -> Result<NewAutomation, CoreError> {
    draft.normalize();
    let report = validate(&draft);
    if !report.is_valid() {
        return Err(CoreError::InvalidAutomation(report));
    }
    Ok(draft.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn draft(value: serde_json::Value) -> AutomationDraft {
        serde_json::from_value(value).unwrap()
    }

    fn valid_upload_draft() -> serde_json::Value {
        json!({
            "name": "TX uploads",
            "isActive": true,
            "trigger": { "type": "property_uploaded", "config": {} },
            "conditions": [
                { "category": "property_data", "operator": "AND", "filters": { "state": ["TX"] } }
            ],
            "action": { "type": "send_campaign", "config": { "templateId": "tmpl-1" } }
        })
    }

    #[test]
    fn well_formed_draft_is_valid() {
        assert!(validate(&draft(valid_upload_draft())).is_valid());
    }

    #[test]
    fn weekly_schedule_without_day_reports_trigger_error() {
        let d = draft(json!({
            "name": "Weekly",
            "trigger": { "type": "time_based", "config": { "schedule": "weekly", "time": "09:00" } },
            "conditions": [{ "category": "property_data", "filters": {} }],
            "action": { "type": "send_campaign", "config": { "templateId": "t", "campaignType": "multi_property" } }
        }));
        let report = validate(&d);
        assert!(!report.is_valid());
        assert_eq!(report.trigger_errors.len(), 1);
        assert!(report.trigger_errors[0].contains("dayOfWeek"));
        assert!(report.condition_errors.is_empty());
    }

    #[test]
    fn reversed_asking_price_range_reports_condition_error() {
        let d = draft(json!({
            "name": "Bad range",
            "trigger": { "type": "property_uploaded", "config": {} },
            "conditions": [{
                "category": "property_data",
                "filters": { "numeric": [
                    { "field": "askingprice", "operator": "between", "value": 50000, "value2": 40000 }
                ] }
            }],
            "action": { "type": "send_campaign", "config": { "templateId": "t" } }
        }));
        let report = validate(&d);
        assert_eq!(report.condition_errors.len(), 1);
        assert!(report.condition_errors[0].starts_with("Condition 1 (property_data)"));
        assert!(report.condition_errors[0].contains("invalid range"));
    }

    #[test]
    fn time_based_without_property_condition_is_invalid() {
        let d = draft(json!({
            "name": "Daily",
            "trigger": { "type": "time_based", "config": { "schedule": "daily", "time": "07:00" } },
            "action": { "type": "send_campaign", "config": { "templateId": "t" } }
        }));
        let err = build(d).unwrap_err();
        let report = assert_matches!(err, CoreError::InvalidAutomation(r) => r);
        assert!(report.condition_errors[0].contains("property_data"));
        // Normalization already forced multi_property, so no action error.
        assert!(report.action_errors.is_empty());
    }

    #[test]
    fn build_forces_multi_property_for_time_based() {
        let d = draft(json!({
            "name": "Daily",
            "trigger": { "type": "time_based", "config": { "schedule": "daily", "time": "07:00" } },
            "conditions": [{ "category": "property_data", "filters": { "status": ["Available"] } }],
            "action": { "type": "send_campaign", "config": { "templateId": "t", "campaignType": "single_property" } }
        }));
        let built = build(d).unwrap();
        assert_eq!(
            built.action.unwrap().config.campaign_type,
            CampaignType::MultiProperty
        );
    }

    #[test]
    fn active_draft_without_action_is_invalid() {
        let mut value = valid_upload_draft();
        value.as_object_mut().unwrap().remove("action");
        let report = validate(&draft(value.clone()));
        assert_eq!(report.action_errors.len(), 1);

        value["isActive"] = json!(false);
        assert!(validate(&draft(value)).is_valid());
    }

    #[test]
    fn empty_and_overlong_names_are_rejected() {
        let mut value = valid_upload_draft();
        value["name"] = json!("");
        assert_eq!(validate(&draft(value.clone())).general_errors.len(), 1);

        value["name"] = json!("x".repeat(201));
        assert_eq!(validate(&draft(value)).general_errors.len(), 1);
    }

    #[test]
    fn too_many_conditions_are_rejected() {
        let mut value = valid_upload_draft();
        let condition = json!({ "category": "buyer_data", "filters": {} });
        value["conditions"] = json!(vec![condition; 21]);
        let report = validate(&draft(value));
        assert_eq!(report.condition_errors, vec!["An automation may have at most 20 conditions"]);
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = ValidationReport {
            trigger_errors: vec!["x".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["triggerErrors"], json!(["x"]));
        assert_eq!(value["conditionErrors"], json!([]));
        assert!(value.get("generalErrors").is_none());
    }
}
