//! Trigger types, per-trigger configuration, and event payload matching.
//!
//! A [`Trigger`] is fixed when an automation is created. At dispatch time the
//! engine first selects automations by [`TriggerType`], then asks the trigger
//! whether its config accepts the concrete [`EventPayload`].

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{BuyerId, PropertyId, Timestamp};

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// The closed set of event classes an automation can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    PropertyUploaded,
    TimeBased,
    PropertyViewed,
    PropertyUpdated,
    CampaignStatusChanged,
    EmailTrackingStatus,
    Unsubscribe,
}

impl TriggerType {
    pub const ALL: [TriggerType; 7] = [
        Self::PropertyUploaded,
        Self::TimeBased,
        Self::PropertyViewed,
        Self::PropertyUpdated,
        Self::CampaignStatusChanged,
        Self::EmailTrackingStatus,
        Self::Unsubscribe,
    ];

    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyUploaded => "property_uploaded",
            Self::TimeBased => "time_based",
            Self::PropertyViewed => "property_viewed",
            Self::PropertyUpdated => "property_updated",
            Self::CampaignStatusChanged => "campaign_status_changed",
            Self::EmailTrackingStatus => "email_tracking_status",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

impl FromStr for TriggerType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTrigger(s.to_string()))
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event payload
// ---------------------------------------------------------------------------

/// Data carried by a trigger event.
///
/// Every field is optional; which ones are populated depends on the trigger
/// class. Unknown keys are kept in `extra` so nothing is lost when the event
/// is re-serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<PropertyId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_ids: Vec<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<BuyerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventPayload {
    /// All property ids referenced by the payload, deduplicated, in order.
    pub fn referenced_property_ids(&self) -> Vec<PropertyId> {
        let mut ids: Vec<PropertyId> = Vec::new();
        for id in self.property_id.iter().chain(self.property_ids.iter()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

// ---------------------------------------------------------------------------
// Trigger configs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUploadedConfig {
    /// Only fire for uploads whose listing status is one of these.
    #[serde(default)]
    pub statuses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyViewedConfig {
    #[serde(default)]
    pub min_views: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUpdatedConfig {
    /// Property fields whose change fires the trigger; empty means any.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStatusConfig {
    #[serde(default)]
    pub from_status: Option<String>,
    #[serde(default)]
    pub to_status: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTrackingConfig {
    #[serde(default)]
    pub statuses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeConfig {}

/// Recurrence of a `time_based` trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Daily,
    Weekly,
    Monthly,
}

fn default_schedule_time() -> String {
    "09:00".to_string()
}

/// Configuration of a `time_based` trigger. Times are UTC wall-clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub schedule: Schedule,
    #[serde(default = "default_schedule_time")]
    pub time: String,
    /// 0 = Sunday .. 6 = Saturday. Required for weekly schedules.
    #[serde(default)]
    pub day_of_week: Option<u8>,
    /// 1..=31. Required for monthly schedules; clamped to the month's last day.
    #[serde(default)]
    pub day_of_month: Option<u8>,
}

impl ScheduleConfig {
    /// Structural problems with this schedule, one message per problem.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if parse_time(&self.time).is_none() {
            errors.push(format!(
                "Schedule time '{}' must be in HH:MM (24h) format",
                self.time
            ));
        }

        match self.schedule {
            Schedule::Daily => {}
            Schedule::Weekly => match self.day_of_week {
                None => errors.push("Weekly schedule requires dayOfWeek".to_string()),
                Some(d) if d > 6 => errors.push(format!(
                    "dayOfWeek must be between 0 (Sunday) and 6 (Saturday), got {d}"
                )),
                Some(_) => {}
            },
            Schedule::Monthly => match self.day_of_month {
                None => errors.push("Monthly schedule requires dayOfMonth".to_string()),
                Some(d) if !(1..=31).contains(&d) => errors.push(format!(
                    "dayOfMonth must be between 1 and 31, got {d}"
                )),
                Some(_) => {}
            },
        }

        errors
    }

    /// Whether the schedule fires during the minute containing `at`.
    pub fn is_due(&self, at: Timestamp) -> bool {
        let Some(time) = parse_time(&self.time) else {
            return false;
        };
        if at.hour() != time.hour() || at.minute() != time.minute() {
            return false;
        }

        match self.schedule {
            Schedule::Daily => true,
            Schedule::Weekly => self
                .day_of_week
                .is_some_and(|d| u32::from(d) == at.weekday().num_days_from_sunday()),
            Schedule::Monthly => self.day_of_month.is_some_and(|d| {
                let last = last_day_of_month(at.year(), at.month());
                u32::from(d).min(last) == at.day()
            }),
        }
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// The trigger of an automation: `{ "type": ..., "config": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum Trigger {
    PropertyUploaded(PropertyUploadedConfig),
    TimeBased(ScheduleConfig),
    PropertyViewed(PropertyViewedConfig),
    PropertyUpdated(PropertyUpdatedConfig),
    CampaignStatusChanged(CampaignStatusConfig),
    EmailTrackingStatus(EmailTrackingConfig),
    Unsubscribe(UnsubscribeConfig),
}

impl Trigger {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            Self::PropertyUploaded(_) => TriggerType::PropertyUploaded,
            Self::TimeBased(_) => TriggerType::TimeBased,
            Self::PropertyViewed(_) => TriggerType::PropertyViewed,
            Self::PropertyUpdated(_) => TriggerType::PropertyUpdated,
            Self::CampaignStatusChanged(_) => TriggerType::CampaignStatusChanged,
            Self::EmailTrackingStatus(_) => TriggerType::EmailTrackingStatus,
            Self::Unsubscribe(_) => TriggerType::Unsubscribe,
        }
    }

    /// Structural problems with the trigger config.
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::TimeBased(schedule) => schedule.errors(),
            Self::PropertyViewed(PropertyViewedConfig {
                min_views: Some(0),
            }) => vec!["minViews must be at least 1 when set".to_string()],
            _ => Vec::new(),
        }
    }

    /// Whether this trigger's config accepts an event that occurred at
    /// `occurred_at` with the given payload.
    ///
    /// Callers must already have matched the trigger type.
    pub fn accepts(&self, payload: &EventPayload, occurred_at: Timestamp) -> bool {
        match self {
            Self::PropertyUploaded(cfg) => matches_any(&cfg.statuses, payload.property_status.as_deref()),
            Self::TimeBased(schedule) => schedule.is_due(occurred_at),
            Self::PropertyViewed(cfg) => match cfg.min_views {
                None => true,
                Some(min) => payload.view_count.is_some_and(|v| v >= min),
            },
            Self::PropertyUpdated(cfg) => {
                cfg.fields.is_empty()
                    || payload
                        .changed_fields
                        .iter()
                        .any(|f| cfg.fields.iter().any(|c| c.eq_ignore_ascii_case(f)))
            }
            Self::CampaignStatusChanged(cfg) => {
                let from_ok = match &cfg.from_status {
                    None => true,
                    Some(from) => payload
                        .previous_status
                        .as_deref()
                        .is_some_and(|p| p.eq_ignore_ascii_case(from)),
                };
                from_ok && matches_any(&cfg.to_status, payload.status.as_deref())
            }
            Self::EmailTrackingStatus(cfg) => matches_any(&cfg.statuses, payload.status.as_deref()),
            Self::Unsubscribe(_) => true,
        }
    }
}

/// An empty allow-list accepts everything; otherwise the value must be
/// present (case-insensitive).
fn matches_any(allowed: &[String], value: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    value.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
