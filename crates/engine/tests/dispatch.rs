//! End-to-end dispatch tests against the in-memory collaborators.

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mailivo_core::action::{Action, ActionConfig, ActionType, CampaignType};
use mailivo_core::campaign::{CreatedCampaign, MultiCampaignPayload, SingleCampaignPayload};
use mailivo_core::conditions::Condition;
use mailivo_core::execution::{ExecutionStatus, LogLevel};
use mailivo_core::payment_plan::{PaymentPlan, PlanStrategy};
use mailivo_core::records::{Buyer, Property};
use mailivo_core::services::{AutomationStore, CampaignService, ServiceError};
use mailivo_core::types::DbId;
use mailivo_core::trigger::{EventPayload, PropertyUploadedConfig, Schedule, ScheduleConfig, Trigger, TriggerType};
use mailivo_core::automation::{Automation, AutomationUpdate, NewAutomation};
use mailivo_engine::memory::{
    InMemoryAutomationStore, InMemoryExecutionLog, InMemoryListings, InMemoryTemplates, RecordingCampaignService,
};
use mailivo_engine::{Collaborators, Dispatcher, EngineConfig, EngineError};
use mailivo_events::TriggerEvent;
use serde_json::json;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    automations: Arc<InMemoryAutomationStore>,
    listings: Arc<InMemoryListings>,
    executions: Arc<InMemoryExecutionLog>,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new(campaigns: Arc<dyn CampaignService>) -> Self {
        Self::with_log(campaigns, Arc::new(InMemoryExecutionLog::new()))
    }

    fn with_log(campaigns: Arc<dyn CampaignService>, executions: Arc<InMemoryExecutionLog>) -> Self {
        let automations = Arc::new(InMemoryAutomationStore::new());
        let listings = Arc::new(InMemoryListings::new());
        let dispatcher = Dispatcher::new(
            Collaborators {
                automations: automations.clone(),
                properties: listings.clone(),
                buyers: listings.clone(),
                templates: Arc::new(InMemoryTemplates::new()),
                campaigns,
                executions: executions.clone(),
            },
            &EngineConfig::default(),
        );
        Self {
            automations,
            listings,
            executions,
            dispatcher,
        }
    }

    async fn automation(&self, name: &str, trigger: Trigger, conditions: Vec<Condition>, action: Action) -> i64 {
        self.automations
            .create(&NewAutomation {
                user_id: Some(1),
                name: name.into(),
                description: None,
                is_active: true,
                trigger,
                conditions,
                action: Some(action),
            })
            .await
            .unwrap()
            .id
    }
}

fn uploaded() -> Trigger {
    Trigger::PropertyUploaded(PropertyUploadedConfig::default())
}

fn send(template_id: &str, campaign_type: CampaignType) -> Action {
    Action::send_campaign(ActionConfig {
        template_id: template_id.into(),
        campaign_type,
        ..Default::default()
    })
}

fn state_is(state: &str) -> Condition {
    serde_json::from_value(json!({ "category": "property_data", "filters": { "state": [state] } })).unwrap()
}

fn property(id: &str, state: &str) -> Property {
    Property {
        state: state.into(),
        status: "Available".into(),
        asking_price: Some(25_000.0),
        ..Property::new(id)
    }
}

fn upload_event(property_id: &str) -> TriggerEvent {
    TriggerEvent::new(TriggerType::PropertyUploaded).with_payload(EventPayload {
        property_id: Some(property_id.into()),
        ..Default::default()
    })
}

/// Fails every campaign whose template is `broken`.
struct SelectiveCampaignService;

#[async_trait]
impl CampaignService for SelectiveCampaignService {
    async fn create_campaign(&self, payload: &SingleCampaignPayload) -> Result<CreatedCampaign, ServiceError> {
        if payload.template_id == "broken" {
            return Err(ServiceError::Unavailable("template rendering failed".into()));
        }
        Ok(CreatedCampaign {
            id: format!("c-{}", payload.property_id),
        })
    }

    async fn create_multi_property_campaign(
        &self,
        _payload: &MultiCampaignPayload,
    ) -> Result<CreatedCampaign, ServiceError> {
        Ok(CreatedCampaign { id: "c-multi".into() })
    }
}

/// Store whose only active automation no longer decodes.
struct CorruptStore;

#[async_trait]
impl AutomationStore for CorruptStore {
    async fn active_for_trigger(&self, _trigger: TriggerType) -> Result<Vec<Automation>, ServiceError> {
        Err(ServiceError::MalformedAutomation {
            id: 7,
            reason: "unknown variant `property_sold`".into(),
        })
    }

    async fn create(&self, _automation: &NewAutomation) -> Result<Automation, ServiceError> {
        Err(ServiceError::Storage("read-only".into()))
    }

    async fn find_by_id(&self, _id: DbId) -> Result<Option<Automation>, ServiceError> {
        Ok(None)
    }

    async fn list(&self, _limit: i64, _offset: i64) -> Result<Vec<Automation>, ServiceError> {
        Ok(Vec::new())
    }

    async fn update(&self, _id: DbId, _update: &AutomationUpdate) -> Result<Option<Automation>, ServiceError> {
        Ok(None)
    }

    async fn set_active(&self, _id: DbId, _is_active: bool) -> Result<Option<Automation>, ServiceError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Condition outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_matching_state_creates_no_campaign() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "CA")).await;
    let id = h
        .automation("Texas uploads", uploaded(), vec![state_is("TX")], send("t1", CampaignType::SingleProperty))
        .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].workflow_id, id);
    assert!(results[0].success);
    assert_eq!(results[0].affected_records, 0);
    assert_eq!(campaigns.call_count(), 0);
    assert!(results[0]
        .logs
        .iter()
        .any(|l| l.message.contains("Condition 1 (property_data) matched no records")));

    let history = h.executions.entries().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ExecutionStatus::Completed);
    assert_eq!(history[0].records_affected, 0);
}

#[tokio::test]
async fn matching_state_creates_single_property_campaign() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "TX")).await;
    h.listings.add_buyer(Buyer::new("b1", "ann@example.com"), &["p1"]).await;
    h.listings.add_buyer(Buyer::new("b2", "bob@example.com"), &["p9"]).await;
    let id = h
        .automation("Texas uploads", uploaded(), vec![state_is("TX")], send("t1", CampaignType::SingleProperty))
        .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();

    assert!(results[0].success);
    assert_eq!(results[0].affected_records, 1);
    assert_eq!(results[0].data.as_ref().unwrap()["campaignId"], json!("campaign-1"));

    let sent = campaigns.single_calls().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].property_id, "p1");
    assert_eq!(sent[0].template_id, "t1");
    assert_eq!(sent[0].metadata.workflow_id, id);
    let emails: Vec<_> = sent[0].buyers.iter().map(|b| b.email.as_str()).collect();
    assert_eq!(emails, vec!["ann@example.com"]);

    let history = h.executions.entries().await;
    assert_eq!(history[0].campaign_id.as_deref(), Some("campaign-1"));
}

#[tokio::test]
async fn unavailable_preferred_plan_falls_back_to_first_available() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    let plan = |n: u8, available: bool| PaymentPlan {
        plan_number: n,
        down_payment: 1_000.0,
        loan_amount: 20_000.0,
        interest_rate: 9.9,
        monthly_payment: 300.0 + f64::from(n),
        is_available: available,
    };
    h.listings
        .add_property(Property {
            financing: true,
            payment_plans: vec![plan(1, true), plan(2, false)],
            ..property("p1", "TX")
        })
        .await;
    h.automation(
        "Financed uploads",
        uploaded(),
        Vec::new(),
        Action::send_campaign(ActionConfig {
            template_id: "t1".into(),
            financing_enabled: true,
            plan_strategy: PlanStrategy::Plan2,
            ..Default::default()
        }),
    )
    .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();

    assert!(results[0].success);
    let sent = campaigns.single_calls().await;
    assert_eq!(sent[0].selected_plan.as_ref().map(|p| p.plan_number), Some(1));
}

#[tokio::test]
async fn multi_property_campaign_covers_every_matched_property() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    for (id, state) in [("p1", "TX"), ("p2", "TX"), ("p3", "CA")] {
        h.listings.add_property(property(id, state)).await;
    }
    h.automation("Texas digest", uploaded(), vec![state_is("TX")], send("t1", CampaignType::MultiProperty))
        .await;

    let event = TriggerEvent::new(TriggerType::PropertyUploaded).with_payload(EventPayload {
        property_ids: vec!["p1".into(), "p2".into(), "p3".into()],
        ..Default::default()
    });
    let results = h.dispatcher.dispatch(&event).await.unwrap();

    assert_eq!(results[0].affected_records, 2);
    let sent = campaigns.multi_calls().await;
    assert_eq!(sent[0].property_ids, vec!["p1".to_string(), "p2".to_string()]);
}

// ---------------------------------------------------------------------------
// Matching and isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn only_matching_active_automations_run() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "TX")).await;

    let matching = h
        .automation("Uploads", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;
    let paused = h
        .automation("Paused", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;
    h.automations.set_active(paused, false).await.unwrap();
    h.automation(
        "Sold only",
        Trigger::PropertyUploaded(PropertyUploadedConfig {
            statuses: vec!["Sold".into()],
        }),
        Vec::new(),
        send("t1", CampaignType::SingleProperty),
    )
    .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();

    let ids: Vec<_> = results.iter().map(|r| r.workflow_id).collect();
    assert_eq!(ids, vec![matching]);
}

#[tokio::test]
async fn one_failing_automation_does_not_affect_others() {
    let h = Harness::new(Arc::new(SelectiveCampaignService));
    h.listings.add_property(property("p1", "TX")).await;
    let broken = h
        .automation("Broken", uploaded(), Vec::new(), send("broken", CampaignType::SingleProperty))
        .await;
    let healthy = h
        .automation("Healthy", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();
    assert_eq!(results.len(), 2);

    let failed = results.iter().find(|r| r.workflow_id == broken).unwrap();
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("template rendering failed"));
    assert_eq!(failed.affected_records, 0);

    let ok = results.iter().find(|r| r.workflow_id == healthy).unwrap();
    assert!(ok.success);
    assert_eq!(ok.affected_records, 1);

    let history = h.executions.entries().await;
    assert_eq!(history.len(), 2);
    let statuses: Vec<_> = history.iter().map(|e| (e.workflow_id, e.status)).collect();
    assert!(statuses.contains(&(broken, ExecutionStatus::Failed)));
    assert!(statuses.contains(&(healthy, ExecutionStatus::Completed)));
}

#[tokio::test]
async fn unsupported_action_aborts_dispatch_before_any_run() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "TX")).await;
    h.automation("Fine", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;
    let mut sms = send("t1", CampaignType::SingleProperty);
    sms.action_type = ActionType::Other("send_sms".into());
    let bad = h.automation("SMS", uploaded(), Vec::new(), sms).await;

    let result = h.dispatcher.dispatch(&upload_event("p1")).await;

    assert_matches!(
        result,
        Err(EngineError::UnsupportedAction { automation_id, action_type })
            if automation_id == bad && action_type == "send_sms"
    );
    assert_eq!(campaigns.call_count(), 0);
    assert!(h.executions.entries().await.is_empty());
}

#[tokio::test]
async fn active_automation_without_action_aborts_dispatch() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "TX")).await;
    h.automation("Fine", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;
    let bare = h
        .automations
        .create(&NewAutomation {
            user_id: Some(1),
            name: "No action".into(),
            description: None,
            is_active: true,
            trigger: uploaded(),
            conditions: Vec::new(),
            action: None,
        })
        .await
        .unwrap()
        .id;

    let result = h.dispatcher.dispatch(&upload_event("p1")).await;

    assert_matches!(
        result,
        Err(EngineError::MalformedAutomation { automation_id, .. }) if automation_id == bare
    );
    assert_eq!(campaigns.call_count(), 0);
    assert!(h.executions.entries().await.is_empty());
}

#[tokio::test]
async fn oversized_day_window_runs_alongside_other_automations() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings
        .add_property(Property {
            created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            ..property("p1", "TX")
        })
        .await;
    let wide: Condition = serde_json::from_value(json!({
        "category": "property_data",
        "filters": { "dates": [{ "field": "createdAt", "operator": "last_n_days", "days": 100_000_000 }] }
    }))
    .unwrap();
    let wide_id = h
        .automation("Forever", uploaded(), vec![wide], send("t1", CampaignType::SingleProperty))
        .await;
    let plain_id = h
        .automation("Plain", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success && r.affected_records == 1));
    let ids: Vec<_> = results.iter().map(|r| r.workflow_id).collect();
    assert!(ids.contains(&wide_id) && ids.contains(&plain_id));
    assert_eq!(campaigns.call_count(), 2);
}

#[tokio::test]
async fn undecodable_stored_automation_fails_dispatch() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let listings = Arc::new(InMemoryListings::new());
    listings.add_property(property("p1", "TX")).await;
    let executions = Arc::new(InMemoryExecutionLog::new());
    let dispatcher = Dispatcher::new(
        Collaborators {
            automations: Arc::new(CorruptStore),
            properties: listings.clone(),
            buyers: listings,
            templates: Arc::new(InMemoryTemplates::new()),
            campaigns: campaigns.clone(),
            executions: executions.clone(),
        },
        &EngineConfig::default(),
    );

    let result = dispatcher.dispatch(&upload_event("p1")).await;

    assert_matches!(result, Err(EngineError::MalformedAutomation { automation_id: 7, .. }));
    assert_eq!(campaigns.call_count(), 0);
    assert!(executions.entries().await.is_empty());
}

#[tokio::test]
async fn unknown_trigger_name_is_rejected() {
    let h = Harness::new(Arc::new(RecordingCampaignService::new()));
    let result = h.dispatcher.dispatch_raw("property_sold", EventPayload::default()).await;
    assert_matches!(result, Err(EngineError::UnknownTrigger(t)) if t == "property_sold");
}

#[tokio::test]
async fn dispatch_raw_parses_wire_trigger_name() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "TX")).await;
    h.automation("Uploads", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;

    let payload = EventPayload {
        property_id: Some("p1".into()),
        ..Default::default()
    };
    let results = h.dispatcher.dispatch_raw("property_uploaded", payload).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(campaigns.call_count(), 1);
}

// ---------------------------------------------------------------------------
// Scheduling and history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduled_automation_runs_once_per_minute() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::new(campaigns.clone());
    h.listings.add_property(property("p1", "TX")).await;
    h.listings.add_property(property("p2", "TX")).await;
    h.automation(
        "Morning digest",
        Trigger::TimeBased(ScheduleConfig {
            schedule: Schedule::Daily,
            time: "09:00".into(),
            day_of_week: None,
            day_of_month: None,
        }),
        vec![state_is("TX")],
        send("t1", CampaignType::MultiProperty),
    )
    .await;

    let nine = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
    let ten = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();

    let not_due = h
        .dispatcher
        .dispatch(&TriggerEvent::new(TriggerType::TimeBased).at(ten))
        .await
        .unwrap();
    assert!(not_due.is_empty());

    let first = h
        .dispatcher
        .dispatch(&TriggerEvent::new(TriggerType::TimeBased).at(nine))
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].affected_records, 2);

    let repeat = h
        .dispatcher
        .dispatch(&TriggerEvent::new(TriggerType::TimeBased).at(nine))
        .await
        .unwrap();
    assert!(repeat.is_empty());
    assert_eq!(campaigns.call_count(), 1);
}

#[tokio::test]
async fn history_write_failure_is_surfaced_in_result_logs() {
    let campaigns = Arc::new(RecordingCampaignService::new());
    let h = Harness::with_log(campaigns, Arc::new(InMemoryExecutionLog::rejecting_writes()));
    h.listings.add_property(property("p1", "TX")).await;
    h.automation("Uploads", uploaded(), Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;

    let results = h.dispatcher.dispatch(&upload_event("p1")).await.unwrap();

    assert!(results[0].success);
    let last = results[0].logs.last().unwrap();
    assert_eq!(last.level, LogLevel::Error);
    assert!(last.message.contains("Failed to write execution record"));
}

#[tokio::test]
async fn campaign_status_event_without_campaign_id_fails_the_run() {
    let h = Harness::new(Arc::new(RecordingCampaignService::new()));
    let trigger: Trigger = serde_json::from_value(json!({
        "type": "campaign_status_changed",
        "config": {}
    }))
    .unwrap();
    let id = h
        .automation("Follow-up", trigger, Vec::new(), send("t1", CampaignType::SingleProperty))
        .await;

    let event = TriggerEvent::new(TriggerType::CampaignStatusChanged).with_payload(EventPayload {
        status: Some("sent".into()),
        ..Default::default()
    });
    let results = h.dispatcher.dispatch(&event).await.unwrap();

    assert_eq!(results[0].workflow_id, id);
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("campaignId"));
}
