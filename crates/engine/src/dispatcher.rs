//! Trigger dispatch: match automations to an event and run each one.
//!
//! One event fans out to every active automation whose trigger type matches
//! and whose trigger config accepts the payload. Each automation runs its own
//! sequential pipeline (load, filter, act, record); automations run
//! concurrently up to [`EngineConfig::max_concurrency`] and never affect each
//! other's outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use mailivo_core::automation::Automation;
use mailivo_core::conditions::{apply_conditions, FilterOutcome};
use mailivo_core::execution::{ExecutionLogEntry, ExecutionRecord, ExecutionResult, ExecutionStatus, LogLevel};
use mailivo_core::services::{
    AutomationStore, BuyerSource, CampaignService, ExecutionLog, PropertySource, TemplateSource,
};
use mailivo_core::trigger::{EventPayload, TriggerType};
use mailivo_events::TriggerEvent;
use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::error::{EngineError, ExecutionError};
use crate::executor::{ActionExecutor, ActionOutcome, ExecutionContext};
use crate::loader::RecordLoader;
use crate::trace::ExecutionTrace;

/// Everything the dispatcher talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub automations: Arc<dyn AutomationStore>,
    pub properties: Arc<dyn PropertySource>,
    pub buyers: Arc<dyn BuyerSource>,
    pub templates: Arc<dyn TemplateSource>,
    pub campaigns: Arc<dyn CampaignService>,
    pub executions: Arc<dyn ExecutionLog>,
}

pub struct Dispatcher {
    automations: Arc<dyn AutomationStore>,
    executions: Arc<dyn ExecutionLog>,
    loader: RecordLoader,
    executor: ActionExecutor,
    max_concurrency: usize,
}

impl Dispatcher {
    pub fn new(deps: Collaborators, config: &EngineConfig) -> Self {
        Self {
            automations: deps.automations,
            executions: deps.executions,
            loader: RecordLoader::new(deps.properties, deps.buyers, deps.templates),
            executor: ActionExecutor::new(deps.campaigns, config.campaign_timeout),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Dispatch an event identified by its wire-format trigger name.
    pub async fn dispatch_raw(
        &self,
        trigger_id: &str,
        payload: EventPayload,
    ) -> Result<Vec<ExecutionResult>, EngineError> {
        let trigger_type: TriggerType = trigger_id
            .parse()
            .map_err(|_| EngineError::UnknownTrigger(trigger_id.to_string()))?;
        let event = TriggerEvent::new(trigger_type)
            .with_payload(payload)
            .with_source("api");
        self.dispatch(&event).await
    }

    /// Run every matching automation for `event`.
    ///
    /// Returns one result per automation that ran. Configuration errors in
    /// any candidate abort the whole dispatch before anything runs; failures
    /// during a run are reported in that automation's result.
    pub async fn dispatch(&self, event: &TriggerEvent) -> Result<Vec<ExecutionResult>, EngineError> {
        let candidates = self.candidates(event).await?;
        for automation in &candidates {
            check_runnable(automation, event.trigger_type)?;
        }

        tracing::info!(
            event_id = %event.event_id,
            trigger_type = %event.trigger_type,
            candidates = candidates.len(),
            "Dispatching trigger event"
        );

        let results: Vec<ExecutionResult> = stream::iter(candidates)
            .map(|automation| async move { self.run(automation, event).await })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.success).count();
        tracing::info!(
            event_id = %event.event_id,
            executed = results.len(),
            failed,
            "Trigger event dispatched"
        );
        Ok(results)
    }

    /// Active automations of the event's trigger type whose config accepts
    /// the event. Scheduled automations that already ran for this minute are
    /// skipped.
    async fn candidates(&self, event: &TriggerEvent) -> Result<Vec<Automation>, EngineError> {
        let active = self.automations.active_for_trigger(event.trigger_type).await?;
        let mut candidates = Vec::with_capacity(active.len());

        for automation in active {
            if !automation.trigger.accepts(&event.payload, event.occurred_at) {
                tracing::debug!(automation_id = automation.id, "Trigger config did not accept event");
                continue;
            }
            if event.trigger_type == TriggerType::TimeBased && self.already_ran(&automation, event).await {
                tracing::debug!(automation_id = automation.id, "Schedule already ran this minute");
                continue;
            }
            candidates.push(automation);
        }
        Ok(candidates)
    }

    async fn already_ran(&self, automation: &Automation, event: &TriggerEvent) -> bool {
        match self.executions.last_started_at(automation.id).await {
            Ok(last) => last.is_some_and(|last| last >= event.occurred_at),
            Err(e) => {
                tracing::warn!(automation_id = automation.id, error = %e, "Could not read last execution time");
                false
            }
        }
    }

    /// Run one automation end to end and record the execution.
    async fn run(&self, automation: Automation, event: &TriggerEvent) -> ExecutionResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut trace = ExecutionTrace::new(automation.id);
        trace.info(format!("Automation '{}' triggered by {}", automation.name, event.trigger_type));

        let outcome = self.evaluate(&automation, event, started_at, &mut trace).await;

        let (status, error, outcome) = match outcome {
            Ok(outcome) => (ExecutionStatus::Completed, None, outcome),
            Err(e) => {
                trace.error(format!("Execution failed: {e}"));
                (ExecutionStatus::Failed, Some(e.to_string()), ActionOutcome::default())
            }
        };

        let record = ExecutionRecord {
            workflow_id: automation.id,
            trigger_type: event.trigger_type,
            started_at,
            execution_time_ms: clock.elapsed().as_millis() as u64,
            records_affected: outcome.affected_records,
            status,
            error,
            campaign_id: outcome.campaign_id,
            logs: trace.into_entries(),
        };

        let mut result = ExecutionResult::from_record(&record, outcome.data);
        if let Err(e) = self.executions.record(&record).await {
            tracing::error!(automation_id = automation.id, error = %e, "Failed to write execution record");
            result.logs.push(ExecutionLogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Error,
                message: format!("Failed to write execution record: {e}"),
            });
        }
        result
    }

    async fn evaluate(
        &self,
        automation: &Automation,
        event: &TriggerEvent,
        started_at: DateTime<Utc>,
        trace: &mut ExecutionTrace,
    ) -> Result<ActionOutcome, ExecutionError> {
        let initial = self.loader.load(automation, event).await?;
        trace.info(format!(
            "Loaded {} propert(ies), {} buyer(s), {} campaign(s), {} template(s)",
            initial.properties.len(),
            initial.buyers.len(),
            initial.campaigns.len(),
            initial.templates.len()
        ));

        let outcome = apply_conditions(initial, &automation.conditions, event.occurred_at);
        if let FilterOutcome::NoMatches { stopped_at, category } = &outcome {
            trace.info(format!(
                "Condition {} ({category}) matched no records; remaining conditions skipped",
                stopped_at + 1
            ));
        }
        let matched = outcome.into_records();

        let Some(action) = &automation.action else {
            return Err(ExecutionError::InvalidPayload(format!(
                "automation {} has no action",
                automation.id
            )));
        };
        let ctx = ExecutionContext {
            workflow_id: automation.id,
            user_id: automation.user_id,
            automation_name: automation.name.clone(),
            started_at,
            trigger_type: event.trigger_type,
        };
        self.executor.execute(action, &matched, &ctx, trace).await
    }
}

/// Structural completeness required before any automation runs.
fn check_runnable(automation: &Automation, trigger_type: TriggerType) -> Result<(), EngineError> {
    if automation.trigger_type() != trigger_type {
        return Err(EngineError::MalformedAutomation {
            automation_id: automation.id,
            reason: format!(
                "trigger type {} does not match event type {trigger_type}",
                automation.trigger_type()
            ),
        });
    }
    let Some(action) = &automation.action else {
        return Err(EngineError::MalformedAutomation {
            automation_id: automation.id,
            reason: "active automation has no action".to_string(),
        });
    };
    if !action.action_type.is_supported() {
        return Err(EngineError::UnsupportedAction {
            automation_id: automation.id,
            action_type: action.action_type.to_string(),
        });
    }
    Ok(())
}
