//! Bridges the event bus to the dispatcher.

use std::sync::Arc;

use mailivo_events::TriggerEvent;
use tokio::sync::broadcast;

use crate::dispatcher::Dispatcher;

/// Background service that dispatches every trigger event published on the
/// [`EventBus`](mailivo_events::EventBus).
pub struct AutomationListener;

impl AutomationListener {
    /// Run the listener loop.
    ///
    /// Each event is dispatched on its own task so a slow campaign service
    /// never stalls the receiver. The loop exits when the bus is dropped.
    pub async fn run(dispatcher: Arc<Dispatcher>, mut receiver: broadcast::Receiver<TriggerEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    tokio::spawn(async move {
                        if let Err(e) = dispatcher.dispatch(&event).await {
                            tracing::error!(
                                error = %e,
                                event_id = %event.event_id,
                                trigger_type = %event.trigger_type,
                                "Failed to dispatch trigger event"
                            );
                        }
                    });
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Automation listener lagged, some trigger events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, automation listener shutting down");
                    break;
                }
            }
        }
    }
}
