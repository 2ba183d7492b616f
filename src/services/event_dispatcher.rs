//! Event fan-out to listeners.
//!
//! The EventDispatcher subscribes to the EventBus and hands every event to
//! each registered listener interested in it. Listener failures are logged
//! and never stop the loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;

use super::event_bus::{DomainEvent, EventBus};

/// A consumer of domain events.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether this listener wants to see `event`.
    fn interested_in(&self, event: &DomainEvent) -> bool;

    async fn handle(&self, event: &DomainEvent) -> DomainResult<()>;
}

/// Configuration for the EventDispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Per-listener timeout in milliseconds.
    pub listener_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            listener_timeout_ms: 15000,
        }
    }
}

/// Fans events from the bus out to registered listeners.
pub struct EventDispatcher {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
    event_bus: Arc<EventBus>,
    config: DispatcherConfig,
    running: Arc<AtomicBool>,
    events_processed: Arc<AtomicU64>,
}

impl EventDispatcher {
    pub fn new(event_bus: Arc<EventBus>, config: DispatcherConfig) -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            event_bus,
            config,
            running: Arc::new(AtomicBool::new(false)),
            events_processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a listener.
    pub async fn register(&self, listener: Arc<dyn EventListener>) {
        tracing::debug!(listener = listener.name(), "Registering event listener");
        self.listeners.write().await.push(listener);
    }

    /// Deliver one event to every interested listener, in registration order.
    ///
    /// Returns the number of listeners that handled it successfully.
    pub async fn dispatch(&self, event: &DomainEvent) -> usize {
        let listeners = self.listeners.read().await;
        deliver(&listeners, event, self.config.listener_timeout_ms).await
    }

    /// Start the dispatch loop. Returns a JoinHandle that can be aborted on shutdown.
    ///
    /// The bus subscription is taken before this returns, so events published
    /// afterwards are never missed.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let listeners = self.listeners.clone();
        let timeout_ms = self.config.listener_timeout_ms;
        let running = self.running.clone();
        let events_processed = self.events_processed.clone();
        let mut receiver = self.event_bus.subscribe();

        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let event = match tokio::time::timeout(Duration::from_secs(1), receiver.recv()).await {
                    Ok(Ok(event)) => event,
                    Ok(Err(RecvError::Lagged(n))) => {
                        tracing::warn!("EventDispatcher lagged, missed {} events", n);
                        continue;
                    }
                    Ok(Err(RecvError::Closed)) => {
                        tracing::info!("EventDispatcher: EventBus channel closed, stopping");
                        break;
                    }
                    // Timeout: re-check the running flag
                    Err(_) => continue,
                };

                {
                    let hs = listeners.read().await;
                    deliver(&hs, &event, timeout_ms).await;
                }
                events_processed.fetch_add(1, Ordering::Relaxed);
            }
        })
    }

    /// Stop the dispatch loop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get the number of events processed by the loop.
    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    /// Check if the dispatcher is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the names of all registered listeners (snapshot).
    pub async fn listener_names(&self) -> Vec<String> {
        let listeners = self.listeners.read().await;
        listeners.iter().map(|l| l.name().to_string()).collect()
    }
}

async fn deliver(listeners: &[Arc<dyn EventListener>], event: &DomainEvent, timeout_ms: u64) -> usize {
    let mut handled = 0;
    for listener in listeners.iter().filter(|l| l.interested_in(event)) {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), listener.handle(event)).await {
            Ok(Ok(())) => handled += 1,
            Ok(Err(e)) => {
                tracing::warn!(listener = listener.name(), event = %event.name, error = %e, "Listener failed");
            }
            Err(_) => {
                tracing::warn!(listener = listener.name(), event = %event.name, "Listener timed out after {}ms", timeout_ms);
            }
        }
    }
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::services::event_bus::{EventBusConfig, EventKind};
    use serde_json::json;
    use tokio::sync::Mutex;

    struct Recorder {
        name: String,
        suffix: &'static str,
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn new(name: &str, suffix: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                suffix,
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl EventListener for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn interested_in(&self, event: &DomainEvent) -> bool {
            event.name.ends_with(self.suffix)
        }

        async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
            self.seen.lock().await.push(event.name.clone());
            if self.fail {
                return Err(DomainError::ExecutionFailed("boom".to_string()));
            }
            Ok(())
        }
    }

    fn event(action: &str) -> DomainEvent {
        DomainEvent::new("test", EventKind::Pr, action, None, json!({}))
    }

    #[tokio::test]
    async fn test_dispatch_filters_by_interest() {
        let dispatcher = EventDispatcher::new(Arc::new(EventBus::default()), DispatcherConfig::default());
        let opened = Recorder::new("opened", ".opened", false);
        let closed = Recorder::new("closed", ".closed", false);
        dispatcher.register(opened.clone()).await;
        dispatcher.register(closed.clone()).await;

        assert_eq!(dispatcher.dispatch(&event("opened")).await, 1);
        assert_eq!(opened.seen.lock().await.len(), 1);
        assert!(closed.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_block_others() {
        let dispatcher = EventDispatcher::new(Arc::new(EventBus::default()), DispatcherConfig::default());
        let failing = Recorder::new("failing", ".opened", true);
        let ok = Recorder::new("ok", ".opened", false);
        dispatcher.register(failing.clone()).await;
        dispatcher.register(ok.clone()).await;

        assert_eq!(dispatcher.dispatch(&event("opened")).await, 1);
        assert_eq!(failing.seen.lock().await.len(), 1);
        assert_eq!(ok.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_loop_delivers_published_events() {
        let bus = Arc::new(EventBus::new(EventBusConfig::default()));
        let dispatcher = EventDispatcher::new(bus.clone(), DispatcherConfig::default());
        let recorder = Recorder::new("all", "", false);
        dispatcher.register(recorder.clone()).await;

        let handle = dispatcher.start();
        bus.publish(event("opened"));
        bus.publish(event("closed"));

        for _ in 0..50 {
            if dispatcher.events_processed() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        dispatcher.stop();
        handle.abort();

        assert_eq!(
            *recorder.seen.lock().await,
            vec!["test.pr.opened".to_string(), "test.pr.closed".to_string()]
        );
    }
}
