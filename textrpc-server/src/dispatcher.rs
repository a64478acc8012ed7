//! Request dispatch.
//!
//! The dispatcher routes a decoded request to its registered handler. Every
//! routed call bumps the shared call counter exactly once before the handler
//! runs; requests naming an unknown function are answered without touching it.

use crate::metrics::Metrics;
use std::sync::Arc;
use textrpc_core::{CallContext, CallCounter, Registry};
use textrpc_protocol::{Request, Response};

/// Routes requests to registered functions.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    counter: Arc<CallCounter>,
    metrics: Option<Arc<Metrics>>,
}

impl Dispatcher {
    /// Creates a dispatcher with a fresh call counter.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            counter: Arc::new(CallCounter::new()),
            metrics: None,
        }
    }

    /// Shares an existing call counter.
    pub fn with_counter(mut self, counter: Arc<CallCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Sets the metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn counter(&self) -> &Arc<CallCounter> {
        &self.counter
    }

    /// Dispatches a request and returns the reply text.
    ///
    /// Handlers may block (filesystem access, child processes); callers on an
    /// async runtime should run this on a blocking thread.
    pub fn dispatch(&self, request: &Request) -> Response {
        let entry = match self.registry.lookup(&request.function) {
            Ok(entry) => entry,
            Err(_) => {
                tracing::debug!("Unknown function {:?}", request.function);
                if let Some(ref metrics) = self.metrics {
                    metrics.unknown_functions_total.inc();
                }
                return Response::unknown_function();
            }
        };

        let call_number = self.counter.increment();
        tracing::debug!(
            "Call #{}: {} {:?}",
            call_number,
            entry.name(),
            request.args
        );

        let timer = self.metrics.as_ref().map(|m| {
            m.request_duration
                .with_label_values(&[entry.name()])
                .start_timer()
        });

        let ctx = CallContext::new(&self.registry, call_number);
        let text = entry.handler().call(&ctx, &request.args);

        drop(timer); // Observation happens on drop
        if let Some(ref metrics) = self.metrics {
            metrics
                .requests_total
                .with_label_values(&[entry.name()])
                .inc();
        }

        Response::new(text)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("calls", &self.counter.current())
            .field("metrics_enabled", &self.metrics.is_some())
            .finish()
    }
}
