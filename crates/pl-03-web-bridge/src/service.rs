//! # Web Bridge
//!
//! Turns inbound web-UI messages into registered command instances.
//!
//! ```text
//! text ──parse──► WebMessage ──factories──► instance ──insert──► process()
//!                                   │
//!                                   └─(none match)─► {code: 1, "unsupported command"}
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{BridgeConfig, InstanceId, WebMessage};
use crate::error::BridgeError;
use crate::instance::InstanceContext;
use crate::ports::{InstanceFactory, ResponseSink};
use crate::registry::InstanceRegistry;

pub struct WebBridge {
    registry: InstanceRegistry,
    factories: Vec<Box<dyn InstanceFactory>>,
    sink: Arc<dyn ResponseSink>,
}

impl WebBridge {
    pub fn new(config: &BridgeConfig, sink: Arc<dyn ResponseSink>) -> Self {
        Self {
            registry: InstanceRegistry::new(config),
            factories: Vec::new(),
            sink,
        }
    }

    /// Add a factory. Factories are tried in registration order.
    pub fn with_factory(mut self, factory: impl InstanceFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Parse `text` and start an instance for it.
    pub fn handle_message(&self, text: &str) -> Result<InstanceId, BridgeError> {
        let message = WebMessage::parse(text).map_err(|e| {
            warn!(error = %e, "Dropping web message");
            e
        })?;
        self.dispatch(message)
    }

    /// Start an instance for an already parsed message.
    pub fn dispatch(&self, message: WebMessage) -> Result<InstanceId, BridgeError> {
        let id = self.registry.next_id();
        let long_lived = message.event_id.is_some();
        let cmd = message.cmd.clone();
        let mut context = InstanceContext::new(message, self.sink.clone(), self.registry.handle(id));

        for factory in &self.factories {
            match factory.create(context) {
                Ok(instance) => {
                    debug!(instance = %id, cmd = %cmd, long_lived, "Command accepted");
                    self.registry.insert(instance.clone(), long_lived);
                    instance.process();
                    return Ok(id);
                }
                Err(declined) => context = declined,
            }
        }

        warn!(cmd = %cmd, "Unsupported command");
        context.respond_failed(format!("unsupported command: {}", cmd));
        Err(BridgeError::UnsupportedCommand(cmd))
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
