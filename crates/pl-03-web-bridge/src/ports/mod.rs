//! Ports for the web-command bridge.

use std::sync::Arc;

use serde_json::Value;
use shared_timeout::TimeoutHook;

use crate::domain::InstanceId;
use crate::instance::InstanceContext;

/// Delivers outbound responses to the web UI.
pub trait ResponseSink: Send + Sync {
    fn deliver(&self, response: Value);
}

/// One inbound command being served.
///
/// The registry holds the owning handle; the timeout hook runs if the
/// instance never finishes within its lifetime.
pub trait CommandInstance: TimeoutHook {
    fn id(&self) -> InstanceId;

    fn cmd(&self) -> &str;

    /// Start serving. Runs after the instance is registered.
    fn process(self: Arc<Self>);
}

/// Turns a command into an instance, or declines it.
pub trait InstanceFactory: Send + Sync {
    fn create(&self, context: InstanceContext) -> Result<Arc<dyn CommandInstance>, InstanceContext>;
}
