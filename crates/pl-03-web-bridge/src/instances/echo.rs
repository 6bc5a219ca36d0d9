//! `test`: answers with the request params and finishes.

use std::sync::Arc;

use shared_timeout::TimeoutHook;

use crate::domain::InstanceId;
use crate::instance::InstanceContext;
use crate::ports::{CommandInstance, InstanceFactory};

pub const ECHO_CMD: &str = "test";

#[derive(Debug)]
pub struct EchoInstance {
    context: InstanceContext,
}

impl TimeoutHook for EchoInstance {
    fn on_timeout(&self) {
        self.context.respond_timeout();
    }
}

impl CommandInstance for EchoInstance {
    fn id(&self) -> InstanceId {
        self.context.id()
    }

    fn cmd(&self) -> &str {
        self.context.cmd()
    }

    fn process(self: Arc<Self>) {
        self.context.respond_ok(self.context.params().clone());
        self.context.finish();
    }
}

pub struct EchoFactory;

impl InstanceFactory for EchoFactory {
    fn create(&self, context: InstanceContext) -> Result<Arc<dyn CommandInstance>, InstanceContext> {
        if context.cmd() == ECHO_CMD {
            Ok(Arc::new(EchoInstance { context }))
        } else {
            Err(context)
        }
    }
}
