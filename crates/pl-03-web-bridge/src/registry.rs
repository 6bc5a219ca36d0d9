//! # Instance Registry
//!
//! Live command instances keyed by [`InstanceId`]. Instances with an event
//! id never expire and must finish themselves; all others expire after
//! the configured lifetime and run their timeout hook.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use shared_timeout::TimeoutRegistry;
use tracing::debug;

use crate::domain::{BridgeConfig, InstanceId};
use crate::ports::CommandInstance;

type Instances = TimeoutRegistry<InstanceId, Arc<dyn CommandInstance>>;

/// Registry of in-flight command instances.
pub struct InstanceRegistry {
    instances: Arc<Instances>,
    next_id: AtomicU64,
}

impl InstanceRegistry {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            instances: Arc::new(TimeoutRegistry::with_config(
                config.instance_timeout,
                config.sweep_interval,
            )),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> InstanceId {
        InstanceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Handle that lets instance `id` remove itself.
    pub fn handle(&self, id: InstanceId) -> InstanceHandle {
        InstanceHandle {
            id,
            instances: Arc::downgrade(&self.instances),
        }
    }

    /// Register `instance`. Long-lived instances never expire.
    pub fn insert(&self, instance: Arc<dyn CommandInstance>, long_lived: bool) {
        let id = instance.id();
        if long_lived {
            self.instances.add_infinite(id, instance);
        } else {
            self.instances
                .add(id, instance, self.instances.default_timeout());
        }
        debug!(instance = %id, long_lived, "Instance registered");
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.exists(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Live instances serving `cmd`.
    pub fn find_by_cmd(&self, cmd: &str) -> Vec<Arc<dyn CommandInstance>> {
        self.instances
            .snapshot()
            .into_iter()
            .filter(|(_, instance)| instance.cmd() == cmd)
            .map(|(_, instance)| instance)
            .collect()
    }
}

/// Lets an instance end itself without owning the registry.
#[derive(Clone)]
pub struct InstanceHandle {
    id: InstanceId,
    instances: Weak<Instances>,
}

impl InstanceHandle {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Remove the instance without running its timeout hook.
    pub fn finish(&self) -> bool {
        let Some(instances) = self.instances.upgrade() else {
            return false;
        };
        let removed = instances.remove(&self.id);
        if removed {
            debug!(instance = %self.id, "Instance finished");
        }
        removed
    }
}
