// Path: crates/hub/src/jobs.rs
//! Periodic jobs the hub registers at startup.

use crate::registry::NodeRegistry;
use provenet_scheduler::Scheduler;
use provenet_types::error::SchedulerError;
use std::sync::Arc;
use std::time::Duration;

/// Sweep interval and the timeout the sweep enforces.
const UPDATE_NODE_LIST_INTERVAL: Duration = Duration::from_secs(60);

/// Register the hub's jobs. The only mandated one is `update_node_list`,
/// which pins the registry timeout to the sweep interval and drops
/// inactive nodes.
pub fn register_jobs(
    scheduler: &Scheduler,
    registry: Arc<NodeRegistry>,
) -> Result<(), SchedulerError> {
    scheduler.add_job("update_node_list", UPDATE_NODE_LIST_INTERVAL, move || {
        let registry = Arc::clone(&registry);
        async move {
            registry.set_timeout(UPDATE_NODE_LIST_INTERVAL);
            let removed = registry.sweep();
            tracing::debug!(
                target: "job",
                job = "update_node_list",
                removed,
                remaining = registry.len(),
                "node list updated"
            );
            Ok(())
        }
    })
}
