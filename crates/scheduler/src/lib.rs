// Path: crates/scheduler/src/lib.rs
//! Named periodic jobs on the shared runtime.
//!
//! Jobs register under a unique name — a duplicate registration is a fatal
//! configuration error surfaced at startup, never at tick time. A tick that
//! returns an error is logged and does not stop the job; shutdown stops
//! issuance of new ticks and cancels in-flight work before returning.

use parking_lot::Mutex;
use provenet_types::error::SchedulerError;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A periodic job runner with a shutdown signal.
pub struct Scheduler {
    names: Mutex<HashSet<String>>,
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// An empty scheduler; jobs start ticking as soon as they are added.
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            names: Mutex::new(HashSet::new()),
            handles: Mutex::new(Vec::new()),
            shutdown_tx,
        }
    }

    /// A receiver that flips to `true` once shutdown begins. Components
    /// outside the scheduler (heartbeats, flushers) can share it.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Register and start a job running `body` every `interval`.
    ///
    /// The first tick fires immediately. Ticks never overlap: the next sleep
    /// starts after the previous body finished.
    pub fn add_job<F, Fut>(
        &self,
        name: &str,
        interval: Duration,
        body: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if !self.names.lock().insert(name.to_string()) {
            return Err(SchedulerError::DuplicateJob(name.to_string()));
        }

        let job_name = name.to_string();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut tick: u64 = 0;
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                tick += 1;
                let started = std::time::Instant::now();
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    result = body() => match result {
                        Ok(()) => tracing::debug!(
                            target: "scheduler",
                            job = %job_name,
                            tick,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "job tick completed"
                        ),
                        Err(e) => tracing::error!(
                            target: "scheduler",
                            job = %job_name,
                            tick,
                            error = %e,
                            "job tick failed"
                        ),
                    },
                }
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            tracing::info!(target: "scheduler", job = %job_name, "job stopped");
        });

        self.handles.lock().push((name.to_string(), handle));
        tracing::info!(
            target: "scheduler",
            job = %name,
            interval_secs = interval.as_secs_f64(),
            "job scheduled"
        );
        Ok(())
    }

    /// Stop issuing ticks, cancel in-flight work and wait for every job
    /// loop to exit. Join failures (aborts, panicked bodies) are logged,
    /// never propagated.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for (name, handle) in handles {
            if let Err(e) = handle.await {
                tracing::warn!(target: "scheduler", job = %name, error = %e, "job did not exit cleanly");
            }
        }
        tracing::info!(target: "scheduler", "shutdown complete");
    }
}
