use crate::collector::Collector;
use crate::shutdown::Shutdown;
use anyhow::{anyhow, Result};
use tokio::task::JoinSet;

/// Runs a set of collectors concurrently, one task each.
pub struct CollectorManager {
    collectors: Vec<Collector>,
    shutdown: Shutdown,
}

impl Default for CollectorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Adds a collector; it will also observe the manager's shutdown signal.
    pub fn add(&mut self, mut collector: Collector) {
        collector.attach_parent_shutdown(self.shutdown.clone());
        self.collectors.push(collector);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Signal that stops every managed collector when triggered.
    #[must_use]
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Requests cancellation of every collector. Idempotent.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Spawns every collector and waits until all of them have exited.
    ///
    /// A failing collector does not stop the others.
    ///
    /// # Errors
    /// Returns the first collector error (or panic) observed, after every
    /// task has finished.
    pub async fn start(&mut self) -> Result<()> {
        let mut tasks = JoinSet::new();
        for mut collector in self.collectors.drain(..) {
            tasks.spawn(async move {
                let source = collector.source_name();
                let result = collector.start().await;
                (source, result)
            });
        }
        tracing::info!("Started {} collectors", tasks.len());

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((source, Ok(()))) => {
                    tracing::info!("Collector {} finished", source);
                    None
                }
                Ok((source, Err(e))) => {
                    tracing::error!("Collector {} failed: {:#}", source, e);
                    Some(e.context(format!("collector {source} failed")))
                }
                Err(e) => {
                    tracing::error!("Collector task panicked or was aborted: {}", e);
                    Some(anyhow!("collector task ended abnormally: {e}"))
                }
            };
            if first_error.is_none() {
                first_error = failure;
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
