//! Periodic tick loop
//!
//! Runs one tick pass, waits the configured interval, and repeats. Each
//! pass runs on the blocking pool so node hooks never stall the async
//! runtime. The interval is re-read after every pass, so changes apply
//! from the next sleep on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;

use crate::engine::{Engine, EngineShared};

/// Handle to the running tick loop
#[derive(Default)]
pub(crate) struct Scheduler {
    /// Stop flag of the current loop. Every start gets a fresh flag so a
    /// stopped loop can never be revived by a later start.
    running: Option<Arc<AtomicBool>>,
}

impl Scheduler {
    /// Spawn the loop unless one is already running
    pub fn start(&mut self, runtime: &Handle, engine: Weak<EngineShared>) {
        if self.is_running() {
            log::warn!("Scheduler already running");
            return;
        }

        let running = Arc::new(AtomicBool::new(true));
        self.running = Some(running.clone());

        runtime.spawn(async move {
            log::debug!("Scheduler loop started");

            while running.load(Ordering::SeqCst) {
                let Some(shared) = engine.upgrade() else {
                    break;
                };
                let engine_for_pass = Engine::from_shared(shared.clone());
                let flag = running.clone();

                let pass = tokio::task::spawn_blocking(move || {
                    // A stop may have landed while this pass was queued
                    if flag.load(Ordering::SeqCst) {
                        engine_for_pass.tick();
                    }
                })
                .await;
                if let Err(e) = pass {
                    log::error!("Tick pass aborted: {}", e);
                }

                let interval = shared.update_interval();
                drop(shared);
                tokio::time::sleep(interval).await;
            }

            log::debug!("Scheduler loop stopped");
        });
    }

    /// Signal the loop to exit after its current pass
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| r.load(Ordering::SeqCst))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
