use std::time::Duration;

use tokio::{
    spawn,
    sync::mpsc::WeakUnboundedSender,
    task::JoinHandle,
    time::sleep,
};
use tracing::trace;

use crate::engine::Command;

/// Timer T1 of one engine.
///
/// Every start or cancel bumps the generation; an expiry only counts if it carries the
/// generation of the currently armed timer, so an expiry queued just before a restart is
/// discarded.
#[derive(Debug)]
pub(crate) struct Timer {
    generation: u64,
    task: Option<JoinHandle<()>>,
    engine: WeakUnboundedSender<Command>,
}
impl Timer {
    pub(crate) fn new(engine: WeakUnboundedSender<Command>) -> Self {
        Self {
            generation: 0,
            task: None,
            engine,
        }
    }

    pub(crate) fn start(&mut self, duration: Duration) {
        self.cancel();
        let generation = self.generation;
        let engine = self.engine.clone();
        self.task = Some(spawn(async move {
            sleep(duration).await;
            if let Some(engine) = engine.upgrade() {
                engine.send(Command::TimerExpired { generation }).ok();
            }
        }));
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }

    /// Whether an expiry of `generation` is the one of the armed timer; disarms it if so.
    pub(crate) fn fire(&mut self, generation: u64) -> bool {
        if self.task.is_some() && generation == self.generation {
            self.task = None;
            true
        } else {
            trace!("discarding stale T1 expiry {generation}");
            false
        }
    }
}
