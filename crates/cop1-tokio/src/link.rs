use cop1_core::{FopInput, TransferFrame};
use tokio::{
    sync::mpsc::{UnboundedSender, WeakUnboundedSender, unbounded_channel},
    task::spawn_blocking,
};
use tracing::{debug, warn};

use crate::engine::Command;

/// Hands frames to the physical/link layer.
///
/// `transmit` may block; it runs on the blocking pool, never on the engine task. The return
/// value tells the FOP whether the lower layer accepted the frame.
pub trait LinkSink: Send + Sync + 'static {
    /// Sends one frame and returns `true` if the lower layer took it.
    fn transmit(&self, frame: &TransferFrame) -> bool;
}

impl<F> LinkSink for F
where
    F: Fn(&TransferFrame) -> bool + Send + Sync + 'static,
{
    fn transmit(&self, frame: &TransferFrame) -> bool {
        self(frame)
    }
}

/// Starts the link-output worker and returns the queue feeding it.
///
/// The worker stops once the queue is closed or the engine is gone.
pub(crate) fn spawn_worker(
    vcid: u8,
    sink: impl LinkSink,
    engine: WeakUnboundedSender<Command>,
) -> UnboundedSender<TransferFrame> {
    let (tx, mut rx) = unbounded_channel::<TransferFrame>();
    spawn_blocking(move || {
        while let Some(frame) = rx.blocking_recv() {
            let accepted = sink.transmit(&frame);
            if accepted {
                debug!(vcid, "link layer accepted {frame}");
            } else {
                warn!(vcid, "link layer rejected {frame}");
            }
            let Some(engine) = engine.upgrade() else {
                break;
            };
            if engine
                .send(Command::Input(FopInput::LowerLayer { frame, accepted }))
                .is_err()
            {
                break;
            }
        }
        debug!(vcid, "link worker stopped");
    });
    tx
}
