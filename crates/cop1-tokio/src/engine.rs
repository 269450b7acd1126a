use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
    time::Duration,
};

use anyhow::anyhow;
use cop1_core::{
    Clcw, Fop, FopConfig, FopContext, FopDirective, FopInput, FopNotification, FopOutput,
    FopResponse, FopStatus, FrameId, FrameSource, TransferFrame,
};
use tokio::{
    runtime::Handle,
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender, WeakUnboundedSender, unbounded_channel},
        oneshot,
    },
    time::timeout,
};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::{FopObserver, LinkSink, link, timer::Timer};

/// How long [`FopEngine::dispose`] waits for the final purge.
const DISPOSE_GRACE: Duration = Duration::from_secs(1);

/// Unit of work for the engine task.
pub(crate) enum Command {
    Input(FopInput),
    TransmitAndWait {
        frame: TransferFrame,
        reply: oneshot::Sender<bool>,
    },
    TimerExpired {
        generation: u64,
    },
    Register {
        id: Uuid,
        observer: Arc<dyn FopObserver>,
    },
    Deregister {
        id: Uuid,
    },
    Status {
        reply: oneshot::Sender<FopStatus>,
    },
    Dispose {
        done: oneshot::Sender<()>,
    },
}

/// The task owning one FOP and everything it touches.
struct Engine {
    vcid: u8,
    fop: Fop,
    ctx: FopContext,
    rx: UnboundedReceiver<Command>,
    link: UnboundedSender<TransferFrame>,
    timer: Timer,
    observers: HashMap<Uuid, Arc<dyn FopObserver>>,
    waiters: HashMap<FrameId, oneshot::Sender<bool>>,
    last_status: FopStatus,
}
impl Engine {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Input(input) => {
                    self.fop.handle(input, &mut self.ctx);
                }
                Command::TransmitAndWait { frame, reply } => {
                    match self.waiters.entry(frame.id()) {
                        Entry::Occupied(_) => {
                            debug!(vcid = self.vcid, "{frame} is already waiting for admission");
                            reply.send(false).ok();
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(reply);
                        }
                    }
                    self.fop
                        .handle(FopInput::TransmitRequest(frame), &mut self.ctx);
                }
                Command::TimerExpired { generation } => {
                    if self.timer.fire(generation) {
                        debug!(vcid = self.vcid, "T1 expired");
                        self.fop.handle(FopInput::TimerExpired, &mut self.ctx);
                    }
                }
                Command::Register { id, observer } => {
                    debug!(vcid = self.vcid, "{id}: observer registered");
                    self.observers.insert(id, observer);
                }
                Command::Deregister { id } => {
                    if self.observers.remove(&id).is_none() {
                        warn!(vcid = self.vcid, "{id}: no such observer");
                    }
                }
                Command::Status { reply } => {
                    reply.send(self.last_status).ok();
                }
                Command::Dispose { done } => {
                    self.ctx.dispose();
                    self.flush();
                    self.timer.cancel();
                    self.rx.close();
                    done.send(()).ok();
                    break;
                }
            }
            self.flush();
        }
        info!(vcid = self.vcid, "FOP engine stopped");
    }

    fn flush(&mut self) {
        while let Some(output) = self.ctx.poll_output() {
            match output {
                FopOutput::Transmit(frame) => {
                    if let Err(e) = self.link.send(frame) {
                        error!(vcid = self.vcid, "link worker gone, dropping {}", e.0);
                    }
                }
                FopOutput::StartTimer(duration) => self.timer.start(duration),
                FopOutput::CancelTimer => self.timer.cancel(),
                FopOutput::Notify(notification) => self.publish(&notification),
            }
        }
    }

    fn publish(&mut self, notification: &FopNotification) {
        match notification {
            FopNotification::Transfer {
                response: response @ (FopResponse::Accept | FopResponse::Reject),
                frame,
            } => {
                let held = self
                    .ctx
                    .waiting_frame()
                    .is_some_and(|waiting| waiting.id() == frame.id());
                if held {
                    trace!(vcid = self.vcid, "copy of held {frame} refused, original still waits");
                } else if let Some(waiter) = self.waiters.remove(&frame.id()) {
                    waiter.send(*response == FopResponse::Accept).ok();
                }
            }
            FopNotification::Status(status) => self.last_status = *status,
            _ => (),
        }
        trace!(vcid = self.vcid, "{notification:?}");
        for observer in self.observers.values() {
            observer.notify(notification);
        }
    }
}

/// Handle to the FOP engine of one virtual channel.
///
/// Cloning is cheap; all clones feed the same engine task. Every operation only enqueues a
/// command, so the handle can be used from any thread. Results of frame and directive
/// submissions arrive through the registered [`FopObserver`]s.
#[derive(Clone, Debug)]
pub struct FopEngine {
    vcid: u8,
    tx: UnboundedSender<Command>,
    runtime: Handle,
}

impl FopEngine {
    /// Starts the engine task and its link-output worker on the current runtime.
    ///
    /// The FOP starts in S6; issue one of the `InitAd*` directives before sending AD frames.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or if called outside a Tokio runtime.
    pub fn spawn(
        config: FopConfig,
        frames: impl FrameSource + 'static,
        link: impl LinkSink,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()?;
        let vcid = config.vcid;

        let (tx, rx) = unbounded_channel();
        let weak: WeakUnboundedSender<Command> = tx.downgrade();
        let mut ctx = FopContext::new(config, frames);
        let fop = Fop::new(&mut ctx);
        let last_status = fop.status(&ctx);
        let engine = Engine {
            vcid,
            fop,
            ctx,
            rx,
            link: link::spawn_worker(vcid, link, weak.clone()),
            timer: Timer::new(weak),
            observers: HashMap::new(),
            waiters: HashMap::new(),
            last_status,
        };
        runtime.spawn(engine.run());
        info!(vcid, "FOP engine started");

        Ok(Self { vcid, tx, runtime })
    }

    /// The virtual channel this engine serves.
    #[must_use]
    pub fn vcid(&self) -> u8 {
        self.vcid
    }

    fn send(&self, command: Command) -> anyhow::Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("engine for VC {} has been disposed", self.vcid))
    }

    /// Submits an AD or BD frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub fn transmit_frame(&self, frame: TransferFrame) -> anyhow::Result<()> {
        self.send(Command::Input(FopInput::TransmitRequest(frame)))
    }

    /// Submits a frame and waits until the FOP accepted or rejected it.
    ///
    /// Returns `false` on reject or if no answer came within `wait`. An AD frame held in the
    /// Wait Queue is only accepted once the window admits it. Waiting again on a frame (or a
    /// clone of it) that is already waited on returns `false` at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub async fn transmit_frame_and_wait(
        &self,
        frame: TransferFrame,
        wait: Duration,
    ) -> anyhow::Result<bool> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::TransmitAndWait { frame, reply })?;
        match timeout(wait, answer).await {
            Ok(Ok(accepted)) => Ok(accepted),
            Ok(Err(_)) => Err(anyhow!("engine for VC {} has been disposed", self.vcid)),
            Err(_) => {
                debug!(vcid = self.vcid, "no answer within {wait:?}");
                Ok(false)
            }
        }
    }

    /// Blocking variant of [`FopEngine::transmit_frame_and_wait`] for threads outside the
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn transmit_frame_blocking(
        &self,
        frame: TransferFrame,
        wait: Duration,
    ) -> anyhow::Result<bool> {
        self.runtime
            .block_on(self.transmit_frame_and_wait(frame, wait))
    }

    /// Submits a directive; `tag` is echoed in its notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub fn directive(&self, tag: u64, directive: FopDirective) -> anyhow::Result<()> {
        self.send(Command::Input(FopInput::Directive { tag, directive }))
    }

    /// Delivers a CLCW. Reports for other channels or other COPs are dropped by the FOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub fn clcw(&self, clcw: Clcw) -> anyhow::Result<()> {
        self.send(Command::Input(FopInput::Clcw(clcw)))
    }

    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub fn register_observer(&self, observer: impl FopObserver + 'static) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.send(Command::Register {
            id,
            observer: Arc::new(observer),
        })?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub fn deregister_observer(&self, id: Uuid) -> anyhow::Result<()> {
        self.send(Command::Deregister { id })
    }

    /// The latest status snapshot, taken after all previously submitted commands.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub async fn status(&self) -> anyhow::Result<FopStatus> {
        let (reply, status) = oneshot::channel();
        self.send(Command::Status { reply })?;
        status
            .await
            .map_err(|_| anyhow!("engine for VC {} has been disposed", self.vcid))
    }

    /// Cancels T1, purges both queues and stops the engine.
    ///
    /// Outstanding frames are negatively confirmed and the waiting frame rejected before the
    /// engine stops. Any later operation on this engine returns an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has already been disposed.
    pub async fn dispose(&self) -> anyhow::Result<()> {
        let (done, finished) = oneshot::channel();
        self.send(Command::Dispose { done })?;
        if timeout(DISPOSE_GRACE, finished).await.is_err() {
            warn!(vcid = self.vcid, "engine did not finish disposal in time");
        }
        Ok(())
    }
}
