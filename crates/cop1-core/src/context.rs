use std::{collections::VecDeque, fmt::Debug, time::Duration};

use tracing::{debug, trace, warn};

use crate::{
    AlertCode, EventNumber, FopConfig, FopDirective, FopEvent, FopNotification, FopOutput,
    FopResponse, FopState, FopStatus, FrameSource, FrameType, TimeoutType, TransferFrame,
    seq::less_than,
};

#[derive(Clone, Debug, PartialEq, Eq)]
struct SentEntry {
    frame: TransferFrame,
    retransmit: bool,
}

/// Protocol variables, queues and pending outputs of one FOP.
///
/// This is the context every state handler receives by unique reference.
/// Handlers mutate it through the actions below; whatever must happen
/// outside the machine (link hand-off, timer, notifications) is queued as
/// [`FopOutput`] and drained with [`FopContext::poll_output`].
pub struct FopContext {
    vcid: u8,
    frames: Box<dyn FrameSource>,
    sent_queue: VecDeque<SentEntry>,
    wait_queue: Option<TransferFrame>,
    /// Init directive waiting for its confirmation in S4/S5.
    pending_init: Option<(u64, FopDirective)>,
    expected_ack: u8,
    transmission_count: u32,
    transmission_limit: u32,
    timeout_type: TimeoutType,
    t1_initial: Duration,
    suspend_state: u8,
    sliding_window: u8,
    ad_out_ready: bool,
    bc_out_ready: bool,
    bd_out_ready: bool,
    ignored: bool,
    outputs: VecDeque<FopOutput>,
}

impl Debug for FopContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FopContext")
            .field("vcid", &self.vcid)
            .field("v_s", &self.frames.next_sequence())
            .field("nn_r", &self.expected_ack)
            .field("sent_queue", &self.sent_queue.len())
            .field("wait_queue", &self.wait_queue.is_some())
            .field("transmission_count", &self.transmission_count)
            .field("suspend_state", &self.suspend_state)
            .finish_non_exhaustive()
    }
}

impl FopContext {
    /// A context with both queues empty and NN(R) at the current V(S).
    pub fn new(config: FopConfig, frames: impl FrameSource + 'static) -> Self {
        let expected_ack = frames.next_sequence();
        Self {
            vcid: config.vcid,
            frames: Box::new(frames),
            sent_queue: VecDeque::new(),
            wait_queue: None,
            pending_init: None,
            expected_ack,
            transmission_count: 1,
            transmission_limit: config.transmission_limit,
            timeout_type: config.timeout_type,
            t1_initial: config.t1_initial,
            suspend_state: 0,
            sliding_window: config.sliding_window,
            ad_out_ready: true,
            bc_out_ready: true,
            bd_out_ready: true,
            ignored: false,
            outputs: VecDeque::new(),
        }
    }

    /// Next pending side effect, in the order the FOP requested them.
    pub fn poll_output(&mut self) -> Option<FopOutput> {
        self.outputs.pop_front()
    }

    /// Virtual channel served.
    #[must_use]
    pub fn vcid(&self) -> u8 {
        self.vcid
    }

    /// V(S), read through the frame source.
    #[must_use]
    pub fn next_sequence(&self) -> u8 {
        self.frames.next_sequence()
    }

    /// NN(R)
    #[must_use]
    pub fn expected_ack(&self) -> u8 {
        self.expected_ack
    }

    /// K
    #[must_use]
    pub fn sliding_window(&self) -> u8 {
        self.sliding_window
    }

    /// TC, transmissions of the oldest outstanding frame.
    #[must_use]
    pub fn transmission_count(&self) -> u32 {
        self.transmission_count
    }

    /// TL
    #[must_use]
    pub fn transmission_limit(&self) -> u32 {
        self.transmission_limit
    }

    /// TT
    #[must_use]
    pub fn timeout_type(&self) -> TimeoutType {
        self.timeout_type
    }

    /// Current T1 initial value.
    #[must_use]
    pub fn t1_initial(&self) -> Duration {
        self.t1_initial
    }

    /// SS: 0 when not suspended, otherwise the number of the state suspended from.
    #[must_use]
    pub fn suspend_state(&self) -> u8 {
        self.suspend_state
    }

    /// Number of frames in the Sent Queue.
    #[must_use]
    pub fn sent_queue_len(&self) -> usize {
        self.sent_queue.len()
    }

    /// Whether an AD frame is held in the Wait Queue.
    #[must_use]
    pub fn wait_queue_full(&self) -> bool {
        self.wait_queue.is_some()
    }

    /// The AD frame held in the Wait Queue.
    #[must_use]
    pub fn waiting_frame(&self) -> Option<&TransferFrame> {
        self.wait_queue.as_ref()
    }

    /// AD_Out_Flag
    #[must_use]
    pub fn ad_out_ready(&self) -> bool {
        self.ad_out_ready
    }

    /// BC_Out_Flag
    #[must_use]
    pub fn bc_out_ready(&self) -> bool {
        self.bc_out_ready
    }

    /// BD_Out_Flag
    #[must_use]
    pub fn bd_out_ready(&self) -> bool {
        self.bd_out_ready
    }

    pub(crate) fn status(
        &self,
        previous_state: FopState,
        current_state: FopState,
        event: Option<EventNumber>,
    ) -> FopStatus {
        FopStatus {
            expected_ack: self.expected_ack,
            sent_queue_len: self.sent_queue.len(),
            wait_queue_full: self.wait_queue.is_some(),
            ad_out_ready: self.ad_out_ready,
            bc_out_ready: self.bc_out_ready,
            bd_out_ready: self.bd_out_ready,
            previous_state,
            current_state,
            event,
        }
    }

    pub(crate) fn begin_dispatch(&mut self) {
        self.ignored = false;
    }

    pub(crate) fn was_ignored(&self) -> bool {
        self.ignored
    }

    pub(crate) fn notify(&mut self, notification: FopNotification) {
        self.outputs.push_back(FopOutput::Notify(notification));
    }

    fn notify_frame(&mut self, response: FopResponse, frame: TransferFrame) {
        trace!(vcid = self.vcid, "{response:?} for {frame}");
        self.notify(FopNotification::Transfer { response, frame });
    }

    fn notify_directive(&mut self, response: FopResponse, tag: u64, directive: FopDirective) {
        trace!(vcid = self.vcid, "{response:?} for directive {directive} ({tag})");
        self.notify(FopNotification::Directive {
            response,
            tag,
            directive,
        });
    }

    pub(crate) fn start_timer(&mut self) {
        self.outputs
            .push_back(FopOutput::StartTimer(self.t1_initial));
    }

    pub(crate) fn cancel_timer(&mut self) {
        self.outputs.push_back(FopOutput::CancelTimer);
    }

    fn pass_to_lower_layer(&mut self, frame: TransferFrame) {
        debug!(vcid = self.vcid, "transmitting {frame}");
        self.outputs.push_back(FopOutput::Transmit(frame));
    }
}

// Actions invoked by the state handlers.
impl FopContext {
    pub(crate) fn ignore(&mut self, event: &FopEvent) {
        trace!(vcid = self.vcid, "ignoring {}", event.number());
        self.ignored = true;
    }

    pub(crate) fn reject(&mut self, event: &FopEvent) {
        warn!(vcid = self.vcid, "rejecting request ({})", event.number());
        if let Some((tag, directive)) = event.directive() {
            self.notify_directive(FopResponse::Reject, tag, directive.clone());
        } else if let Some(frame) = event.frame() {
            self.notify_frame(FopResponse::Reject, frame.clone());
        }
    }

    /// Reject a BC frame handed in by a user, which only the FOP may create.
    pub(crate) fn reject_frame(&mut self, frame: TransferFrame) {
        warn!(vcid = self.vcid, "rejecting user-supplied {frame}");
        self.notify_frame(FopResponse::Reject, frame);
    }

    pub(crate) fn accept_directive(&mut self, event: &FopEvent) {
        if let Some((tag, directive)) = event.directive() {
            self.notify_directive(FopResponse::Accept, tag, directive.clone());
        }
    }

    pub(crate) fn confirm_directive(&mut self, event: &FopEvent) {
        if let Some((tag, directive)) = event.directive() {
            self.notify_directive(FopResponse::PositiveConfirm, tag, directive.clone());
        }
    }

    /// Remember the init directive being processed until S4/S5 resolves it.
    pub(crate) fn hold_directive(&mut self, event: &FopEvent) {
        if let Some((tag, directive)) = event.directive() {
            self.pending_init = Some((tag, directive.clone()));
        }
    }

    pub(crate) fn confirm_pending_directive(&mut self) {
        if let Some((tag, directive)) = self.pending_init.take() {
            self.notify_directive(FopResponse::PositiveConfirm, tag, directive);
        }
    }

    pub(crate) fn set_parameter(&mut self, event: &FopEvent) {
        let Some((_, directive)) = event.directive() else {
            return;
        };
        match *directive {
            FopDirective::SetSlidingWindow(k) => self.sliding_window = k,
            FopDirective::SetT1Initial(t1) => self.t1_initial = t1,
            FopDirective::SetTransmissionLimit(limit) => self.transmission_limit = limit,
            FopDirective::SetTimeoutType(tt) => self.timeout_type = tt,
            FopDirective::SetVs(vs) => self.set_vs_and_expected_ack(vs),
            _ => (),
        }
        debug!(vcid = self.vcid, "{directive} applied");
    }

    pub(crate) fn set_vs_and_expected_ack(&mut self, value: u8) {
        self.frames.set_next_sequence(value);
        self.expected_ack = value;
    }

    pub(crate) fn add_to_wait_queue(&mut self, event: &FopEvent) {
        if let Some(frame) = event.frame() {
            self.wait_queue = Some(frame.clone());
        }
    }

    pub(crate) fn transmit_bd(&mut self, event: &FopEvent) {
        let Some(frame) = event.frame() else {
            return;
        };
        self.notify_frame(FopResponse::Accept, frame.clone());
        self.bd_out_ready = false;
        self.pass_to_lower_layer(frame.clone());
    }

    /// Outcome of a BD frame reported by the lower layer.
    pub(crate) fn confirm_bd(&mut self, event: &FopEvent, accepted: bool) {
        self.bd_out_ready = true;
        if let Some(frame) = event.frame() {
            let response = if accepted {
                FopResponse::PositiveConfirm
            } else {
                FopResponse::NegativeConfirm
            };
            self.notify_frame(response, frame.clone());
        }
    }

    pub(crate) fn set_ad_out_ready(&mut self) {
        self.ad_out_ready = true;
    }

    pub(crate) fn set_bc_out_ready(&mut self) {
        self.bc_out_ready = true;
    }

    /// Transmit a pending retransmission or, window permitting, the frame in
    /// the Wait Queue.
    pub(crate) fn look_for_fdu(&mut self) {
        if !self.ad_out_ready {
            return;
        }
        if let Some(entry) = self
            .sent_queue
            .iter_mut()
            .find(|e| e.retransmit && e.frame.typ() == FrameType::Ad)
        {
            entry.retransmit = false;
            let frame = entry.frame.clone();
            self.ad_out_ready = false;
            self.pass_to_lower_layer(frame);
            return;
        }
        if self.sent_queue.len() < usize::from(self.sliding_window) {
            if let Some(frame) = self.wait_queue.take() {
                self.transmit_ad(frame);
            }
        }
    }

    fn transmit_ad(&mut self, mut frame: TransferFrame) {
        let vs = self.frames.next_sequence();
        frame.stamp(vs);
        self.frames.set_next_sequence(vs.wrapping_add(1));
        self.notify_frame(FopResponse::Accept, frame.clone());
        if self.sent_queue.is_empty() {
            self.transmission_count = 1;
        }
        self.sent_queue.push_back(SentEntry {
            frame: frame.clone(),
            retransmit: false,
        });
        self.start_timer();
        self.ad_out_ready = false;
        self.pass_to_lower_layer(frame);
    }

    pub(crate) fn look_for_directive(&mut self) {
        if !self.bc_out_ready {
            return;
        }
        if let Some(entry) = self
            .sent_queue
            .iter_mut()
            .find(|e| e.retransmit && e.frame.typ() == FrameType::Bc)
        {
            entry.retransmit = false;
            let frame = entry.frame.clone();
            self.bc_out_ready = false;
            self.pass_to_lower_layer(frame);
        }
    }

    pub(crate) fn transmit_bc(&mut self, frame: TransferFrame) {
        self.sent_queue.push_back(SentEntry {
            frame: frame.clone(),
            retransmit: false,
        });
        self.transmission_count = 1;
        self.start_timer();
        self.bc_out_ready = false;
        self.pass_to_lower_layer(frame);
    }

    pub(crate) fn transmit_unlock(&mut self) {
        let frame = self.frames.unlock_frame();
        self.transmit_bc(frame);
    }

    /// V(S) := NN(R) := V*(R), then send Set V(R) to the FARM.
    pub(crate) fn transmit_set_vr(&mut self, event: &FopEvent) {
        let Some((_, &FopDirective::InitAdWithSetVr(vr))) = event.directive() else {
            return;
        };
        self.set_vs_and_expected_ack(vr);
        let frame = self.frames.set_vr_frame(vr);
        self.transmit_bc(frame);
    }

    pub(crate) fn release_bc_frame(&mut self) {
        self.sent_queue.retain(|e| e.frame.typ() != FrameType::Bc);
    }

    pub(crate) fn initiate_ad_retransmission(&mut self) {
        self.transmission_count += 1;
        self.start_timer();
        for entry in &mut self.sent_queue {
            if entry.frame.typ() == FrameType::Ad {
                entry.retransmit = true;
            }
        }
        debug!(
            vcid = self.vcid,
            "AD retransmission #{} of {} frames",
            self.transmission_count,
            self.sent_queue.len()
        );
    }

    pub(crate) fn initiate_bc_retransmission(&mut self) {
        self.transmission_count += 1;
        self.start_timer();
        for entry in &mut self.sent_queue {
            if entry.frame.typ() == FrameType::Bc {
                entry.retransmit = true;
            }
        }
    }

    /// Positively confirm every frame up to and including N(R).
    pub(crate) fn remove_acknowledged_frames(&mut self, event: &FopEvent) {
        let Some(nr) = event.clcw().map(|c| c.report_value) else {
            return;
        };
        while let Some(entry) = self.sent_queue.front() {
            let sequence = entry.frame.sequence();
            let acknowledged = entry.frame.typ() == FrameType::Ad
                && (sequence == nr || less_than(sequence, nr, self.sliding_window));
            if !acknowledged {
                break;
            }
            if let Some(entry) = self.sent_queue.pop_front() {
                self.expected_ack = sequence.wrapping_add(1);
                self.transmission_count = 1;
                self.notify_frame(FopResponse::PositiveConfirm, entry.frame);
            }
        }
        if self.sent_queue.is_empty() {
            self.cancel_timer();
        }
    }

    fn purge_sent_queue(&mut self) {
        for entry in std::mem::take(&mut self.sent_queue) {
            if entry.frame.typ() == FrameType::Ad {
                self.notify_frame(FopResponse::NegativeConfirm, entry.frame);
            }
        }
        // a BC frame in flight belongs to the init directive
        if let Some((tag, directive)) = self.pending_init.take() {
            self.notify_directive(FopResponse::NegativeConfirm, tag, directive);
        }
    }

    fn purge_wait_queue(&mut self) {
        if let Some(frame) = self.wait_queue.take() {
            self.notify_frame(FopResponse::Reject, frame);
        }
    }

    pub(crate) fn initialise(&mut self) {
        self.purge_sent_queue();
        self.purge_wait_queue();
        self.transmission_count = 1;
        self.suspend_state = 0;
        self.expected_ack = self.frames.next_sequence();
    }

    pub(crate) fn alert(&mut self, code: AlertCode) {
        warn!(vcid = self.vcid, "FOP alert {code}");
        self.cancel_timer();
        self.purge_sent_queue();
        self.purge_wait_queue();
        self.notify(FopNotification::Alert(code));
    }

    pub(crate) fn suspend(&mut self, state: FopState) {
        warn!(vcid = self.vcid, "AD service suspended in {state}");
        self.suspend_state = state.code();
        self.notify(FopNotification::Suspend);
    }

    pub(crate) fn resume(&mut self) {
        debug!(
            vcid = self.vcid,
            "AD service resumed (SS={})", self.suspend_state
        );
        self.start_timer();
        self.suspend_state = 0;
    }

    /// Final purge before the engine is torn down.
    pub fn dispose(&mut self) {
        self.cancel_timer();
        self.purge_sent_queue();
        self.purge_wait_queue();
    }
}

#[cfg(test)]
impl FopContext {
    pub(crate) fn force_expected_ack(&mut self, value: u8) {
        self.expected_ack = value;
    }

    pub(crate) fn force_next_sequence(&mut self, value: u8) {
        self.frames.set_next_sequence(value);
    }

    pub(crate) fn force_transmission_count(&mut self, value: u32) {
        self.transmission_count = value;
    }

    pub(crate) fn force_timeout_type(&mut self, value: TimeoutType) {
        self.timeout_type = value;
    }
}
