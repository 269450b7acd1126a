use std::{fmt::Display, time::Duration};

use crate::{EventNumber, FopDirective, TransferFrame};

/// The six FOP-1 states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FopState {
    /// S1
    Active,
    /// S2
    RetransmitWithoutWait,
    /// S3
    RetransmitWithWait,
    /// S4
    InitialisingWithoutBc,
    /// S5
    InitialisingWithBc,
    /// S6
    Initial,
}
impl FopState {
    /// State number 1..=6. S1..S4 are also the suspend state codes.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Active => 1,
            Self::RetransmitWithoutWait => 2,
            Self::RetransmitWithWait => 3,
            Self::InitialisingWithoutBc => 4,
            Self::InitialisingWithBc => 5,
            Self::Initial => 6,
        }
    }
}

impl Display for FopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{} ({self:?})", self.code())
    }
}

/// Reason given with an alert.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlertCode {
    /// CLCW inconsistent with the sent frames.
    Synch,
    /// CLCW with an invalid flag combination.
    Clcw,
    /// Transmission limit reached.
    Limit,
    /// N(R) outside the valid range.
    NnR,
    /// FARM lockout.
    Lockout,
    /// Timer T1 exhausted.
    T1,
    /// Lower layer rejected a frame.
    Llif,
    /// AD service terminated by directive.
    Term,
}

impl Display for AlertCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::Synch => "SYNCH",
            Self::Clcw => "CLCW",
            Self::Limit => "LIMIT",
            Self::NnR => "NN_R",
            Self::Lockout => "LOCKOUT",
            Self::T1 => "T1",
            Self::Llif => "LLIF",
            Self::Term => "TERM",
        };
        f.write_str(code)
    }
}

/// Response delivered to the originator of a request or directive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FopResponse {
    /// The FOP took the request on.
    Accept,
    /// The FOP refused the request; nothing was sent.
    Reject,
    /// The request completed: frame acknowledged or directive done.
    PositiveConfirm,
    /// The request was given up on.
    NegativeConfirm,
}

/// Snapshot of the FOP taken after an event was processed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FopStatus {
    /// NN(R), the N(S) of the oldest unacknowledged AD frame.
    pub expected_ack: u8,
    /// Frames sent and not yet acknowledged.
    pub sent_queue_len: usize,
    /// An AD frame is held in the Wait Queue.
    pub wait_queue_full: bool,
    /// AD_Out_Flag: the lower layer took the last AD frame.
    pub ad_out_ready: bool,
    /// BC_Out_Flag: the lower layer took the last BC frame.
    pub bc_out_ready: bool,
    /// BD_Out_Flag: the lower layer took the last BD frame.
    pub bd_out_ready: bool,
    /// State before the event.
    pub previous_state: FopState,
    /// State after the event.
    pub current_state: FopState,
    /// `None` for the snapshot taken at start-up.
    pub event: Option<EventNumber>,
}

/// Record emitted by the FOP for its observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FopNotification {
    /// Outcome of a frame request.
    Transfer {
        /// What happened to the frame.
        response: FopResponse,
        /// The frame as the FOP holds it, with N(S) once admitted.
        frame: TransferFrame,
    },
    /// Outcome of a directive; `tag` is the one it was submitted with.
    Directive {
        /// What happened to the directive.
        response: FopResponse,
        /// The tag the directive was submitted with.
        tag: u64,
        /// The directive itself.
        directive: FopDirective,
    },
    /// The AD service was aborted and the FOP is back in S6.
    Alert(AlertCode),
    /// The AD service was suspended and can be resumed.
    Suspend,
    /// Snapshot after an event that was not ignored.
    Status(FopStatus),
}

/// Side effect requested by the FOP from whoever drives it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FopOutput {
    /// Hand the frame to the link layer and report back accept or reject.
    Transmit(TransferFrame),
    /// (Re)start timer T1, cancelling any pending expiry.
    StartTimer(Duration),
    /// Stop timer T1.
    CancelTimer,
    Notify(FopNotification),
}
