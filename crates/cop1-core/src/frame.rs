use std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// Service type of a telecommand transfer frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Sequence-controlled, acknowledged through the CLCW.
    Ad,
    /// Expedited, bypasses the FOP queues.
    Bd,
    /// Control command for the FARM (Unlock, Set V(R)).
    Bc,
}

/// Process-unique identity of a submitted frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

/// A telecommand transfer frame as seen by the FOP.
///
/// The data field is opaque: encoding the frame onto the wire is the job of
/// the link sink. AD frames are numbered by the FOP when they leave the
/// Wait Queue, so a caller builds them without a sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferFrame {
    id: FrameId,
    typ: FrameType,
    sequence: u8,
    data: Vec<u8>,
}
impl TransferFrame {
    fn new(typ: FrameType, sequence: u8, data: Vec<u8>) -> Self {
        Self {
            id: FrameId(NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed)),
            typ,
            sequence,
            data,
        }
    }

    /// A sequence-controlled frame; N(S) is assigned on admission.
    pub fn ad(data: impl Into<Vec<u8>>) -> Self {
        Self::new(FrameType::Ad, 0, data.into())
    }

    /// An expedited frame.
    pub fn bd(data: impl Into<Vec<u8>>) -> Self {
        Self::new(FrameType::Bd, 0, data.into())
    }

    /// A control frame carrying a FARM control command.
    pub fn bc(sequence: u8, data: impl Into<Vec<u8>>) -> Self {
        Self::new(FrameType::Bc, sequence, data.into())
    }

    /// Identity that survives stamping and cloning.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// AD, BD or BC.
    #[must_use]
    pub fn typ(&self) -> FrameType {
        self.typ
    }

    /// N(S) for AD frames, the value carried by BC frames, 0 for BD.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// The opaque data field.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn stamp(&mut self, sequence: u8) {
        self.sequence = sequence;
    }
}

impl Display for TransferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.typ {
            FrameType::Bd => write!(f, "BD frame #{} ({} bytes)", self.id.0, self.data.len()),
            typ => write!(
                f,
                "{typ:?} frame #{} N(S)={} ({} bytes)",
                self.id.0,
                self.sequence,
                self.data.len()
            ),
        }
    }
}

/// The "COP in effect" field of a CLCW.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CopInEffect {
    /// No COP, the CLCW carries nothing for the FOP.
    None,
    /// COP-1, the only value the FOP acts on.
    Cop1,
    /// Any other value of the two-bit field.
    Reserved(u8),
}

/// Communications Link Control Word, the FARM's report to the FOP.
///
/// Only the fields the FOP looks at are modelled; decoding the 32-bit word
/// happens in the transport.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Clcw {
    /// Reports are only acted on with COP-1 in effect.
    pub cop_in_effect: CopInEffect,
    /// Virtual channel the report is about.
    pub vcid: u8,
    /// The FARM is in lockout and discards AD frames.
    pub lockout: bool,
    /// The FARM cannot take more AD frames for now.
    pub wait: bool,
    /// The FARM saw a gap and wants retransmission.
    pub retransmit: bool,
    /// N(R), the report value.
    pub report_value: u8,
}
impl Clcw {
    /// A COP-1 report for `vcid` with all flags cleared.
    #[must_use]
    pub fn cop1(vcid: u8, report_value: u8) -> Self {
        Self {
            cop_in_effect: CopInEffect::Cop1,
            vcid,
            lockout: false,
            wait: false,
            retransmit: false,
            report_value,
        }
    }

    /// Sets the lockout flag.
    #[must_use]
    pub fn with_lockout(mut self) -> Self {
        self.lockout = true;
        self
    }

    /// Sets the wait flag.
    #[must_use]
    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    /// Sets the retransmit flag.
    #[must_use]
    pub fn with_retransmit(mut self) -> Self {
        self.retransmit = true;
        self
    }
}
