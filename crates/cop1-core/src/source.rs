use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use crate::TransferFrame;

/// Hooks into the sending virtual channel.
///
/// The FOP reads and writes V(S) through this trait so the channel's own
/// frame counter never drifts from the protocol variable, and asks it for
/// the two control frames it may need to send.
pub trait FrameSource: Send {
    /// Current V(S), the N(S) the next AD frame will carry.
    fn next_sequence(&self) -> u8;
    /// Moves V(S), after admission of an AD frame or a Set V(S)/Set V(R).
    fn set_next_sequence(&mut self, value: u8);
    /// A BC frame carrying the Unlock control command.
    fn unlock_frame(&mut self) -> TransferFrame;
    /// A BC frame carrying Set V(R) to `value`.
    fn set_vr_frame(&mut self, value: u8) -> TransferFrame;
}

/// V(S) shared with the rest of the ground segment through an atomic.
///
/// Clones observe the same counter. Control frames carry the CCSDS 232.0
/// control command octets as their data field.
#[derive(Clone, Debug, Default)]
pub struct SharedCounter(Arc<AtomicU8>);
impl SharedCounter {
    const UNLOCK: &[u8] = &[0x00];
    const SET_VR: &[u8] = &[0x82, 0x00];

    /// A counter starting at V(S) = `initial`.
    #[must_use]
    pub fn new(initial: u8) -> Self {
        Self(Arc::new(AtomicU8::new(initial)))
    }

    /// Current V(S).
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

impl FrameSource for SharedCounter {
    fn next_sequence(&self) -> u8 {
        self.value()
    }

    fn set_next_sequence(&mut self, value: u8) {
        self.0.store(value, Ordering::Release);
    }

    fn unlock_frame(&mut self) -> TransferFrame {
        TransferFrame::bc(0, Self::UNLOCK)
    }

    fn set_vr_frame(&mut self, value: u8) -> TransferFrame {
        let mut command = Self::SET_VR.to_vec();
        command.push(value);
        TransferFrame::bc(value, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameType;

    #[test]
    fn clones_share_the_counter() {
        let mut counter = SharedCounter::new(5);
        let observer = counter.clone();
        counter.set_next_sequence(6);
        assert_eq!(observer.value(), 6);
    }

    #[test]
    fn control_commands() {
        let mut counter = SharedCounter::default();
        let unlock = counter.unlock_frame();
        assert_eq!(unlock.typ(), FrameType::Bc);
        assert_eq!(unlock.data(), &[0x00]);

        let set_vr = counter.set_vr_frame(200);
        assert_eq!(set_vr.typ(), FrameType::Bc);
        assert_eq!(set_vr.data(), &[0x82, 0x00, 200]);
        assert_eq!(set_vr.sequence(), 200);
    }
}
