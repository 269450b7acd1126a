use std::fmt::Display;

use crate::{
    Clcw, FopContext, FopDirective, FrameType, TimeoutType, TransferFrame,
    seq::{greater_or_equal, less_than},
};

/// Raw inputs to the FOP, before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FopInput {
    /// A CLCW was received on the return link.
    Clcw(Clcw),
    /// Request to transmit an AD or BD frame.
    TransmitRequest(TransferFrame),
    /// A directive from the management function.
    Directive {
        /// Echoed in every notification about this directive.
        tag: u64,
        /// The directive to run.
        directive: FopDirective,
    },
    /// Timer T1 expired.
    TimerExpired,
    /// The lower layer accepted or rejected a frame handed to it.
    LowerLayer {
        /// The frame the outcome is about.
        frame: TransferFrame,
        /// `false` if the lower layer refused the frame.
        accepted: bool,
    },
}

/// FOP-1 event classes as numbered in CCSDS 232.1-B-2, Table 5-1.
///
/// E15 has no assignment in that edition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventNumber {
    /// CLCW: N(R) = V(S), R=0, W=0, N(R) = NN(R)
    E1,
    /// CLCW: N(R) = V(S), R=0, W=0, N(R) != NN(R)
    E2,
    /// CLCW: N(R) = V(S), R=0, W=1
    E3,
    /// CLCW: N(R) = V(S), R=1
    E4,
    /// CLCW: NN(R) <= N(R) < V(S), R=0, W=0, N(R) = NN(R)
    E5,
    /// CLCW: NN(R) <= N(R) < V(S), R=0, W=0, N(R) != NN(R)
    E6,
    /// CLCW: NN(R) <= N(R) < V(S), R=0, W=1
    E7,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL = 1, N(R) != NN(R)
    E101,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL = 1, N(R) = NN(R)
    E102,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL > 1, N(R) != NN(R), W=0
    E8,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL > 1, N(R) != NN(R), W=1
    E9,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL > 1, N(R) = NN(R), TC < TL, W=0
    E10,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL > 1, N(R) = NN(R), TC < TL, W=1
    E11,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL > 1, N(R) = NN(R), TC >= TL, W=0
    E12,
    /// CLCW: NN(R) <= N(R) < V(S), R=1, TL > 1, N(R) = NN(R), TC >= TL, W=1
    E103,
    /// CLCW: N(R) outside NN(R)..=V(S)
    E13,
    /// CLCW: lockout
    E14,
    /// T1 expired, TC < TL, timeout type 0
    E16,
    /// T1 expired, TC < TL, timeout type 1
    E104,
    /// T1 expired, TC >= TL, timeout type 0
    E17,
    /// T1 expired, TC >= TL, timeout type 1
    E18,
    /// AD request, Wait Queue empty
    E19,
    /// AD request, Wait Queue occupied
    E20,
    /// BD request, BD_Out ready
    E21,
    /// BD request, BD_Out not ready
    E22,
    /// Initiate AD service without CLCW check
    E23,
    /// Initiate AD service with CLCW check
    E24,
    /// Initiate AD service with Unlock, BC_Out ready
    E25,
    /// Initiate AD service with Unlock, BC_Out not ready
    E26,
    /// Initiate AD service with Set V(R), BC_Out ready
    E27,
    /// Initiate AD service with Set V(R), BC_Out not ready
    E28,
    /// Terminate AD service
    E29,
    /// Resume AD service, SS = 0
    E30,
    /// Resume AD service, SS = 1
    E31,
    /// Resume AD service, SS = 2
    E32,
    /// Resume AD service, SS = 3
    E33,
    /// Resume AD service, SS = 4
    E34,
    /// Set V(S)
    E35,
    /// Set FOP sliding window width
    E36,
    /// Set T1 initial
    E37,
    /// Set transmission limit
    E38,
    /// Set timeout type
    E39,
    /// Invalid directive
    E40,
    /// AD frame accepted by the lower layer
    E41,
    /// AD frame rejected by the lower layer
    E42,
    /// BC frame accepted by the lower layer
    E43,
    /// BC frame rejected by the lower layer
    E44,
    /// BD frame accepted by the lower layer
    E45,
    /// BD frame rejected by the lower layer
    E46,
}
impl EventNumber {
    /// Whether the event comes from a CLCW or from timer T1.
    #[must_use]
    pub fn is_link_status(self) -> bool {
        matches!(
            self,
            Self::E1
                | Self::E2
                | Self::E3
                | Self::E4
                | Self::E5
                | Self::E6
                | Self::E7
                | Self::E101
                | Self::E102
                | Self::E8
                | Self::E9
                | Self::E10
                | Self::E11
                | Self::E12
                | Self::E103
                | Self::E13
                | Self::E14
                | Self::E16
                | Self::E104
                | Self::E17
                | Self::E18
        )
    }
}

impl Display for EventNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A classified input, the only thing the state machine ever sees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FopEvent {
    number: EventNumber,
    input: FopInput,
}
impl FopEvent {
    /// The event class.
    #[must_use]
    pub fn number(&self) -> EventNumber {
        self.number
    }

    /// The input the event was classified from.
    #[must_use]
    pub fn input(&self) -> &FopInput {
        &self.input
    }

    pub(crate) fn frame(&self) -> Option<&TransferFrame> {
        match &self.input {
            FopInput::TransmitRequest(frame) | FopInput::LowerLayer { frame, .. } => Some(frame),
            _ => None,
        }
    }

    pub(crate) fn directive(&self) -> Option<(u64, &FopDirective)> {
        match &self.input {
            FopInput::Directive { tag, directive } => Some((*tag, directive)),
            _ => None,
        }
    }

    pub(crate) fn clcw(&self) -> Option<&Clcw> {
        match &self.input {
            FopInput::Clcw(clcw) => Some(clcw),
            _ => None,
        }
    }

    /// Classifies `input` against the current protocol variables.
    ///
    /// Inputs that never reach the state machine (CLCWs for another channel
    /// or another COP, BC frames submitted by a user) are handed back.
    pub(crate) fn classify(input: FopInput, ctx: &FopContext) -> Result<Self, FopInput> {
        let number = match &input {
            FopInput::Clcw(clcw) => {
                if clcw.cop_in_effect != crate::CopInEffect::Cop1 || clcw.vcid != ctx.vcid() {
                    return Err(input);
                }
                clcw_event(clcw, ctx)
            }
            FopInput::TransmitRequest(frame) => match frame.typ() {
                FrameType::Ad if ctx.wait_queue_full() => EventNumber::E20,
                FrameType::Ad => EventNumber::E19,
                FrameType::Bd if ctx.bd_out_ready() => EventNumber::E21,
                FrameType::Bd => EventNumber::E22,
                FrameType::Bc => return Err(input),
            },
            FopInput::Directive { directive, .. } => directive_event(directive, ctx),
            FopInput::TimerExpired => timer_event(ctx),
            FopInput::LowerLayer { frame, accepted } => match (frame.typ(), accepted) {
                (FrameType::Ad, true) => EventNumber::E41,
                (FrameType::Ad, false) => EventNumber::E42,
                (FrameType::Bc, true) => EventNumber::E43,
                (FrameType::Bc, false) => EventNumber::E44,
                (FrameType::Bd, true) => EventNumber::E45,
                (FrameType::Bd, false) => EventNumber::E46,
            },
        };
        Ok(Self { number, input })
    }
}

fn clcw_event(clcw: &Clcw, ctx: &FopContext) -> EventNumber {
    use EventNumber::*;

    let nr = clcw.report_value;
    let vs = ctx.next_sequence();
    let nn_r = ctx.expected_ack();
    let window = ctx.sliding_window();

    if clcw.lockout {
        return E14;
    }
    if nr == vs {
        return match (clcw.retransmit, clcw.wait) {
            (false, false) if nr == nn_r => E1,
            (false, false) => E2,
            (false, true) => E3,
            (true, _) => E4,
        };
    }
    if !(less_than(nr, vs, window) && greater_or_equal(nr, nn_r, window)) {
        return E13;
    }
    if !clcw.retransmit {
        return if clcw.wait {
            E7
        } else if nr == nn_r {
            E5
        } else {
            E6
        };
    }
    if ctx.transmission_limit() == 1 {
        return if nr == nn_r { E102 } else { E101 };
    }
    if nr != nn_r {
        return if clcw.wait { E9 } else { E8 };
    }
    match (ctx.transmission_count() < ctx.transmission_limit(), clcw.wait) {
        (true, false) => E10,
        (true, true) => E11,
        (false, false) => E12,
        (false, true) => E103,
    }
}

fn timer_event(ctx: &FopContext) -> EventNumber {
    match (
        ctx.transmission_count() < ctx.transmission_limit(),
        ctx.timeout_type(),
    ) {
        (true, TimeoutType::Alert) => EventNumber::E16,
        (true, TimeoutType::Suspend) => EventNumber::E104,
        (false, TimeoutType::Alert) => EventNumber::E17,
        (false, TimeoutType::Suspend) => EventNumber::E18,
    }
}

fn directive_event(directive: &FopDirective, ctx: &FopContext) -> EventNumber {
    if !directive.is_valid() {
        return EventNumber::E40;
    }
    match directive {
        FopDirective::InitAdWithoutClcw => EventNumber::E23,
        FopDirective::InitAdWithClcw => EventNumber::E24,
        FopDirective::InitAdWithUnlock if ctx.bc_out_ready() => EventNumber::E25,
        FopDirective::InitAdWithUnlock => EventNumber::E26,
        FopDirective::InitAdWithSetVr(_) if ctx.bc_out_ready() => EventNumber::E27,
        FopDirective::InitAdWithSetVr(_) => EventNumber::E28,
        FopDirective::Terminate => EventNumber::E29,
        FopDirective::Resume => match ctx.suspend_state() {
            0 => EventNumber::E30,
            1 => EventNumber::E31,
            2 => EventNumber::E32,
            3 => EventNumber::E33,
            4 => EventNumber::E34,
            // only 0..=4 are ever recorded
            _ => EventNumber::E40,
        },
        FopDirective::SetVs(_) => EventNumber::E35,
        FopDirective::SetSlidingWindow(_) => EventNumber::E36,
        FopDirective::SetT1Initial(_) => EventNumber::E37,
        FopDirective::SetTransmissionLimit(_) => EventNumber::E38,
        FopDirective::SetTimeoutType(_) => EventNumber::E39,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{FopConfig, SharedCounter};

    fn context(window: u8, limit: u32) -> FopContext {
        FopContext::new(
            FopConfig {
                vcid: 3,
                sliding_window: window,
                t1_initial: Duration::from_secs(1),
                transmission_limit: limit,
                timeout_type: TimeoutType::Alert,
            },
            SharedCounter::new(0),
        )
    }

    fn classify(ctx: &FopContext, clcw: Clcw) -> EventNumber {
        FopEvent::classify(FopInput::Clcw(clcw), ctx)
            .map(|e| e.number())
            .expect("CLCW classified")
    }

    #[test]
    fn lockout_wins_over_everything() {
        let ctx = context(10, 3);
        let clcw = Clcw::cop1(3, 0).with_lockout().with_retransmit().with_wait();
        assert_eq!(classify(&ctx, clcw), EventNumber::E14);
    }

    #[test]
    fn all_acknowledged_reports() {
        let mut ctx = context(10, 3);
        ctx.set_vs_and_expected_ack(20);
        assert_eq!(classify(&ctx, Clcw::cop1(3, 20)), EventNumber::E1);
        assert_eq!(classify(&ctx, Clcw::cop1(3, 20).with_wait()), EventNumber::E3);
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 20).with_retransmit()),
            EventNumber::E4
        );
        ctx.force_expected_ack(18);
        assert_eq!(classify(&ctx, Clcw::cop1(3, 20)), EventNumber::E2);
    }

    #[test]
    fn outstanding_frames_reports() {
        let mut ctx = context(10, 3);
        ctx.set_vs_and_expected_ack(250);
        ctx.force_next_sequence(4);
        // NN(R)=250, V(S)=4: valid N(R) are 250..=255, 0..=3
        assert_eq!(classify(&ctx, Clcw::cop1(3, 250)), EventNumber::E5);
        assert_eq!(classify(&ctx, Clcw::cop1(3, 2)), EventNumber::E6);
        assert_eq!(classify(&ctx, Clcw::cop1(3, 2).with_wait()), EventNumber::E7);
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 2).with_retransmit()),
            EventNumber::E8
        );
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 2).with_retransmit().with_wait()),
            EventNumber::E9
        );
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 250).with_retransmit()),
            EventNumber::E10
        );
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 250).with_retransmit().with_wait()),
            EventNumber::E11
        );
        assert_eq!(classify(&ctx, Clcw::cop1(3, 249)), EventNumber::E13);
        assert_eq!(classify(&ctx, Clcw::cop1(3, 5)), EventNumber::E13);
    }

    #[test]
    fn limit_reports() {
        let mut ctx = context(10, 1);
        ctx.set_vs_and_expected_ack(7);
        ctx.force_next_sequence(9);
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 8).with_retransmit()),
            EventNumber::E101
        );
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 7).with_retransmit()),
            EventNumber::E102
        );

        let mut ctx = context(10, 2);
        ctx.set_vs_and_expected_ack(7);
        ctx.force_next_sequence(9);
        ctx.force_transmission_count(2);
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 7).with_retransmit()),
            EventNumber::E12
        );
        assert_eq!(
            classify(&ctx, Clcw::cop1(3, 7).with_retransmit().with_wait()),
            EventNumber::E103
        );
    }

    #[test]
    fn foreign_reports_are_not_classified() {
        let ctx = context(10, 3);
        let other_vc = FopInput::Clcw(Clcw::cop1(4, 0));
        assert!(FopEvent::classify(other_vc, &ctx).is_err());
        let mut no_cop = Clcw::cop1(3, 0);
        no_cop.cop_in_effect = crate::CopInEffect::None;
        assert!(FopEvent::classify(FopInput::Clcw(no_cop), &ctx).is_err());
    }

    #[test]
    fn timer_expiry() {
        let mut ctx = context(10, 2);
        assert_eq!(timer_event(&ctx), EventNumber::E16);
        ctx.force_transmission_count(2);
        assert_eq!(timer_event(&ctx), EventNumber::E17);
        ctx.force_timeout_type(TimeoutType::Suspend);
        assert_eq!(timer_event(&ctx), EventNumber::E18);
        ctx.force_transmission_count(1);
        assert_eq!(timer_event(&ctx), EventNumber::E104);
    }

    #[test]
    fn directives() {
        let ctx = context(10, 2);
        let number = |directive| directive_event(&directive, &ctx);
        assert_eq!(number(FopDirective::InitAdWithUnlock), EventNumber::E25);
        assert_eq!(number(FopDirective::InitAdWithSetVr(9)), EventNumber::E27);
        assert_eq!(number(FopDirective::Resume), EventNumber::E30);
        assert_eq!(number(FopDirective::SetSlidingWindow(0)), EventNumber::E40);
        assert_eq!(number(FopDirective::SetSlidingWindow(5)), EventNumber::E36);
        assert_eq!(
            number(FopDirective::SetT1Initial(Duration::ZERO)),
            EventNumber::E40
        );
        assert_eq!(number(FopDirective::SetTransmissionLimit(0)), EventNumber::E40);
        assert_eq!(
            number(FopDirective::SetTimeoutType(TimeoutType::Suspend)),
            EventNumber::E39
        );
    }
}
