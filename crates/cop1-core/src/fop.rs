use statig::{
    Response, StateOrSuperstate,
    prelude::{InitializedStateMachine, IntoStateMachineExt as _},
    state_machine,
};
use tracing::{debug, trace};

use crate::{
    AlertCode, EventNumber as E, FopContext, FopEvent, FopInput, FopNotification, FopState,
    FopStatus,
};

/// A FOP-1 instance: the state machine of CCSDS 232.1 driven over a
/// [`FopContext`].
///
/// `Fop` performs no I/O. Feed it inputs with [`Fop::handle`] and drain the
/// resulting outputs from the context.
#[derive(Debug)]
pub struct Fop(InitializedStateMachine<FopMachine>);
impl Fop {
    /// Starts in S6; the AD service needs one of the `InitAd*` directives.
    pub fn new(ctx: &mut FopContext) -> Self {
        let sm = FopMachine { vcid: ctx.vcid() }
            .uninitialized_state_machine()
            .init_with_context(ctx);
        Self(sm)
    }

    /// The state the last event left the machine in.
    #[must_use]
    pub fn state(&self) -> FopState {
        self.0.state().into()
    }

    /// Snapshot of the current state, not tied to an event.
    #[must_use]
    pub fn status(&self, ctx: &FopContext) -> FopStatus {
        ctx.status(self.state(), self.state(), None)
    }

    /// Classifies `input`, runs it through the current state and queues a
    /// status snapshot unless the state ignored the event.
    ///
    /// Returns the event class, or `None` if the input never reached the
    /// state machine.
    pub fn handle(&mut self, input: FopInput, ctx: &mut FopContext) -> Option<E> {
        let event = match FopEvent::classify(input, ctx) {
            Ok(event) => event,
            Err(FopInput::TransmitRequest(frame)) => {
                ctx.reject_frame(frame);
                return None;
            }
            Err(input) => {
                trace!(vcid = ctx.vcid(), "dropping {input:?}");
                return None;
            }
        };
        let previous = self.state();
        ctx.begin_dispatch();
        self.0.handle_with_context(&event, ctx);
        if !ctx.was_ignored() {
            let status = ctx.status(previous, self.state(), Some(event.number()));
            ctx.notify(FopNotification::Status(status));
        }
        Some(event.number())
    }
}

impl From<&State> for FopState {
    fn from(state: &State) -> Self {
        match state {
            State::Active {} => Self::Active,
            State::RetransmitWithoutWait {} => Self::RetransmitWithoutWait,
            State::RetransmitWithWait {} => Self::RetransmitWithWait,
            State::InitialisingWithoutBc {} => Self::InitialisingWithoutBc,
            State::InitialisingWithBc {} => Self::InitialisingWithBc,
            State::Initial {} => Self::Initial,
        }
    }
}

/// Storage of the `statig` machine; all protocol variables live in [`FopContext`].
#[derive(Debug, Clone)]
pub struct FopMachine {
    vcid: u8,
}

#[state_machine(
    initial = "State::initial()",
    before_dispatch = "Self::before_dispatch",
    after_transition = "Self::after_transition",
    state(derive(Clone, Debug, PartialEq, Eq)),
    superstate(derive(Clone, Debug))
)]
impl FopMachine {
    #[expect(clippy::needless_pass_by_value, reason = "due to macro")]
    fn before_dispatch(&mut self, state: StateOrSuperstate<State, Superstate>, event: &FopEvent) {
        trace!(
            vcid = self.vcid,
            "dispatching {} to `{:?}`",
            event.number(),
            state
        );
    }
    fn after_transition(&mut self, prev: &State, next: &State) {
        debug!(
            vcid = self.vcid,
            "transitioned from `{:?}` to `{:?}`", prev, next
        );
    }

    /// Behaviour shared by all six states: BD service, parameter setters,
    /// lower layer responses. Unhandled requests are rejected and unhandled
    /// CLCW or timer events ignored.
    #[superstate]
    fn common(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E21 => {
                context.transmit_bd(event);
                Response::Handled
            }
            E::E36 | E::E37 | E::E38 | E::E39 => {
                context.accept_directive(event);
                context.set_parameter(event);
                context.confirm_directive(event);
                Response::Handled
            }
            E::E41 => {
                context.set_ad_out_ready();
                Response::Handled
            }
            E::E43 => {
                context.set_bc_out_ready();
                Response::Handled
            }
            E::E45 => {
                context.confirm_bd(event, true);
                Response::Handled
            }
            E::E42 => {
                context.set_ad_out_ready();
                alert(context, AlertCode::Llif)
            }
            E::E44 => {
                context.set_bc_out_ready();
                alert(context, AlertCode::Llif)
            }
            E::E46 => {
                context.confirm_bd(event, false);
                alert(context, AlertCode::Llif)
            }
            number if number.is_link_status() => ignore(context, event),
            _ => {
                context.reject(event);
                Response::Handled
            }
        }
    }

    /// S1
    #[state(superstate = "common")]
    fn active(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E1 | E::E5 => ignore(context, event),
            E::E2 => {
                context.remove_acknowledged_frames(event);
                context.cancel_timer();
                context.look_for_fdu();
                Response::Handled
            }
            E::E3 | E::E7 => alert(context, AlertCode::Clcw),
            E::E4 => alert(context, AlertCode::Synch),
            E::E6 => {
                context.remove_acknowledged_frames(event);
                context.look_for_fdu();
                Response::Handled
            }
            E::E101 => {
                context.remove_acknowledged_frames(event);
                alert(context, AlertCode::Limit)
            }
            E::E102 | E::E12 | E::E103 => alert(context, AlertCode::Limit),
            E::E8 => {
                context.remove_acknowledged_frames(event);
                context.initiate_ad_retransmission();
                context.look_for_fdu();
                Response::Transition(State::retransmit_without_wait())
            }
            E::E9 => {
                context.remove_acknowledged_frames(event);
                Response::Transition(State::retransmit_with_wait())
            }
            E::E10 | E::E16 | E::E104 => {
                context.initiate_ad_retransmission();
                context.look_for_fdu();
                Response::Transition(State::retransmit_without_wait())
            }
            E::E11 => Response::Transition(State::retransmit_with_wait()),
            E::E13 => alert(context, AlertCode::NnR),
            E::E14 => alert(context, AlertCode::Lockout),
            E::E17 => alert(context, AlertCode::T1),
            E::E18 => suspend(context, FopState::Active),
            E::E19 => {
                context.add_to_wait_queue(event);
                context.look_for_fdu();
                Response::Handled
            }
            E::E29 => terminate(context, event),
            E::E41 => {
                context.set_ad_out_ready();
                context.look_for_fdu();
                Response::Handled
            }
            _ => Response::Super,
        }
    }

    /// S2
    #[state(superstate = "common")]
    fn retransmit_without_wait(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E1 | E::E4 => alert(context, AlertCode::Synch),
            E::E2 => {
                context.remove_acknowledged_frames(event);
                context.cancel_timer();
                context.look_for_fdu();
                Response::Transition(State::active())
            }
            E::E3 | E::E7 => alert(context, AlertCode::Clcw),
            E::E5 => {
                context.look_for_fdu();
                Response::Transition(State::active())
            }
            E::E6 => {
                context.remove_acknowledged_frames(event);
                context.look_for_fdu();
                Response::Transition(State::active())
            }
            E::E101 => {
                context.remove_acknowledged_frames(event);
                alert(context, AlertCode::Limit)
            }
            E::E102 | E::E103 => alert(context, AlertCode::Limit),
            E::E8 => {
                context.remove_acknowledged_frames(event);
                context.initiate_ad_retransmission();
                context.look_for_fdu();
                Response::Handled
            }
            E::E9 => {
                context.remove_acknowledged_frames(event);
                Response::Transition(State::retransmit_with_wait())
            }
            // retransmission already under way
            E::E10 | E::E12 => ignore(context, event),
            E::E11 => Response::Transition(State::retransmit_with_wait()),
            E::E13 => alert(context, AlertCode::NnR),
            E::E14 => alert(context, AlertCode::Lockout),
            E::E16 | E::E104 => {
                context.initiate_ad_retransmission();
                context.look_for_fdu();
                Response::Handled
            }
            E::E17 => alert(context, AlertCode::T1),
            E::E18 => suspend(context, FopState::RetransmitWithoutWait),
            E::E19 => {
                context.add_to_wait_queue(event);
                context.look_for_fdu();
                Response::Handled
            }
            E::E29 => terminate(context, event),
            E::E41 => {
                context.set_ad_out_ready();
                context.look_for_fdu();
                Response::Handled
            }
            _ => Response::Super,
        }
    }

    /// S3
    #[state(superstate = "common")]
    fn retransmit_with_wait(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E1 | E::E4 => alert(context, AlertCode::Synch),
            E::E2 => {
                context.remove_acknowledged_frames(event);
                context.cancel_timer();
                context.look_for_fdu();
                Response::Transition(State::active())
            }
            E::E3 | E::E7 => alert(context, AlertCode::Clcw),
            E::E5 => {
                context.look_for_fdu();
                Response::Transition(State::active())
            }
            E::E6 => {
                context.remove_acknowledged_frames(event);
                context.look_for_fdu();
                Response::Transition(State::active())
            }
            E::E101 => {
                context.remove_acknowledged_frames(event);
                alert(context, AlertCode::Limit)
            }
            E::E102 | E::E12 => alert(context, AlertCode::Limit),
            E::E8 => {
                context.remove_acknowledged_frames(event);
                context.initiate_ad_retransmission();
                context.look_for_fdu();
                Response::Transition(State::retransmit_without_wait())
            }
            E::E9 => {
                context.remove_acknowledged_frames(event);
                Response::Handled
            }
            E::E10 => {
                context.initiate_ad_retransmission();
                context.look_for_fdu();
                Response::Transition(State::retransmit_without_wait())
            }
            // the FARM asked us to wait
            E::E11 | E::E103 | E::E16 | E::E104 => ignore(context, event),
            E::E13 => alert(context, AlertCode::NnR),
            E::E14 => alert(context, AlertCode::Lockout),
            E::E17 => alert(context, AlertCode::T1),
            E::E18 => suspend(context, FopState::RetransmitWithWait),
            E::E19 => {
                context.add_to_wait_queue(event);
                Response::Handled
            }
            E::E29 => terminate(context, event),
            _ => Response::Super,
        }
    }

    /// S4
    #[state(superstate = "common")]
    fn initialising_without_bc(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E1 => {
                context.cancel_timer();
                context.confirm_pending_directive();
                Response::Transition(State::active())
            }
            E::E3 => alert(context, AlertCode::Clcw),
            E::E13 => alert(context, AlertCode::NnR),
            E::E14 => alert(context, AlertCode::Lockout),
            E::E16 | E::E17 => alert(context, AlertCode::T1),
            E::E104 | E::E18 => suspend(context, FopState::InitialisingWithoutBc),
            E::E29 => terminate(context, event),
            _ => Response::Super,
        }
    }

    /// S5
    #[state(superstate = "common")]
    fn initialising_with_bc(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E1 => {
                context.release_bc_frame();
                context.cancel_timer();
                context.confirm_pending_directive();
                Response::Transition(State::active())
            }
            E::E3 => alert(context, AlertCode::Clcw),
            E::E16 | E::E104 => {
                context.initiate_bc_retransmission();
                context.look_for_directive();
                Response::Handled
            }
            E::E17 | E::E18 => alert(context, AlertCode::T1),
            E::E29 => terminate(context, event),
            E::E43 => {
                context.set_bc_out_ready();
                context.look_for_directive();
                Response::Handled
            }
            _ => Response::Super,
        }
    }

    /// S6
    #[state(superstate = "common")]
    fn initial(context: &mut FopContext, event: &FopEvent) -> Response<State> {
        match event.number() {
            E::E23 => {
                context.accept_directive(event);
                context.initialise();
                context.confirm_directive(event);
                Response::Transition(State::active())
            }
            E::E24 => {
                context.accept_directive(event);
                context.initialise();
                context.hold_directive(event);
                context.start_timer();
                Response::Transition(State::initialising_without_bc())
            }
            E::E25 => {
                context.accept_directive(event);
                context.initialise();
                context.hold_directive(event);
                context.transmit_unlock();
                Response::Transition(State::initialising_with_bc())
            }
            E::E27 => {
                context.accept_directive(event);
                context.initialise();
                context.hold_directive(event);
                context.transmit_set_vr(event);
                Response::Transition(State::initialising_with_bc())
            }
            E::E29 => {
                context.accept_directive(event);
                context.confirm_directive(event);
                Response::Handled
            }
            E::E35 => {
                context.accept_directive(event);
                context.set_parameter(event);
                context.confirm_directive(event);
                Response::Handled
            }
            E::E31 => resume(context, event, State::active()),
            E::E32 => resume(context, event, State::retransmit_without_wait()),
            E::E33 => resume(context, event, State::retransmit_with_wait()),
            E::E34 => resume(context, event, State::initialising_without_bc()),
            _ => Response::Super,
        }
    }
}

fn ignore(context: &mut FopContext, event: &FopEvent) -> Response<State> {
    context.ignore(event);
    Response::Handled
}

fn alert(context: &mut FopContext, code: AlertCode) -> Response<State> {
    context.alert(code);
    Response::Transition(State::initial())
}

fn suspend(context: &mut FopContext, state: FopState) -> Response<State> {
    context.suspend(state);
    Response::Transition(State::initial())
}

fn terminate(context: &mut FopContext, event: &FopEvent) -> Response<State> {
    context.accept_directive(event);
    context.alert(AlertCode::Term);
    context.confirm_directive(event);
    Response::Transition(State::initial())
}

fn resume(context: &mut FopContext, event: &FopEvent, target: State) -> Response<State> {
    context.accept_directive(event);
    context.resume();
    context.confirm_directive(event);
    Response::Transition(target)
}
