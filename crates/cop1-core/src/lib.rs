//! Sans-I/O implementation of the COP-1 Frame Operation Procedure (FOP-1).

mod config;
mod context;
mod directive;
mod event;
mod fop;
mod frame;
pub mod seq;
mod source;
mod status;

pub use config::FopConfig;
pub use context::FopContext;
pub use directive::{FopDirective, TimeoutType};
pub use event::{EventNumber, FopEvent, FopInput};
pub use fop::{Fop, FopMachine, State};
pub use frame::{Clcw, CopInEffect, FrameId, FrameType, TransferFrame};
pub use source::{FrameSource, SharedCounter};
pub use status::{AlertCode, FopNotification, FopOutput, FopResponse, FopState, FopStatus};
