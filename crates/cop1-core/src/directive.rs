use std::{fmt::Display, time::Duration};

/// Behaviour of the FOP when timer T1 expires with the transmission limit
/// reached.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TimeoutType {
    /// Timeout type 0: raise the T1 alert.
    #[default]
    Alert,
    /// Timeout type 1: suspend the AD service.
    Suspend,
}

/// Directives accepted by the FOP from the management function.
///
/// These correspond to the FOP-1 directives of CCSDS 232.1; the qualifier
/// of each directive travels in its variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FopDirective {
    /// Start the AD service without waiting for a CLCW.
    InitAdWithoutClcw,
    /// Start the AD service once a CLCW confirms V(R) = V(S).
    InitAdWithClcw,
    /// Start the AD service by sending an Unlock control command.
    InitAdWithUnlock,
    /// Start the AD service by sending Set V(R) with the given value.
    InitAdWithSetVr(u8),
    /// Stop the AD service.
    Terminate,
    /// Resume a suspended AD service.
    Resume,
    /// Set V(S) and NN(R) to the given value.
    SetVs(u8),
    /// Set the FOP sliding window width K.
    SetSlidingWindow(u8),
    /// Set the initial value of timer T1.
    SetT1Initial(Duration),
    /// Set the maximum number of transmissions per frame.
    SetTransmissionLimit(u32),
    /// Set the timeout type.
    SetTimeoutType(TimeoutType),
}
impl FopDirective {
    /// Whether the qualifier is in range for the directive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::SetSlidingWindow(k) => *k > 0,
            Self::SetT1Initial(t1) => !t1.is_zero(),
            Self::SetTransmissionLimit(limit) => *limit > 0,
            _ => true,
        }
    }
}

impl Display for FopDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitAdWithoutClcw => write!(f, "INIT_AD_WITHOUT_CLCW"),
            Self::InitAdWithClcw => write!(f, "INIT_AD_WITH_CLCW"),
            Self::InitAdWithUnlock => write!(f, "INIT_AD_WITH_UNLOCK"),
            Self::InitAdWithSetVr(vr) => write!(f, "INIT_AD_WITH_SET_V_R({vr})"),
            Self::Terminate => write!(f, "TERMINATE"),
            Self::Resume => write!(f, "RESUME"),
            Self::SetVs(vs) => write!(f, "SET_V_S({vs})"),
            Self::SetSlidingWindow(k) => write!(f, "SET_FOP_SLIDING_WINDOW({k})"),
            Self::SetT1Initial(t1) => write!(f, "SET_T1_INITIAL({}ms)", t1.as_millis()),
            Self::SetTransmissionLimit(limit) => write!(f, "SET_TRANSMISSION_LIMIT({limit})"),
            Self::SetTimeoutType(tt) => write!(f, "SET_TIMEOUT_TYPE({tt:?})"),
        }
    }
}
