use nix::errno::Errno;

use crate::errors::{Error, Result};
use crate::flags::FlagSet;
use crate::uapi::v1::{GPIOEVENT_REQUEST_FLAGS, GPIOHANDLE_REQUEST_FLAGS};

int_enum! {
    /// What a line is requested for.
    pub enum RequestType as "request type" {
        /// Keep the direction the line already has
        DirectionAsIs = 1,
        DirectionInput = 2,
        DirectionOutput = 3,
        EventFallingEdge = 4,
        EventRisingEdge = 5,
        EventBothEdges = 6,
    }
}

impl Default for RequestType {
    fn default() -> Self {
        Self::DirectionAsIs
    }
}

impl RequestType {
    pub fn is_event(self) -> bool {
        self.event_flags().is_some()
    }

    pub(crate) fn event_flags(self) -> Option<GPIOEVENT_REQUEST_FLAGS> {
        match self {
            Self::EventFallingEdge => Some(GPIOEVENT_REQUEST_FLAGS::FALLING_EDGE),
            Self::EventRisingEdge => Some(GPIOEVENT_REQUEST_FLAGS::RISING_EDGE),
            Self::EventBothEdges => Some(GPIOEVENT_REQUEST_FLAGS::BOTH_EDGES),
            _ => None,
        }
    }

    /// Direction bits of the kernel handle flags. Event lines are inputs.
    pub(crate) fn direction_flags(self) -> GPIOHANDLE_REQUEST_FLAGS {
        match self {
            Self::DirectionAsIs => GPIOHANDLE_REQUEST_FLAGS::empty(),
            Self::DirectionOutput => GPIOHANDLE_REQUEST_FLAGS::OUTPUT,
            _ => GPIOHANDLE_REQUEST_FLAGS::INPUT,
        }
    }
}

pub(crate) const ACTIVE_LOW: FlagSet = FlagSet::bit(0);
pub(crate) const OPEN_SOURCE: FlagSet = FlagSet::bit(1);
pub(crate) const OPEN_DRAIN: FlagSet = FlagSet::bit(2);
pub(crate) const BIAS_DISABLE: FlagSet = FlagSet::bit(3);
pub(crate) const BIAS_PULL_DOWN: FlagSet = FlagSet::bit(4);
pub(crate) const BIAS_PULL_UP: FlagSet = FlagSet::bit(5);

/// Consumer, request type and flags used when requesting lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRequest {
    pub consumer: String,
    pub request_type: RequestType,
    pub flags: FlagSet,
}

impl LineRequest {
    pub const FLAG_ACTIVE_LOW: FlagSet = ACTIVE_LOW;
    pub const FLAG_OPEN_SOURCE: FlagSet = OPEN_SOURCE;
    pub const FLAG_OPEN_DRAIN: FlagSet = OPEN_DRAIN;

    pub fn new(consumer: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            consumer: consumer.into(),
            request_type,
            flags: FlagSet::empty(),
        }
    }

    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// Kernel handle flags for this request, after validation.
    pub(crate) fn handle_flags(&self) -> Result<GPIOHANDLE_REQUEST_FLAGS> {
        handle_flags(self.request_type.direction_flags(), self.flags)
    }
}

/// Translate request flags to kernel handle flags, rejecting the
/// combinations the kernel would refuse.
pub(crate) fn handle_flags(
    direction: GPIOHANDLE_REQUEST_FLAGS,
    flags: FlagSet,
) -> Result<GPIOHANDLE_REQUEST_FLAGS> {
    if flags.contains(OPEN_DRAIN | OPEN_SOURCE) {
        return Err(Error::os(
            Errno::EINVAL,
            "open-drain and open-source are mutually exclusive",
        ));
    }
    if flags.intersects(OPEN_DRAIN | OPEN_SOURCE)
        && !direction.contains(GPIOHANDLE_REQUEST_FLAGS::OUTPUT)
    {
        return Err(Error::os(
            Errno::EINVAL,
            "open-drain and open-source require output direction",
        ));
    }
    if (flags & (BIAS_DISABLE | BIAS_PULL_DOWN | BIAS_PULL_UP)).count() > 1 {
        return Err(Error::os(Errno::EINVAL, "only one bias flag may be set"));
    }

    Ok([
        (ACTIVE_LOW, GPIOHANDLE_REQUEST_FLAGS::ACTIVE_LOW),
        (OPEN_SOURCE, GPIOHANDLE_REQUEST_FLAGS::OPEN_SOURCE),
        (OPEN_DRAIN, GPIOHANDLE_REQUEST_FLAGS::OPEN_DRAIN),
        (BIAS_DISABLE, GPIOHANDLE_REQUEST_FLAGS::BIAS_DISABLE),
        (BIAS_PULL_DOWN, GPIOHANDLE_REQUEST_FLAGS::BIAS_PULL_DOWN),
        (BIAS_PULL_UP, GPIOHANDLE_REQUEST_FLAGS::BIAS_PULL_UP),
    ]
    .into_iter()
    .filter(|(bit, _)| flags.contains(*bit))
    .fold(direction, |acc, (_, kernel)| acc | kernel))
}
