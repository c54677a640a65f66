mod deferred;
mod dispatch;
mod error;
mod pin;
mod runtime;
mod schedule;
mod transport;

pub use deferred::DeferredDeletions;
pub use dispatch::{
    Command, CommandDispatcher, DispatcherConfig, InboundEvent, RESET_CALLBACK, parse_command,
};
pub use error::TransportError;
pub use pin::{PinSynchronizer, RepublishOutcome};
pub use runtime::PollLoop;
pub use schedule::ResetSchedule;
pub use transport::{ChatTransport, Destination, TextFormat};
