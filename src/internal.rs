mod buffer;
mod dispatcher;
mod flush_timer;

pub(crate) use buffer::{BufferState, Outbound};
pub(crate) use dispatcher::{Dispatcher, SignedDispatcher, UnsignedDispatcher};
pub(crate) use flush_timer::FlushTimer;
