mod builder;
mod coordinator;
mod dispatch;
mod event_loop;
mod state;

pub use builder::EventLoopBuilder;
pub use event_loop::{EventLoop, LoopStats};
pub use state::LoopState;
