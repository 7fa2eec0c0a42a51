use crate::handler::Handler;

/// A handler collected from an `#[event_handler]` function.
#[derive(Debug, Clone)]
pub struct RegisteredHandler {
    pub name: &'static str,
    pub handler: Handler,
}

impl RegisteredHandler {
    pub fn new(name: &'static str, handler: Handler) -> Self {
        Self { name, handler }
    }
}

/// Global distributed slice for collecting `#[event_handler]` functions
#[linkme::distributed_slice]
pub static EVENT_HANDLERS: [fn() -> RegisteredHandler] = [..];

/// Every handler linked into the binary, in link order.
pub fn linked_handlers() -> impl Iterator<Item = RegisteredHandler> {
    EVENT_HANDLERS.iter().map(|register| register())
}
