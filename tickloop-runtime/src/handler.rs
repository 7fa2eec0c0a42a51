//! Event handlers and the registry that resolves them by name.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;

use crate::registry::linked_handlers;

/// Opaque event payload. Handlers recover the concrete type with
/// `payload.downcast_ref::<T>()`.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Error a handler may return to report failure.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one handler execution.
pub type HandlerResult = Result<(), HandlerError>;

/// Boxed future returned by async handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

type BlockingFn = Arc<dyn Fn(Payload) -> HandlerResult + Send + Sync>;
type AsyncFn = Arc<dyn Fn(Payload) -> HandlerFuture + Send + Sync>;

/// A callable an event fires.
///
/// Blocking handlers run on tokio's blocking pool; async handlers run as
/// ordinary tasks. Either way every execution gets its own task.
#[derive(Clone)]
pub enum Handler {
    Blocking(BlockingFn),
    Async(AsyncFn),
}

impl Handler {
    /// Wrap a synchronous function.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tickloop_runtime::{Handler, Payload};
    ///
    /// let greet = Handler::blocking(|payload: Payload| {
    ///     if let Some(name) = payload.downcast_ref::<String>() {
    ///         println!("Hello, {}!", name);
    ///     }
    ///     Ok(())
    /// });
    /// # let _ = greet;
    /// ```
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(Payload) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Blocking(Arc::new(f))
    }

    /// Wrap an async function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::Async(Arc::new(move |payload| Box::pin(f(payload)) as HandlerFuture))
    }

    /// Start one execution on its own task.
    ///
    /// The handler is invoked inside the spawned task, so a panic while
    /// building the future is captured by the returned join handle too.
    pub(crate) fn spawn(&self, payload: Payload) -> JoinHandle<HandlerResult> {
        match self {
            Handler::Blocking(f) => {
                let f = Arc::clone(f);
                tokio::task::spawn_blocking(move || f(payload))
            }
            Handler::Async(f) => {
                let f = Arc::clone(f);
                tokio::spawn(async move { f(payload).await })
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Blocking(_) => f.write_str("Handler::Blocking"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// Resolves handler names to callables.
///
/// The loop calls `resolve` exactly once per admitted event and keeps the
/// result; it is never consulted again when the event fires.
pub trait HandlerRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Handler>;
}

/// In-memory registry that accepts registrations at any time.
#[derive(Default)]
pub struct HandlerMap {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl HandlerMap {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every `#[event_handler]` function linked
    /// into the binary.
    pub fn linked() -> Self {
        let map = Self::new();
        for registered in linked_handlers() {
            map.register(registered.name, registered.handler);
        }
        map
    }

    /// Register `handler` under `name`, returning the handler it replaced.
    pub fn register(&self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), handler)
    }

    /// Remove the handler registered under `name`.
    pub fn unregister(&self, name: &str) -> Option<Handler> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Check whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl HandlerRegistry for HandlerMap {
    fn resolve(&self, name: &str) -> Option<Handler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl<R: HandlerRegistry + ?Sized> HandlerRegistry for Arc<R> {
    fn resolve(&self, name: &str) -> Option<Handler> {
        (**self).resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Handler::blocking(|_| Ok(()))
    }

    #[test]
    fn register_and_resolve() {
        let map = HandlerMap::new();
        assert!(map.resolve("greet").is_none());

        assert!(map.register("greet", noop()).is_none());
        assert!(map.contains("greet"));
        assert!(map.resolve("greet").is_some());

        assert!(map.register("greet", noop()).is_some());
        assert_eq!(map.names(), vec!["greet".to_string()]);

        assert!(map.unregister("greet").is_some());
        assert!(map.resolve("greet").is_none());
    }

    #[tokio::test]
    async fn blocking_handler_receives_payload() {
        let handler = Handler::blocking(|payload| {
            let value = payload.downcast_ref::<u32>().ok_or("wrong payload type")?;
            if *value == 7 {
                Ok(())
            } else {
                Err("unexpected value".into())
            }
        });

        let outcome = handler.spawn(Arc::new(7u32)).await;
        assert!(matches!(outcome, Ok(Ok(()))));

        let outcome = handler.spawn(Arc::new("seven")).await;
        assert!(matches!(outcome, Ok(Err(_))));
    }

    async fn explode(_: Payload) -> HandlerResult {
        panic!("boom")
    }

    #[tokio::test]
    async fn async_handler_panic_is_captured_by_join_handle() {
        let handler = Handler::from_async(explode);

        let outcome = handler.spawn(Arc::new(())).await;
        assert!(outcome.is_err_and(|e| e.is_panic()));
    }
}
