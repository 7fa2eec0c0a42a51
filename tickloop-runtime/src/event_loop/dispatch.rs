use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::error::HandlerFault;
use crate::event::ScheduledEvent;
use crate::handler::HandlerResult;
use crate::logging::LogSink;

/// Execution counters shared with `EventLoop::stats`.
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    fired: AtomicU64,
    faults: AtomicU64,
}

impl DispatchCounters {
    pub(crate) fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub(crate) fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

/// Launches one supervised execution per due event.
///
/// Nothing here is awaited by the coordinator. Each supervisor spawns the
/// handler on its own task, waits for it, and turns the join outcome into a
/// `Result<(), HandlerFault>` that is logged and counted.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    limiter: Option<Arc<Semaphore>>,
    counters: Arc<DispatchCounters>,
    sink: LogSink,
}

impl Dispatcher {
    /// `max_concurrent == 0` leaves executions unbounded.
    pub(crate) fn new(max_concurrent: usize, sink: LogSink) -> Self {
        Self {
            limiter: (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent))),
            counters: Arc::new(DispatchCounters::default()),
            sink,
        }
    }

    pub(crate) fn counters(&self) -> Arc<DispatchCounters> {
        Arc::clone(&self.counters)
    }

    /// Fire every event of one bucket. Returns the number launched.
    pub(crate) fn fire(&self, timestamp: i64, events: Vec<ScheduledEvent>) -> usize {
        if events.is_empty() {
            return 0;
        }

        let count = events.len();
        info!(timestamp, event_count = count, "Firing events");

        for event in events {
            self.counters.fired.fetch_add(1, Ordering::Relaxed);
            let supervised = supervise(event, self.limiter.clone(), Arc::clone(&self.counters));
            tokio::spawn(self.sink.attach(supervised));
        }

        count
    }
}

async fn supervise(
    event: ScheduledEvent,
    limiter: Option<Arc<Semaphore>>,
    counters: Arc<DispatchCounters>,
) {
    // The permit lives until the handler finishes.
    let _permit = match limiter {
        Some(semaphore) => match semaphore.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => return,
        },
        None => None,
    };

    let joined = event.handler().spawn(Arc::clone(event.payload())).await;

    if let Err(fault) = into_outcome(joined) {
        counters.faults.fetch_add(1, Ordering::Relaxed);
        error!(
            handler = event.handler_name(),
            fire_at = event.fire_at(),
            error = %fault,
            "Handler execution failed"
        );
    }
}

fn into_outcome(joined: Result<HandlerResult, JoinError>) -> Result<(), HandlerFault> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerFault::Failed(e.to_string())),
        Err(e) if e.is_panic() => Err(HandlerFault::Panicked(panic_message(e.into_panic()))),
        Err(_) => Err(HandlerFault::Cancelled),
    }
}

pub(super) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, HandlerError};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn event(name: &str, handler: Handler) -> ScheduledEvent {
        ScheduledEvent::new(100, 0, name, Arc::new(()), handler)
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42u8)), "non-string panic payload");
    }

    async fn explode() -> HandlerResult {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn faults_are_classified() {
        assert_eq!(
            into_outcome(tokio::spawn(explode()).await),
            Err(HandlerFault::Panicked("kaboom".into()))
        );

        assert_eq!(
            into_outcome(Ok(Err("nope".into()))),
            Err(HandlerFault::Failed("nope".into()))
        );

        let never = tokio::spawn(std::future::pending::<HandlerResult>());
        never.abort();
        assert_eq!(into_outcome(never.await), Err(HandlerFault::Cancelled));
    }

    #[tokio::test]
    async fn faulting_handler_does_not_affect_siblings() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(0, LogSink::ambient());

        let ok = Handler::blocking(move |_| {
            tx.send(()).map_err(|e| e.to_string())?;
            Ok(())
        });
        let bad = Handler::blocking(|_| panic!("handler blew up"));

        let launched = dispatcher.fire(
            100,
            vec![event("bad", bad.clone()), event("ok", ok.clone()), event("bad", bad)],
        );
        assert_eq!(launched, 3);

        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();

        let counters = dispatcher.counters();
        tokio::time::timeout(Duration::from_secs(2), async {
            while counters.faults() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(counters.fired(), 3);

        // A later bucket still fires.
        dispatcher.fire(101, vec![event("ok", ok)]);
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_pool_caps_concurrency() {
        use std::sync::atomic::AtomicUsize;

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let handler = {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            Handler::from_async(move |_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                let done_tx = done_tx.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    done_tx.send(()).map_err(|e| e.to_string())?;
                    Ok::<(), HandlerError>(())
                }
            })
        };

        let dispatcher = Dispatcher::new(2, LogSink::ambient());
        let events = (0..8).map(|_| event("slow", handler.clone())).collect();
        dispatcher.fire(100, events);

        for _ in 0..8 {
            tokio::time::timeout(Duration::from_secs(5), done_rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
