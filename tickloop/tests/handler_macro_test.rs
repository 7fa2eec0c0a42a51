use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tickloop::{event_handler, EventLoop, HandlerMap, HandlerResult, ManualClock, Payload};

static GREETED: AtomicUsize = AtomicUsize::new(0);
static AUDITED: AtomicUsize = AtomicUsize::new(0);
static TOUCHED: AtomicUsize = AtomicUsize::new(0);

#[event_handler]
fn greet(payload: Payload) -> HandlerResult {
    let amount = payload.downcast_ref::<usize>().ok_or("expected a usize")?;
    GREETED.fetch_add(*amount, Ordering::SeqCst);
    Ok(())
}

#[event_handler(name = "audit.write")]
async fn write_audit(payload: Payload) {
    if payload.downcast_ref::<String>().is_some() {
        AUDITED.fetch_add(1, Ordering::SeqCst);
    }
}

#[event_handler(name = "touch")]
fn touch(_payload: Payload) {
    TOUCHED.fetch_add(1, Ordering::SeqCst);
}

async fn wait_for(counter: &AtomicUsize, expected: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while counter.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[test]
fn test_linked_handlers_use_declared_names() {
    let handlers = HandlerMap::linked();

    assert!(handlers.contains("greet"));
    assert!(handlers.contains("audit.write"));
    assert!(handlers.contains("touch"));
    assert!(!handlers.contains("write_audit"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_macro_handlers_fire_through_the_loop() {
    let event_loop = EventLoop::builder()
        .tick_interval(Duration::from_millis(20))
        .register_linked()
        .clock(ManualClock::new(1_000))
        .build()
        .unwrap();
    event_loop.start().unwrap();

    event_loop.schedule_event(1_000, 0, "greet", 3_usize).unwrap();
    event_loop
        .schedule_event(999, 0, "audit.write", "login".to_string())
        .unwrap();
    event_loop.schedule_event(1_000, 0, "touch", ()).unwrap();

    wait_for(&GREETED, 3).await;
    wait_for(&AUDITED, 1).await;
    wait_for(&TOUCHED, 1).await;

    event_loop.stop();
    tokio::time::timeout(Duration::from_secs(2), event_loop.stopped())
        .await
        .unwrap();
}
