use std::sync::Arc;
use std::time::Duration;
use tickloop::{Clock, EventLoop, Handler, HandlerMap, Payload, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let handlers = Arc::new(HandlerMap::new());
    handlers.register(
        "report",
        Handler::blocking(|payload: Payload| {
            let label = payload.downcast_ref::<&str>().copied().unwrap_or("?");
            println!("[REPORT] {}", label);
            Ok(())
        }),
    );
    handlers.register(
        "flaky",
        Handler::blocking(|_| panic!("flaky handler blew up")),
    );

    let event_loop = EventLoop::builder()
        .tick_interval(Duration::from_millis(100))
        .registry(Arc::clone(&handlers))
        .build()?;

    // Everything below is already overdue by the time the loop starts.
    let now = SystemClock.now();
    event_loop.schedule_event(now - 3, 2, "report", "third (was due 1s ago)")?;
    event_loop.schedule_event(now - 10, 5, "report", "first (was due 5s ago)")?;
    event_loop.schedule_event(now - 7, 4, "flaky", ())?;
    event_loop.schedule_event(now - 7, 4, "report", "second (was due 3s ago)")?;
    event_loop.schedule_event(now, 1, "report", "on time")?;

    event_loop.start()?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    event_loop.pause();
    match event_loop.schedule_event(now, 1, "report", "never queued") {
        Ok(()) => println!("unexpected: paused loop accepted an event"),
        Err(e) => println!("While paused: {}", e),
    }
    event_loop.unpause();

    // Handlers can be swapped at runtime; admitted events keep the one they resolved.
    println!("Registered handlers: {:?}", handlers.names());
    handlers.unregister("flaky");
    if let Err(e) = event_loop.schedule_event(now, 1, "flaky", ()) {
        println!("After unregister: {}", e);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    let stats = event_loop.stats();
    println!(
        "\nfired={} faults={} catch_up_cycles={} pending={}",
        stats.fired, stats.faults, stats.catch_up_cycles, stats.pending_events
    );

    event_loop.stop();
    event_loop.stopped().await;
    Ok(())
}
