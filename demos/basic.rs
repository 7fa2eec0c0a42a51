use chrono::Local;
use std::time::Duration;
use tickloop::{event_handler, Clock, EventLoop, HandlerResult, Payload, SystemClock};

/// Prints whatever greeting it was scheduled with
#[event_handler]
fn greet(payload: Payload) -> HandlerResult {
    let name = payload.downcast_ref::<String>().ok_or("greet expects a String")?;
    let now = Local::now().format("%H:%M:%S%.3f");
    println!("[{}] [GREET] Hello, {}!", now, name);
    Ok(())
}

/// Async handler registered under a custom name
#[event_handler(name = "reminder.send")]
async fn send_reminder(payload: Payload) {
    let now = Local::now().format("%H:%M:%S%.3f");
    if let Some(text) = payload.downcast_ref::<&str>() {
        println!("[{}] [REMINDER] {}", now, text);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let event_loop = EventLoop::builder()
        .tick_interval(Duration::from_millis(100))
        .register_linked()
        .build()?;
    event_loop.start()?;

    let now = SystemClock.now();
    event_loop.schedule_event(now, 1, "greet", "World".to_string())?;
    event_loop.schedule_event(now, 3, "reminder.send", "Stand up and stretch")?;
    event_loop.schedule_event(now, 0, "greet", "right now".to_string())?;

    if let Err(e) = event_loop.schedule_event(now, 1, "missing", ()) {
        println!("Rejected as expected: {}", e);
    }

    println!("Events scheduled, waiting 4 seconds...\n");
    tokio::time::sleep(Duration::from_secs(4)).await;

    let stats = event_loop.stats();
    println!("\nFired {} events ({} faults)", stats.fired, stats.faults);

    event_loop.stop();
    event_loop.stopped().await;
    Ok(())
}
