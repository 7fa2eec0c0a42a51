use std::time::Duration;
use tickloop::{event_handler, Clock, EventLoopBuilder, HandlerResult, Payload, SystemClock};

#[event_handler(name = "heartbeat")]
async fn heartbeat(payload: Payload) -> HandlerResult {
    let seq = payload.downcast_ref::<u32>().ok_or("heartbeat expects a u32")?;
    println!("[HEARTBEAT] #{}", seq);
    if seq % 3 == 0 {
        return Err(format!("heartbeat #{} failed its health check", seq).into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    // Pass `yaml` to read demos/config/tickloop.yaml instead.
    // TICKLOOP_EVENT_LOOP__* env vars override either file.
    let builder = match std::env::args().nth(1).as_deref() {
        Some("yaml") => EventLoopBuilder::with_yaml("demos/config/tickloop.yaml")?,
        _ => EventLoopBuilder::with_toml("demos/config/tickloop.toml")?,
    };
    let event_loop = builder.register_linked().build()?;
    println!("Tick interval from config: {:?}", event_loop.tick_interval());
    event_loop.start()?;

    let now = SystemClock.now();
    for seq in 1..=6_u32 {
        event_loop.schedule_event(now, i64::from(seq), "heartbeat", seq)?;
    }

    tokio::time::sleep(Duration::from_secs(8)).await;

    event_loop.stop();
    event_loop.stopped().await;
    Ok(())
}
