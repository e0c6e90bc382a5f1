use std::time::Duration;

use beaconry::{Config, EventTracker, HmacSha256, PostRequest, Result, StaticContext};
use serde_json::json;

/// Stand-in for an HTTP client: prints what would be posted.
fn post_data(request: PostRequest) {
    println!(
        "POST {}?key={}&mac={}\n  {}",
        request.url, request.query["key"], request.query["mac"], request.data
    );
    if let Some(done) = request.done {
        done();
    }
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let tracker = EventTracker::signed()
        .client_key("demo-key")
        .client_secret("demo-secret")
        .events_url("https://events.example.com/v2")
        .app_name("HelloTracker")
        .transport(post_data)
        .signer(HmacSha256)
        .context_provider(StaticContext::new().with("user_agent", "hello-tracker/0.1"))
        .config(
            Config::default()
                .with_buffer_length(3)
                .with_buffer_timeout(Duration::from_millis(500))
                .with_client_context(true),
        )
        .build()?;

    // Third event fills the buffer and flushes immediately.
    for i in 0..3 {
        tracker.track("demo", "click", json!({"button": i}).as_object().cloned());
    }

    // This one waits for the buffer window to expire.
    tracker.track("demo", "scroll", None);
    tokio::time::sleep(Duration::from_millis(600)).await;

    tracker.track("demo", "leave", None);
    tracker.drain();
    Ok(())
}
