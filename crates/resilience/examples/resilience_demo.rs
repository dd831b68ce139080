// crates/resilience/examples/resilience_demo.rs
//! Demonstration of the throttle and retry building blocks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sublink_resilience::{with_retry, with_timeout, RequestThrottler, RetryFailure, RetryPolicy};

#[tokio::main]
async fn main() {
    println!("Resilience Demo");
    println!("===============\n");

    demo_throttle().await;
    println!();
    demo_retry().await;
    println!();
    demo_timeout().await;
}

async fn demo_throttle() {
    println!("1. Request throttle");
    println!("-------------------");

    let throttler = RequestThrottler::default();
    let mut handles = Vec::new();

    for i in 0..6 {
        let throttler = throttler.clone();
        handles.push(tokio::spawn(async move {
            throttler
                .execute(async move {
                    println!("  request {} running", i);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                })
                .await
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
    println!("  slots free afterwards: {}", throttler.available_slots());
}

async fn demo_retry() {
    println!("2. Retry with backoff");
    println!("--------------------");

    let policy = RetryPolicy::with_max_retries(3)
        .with_initial_delay(Duration::from_millis(50))
        .with_jitter(false);
    let calls = AtomicUsize::new(0);

    let result = with_retry(
        &policy,
        |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                println!("  attempt {}", attempt);
                if attempt < 3 {
                    Err("503 Service Unavailable")
                } else {
                    Ok("pong")
                }
            }
        },
        |_| true,
    )
    .await;

    match result {
        Ok(done) => println!("  ✓ {} after {} attempts", done.value, done.attempts),
        Err(RetryFailure::Exhausted { error, attempts }) => {
            println!("  ✗ gave up after {} attempts: {}", attempts, error)
        }
        Err(other) => println!("  ✗ {:?}", other),
    }
}

async fn demo_timeout() {
    println!("3. Timeout");
    println!("----------");

    let result = with_timeout(
        Duration::from_millis(20),
        tokio::time::sleep(Duration::from_millis(200)),
    )
    .await;

    match result {
        Ok(()) => println!("  finished in time"),
        Err(e) => println!("  ✗ {}", e),
    }
}
