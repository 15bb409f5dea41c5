use std::env;
use std::fs;
use std::time::{Duration, Instant};

use serde::Serialize;
use throttle_core::{Throttle, ThrottleOptions, ThrottleStatus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Submissions per scenario.
const REQUESTS: usize = 20_000;

#[derive(Debug, Serialize)]
struct Report {
    scenario: String,
    requests: usize,
    succeeded: usize,
    failed: usize,
    elapsed_ms: u128,
    throughput_per_sec: f64,
    mean_latency_us: u128,
    max_latency_us: u128,
    status_after: ThrottleStatus,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("THROTTLE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// Options from the JSON file given as first argument, if any.
fn load_options() -> Result<Option<ThrottleOptions>, Box<dyn std::error::Error>> {
    let Some(path) = env::args().nth(1) else {
        return Ok(None);
    };
    let raw = fs::read_to_string(&path)?;
    let options: ThrottleOptions = serde_json::from_str(&raw)?;
    info!(%path, ?options, "loaded options");
    Ok(Some(options))
}

/// Stand-in for real work: yields once through the timer, returns its input.
async fn make_async(value: u64) -> Result<u64, std::convert::Infallible> {
    tokio::time::sleep(Duration::ZERO).await;
    Ok(value)
}

async fn run_scenario(
    scenario: String,
    options: ThrottleOptions,
) -> Result<Report, Box<dyn std::error::Error>> {
    let throttle = Throttle::new(options)?;
    info!(%scenario, options = ?throttle.options(), "starting");

    let started = Instant::now();
    let mut workers = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        let throttle = throttle.clone();
        workers.push(tokio::spawn(async move {
            let submitted = Instant::now();
            let result = throttle.submit(move || make_async(i as u64)).await;
            (result.is_ok(), submitted.elapsed())
        }));
    }

    let (mut succeeded, mut failed) = (0, 0);
    let (mut total_latency, mut max_latency) = (Duration::ZERO, Duration::ZERO);
    for worker in workers {
        let (ok, latency) = worker.await?;
        if ok {
            succeeded += 1;
        } else {
            failed += 1;
        }
        total_latency += latency;
        max_latency = max_latency.max(latency);
    }
    let elapsed = started.elapsed();
    if failed > 0 {
        warn!(%scenario, failed, "some submissions failed");
    }

    Ok(Report {
        scenario,
        requests: REQUESTS,
        succeeded,
        failed,
        elapsed_ms: elapsed.as_millis(),
        throughput_per_sec: REQUESTS as f64 / elapsed.as_secs_f64(),
        mean_latency_us: total_latency.as_micros() / REQUESTS as u128,
        max_latency_us: max_latency.as_micros(),
        status_after: throttle.status(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let scenarios: Vec<(String, ThrottleOptions)> = match load_options()? {
        Some(options) => vec![("custom".to_string(), options)],
        None => [100, 1_000, 10_000]
            .into_iter()
            .map(|capacity| {
                (
                    format!("concurrent={capacity}"),
                    ThrottleOptions::new()
                        .with_timeout(Duration::from_secs(10))
                        .with_concurrent(capacity),
                )
            })
            .collect(),
    };

    for (scenario, options) in scenarios {
        let report = run_scenario(scenario, options).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
