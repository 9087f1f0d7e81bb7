use std::sync::Arc;
use std::time::{Duration, Instant};

use ulid::Ulid;

use resguard::engine::Engine;
use resguard::model::{ReservationStatus, Secs, Span};

const HOUR: Secs = 3600;
/// 2026-01-01T00:00:00Z
const EPOCH: Secs = 1_767_225_600;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}us, p50={:.2}us, p95={:.2}us, p99={:.2}us, max={:.2}us",
        latencies.len(),
        avg.as_secs_f64() * 1e6,
        percentile(latencies, 50.0).as_secs_f64() * 1e6,
        percentile(latencies, 95.0).as_secs_f64() * 1e6,
        percentile(latencies, 99.0).as_secs_f64() * 1e6,
        latencies.last().unwrap().as_secs_f64() * 1e6,
    );
}

/// Fill each asset with back-to-back one-hour reservations.
async fn setup(engine: &Engine, assets: usize, per_asset: usize) -> Vec<Ulid> {
    let mut ids = Vec::with_capacity(assets);
    for _ in 0..assets {
        let asset = Ulid::new();
        engine.create_asset(asset, None).unwrap();
        for i in 0..per_asset as Secs {
            let start = EPOCH + i * HOUR;
            engine
                .save_reservation(
                    Ulid::new(),
                    asset,
                    Span::new(start, start + HOUR),
                    ReservationStatus::Published,
                    None,
                )
                .await
                .unwrap();
        }
        ids.push(asset);
    }
    println!("  created {assets} assets x {per_asset} reservations");
    ids
}

async fn bench_checks(engine: &Engine, assets: &[Ulid], per_asset: usize, rounds: usize) {
    let mut latencies = Vec::with_capacity(rounds);
    let mut hits = 0usize;
    for i in 0..rounds {
        let asset = assets[i % assets.len()];
        // Half-hour offset: every other check straddles two reservations.
        let offset = (i % per_asset) as Secs * HOUR + if i % 2 == 0 { HOUR / 2 } else { 0 };
        let candidate = Span::new(EPOCH + offset, EPOCH + offset + HOUR / 4);
        let started = Instant::now();
        if engine.has_overlap(candidate, asset, None).await {
            hits += 1;
        }
        latencies.push(started.elapsed());
    }
    println!("  {hits}/{rounds} checks overlapped");
    print_latency("has_overlap", &mut latencies);
}

async fn bench_contended_saves(engine: Arc<Engine>, writers: usize, per_writer: usize) {
    let asset = Ulid::new();
    engine.create_asset(asset, None).unwrap();

    let started = Instant::now();
    let mut handles = Vec::new();
    for w in 0..writers {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(per_writer);
            let mut committed = 0usize;
            for i in 0..per_writer {
                // Writers collide on the same slots; exactly one wins each.
                let start = EPOCH + ((i * writers + w) / 2) as Secs * HOUR;
                let t = Instant::now();
                if engine
                    .save_reservation(
                        Ulid::new(),
                        asset,
                        Span::new(start, start + HOUR),
                        ReservationStatus::Published,
                        None,
                    )
                    .await
                    .is_ok()
                {
                    committed += 1;
                }
                latencies.push(t.elapsed());
            }
            (latencies, committed)
        }));
    }

    let mut all = Vec::new();
    let mut committed = 0;
    for h in handles {
        let (lat, c) = h.await.unwrap();
        all.extend(lat);
        committed += c;
    }
    let elapsed = started.elapsed();
    println!(
        "  {committed}/{} saves committed in {:.2}ms",
        writers * per_writer,
        elapsed.as_secs_f64() * 1000.0
    );
    print_latency("save_reservation (contended)", &mut all);
}

#[tokio::main]
async fn main() {
    let engine = Arc::new(Engine::new());

    println!("setup");
    let assets = setup(&engine, 10, 5_000).await;

    println!("checks");
    bench_checks(&engine, &assets, 5_000, 100_000).await;

    println!("contended saves");
    bench_contended_saves(engine, 8, 2_000).await;
}
