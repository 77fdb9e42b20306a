//! skytrack: live Mode S / ADS-B tracker fed by a Beast TCP stream.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use skytrack_core::beast::FrameDecoder;
use skytrack_core::config;
use skytrack_core::decode;
use skytrack_core::store::TrackStore;
use skytrack_core::types::*;

#[derive(Parser)]
#[command(name = "skytrack", version, about = "Live ADS-B decoder and tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a Beast feed and track aircraft
    Run {
        /// Feed host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Feed port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Seconds without a message before a track is dropped
        #[arg(long)]
        ttl: Option<u64>,

        /// Position trail capacity per aircraft
        #[arg(long)]
        trail_len: Option<usize>,

        /// Seconds between status table prints
        #[arg(long, default_value = "10")]
        status_interval: u64,

        /// Seconds between reconnect attempts
        #[arg(long, default_value = "5")]
        retry_interval: u64,
    },

    /// Write a default config file and print its path
    InitConfig,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            host,
            port,
            ttl,
            trail_len,
            status_interval,
            retry_interval,
        } => {
            let cfg = config::load_config();
            let host = host.unwrap_or(cfg.source.host);
            let port = port.unwrap_or(cfg.source.port);
            let ttl = ttl.unwrap_or(cfg.display.ttl_seconds) as f64;
            let trail_len = trail_len.unwrap_or(cfg.display.trail_length);

            cmd_run(host, port, ttl, trail_len, status_interval, retry_interval).await;
        }
        Commands::InitConfig => match config::save_config(&config::Config::default()) {
            Ok(path) => println!("Wrote {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    }
}

async fn cmd_run(
    host: String,
    port: u16,
    ttl: f64,
    trail_len: usize,
    status_interval: u64,
    retry_interval: u64,
) {
    let store = Arc::new(TrackStore::new(trail_len));

    // Sweep loop: evict stale tracks at 1 Hz, print status periodically
    let sweeper = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            let mut ticks = 0u64;
            loop {
                tick.tick().await;
                let now = unix_now();
                let removed = store.remove_stale(now, ttl);
                if removed > 0 {
                    debug!(removed, "evicted stale tracks");
                }
                ticks += 1;
                if ticks % status_interval.max(1) == 0 {
                    print_status(&store, now);
                }
            }
        })
    };

    let feed = {
        let store = Arc::clone(&store);
        let addr = format!("{host}:{port}");
        tokio::spawn(async move {
            loop {
                info!(%addr, "connecting to Beast feed");
                match TcpStream::connect(&addr).await {
                    Ok(stream) => {
                        info!(%addr, "connected");
                        match run_stream(stream, &store).await {
                            Ok(()) => info!("feed closed cleanly"),
                            Err(e) => warn!("feed error: {e}"),
                        }
                    }
                    Err(e) => warn!(%addr, "connect failed: {e}"),
                }
                tokio::time::sleep(Duration::from_secs(retry_interval)).await;
            }
        })
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("signal handler error: {e}");
    }
    info!("shutting down");
    feed.abort();
    sweeper.abort();
    print_status(&store, unix_now());
}

/// Read the Beast byte stream until EOF, feeding decoded messages into
/// the store. Returns `Ok(())` on a clean end-of-stream.
async fn run_stream(mut stream: TcpStream, store: &TrackStore) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; 4096];
    let mut frames = Vec::new();

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            decoder.finish()?;
            return Ok(());
        }

        decoder.feed(&buf[..n], &mut frames);
        let now = unix_now();
        for frame in frames.drain(..) {
            if let Some(msg) = decode(&frame, now) {
                debug!(
                    icao = %icao_to_string(&msg.icao),
                    df = msg.df,
                    "message"
                );
                store.apply(&msg);
            }
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn print_status(store: &TrackStore, now: f64) {
    let stats = store.sweep_stats(now);
    let snapshot = store.snapshot();

    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Flight", "Alt (ft)", "Spd (kt)", "Hdg", "VRate", "Lat", "Lon", "Gnd", "Msgs",
        "Age (s)",
    ]);

    let mut sorted: Vec<_> = snapshot.values().collect();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.messages));

    let mut with_position = 0;
    for t in &sorted {
        if t.has_position() {
            with_position += 1;
        }
        table.add_row(vec![
            Cell::new(icao_to_string(&t.icao)),
            Cell::new(t.flight.as_deref().unwrap_or("-")),
            Cell::new(fmt_opt(t.altitude_ft)),
            Cell::new(t.speed_kt.map(|v| format!("{v:.0}")).unwrap_or("-".into())),
            Cell::new(
                t.heading_deg
                    .map(|v| format!("{v:.0}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(fmt_opt(t.vertical_rate_fpm)),
            Cell::new(t.lat.map(|v| format!("{v:.4}")).unwrap_or("-".into())),
            Cell::new(t.lon.map(|v| format!("{v:.4}")).unwrap_or("-".into())),
            Cell::new(if t.on_ground { "Y" } else { "" }),
            Cell::new(t.messages),
            Cell::new(format!("{:.0}", t.age(now))),
        ]);
    }

    println!("{table}");
    println!(
        "{} aircraft ({} with position) | {:.1} msg/s | mean signal {:.0}",
        sorted.len(),
        with_position,
        stats.message_rate,
        stats.mean_signal
    );
}

fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".into())
}
