use clap::Parser;
use rusqlite::Connection;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use time::OffsetDateTime;
use tracing::info;

mod aggregate;
mod api;
mod blocking;
mod bookmarks;
mod classify;
mod clock;
mod error;
mod events;
mod focus;
mod goals;
mod messages;
mod notes;
mod notify;
mod progress;
mod reminders;
mod schedule;
mod settings;
mod state;
mod store;
mod tracker;

use schedule::Schedule;
use state::AppState;

const DEFAULT_PORT: u16 = 17700;

#[derive(Parser, Debug)]
#[command(name = "studyflow_core", version)]
struct Args {
    /// Listen address.
    ///
    /// Accepts:
    /// - ip:port (recommended), e.g. 127.0.0.1:17700
    /// - ip (implies port 17700), e.g. 127.0.0.1
    /// - localhost or localhost:port
    #[arg(long, default_value = "127.0.0.1:17700")]
    listen: String,

    /// SQLite database path.
    #[arg(long, default_value = "./data/studyflow.db")]
    db: PathBuf,

    /// Aggregation tick (seconds): checkpoints the active tab and rewrites today's summary.
    #[arg(long, default_value_t = 15)]
    tick_seconds: u64,

    /// Reminder sweep interval (seconds).
    #[arg(long, default_value_t = 60)]
    reminder_check_seconds: u64,

    /// Productive bookmark sync interval (seconds).
    #[arg(long, default_value_t = 300)]
    bookmark_sync_seconds: u64,

    /// Hours between motivational notifications.
    #[arg(long, default_value_t = 24)]
    motivation_hours: u64,

    /// Local UTC offset in minutes; decides where one calendar day ends.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    tz_offset_minutes: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studyflow_core=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = parse_listen(&args.listen)?;
    let tz = clock::tz_offset_from_minutes(clock::normalize_tz_offset_minutes(Some(
        args.tz_offset_minutes,
    )));

    if let Some(parent) = args.db.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(&args.db)?;
    store::apply_pragmas(&conn)?;
    store::init_db(&conn)?;
    let state = AppState::load(conn, tz, OffsetDateTime::now_utc())?;

    schedule::spawn_all(
        state.clone(),
        Schedule {
            aggregate_seconds: args.tick_seconds,
            reminder_check_seconds: args.reminder_check_seconds,
            bookmark_sync_seconds: args.bookmark_sync_seconds,
            motivation_seconds: args.motivation_hours.max(1) * 3600,
        },
    );

    let app = api::router(state.clone());

    info!("Core listening on http://{addr}");
    info!("DB: {}", args.db.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final flush so the last seconds of the active tab survive a restart.
    if let Err(err) = messages::aggregation_pass(&state, OffsetDateTime::now_utc()).await {
        tracing::error!("final aggregation failed: {err}");
    }
    Ok(())
}

fn parse_listen(input: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Some((host, port_str)) = input.rsplit_once(':') {
        let bad_port = || {
            anyhow::anyhow!(
                "invalid --listen '{}': bad port. Example: 127.0.0.1:{}",
                input,
                DEFAULT_PORT
            )
        };
        if host == "localhost" {
            let port: u16 = port_str.parse().map_err(|_| bad_port())?;
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), port));
        }

        // IPv6 without brackets: ::1:17700
        if let Ok(ip) = host.parse::<IpAddr>() {
            let port: u16 = port_str.parse().map_err(|_| bad_port())?;
            return Ok(SocketAddr::new(ip, port));
        }
    }

    if input == "localhost" {
        return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), DEFAULT_PORT));
    }

    Err(anyhow::anyhow!(
        "invalid --listen '{}'. Use ip:port (e.g. 127.0.0.1:{}) or ip (e.g. 127.0.0.1).",
        input,
        DEFAULT_PORT
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
