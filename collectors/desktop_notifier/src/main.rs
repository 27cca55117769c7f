use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "desktop_notifier", version)]
struct Args {
    /// Core base URL, e.g. http://127.0.0.1:17700
    #[arg(long, default_value = "http://127.0.0.1:17700")]
    core_url: String,

    /// Poll interval (seconds).
    #[arg(long, default_value_t = 5)]
    poll_seconds: u64,

    /// Also surface the periodic "data updated" notices. Default is off.
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    include_data_updates: bool,
}

#[derive(Deserialize)]
struct OkResponse<T> {
    ok: bool,
    data: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPage {
    latest_id: u64,
    #[serde(default)]
    notifications: Vec<Notification>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Notification {
    id: u64,
    kind: String,
    title: String,
    message: String,
    created_at: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "desktop_notifier=info".into()),
        )
        .init();

    let args = Args::parse();
    tokio::select! {
        res = run(args) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    use reqwest::Client;
    use tokio::time::{sleep, Duration};
    use tracing::{error, info};

    let client = Client::new();
    let base_url = args.core_url.trim_end_matches('/').to_string();
    info!("desktop notifier started. Polling {base_url}/notifications");

    // Skip anything queued before we started.
    let mut cursor: Option<u64> = None;
    loop {
        match poll(&client, &base_url, cursor.unwrap_or(0)).await {
            Ok(page) => {
                if cursor.is_none() {
                    cursor = Some(page.latest_id);
                } else {
                    for n in &page.notifications {
                        if should_show(n, args.include_data_updates) {
                            show(n);
                        }
                        cursor = Some(n.id);
                    }
                    // Core restarted: its ids begin again from 1.
                    if page.latest_id < cursor.unwrap_or(0) {
                        info!("core restarted; rewinding cursor");
                        cursor = Some(0);
                    }
                }
            }
            Err(e) => error!("poll failed: {e}"),
        }
        sleep(Duration::from_secs(args.poll_seconds.max(1))).await;
    }
}

async fn poll(
    client: &reqwest::Client,
    base_url: &str,
    after: u64,
) -> anyhow::Result<NotificationPage> {
    let res = client
        .get(format!("{base_url}/notifications?after={after}"))
        .send()
        .await?;
    if !res.status().is_success() {
        anyhow::bail!("http_{}", res.status().as_u16());
    }
    let body: OkResponse<NotificationPage> = res.json().await?;
    if !body.ok {
        anyhow::bail!("not_ok");
    }
    body.data.ok_or_else(|| anyhow::anyhow!("missing_data"))
}

fn should_show(n: &Notification, include_data_updates: bool) -> bool {
    n.kind != "data_updated" || include_data_updates
}

fn format_hhmm(rfc3339: &str) -> String {
    use chrono::Local;

    chrono::DateTime::parse_from_rfc3339(rfc3339)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|_| "??:??".to_string())
}

fn show(n: &Notification) {
    let when = format_hhmm(&n.created_at);
    tracing::info!("[{when}] {}: {}", n.title, n.message);

    #[cfg(windows)]
    {
        use win_toast_notify::{Duration, Scenario, WinToastNotify};

        let scenario = if n.kind == "reminder" {
            Scenario::Reminder
        } else {
            Scenario::Default
        };
        let stamp = format!("StudyFlow · {when}");
        let _ = WinToastNotify::new()
            .set_duration(Duration::Short)
            .set_scenario(scenario)
            .set_title(n.title.as_str())
            .set_messages(vec![n.message.as_str(), stamp.as_str()])
            .show();
    }
}
