use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::blocking::BlockRule;
use crate::bookmarks;
use crate::clock::rfc3339;
use crate::error::AppError;
use crate::events::{self, IngestEvent};
use crate::messages::{self, Parsed, Reply};
use crate::notify::{Notification, DEFAULT_POLL_LIMIT, QUEUE_CAPACITY};
use crate::settings::{self, SettingsUpdate};
use crate::state::AppState;

#[derive(Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

#[derive(Serialize)]
struct ErrResponse {
    ok: bool,
    error: &'static str,
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(OkResponse {
        ok: true,
        data: Some(data),
    })
    .into_response()
}

fn err(status: StatusCode, code: &'static str) -> Response {
    (status, Json(ErrResponse { ok: false, error: code })).into_response()
}

fn app_err(e: AppError) -> Response {
    if matches!(e, AppError::Store(_)) {
        error!("store failure: {e}");
    }
    err(e.status(), e.code())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/event", post(post_event).options(options_ok))
        .route("/message", post(post_message).options(options_ok))
        .route("/notifications", get(get_notifications))
        .route(
            "/settings",
            get(get_settings).post(post_settings).options(options_ok),
        )
        .route("/blocking/rules", get(get_blocking_rules))
        .route("/blocking/check", get(get_blocking_check))
        .route("/export/bookmarks", get(get_export_bookmarks))
        .route(
            "/import/bookmarks",
            post(post_import_bookmarks).options(options_ok),
        )
        .with_state(state)
        .layer(cors)
}

async fn options_ok() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Serialize)]
struct HealthInfo {
    service: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(OkResponse {
        ok: true,
        data: Some(HealthInfo {
            service: "studyflow_core",
            version: env!("CARGO_PKG_VERSION"),
        }),
    })
}

async fn post_event(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let e: IngestEvent = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(_) => return err(StatusCode::BAD_REQUEST, "invalid_json"),
    };
    if e.v < 1 {
        return err(StatusCode::BAD_REQUEST, "invalid_version");
    }

    let name = e.event.name();
    match events::apply_event(&state, e.event, OffsetDateTime::now_utc()).await {
        Ok(outcome) => ok(outcome),
        Err(e) => {
            error!("event {name} failed: {e}");
            app_err(e)
        }
    }
}

async fn post_message(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let ty = payload
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let req = match messages::parse(payload) {
        Parsed::Request(req) => req,
        Parsed::Unknown(_) => {
            warn!("unknown message type {ty:?}");
            return Json(Reply::unknown_type()).into_response();
        }
        Parsed::Invalid(e) => {
            warn!("malformed message: {e}");
            return err(StatusCode::BAD_REQUEST, "invalid_message");
        }
    };

    match messages::dispatch(&state, req, OffsetDateTime::now_utc()).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            messages::log_rejected(&ty, &e);
            if matches!(e, AppError::Store(_)) {
                error!("store failure: {e}");
            }
            (e.status(), Json(Reply::error(e.code()))).into_response()
        }
    }
}

#[derive(Deserialize)]
struct NotificationsQuery {
    #[serde(default)]
    after: u64,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPage {
    latest_id: u64,
    notifications: Vec<Notification>,
}

async fn get_notifications(
    State(state): State<AppState>,
    Query(q): Query<NotificationsQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_POLL_LIMIT).clamp(1, QUEUE_CAPACITY);
    let queue = state.notifications.lock().await;
    ok(NotificationPage {
        latest_id: queue.latest_id(),
        notifications: queue.after(q.after, limit),
    })
}

async fn get_settings(State(state): State<AppState>) -> Response {
    let settings = { *state.settings.lock().await };
    ok(settings)
}

async fn post_settings(State(state): State<AppState>, Json(req): Json<SettingsUpdate>) -> Response {
    if let Err(code) = req.validate() {
        return err(StatusCode::BAD_REQUEST, code);
    }

    let settings = req.apply(*state.settings.lock().await);
    {
        let conn = state.conn.lock().await;
        if let Err(e) = settings::save(&conn, settings) {
            error!("save settings failed: {e}");
            return err(StatusCode::INTERNAL_SERVER_ERROR, "db_error");
        }
    }
    *state.settings.lock().await = settings;
    ok(settings)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RulesView {
    focus_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    focus_started_at: Option<String>,
    rules: Vec<BlockRule>,
}

async fn get_blocking_rules(State(state): State<AppState>) -> Response {
    let (focus_active, focus_started_at) = {
        let focus = state.focus.lock().await;
        (focus.is_active(), focus.started_at().map(rfc3339))
    };
    let rules = state.rules.lock().await.rules().to_vec();
    ok(RulesView {
        focus_active,
        focus_started_at,
        rules,
    })
}

#[derive(Deserialize)]
struct CheckQuery {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResult {
    url: String,
    blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_id: Option<u32>,
}

async fn get_blocking_check(
    State(state): State<AppState>,
    Query(q): Query<CheckQuery>,
) -> Response {
    let rule_id = state.rules.lock().await.matching_rule(&q.url).map(|r| r.id);
    ok(CheckResult {
        url: q.url,
        blocked: rule_id.is_some(),
        rule_id,
    })
}

async fn get_export_bookmarks(State(state): State<AppState>) -> Response {
    let now = OffsetDateTime::now_utc();
    let doc = {
        let conn = state.conn.lock().await;
        match bookmarks::export(&conn, now) {
            Ok(doc) => doc,
            Err(e) => return app_err(e),
        }
    };
    let body = match serde_json::to_string_pretty(&doc) {
        Ok(s) => s,
        Err(e) => {
            error!("serialize export failed: {e}");
            return err(StatusCode::INTERNAL_SERVER_ERROR, "serialize_error");
        }
    };
    let disposition = format!(
        "attachment; filename=\"studyflow-bookmarks-{}.json\"",
        state.today(now)
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn post_import_bookmarks(
    State(state): State<AppState>,
    Json(doc): Json<Value>,
) -> Response {
    let mut conn = state.conn.lock().await;
    match bookmarks::import(&mut conn, &doc, OffsetDateTime::now_utc()) {
        Ok(outcome) => ok(outcome),
        Err(e) => app_err(e),
    }
}
