//! COP-1 HTTP console.
//!
//! This crate provides an HTTP API to drive the FOP engines of an uplink by hand: submit frames
//! and directives, inject CLCWs and read back what the engines reported.
//!
//! # HTTP API Routes
//!
//! ## Journal
//! `GET /`
//!
//! Returns the status of every engine followed by the most recent notifications.
//!
//! ## Send AD Frame
//! `POST /vc/{vcid}/ad`
//!
//! Submits the request body as the data field of a sequence-controlled frame and waits for the
//! FOP to accept or reject it.
//!
//! ## Send BD Frame
//! `POST /vc/{vcid}/bd`
//!
//! Same as above for an expedited frame.
//!
//! ## Directive
//! `POST /vc/{vcid}/directive/{name}` or `POST /vc/{vcid}/directive/{name}/{value}`
//!
//! Issues a FOP directive and returns its tag. Names: `init-without-clcw`, `init-with-clcw`,
//! `init-with-unlock`, `init-with-set-vr/{vr}`, `terminate`, `resume`, `set-vs/{vs}`,
//! `set-window/{k}`, `set-t1/{millis}`, `set-limit/{n}`, `set-timeout-type/{0|1}`.
//!
//! ## CLCW
//! `POST /clcw/{vcid}/{report}/{flags}`
//!
//! Delivers a COP-1 CLCW with report value `report`. `flags` holds any of the letters `l`
//! (lockout), `w` (wait) and `r` (retransmit), or `-` for none.
//!
//! # Error Responses
//!
//! - `404 Not Found`: Returned when no engine serves the virtual channel
//! - `400 Bad Request`: Returned for an unknown directive or a malformed value
//! - `409 Conflict`: Returned when the FOP rejected a frame or did not accept it in time
//! - `500 Internal Server Error`: Returned when the engine has been disposed

use std::{
    collections::VecDeque,
    fmt::Write as _,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use cop1_core::{
    Clcw, FopConfig, FopDirective, FopNotification, SharedCounter, TimeoutType, TransferFrame,
};
use cop1_tokio::{FopEngine, FopObserver, Uplink};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

const JOURNAL_LEN: usize = 256;
const ACCEPT_WAIT: Duration = Duration::from_secs(1);

/// Keeps the latest notifications of all engines for `GET /`.
#[derive(Clone, Default)]
struct Journal {
    entries: Arc<Mutex<VecDeque<String>>>,
    vcid: u8,
}
impl Journal {
    fn for_vc(&self, vcid: u8) -> Self {
        Self {
            entries: self.entries.clone(),
            vcid,
        }
    }
}

impl FopObserver for Journal {
    fn notify(&self, notification: &FopNotification) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() == JOURNAL_LEN {
                entries.pop_front();
            }
            entries.push_back(format!("VC {}: {notification:?}", self.vcid));
        }
    }
}

#[derive(Clone)]
struct AppState {
    uplink: Uplink,
    journal: Journal,
    tags: Arc<AtomicU64>,
}

type ApiError = (StatusCode, String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::ERROR.into())
                .with_env_var("COP1_LOG")
                .from_env_lossy(),
        )
        .init();

    let uplink = Uplink::new();
    let journal = Journal::default();
    let engine = FopEngine::spawn(
        FopConfig::default(),
        SharedCounter::new(0),
        |frame: &TransferFrame| {
            info!("uplinking {frame}");
            true
        },
    )?;
    engine.register_observer(journal.for_vc(engine.vcid()))?;
    uplink.add(engine).await?;
    uplink.monitor(Duration::from_secs(15));

    let state = AppState {
        uplink: uplink.clone(),
        journal,
        tags: Arc::new(AtomicU64::new(1)),
    };
    let app = Router::new()
        .route("/", get(get_journal))
        .route("/vc/{vcid}/ad", post(vc_ad))
        .route("/vc/{vcid}/bd", post(vc_bd))
        .route("/vc/{vcid}/directive/{name}", post(vc_directive))
        .route("/vc/{vcid}/directive/{name}/{value}", post(vc_directive_value))
        .route("/clcw/{vcid}/{report}/{flags}", post(clcw))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:8000").await?;
    axum::serve(listener, app).await?;

    uplink.dispose_all().await;
    Ok(())
}

async fn get_journal(State(state): State<AppState>) -> String {
    let mut out = String::new();
    let engines: Vec<_> = state.uplink.engines().lock().await.values().cloned().collect();
    for engine in engines {
        if let Ok(status) = engine.status().await {
            writeln!(out, "VC {}: {status:#?}", engine.vcid()).ok();
        }
    }
    if let Ok(entries) = state.journal.entries.lock() {
        for entry in entries.iter() {
            writeln!(out, "{entry}").ok();
        }
    }
    out
}

async fn engine(state: &AppState, vcid: u8) -> Result<FopEngine, ApiError> {
    state
        .uplink
        .engine(vcid)
        .await
        .ok_or((StatusCode::NOT_FOUND, format!("no engine for VC {vcid}")))
}

fn internal(e: &anyhow::Error) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn submit(state: &AppState, vcid: u8, frame: TransferFrame) -> Result<StatusCode, ApiError> {
    let engine = engine(state, vcid).await?;
    if engine
        .transmit_frame_and_wait(frame, ACCEPT_WAIT)
        .await
        .map_err(|e| internal(&e))?
    {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err((StatusCode::CONFLICT, "frame not accepted".to_string()))
    }
}

async fn vc_ad(
    Path(vcid): Path<u8>,
    State(state): State<AppState>,
    data: Bytes,
) -> Result<StatusCode, ApiError> {
    submit(&state, vcid, TransferFrame::ad(data.to_vec())).await
}

async fn vc_bd(
    Path(vcid): Path<u8>,
    State(state): State<AppState>,
    data: Bytes,
) -> Result<StatusCode, ApiError> {
    submit(&state, vcid, TransferFrame::bd(data.to_vec())).await
}

async fn vc_directive(
    Path((vcid, name)): Path<(u8, String)>,
    State(state): State<AppState>,
) -> Result<String, ApiError> {
    issue(&state, vcid, parse_directive(&name, None)?).await
}

async fn vc_directive_value(
    Path((vcid, name, value)): Path<(u8, String, u32)>,
    State(state): State<AppState>,
) -> Result<String, ApiError> {
    issue(&state, vcid, parse_directive(&name, Some(value))?).await
}

async fn issue(state: &AppState, vcid: u8, directive: FopDirective) -> Result<String, ApiError> {
    let engine = engine(state, vcid).await?;
    let tag = state.tags.fetch_add(1, Ordering::Relaxed);
    engine
        .directive(tag, directive)
        .map_err(|e| internal(&e))?;
    Ok(tag.to_string())
}

fn parse_directive(name: &str, value: Option<u32>) -> Result<FopDirective, ApiError> {
    let bad_request = |msg: String| (StatusCode::BAD_REQUEST, msg);
    let octet = || {
        value
            .ok_or_else(|| bad_request(format!("{name} needs a value")))
            .and_then(|v| {
                u8::try_from(v).map_err(|_| bad_request(format!("{v} is not in 0..=255")))
            })
    };
    let directive = match name {
        "init-without-clcw" => FopDirective::InitAdWithoutClcw,
        "init-with-clcw" => FopDirective::InitAdWithClcw,
        "init-with-unlock" => FopDirective::InitAdWithUnlock,
        "init-with-set-vr" => FopDirective::InitAdWithSetVr(octet()?),
        "terminate" => FopDirective::Terminate,
        "resume" => FopDirective::Resume,
        "set-vs" => FopDirective::SetVs(octet()?),
        "set-window" => FopDirective::SetSlidingWindow(octet()?),
        "set-t1" => FopDirective::SetT1Initial(Duration::from_millis(
            value
                .ok_or_else(|| bad_request("set-t1 needs a value".to_string()))?
                .into(),
        )),
        "set-limit" => FopDirective::SetTransmissionLimit(
            value.ok_or_else(|| bad_request("set-limit needs a value".to_string()))?,
        ),
        "set-timeout-type" => FopDirective::SetTimeoutType(match value {
            Some(0) => TimeoutType::Alert,
            Some(1) => TimeoutType::Suspend,
            _ => return Err(bad_request("timeout type is 0 or 1".to_string())),
        }),
        _ => return Err(bad_request(format!("unknown directive {name}"))),
    };
    Ok(directive)
}

fn parse_clcw(vcid: u8, report: u8, flags: &str) -> Result<Clcw, ApiError> {
    let mut clcw = Clcw::cop1(vcid, report);
    for flag in flags.chars() {
        clcw = match flag {
            'l' => clcw.with_lockout(),
            'w' => clcw.with_wait(),
            'r' => clcw.with_retransmit(),
            '-' => clcw,
            other => {
                return Err((StatusCode::BAD_REQUEST, format!("unknown CLCW flag {other}")));
            }
        };
    }
    Ok(clcw)
}

async fn clcw(
    Path((vcid, report, flags)): Path<(u8, u8, String)>,
    State(state): State<AppState>,
) -> Result<(), ApiError> {
    let clcw = parse_clcw(vcid, report, &flags)?;
    if state
        .uplink
        .deliver_clcw(clcw)
        .await
        .map_err(|e| internal(&e))?
    {
        Ok(())
    } else {
        Err((StatusCode::NOT_FOUND, format!("no engine for VC {vcid}")))
    }
}
