use std::time::{Duration, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::health::{HealthState, StateLabel};
use crate::ranking::{Availability, CandidateStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
    pub candidates: usize,
    pub usable: usize,
    pub held_best: Option<String>,
    pub open_connections: usize,
    pub probes_in_flight: usize,
    pub ranking_version: u64,
}

/// JSON rendering of a [`CandidateStatus`].
///
/// `last_duration_ms` is the ranking key and is absent for sentinel states;
/// `last_measured_ms` also covers the measured RTT of an unqualified candidate.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateView {
    pub rank: usize,
    pub tag: String,
    pub state: StateLabel,
    pub last_duration_ms: Option<f64>,
    pub last_measured_ms: Option<f64>,
    pub last_probe_time: Option<u64>,
    pub consecutive_failures: u32,
    pub consecutive_borderline: u32,
    pub last_failure: Option<String>,
}

impl CandidateView {
    pub fn new(rank: usize, status: &CandidateStatus) -> Self {
        let ranking_key = match status.state {
            HealthState::Qualified { rtt } => Some(rtt),
            _ => None,
        };
        Self {
            rank,
            tag: status.tag.clone(),
            state: status.label(),
            last_duration_ms: ranking_key.map(millis),
            last_measured_ms: status.state.measured().map(millis),
            last_probe_time: status
                .last_probe_time
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64),
            consecutive_failures: status.consecutive_failures,
            consecutive_borderline: status.consecutive_borderline,
            last_failure: match &status.state {
                HealthState::Failed { reason } => Some(reason.to_string()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BestView {
    pub available: bool,
    pub held: Option<CandidateView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let obs = &state.observatory;
    let ranking = obs.ranking();
    let usable = match ranking.availability() {
        Availability::Available { usable } => usable,
        Availability::NoneUsable => 0,
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if obs.is_stopped() { "stopped" } else { "operational" }.to_string(),
        uptime_secs: obs.uptime().as_secs(),
        candidates: ranking.len(),
        usable,
        held_best: obs.held_best(),
        open_connections: obs.open_connections(),
        probes_in_flight: obs.probes_in_flight(),
        ranking_version: ranking.version(),
    })
}

pub async fn get_ranking(State(state): State<AdminState>) -> Json<Vec<CandidateView>> {
    let ranking = state.observatory.ranking();
    Json(
        ranking
            .entries()
            .iter()
            .enumerate()
            .map(|(i, status)| CandidateView::new(i + 1, status))
            .collect(),
    )
}

pub async fn get_candidate(State(state): State<AdminState>, Path(tag): Path<String>) -> Response {
    let ranking = state.observatory.ranking();
    match (ranking.position(&tag), ranking.get(&tag)) {
        (Some(i), Some(status)) => Json(CandidateView::new(i + 1, status)).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("candidate not registered: {tag}"),
            }),
        )
            .into_response(),
    }
}

/// The held best as last chosen by the selector. Does not re-evaluate.
pub async fn get_best(State(state): State<AdminState>) -> Json<BestView> {
    let obs = &state.observatory;
    let ranking = obs.ranking();
    let held = obs.held_best().and_then(|tag| {
        let i = ranking.position(&tag)?;
        ranking.get(&tag).map(|status| CandidateView::new(i + 1, status))
    });

    Json(BestView {
        available: matches!(ranking.availability(), Availability::Available { .. }),
        held,
    })
}
