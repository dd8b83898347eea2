//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backtest::{BacktestReport, Backtester};
use crate::strategy::SelectionMemory;
use crate::types::{BacktestError, HandicapLine, Side};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Sessions kept before the least recently used one is evicted.
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub backtester: Backtester,
    pub sessions: RwLock<SessionStore>,
}

impl DashboardState {
    pub fn new(backtester: Backtester) -> Self {
        Self::with_capacity(backtester, DEFAULT_SESSION_CAPACITY)
    }

    pub fn with_capacity(backtester: Backtester, session_capacity: usize) -> Self {
        Self {
            backtester,
            sessions: RwLock::new(SessionStore::new(session_capacity)),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionSlot {
    memory: SelectionMemory,
    touched: u64,
}

/// Bounded map of session id to selection memory, evicting the least
/// recently written slot when full.
#[derive(Debug)]
pub struct SessionStore {
    slots: HashMap<String, SessionSlot>,
    capacity: usize,
    clock: u64,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn memory(&self, session: &str) -> Option<&SelectionMemory> {
        self.slots.get(session).map(|slot| &slot.memory)
    }

    /// Store `memory` for `session`, evicting the stalest slot if needed.
    pub fn remember(&mut self, session: String, memory: SelectionMemory) {
        self.clock += 1;
        if !self.slots.contains_key(&session) && self.slots.len() >= self.capacity {
            let stalest = self
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(id, _)| id.clone());
            if let Some(id) = stalest {
                self.slots.remove(&id);
                debug!(session = %id, "Evicted selection memory");
            }
        }
        let touched = self.clock;
        self.slots.insert(session, SessionSlot { memory, touched });
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionsResponse {
    pub matches: usize,
    pub competitions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinesQuery {
    pub competition: String,
    pub side: Side,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinesResponse {
    pub competition: String,
    pub side: Side,
    pub lines: Vec<HandicapLine>,
    /// The line that would be preselected for this session.
    pub default_line: HandicapLine,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestRequest {
    #[serde(default)]
    pub session: Option<String>,
    pub competition: String,
    pub side: Side,
    #[serde(default)]
    pub line: Option<HandicapLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResponse {
    pub session: String,
    pub report: BacktestReport,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Domain error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub BacktestError);

impl From<BacktestError> for ApiError {
    fn from(err: BacktestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            BacktestError::InvalidLine(_) => (StatusCode::BAD_REQUEST, "invalid_line"),
            BacktestError::LineUnavailable { .. } => (StatusCode::BAD_REQUEST, "line_unavailable"),
            BacktestError::EmptyCandidateSet { .. } => (StatusCode::NOT_FOUND, "no_data"),
            BacktestError::UndefinedRoi { .. } => (StatusCode::NOT_FOUND, "undefined_roi"),
            BacktestError::NotSettleable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "not_settleable"),
        };
        warn!(error = %self.0, code, "Request rejected");
        let body = ErrorResponse {
            error: code.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/competitions
pub async fn get_competitions(State(state): State<AppState>) -> Json<CompetitionsResponse> {
    Json(CompetitionsResponse {
        matches: state.backtester.len(),
        competitions: state.backtester.competitions(),
    })
}

/// GET /api/lines
pub async fn get_lines(
    State(state): State<AppState>,
    Query(query): Query<LinesQuery>,
) -> Result<Json<LinesResponse>, ApiError> {
    let lines = state.backtester.display_lines(&query.competition, query.side)?;

    let memory = match &query.session {
        Some(id) => state.sessions.read().await.memory(id).cloned().unwrap_or_default(),
        None => SelectionMemory::new(),
    };
    let default_line = memory.default_for(&lines)?;

    Ok(Json(LinesResponse {
        competition: query.competition,
        side: query.side,
        lines,
        default_line,
    }))
}

/// POST /api/backtest
pub async fn post_backtest(
    State(state): State<AppState>,
    Json(request): Json<BacktestRequest>,
) -> Result<Json<BacktestResponse>, ApiError> {
    let session = request
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Resolve and remember under one write lock; failed selections leave no slot.
    let line = {
        let mut sessions = state.sessions.write().await;
        let mut memory = sessions.memory(&session).cloned().unwrap_or_default();
        let line = state.backtester.select_line(
            &request.competition,
            request.side,
            request.line,
            &mut memory,
        )?;
        sessions.remember(session.clone(), memory);
        line
    };

    let report = state.backtester.run(&request.competition, request.side, line)?;
    info!(
        session = %session,
        competition = %request.competition,
        side = %request.side,
        line = %line,
        bets = report.overall.count,
        "Backtest served"
    );

    Ok(Json(BacktestResponse { session, report }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
