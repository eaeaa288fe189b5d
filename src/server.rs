use crate::error::{InferenceError, ValidationError};
use crate::model::Predictor;
use crate::quote::{location_advisory, FareQuote};
use crate::types::{PredictionOut, TripRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub const SUCCESS_MESSAGE: &str = "Prédiction réussie";

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<Predictor>,
    log_pred: bool,
}

impl AppState {
    pub fn new(predictor: Predictor, log_pred: bool) -> Self {
        Self { predictor: Arc::new(predictor), log_pred }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/docs", get(docs))
        .route("/model-info", get(model_info))
        .route("/predict", post(predict))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ---------- Errors ----------

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse { detail: self.detail, field: self.field });
        (self.status, payload).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: rejection.status(), detail: rejection.body_text(), field: None }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            field: Some(err.field()),
            detail: err.to_string(),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        tracing::error!(error = %err, "inference failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: err.public_message().to_string(),
            field: None,
        }
    }
}

// ---------- Handlers ----------

async fn root() -> Json<Value> {
    Json(json!({ "message": "API Yaoundé v2 opérationnelle", "docs": "/docs" }))
}

async fn health() -> Json<Value> {
    // The process never starts without a model, so reaching here means loaded.
    Json(json!({ "status": "OK", "model": "loaded" }))
}

async fn docs() -> Json<Value> {
    Json(json!({
        "title": "API Prédiction Tarif Taxi Yaoundé",
        "description": "Prédiction du prix de course en FCFA",
        "endpoints": {
            "GET /": "bannière",
            "GET /health": "état du service",
            "GET /model-info": "modèle chargé et ordre des variables",
            "POST /predict": "estimation du prix d'une course"
        },
        "fields": {
            "pluie": "oui/non ou 0/1",
            "etat_route": "bonne, moyenne ou mauvaise",
            "heure": "ex: 14:30 ou 14",
            "jour_semaine": "lundi à dimanche ou 0-6",
            "jour_ferie": "oui/non ou 0/1",
            "bagages": "oui/non ou 0/1",
            "routes_larges": "oui/non ou 0/1",
            "routes_travaux": "oui/non ou 0/1",
            "accident": "oui/non ou 0/1",
            "depart_osm": "lieu de départ",
            "destination_osm": "lieu d'arrivée",
            "distance_km": "distance en km, > 0"
        },
        "example": {
            "pluie": "0", "etat_route": "bonne", "heure": "14", "jour_semaine": "3",
            "jour_ferie": "0", "bagages": "non", "routes_larges": "oui", "routes_travaux": "non",
            "accident": "0", "depart_osm": "Mvan", "destination_osm": "Ngoa-Ekelle", "distance_km": 7.3
        }
    }))
}

#[derive(Debug, Serialize)]
struct ModelInfo<'a> {
    model_loaded: bool,
    model_type: &'static str,
    bundle_name: Option<&'a str>,
    format_version: u32,
    features: &'a [String],
}

async fn model_info(State(state): State<AppState>) -> Response {
    let p = &state.predictor;
    Json(ModelInfo {
        model_loaded: true,
        model_type: p.model_kind(),
        bundle_name: p.name(),
        format_version: p.format_version(),
        features: p.features(),
    })
    .into_response()
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<TripRequest>, JsonRejection>,
) -> Result<Json<PredictionOut>, ApiError> {
    let Json(req) = payload?;
    let row = req.normalize()?;

    let x = state.predictor.encode(&row)?;
    if state.log_pred {
        log_feature_summary(&x, state.predictor.features());
    }

    let raw = state.predictor.infer(&x)?;
    let quote = FareQuote::from_raw(raw)?;
    let all_known = state.predictor.all_locations_known(&row);

    Ok(Json(PredictionOut {
        prix_estime_fcfa: quote.estimate,
        prix_estime_range: quote.range_label(),
        message: SUCCESS_MESSAGE.to_string(),
        lieux_connus: location_advisory(all_known).to_string(),
    }))
}

// LOG_PRED=1: per-request summary of the encoded row
fn log_feature_summary(x: &[f32], names: &[String]) {
    let nz = x.iter().filter(|v| **v != 0.0).count();
    let mean = if x.is_empty() { 0.0 } else { x.iter().sum::<f32>() / (x.len() as f32) };
    let std = if x.len() < 2 {
        0.0
    } else {
        (x.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / (x.len() as f32)).sqrt()
    };
    let sample: Vec<String> = names
        .iter()
        .zip(x)
        .take(6)
        .map(|(name, v)| format!("{name}={v:.3}"))
        .collect();
    tracing::info!(
        "predict in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
        x.len(),
        nz,
        mean,
        std,
        sample.join(", ")
    );
}
