//! Route handlers

use super::error::ApiError;
use super::AppState;
use crate::metrics::{MetricsSnapshot, RequestKind};
use crate::models::{RecommendationModel, TrainingOptions};
use crate::synthetic::SyntheticDataGenerator;
use crate::types::features::TrainingSample;
use crate::types::recommendation::{Prediction, RecommendationSet};
use crate::types::request::{CardData, TransactionContext, UserProfile};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

/// Body of `POST /model/retrain`; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct RetrainRequest {
    /// Labelled samples to train on instead of synthetic data
    pub training_data: Option<Vec<TrainingSample>>,
    /// Overrides the configured epoch count
    pub epochs: Option<usize>,
}

/// Fail on the first listed field absent from the body
fn require_fields(body: &Value, fields: &[&'static str]) -> Result<(), ApiError> {
    match fields.iter().find(|f| body.get(**f).is_none()) {
        Some(missing) => Err(ApiError::MissingField(*missing)),
        None => Ok(()),
    }
}

fn field<T: DeserializeOwned>(body: &Value, name: &'static str) -> Result<T, ApiError> {
    let value = body.get(name).ok_or(ApiError::MissingField(name))?;
    T::deserialize(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid value for field {}: {}", name, e)))
}

fn record_outcome<T>(state: &AppState, result: &Result<T, ApiError>) {
    if result.is_err() {
        state.metrics.record_error();
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let model_trained = state.model.read().await.is_trained();
    Json(json!({
        "status": "healthy",
        "model_trained": model_trained,
        "message": "AI service is running",
    }))
}

fn run_predict(model: &RecommendationModel, body: &Value) -> Result<Prediction, ApiError> {
    require_fields(body, &["transaction", "user_profile", "card_data"])?;
    let transaction: TransactionContext = field(body, "transaction")?;
    let user: UserProfile = field(body, "user_profile")?;
    let card: CardData = field(body, "card_data")?;

    Ok(model.predict(&transaction, &user, &card)?)
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let result = match payload {
        Ok(Json(body)) => run_predict(&*state.model.read().await, &body),
        Err(rejection) => Err(rejection.into()),
    };
    record_outcome(&state, &result);
    let prediction = result?;

    state.metrics.record_score(prediction.score);
    state
        .metrics
        .record_request(RequestKind::Predict, started.elapsed());

    Ok(Json(json!({
        "success": true,
        "prediction": prediction,
    })))
}

fn run_recommend(model: &RecommendationModel, body: &Value) -> Result<RecommendationSet, ApiError> {
    require_fields(body, &["transaction", "user_profile", "available_cards"])?;
    let transaction: TransactionContext = field(body, "transaction")?;
    let user: UserProfile = field(body, "user_profile")?;
    let cards: Vec<Value> = field(body, "available_cards")?;

    Ok(model.recommend(&transaction, &user, &cards))
}

/// POST /recommend
pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let result = match payload {
        Ok(Json(body)) => run_recommend(&*state.model.read().await, &body),
        Err(rejection) => Err(rejection.into()),
    };
    record_outcome(&state, &result);
    let recommendation = result?;

    for card in &recommendation.all_recommendations {
        if card.is_failed() {
            state.metrics.record_card_failure();
        } else {
            state.metrics.record_score(card.score);
        }
    }
    state
        .metrics
        .record_request(RequestKind::Recommend, started.elapsed());

    Ok(Json(json!({
        "success": true,
        "recommendation": recommendation,
    })))
}

/// GET /model/info
pub async fn model_info(State(state): State<AppState>) -> Json<Value> {
    let info = state.model.read().await.info();
    Json(json!({
        "success": true,
        "model_info": info,
    }))
}

fn parse_retrain_request(body: &[u8]) -> Result<RetrainRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RetrainRequest::default());
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    let request = RetrainRequest::deserialize(&mut de)
        .and_then(|r| de.end().map(|_| r))
        .map_err(|e| ApiError::BadRequest(format!("Invalid retrain request: {}", e)))?;

    if request.epochs == Some(0) {
        return Err(ApiError::BadRequest("epochs must be at least 1".to_string()));
    }
    Ok(request)
}

async fn run_retrain(state: &AppState, body: &[u8]) -> Result<Value, ApiError> {
    let request = parse_retrain_request(body)?;

    let mut options = TrainingOptions::from(&state.training);
    if let Some(epochs) = request.epochs {
        options.epochs = epochs;
    }

    let training = state.training.clone();
    let store = state.store.clone();
    let (model, history) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let samples = match request.training_data {
            Some(samples) => samples,
            None => SyntheticDataGenerator::new(training.seed).generate(training.num_samples)?,
        };
        let (model, history) = RecommendationModel::train_new(&samples, &options)?;
        store.save(&model)?;
        Ok((model, history))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Training task failed: {}", e)))??;

    *state.model.write().await = model;
    state.metrics.record_retrain();

    info!(
        epochs = history.epochs_run(),
        final_loss = ?history.final_loss(),
        "Model retrained and swapped in"
    );

    Ok(json!({
        "success": true,
        "message": "Model retrained successfully",
        "training_history": {
            "epochs": history.epochs_run(),
            "final_loss": history.final_loss(),
            "final_accuracy": history.final_accuracy(),
        },
    }))
}

/// POST /model/retrain
pub async fn retrain(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let result = run_retrain(&state, &body).await;
    record_outcome(&state, &result);
    result.map(Json)
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
