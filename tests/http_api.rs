//! End-to-end tests of the HTTP API against a quickly trained model

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use card_recommender::config::TrainingConfig;
use card_recommender::models::{ModelStore, RecommendationModel, TrainingOptions};
use card_recommender::{router, AppState, ServiceMetrics, SyntheticDataGenerator};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn quick_training() -> TrainingConfig {
    TrainingConfig {
        num_samples: 300,
        epochs: 3,
        ..TrainingConfig::default()
    }
}

fn trained_state(dir: &Path) -> AppState {
    let training = quick_training();
    let samples = SyntheticDataGenerator::new(training.seed)
        .generate(training.num_samples)
        .unwrap();
    let (model, _) =
        RecommendationModel::train_new(&samples, &TrainingOptions::from(&training)).unwrap();
    AppState::new(
        model,
        ModelStore::in_dir(dir),
        training,
        Arc::new(ServiceMetrics::new()),
    )
}

fn untrained_state(dir: &Path) -> AppState {
    AppState::new(
        RecommendationModel::new(42),
        ModelStore::in_dir(dir),
        quick_training(),
        Arc::new(ServiceMetrics::new()),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn dining_request() -> Value {
    json!({
        "transaction": {"amount": 50, "category": "dining"},
        "user_profile": {"monthlyIncome": 6000, "creditScore": "good"},
        "card_data": {
            "name": "Dining Rewards",
            "annualFee": 95,
            "rewards": {"dining": 3, "other": 1},
            "type": "cashback"
        }
    })
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(router(trained_state(dir.path())), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_trained"], true);
    assert_eq!(body["message"], "AI service is running");
}

#[tokio::test]
async fn test_predict() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(
        router(trained_state(dir.path())),
        post_json("/predict", &dining_request()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let prediction = &body["prediction"];
    let score = prediction["score"].as_f64().unwrap();
    let confidence = prediction["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert!((confidence - (score - 0.5).abs() * 2.0).abs() < 1e-9);
    assert_eq!(prediction["factors"]["reward_rate"], 3.0);
    assert_eq!(prediction["factors"]["annual_fee"], 95.0);
    assert_eq!(prediction["factors"]["credit_score"], "good");
    assert_eq!(prediction["factors"]["category"], "dining");
    assert_eq!(prediction["factors"]["transaction_amount"], 50.0);
}

#[tokio::test]
async fn test_predict_missing_field() {
    let dir = TempDir::new().unwrap();
    let mut request = dining_request();
    request.as_object_mut().unwrap().remove("card_data");

    let (status, body) = send(
        router(trained_state(dir.path())),
        post_json("/predict", &request),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required field: card_data");
}

#[tokio::test]
async fn test_predict_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"transaction\": "))
        .unwrap();

    let (status, body) = send(router(trained_state(dir.path())), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_predict_rejects_wrong_field_type() {
    let dir = TempDir::new().unwrap();
    let mut request = dining_request();
    request["transaction"]["amount"] = json!("fifty");

    let (status, body) = send(
        router(trained_state(dir.path())),
        post_json("/predict", &request),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("transaction"));
}

#[tokio::test]
async fn test_predict_untrained_model() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(
        router(untrained_state(dir.path())),
        post_json("/predict", &dining_request()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Model not trained. Please train the model first."
    );
}

#[tokio::test]
async fn test_predict_unknown_category() {
    let dir = TempDir::new().unwrap();
    let mut request = dining_request();
    request["card_data"]["type"] = json!("platinum");

    let (status, body) = send(
        router(trained_state(dir.path())),
        post_json("/predict", &request),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("platinum"));
}

#[tokio::test]
async fn test_recommend() {
    let dir = TempDir::new().unwrap();
    let request = json!({
        "transaction": {"amount": 120, "category": "travel"},
        "user_profile": {"monthlyIncome": 9000, "creditScore": "excellent"},
        "available_cards": [
            {"name": "Travel Elite", "annualFee": 550, "rewards": {"travel": 5, "other": 1}, "type": "travel"},
            {"name": "Everyday Cash", "annualFee": 0, "rewards": {"other": 1.5}, "type": "cashback"},
            {"name": "Student Starter", "rewards": {"dining": 2}, "type": "student"},
            {"name": "Unknown Tier", "type": "platinum"}
        ]
    });

    let (status, body) = send(
        router(trained_state(dir.path())),
        post_json("/recommend", &request),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let recommendation = &body["recommendation"];
    let all = recommendation["all_recommendations"].as_array().unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(recommendation["alternatives"].as_array().unwrap().len(), 2);
    assert_eq!(recommendation["recommended"], all[0]);

    let scores: Vec<f64> = all.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    let failed = all
        .iter()
        .find(|r| r["card"]["name"] == "Unknown Tier")
        .unwrap();
    assert_eq!(failed["score"], 0.5);
    assert_eq!(failed["confidence"], 0.5);
    assert_eq!(failed["factors"]["error"], "Prediction failed");
}

#[tokio::test]
async fn test_recommend_missing_cards() {
    let dir = TempDir::new().unwrap();
    let request = json!({
        "transaction": {"amount": 120, "category": "travel"},
        "user_profile": {}
    });

    let (status, body) = send(
        router(trained_state(dir.path())),
        post_json("/recommend", &request),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: available_cards");
}

#[tokio::test]
async fn test_model_info() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(router(trained_state(dir.path())), get("/model/info")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let info = &body["model_info"];
    assert_eq!(info["is_trained"], true);
    assert_eq!(info["architecture"]["layers"], 8);
    assert_eq!(info["architecture"]["total_params"], 12_545);
    assert_eq!(info["features"]["total"], 12);
    assert_eq!(info["features"]["numerical"].as_array().unwrap().len(), 7);
    assert_eq!(info["features"]["categorical"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_retrain_with_supplied_data() {
    let dir = TempDir::new().unwrap();
    let state = untrained_state(dir.path());
    let samples = SyntheticDataGenerator::new(7).generate(200).unwrap();
    let request = json!({"training_data": samples, "epochs": 2});

    let (status, body) = send(router(state.clone()), post_json("/model/retrain", &request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Model retrained successfully");
    assert_eq!(body["training_history"]["epochs"], 2);
    assert!(body["training_history"]["final_loss"].as_f64().unwrap() > 0.0);
    assert!(body["training_history"]["final_accuracy"].is_number());

    assert!(ModelStore::in_dir(dir.path()).exists());

    let (_, health) = send(router(state), get("/health")).await;
    assert_eq!(health["model_trained"], true);
}

#[tokio::test]
async fn test_retrain_with_synthetic_data() {
    let dir = TempDir::new().unwrap();
    let state = trained_state(dir.path());
    let before = state.model.read().await.metadata().map(|m| m.model_id);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/model/retrain")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["training_history"]["epochs"], 3);

    let after = state.model.read().await.metadata().map(|m| m.model_id);
    assert!(after.is_some());
    assert_ne!(before, after);
}

#[tokio::test]
async fn test_retrain_rejects_bad_training_data() {
    let dir = TempDir::new().unwrap();
    let request = json!({"training_data": [{"category": "dining"}]});

    let (status, body) = send(
        router(untrained_state(dir.path())),
        post_json("/model/retrain", &request),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_metrics_track_requests() {
    let dir = TempDir::new().unwrap();
    let state = trained_state(dir.path());

    send(router(state.clone()), post_json("/predict", &dining_request())).await;
    send(router(state.clone()), post_json("/predict", &json!({}))).await;

    let (status, body) = send(router(state), get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions_served"], 1);
    assert_eq!(body["cards_scored"], 1);
    assert_eq!(body["request_errors"], 1);
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(router(trained_state(dir.path())), get("/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn test_cors_headers() {
    let dir = TempDir::new().unwrap();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = router(trained_state(dir.path()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
