//! Offline Model Trainer
//!
//! Trains the recommendation model on synthetic data, saves the artifacts and
//! runs a sample prediction against the result.

use card_recommender::config::{AppConfig, DEFAULT_CONFIG_PATH};
use card_recommender::models::{ModelStore, RecommendationModel, TrainingOptions};
use card_recommender::{CardData, SyntheticDataGenerator, TransactionContext, UserProfile};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

fn sample_card() -> CardData {
    let mut rewards = HashMap::new();
    rewards.insert("dining".to_string(), 3.0);
    rewards.insert("other".to_string(), 1.0);

    CardData {
        name: Some("Sample Dining Card".to_string()),
        annual_fee: 95.0,
        rewards,
        card_type: "cashback".to_string(),
        ..CardData::default()
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("train_model=info".parse()?)
                .add_directive("card_recommender=info".parse()?),
        )
        .init();

    info!("Starting Offline Model Trainer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).map(|s| s.as_str()).unwrap_or(DEFAULT_CONFIG_PATH);
    let config = AppConfig::load_from_path(config_path)?;
    let num_samples: usize = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(config.training.num_samples);

    info!(
        config = %config_path,
        samples = num_samples,
        epochs = config.training.epochs,
        models_dir = %config.model.models_dir,
        "Configuration loaded"
    );

    let started = Instant::now();
    let samples = SyntheticDataGenerator::new(config.training.seed).generate(num_samples)?;
    let options = TrainingOptions::from(&config.training);
    let (model, history) = RecommendationModel::train_new(&samples, &options)?;

    info!(
        epochs = history.epochs_run(),
        best_epoch = history.best_epoch,
        stopped_early = history.stopped_early,
        final_loss = ?history.final_loss(),
        final_accuracy = ?history.final_accuracy(),
        best_val_loss = ?history.best_validation_loss(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Training finished"
    );

    let store = ModelStore::new(&config.model);
    store.save(&model)?;

    // Sample prediction
    let transaction = TransactionContext {
        amount: 50.0,
        category: "dining".to_string(),
    };
    let user = UserProfile::default();
    let prediction = model.predict(&transaction, &user, &sample_card())?;

    info!(
        score = prediction.score,
        confidence = prediction.confidence,
        "Test prediction"
    );
    println!("{}", serde_json::to_string_pretty(&prediction)?);

    Ok(())
}
