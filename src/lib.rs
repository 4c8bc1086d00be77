//! Credit Card Recommendation Service Library
//!
//! Scores how well a credit card fits a transaction and user profile with a
//! small feed-forward network, and serves those scores over HTTP.

pub mod config;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod server;
pub mod synthetic;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use metrics::ServiceMetrics;
pub use models::{ModelError, ModelStore, RecommendationModel};
pub use server::{router, AppState};
pub use synthetic::SyntheticDataGenerator;
pub use types::{CardData, FeatureVector, Prediction, TrainingSample, TransactionContext, UserProfile};
