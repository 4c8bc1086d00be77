//! Type definitions for the recommendation service

pub mod features;
pub mod recommendation;
pub mod request;

pub use features::{FeatureVector, TrainingSample};
pub use recommendation::{CardRecommendation, Factors, Prediction, RecommendationSet};
pub use request::{CardData, TransactionContext, UserProfile};
