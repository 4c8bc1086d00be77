//! Feature extraction for recommendation model inference.
//!
//! Turns the transaction, user profile and card payloads of a request into
//! the same flat record the model was trained on.

use crate::types::features::FeatureVector;
use crate::types::recommendation::Factors;
use crate::types::request::{CardData, TransactionContext, UserProfile};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};

/// Feature extractor that transforms request payloads into model features.
#[derive(Debug)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features for one card at the given moment.
    ///
    /// The time of day and day of week come from `at`, not from the request.
    pub fn extract<Tz: TimeZone>(
        &self,
        transaction: &TransactionContext,
        user: &UserProfile,
        card: &CardData,
        at: &DateTime<Tz>,
    ) -> FeatureVector {
        FeatureVector {
            transaction_amount: transaction.amount,
            monthly_income: user.monthly_income,
            annual_fee: card.annual_fee,
            reward_rate: card.reward_rate(&transaction.category),
            credit_limit: card.typical_credit_limit(),
            signup_bonus: card.signup_bonus_amount(),
            foreign_fee: card.foreign_transaction_fee(),
            category: transaction.category.clone(),
            credit_score: user.credit_score.clone(),
            time_of_day: time_of_day(at.hour()).to_string(),
            day_of_week: day_of_week(at.weekday()).to_string(),
            card_type: card.card_type.clone(),
        }
    }

    /// Inputs reported back to the caller alongside a score.
    pub fn factors(
        &self,
        transaction: &TransactionContext,
        user: &UserProfile,
        card: &CardData,
    ) -> Factors {
        Factors {
            reward_rate: card.reward_rate(&transaction.category),
            annual_fee: card.annual_fee,
            credit_score: user.credit_score.clone(),
            category: transaction.category.clone(),
            transaction_amount: transaction.amount,
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket an hour (0-23) into morning, afternoon or evening
pub fn time_of_day(hour: u32) -> &'static str {
    match hour {
        6..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    }
}

pub fn day_of_week(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sat | Weekday::Sun => "weekend",
        _ => "weekday",
    }
}
