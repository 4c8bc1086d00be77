//! Inbound request payload structures
//!
//! Every field is optional on the wire; missing values fall back to the
//! same defaults used when the model was trained on synthetic data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_amount() -> f64 {
    100.0
}

fn default_category() -> String {
    "general".to_string()
}

fn default_monthly_income() -> f64 {
    5000.0
}

fn default_credit_score() -> String {
    "good".to_string()
}

fn default_card_type() -> String {
    "cashback".to_string()
}

/// The purchase being made
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContext {
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default = "default_category")]
    pub category: String,
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            category: default_category(),
        }
    }
}

/// The card holder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default = "default_monthly_income")]
    pub monthly_income: f64,
    #[serde(default = "default_credit_score")]
    pub credit_score: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            monthly_income: default_monthly_income(),
            credit_score: default_credit_score(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditLimitRange {
    pub typical: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupBonus {
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFeatures {
    pub foreign_transaction_fee: Option<f64>,
}

/// A card product being scored
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub annual_fee: f64,
    /// Reward rate per category; `other` is the catch-all rate
    #[serde(default)]
    pub rewards: HashMap<String, f64>,
    #[serde(default)]
    pub credit_limit_range: CreditLimitRange,
    #[serde(default)]
    pub signup_bonus: SignupBonus,
    #[serde(default)]
    pub features: CardFeatures,
    #[serde(rename = "type", default = "default_card_type")]
    pub card_type: String,
}

impl CardData {
    /// Reward rate for a category, falling back to `other` then 1.0
    pub fn reward_rate(&self, category: &str) -> f64 {
        self.rewards
            .get(category)
            .or_else(|| self.rewards.get("other"))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn typical_credit_limit(&self) -> f64 {
        self.credit_limit_range.typical.unwrap_or(10000.0)
    }

    pub fn signup_bonus_amount(&self) -> f64 {
        self.signup_bonus.amount.unwrap_or(0.0)
    }

    pub fn foreign_transaction_fee(&self) -> f64 {
        self.features.foreign_transaction_fee.unwrap_or(0.0)
    }

    /// Display name used in logs
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

impl Default for CardData {
    fn default() -> Self {
        Self {
            name: None,
            annual_fee: 0.0,
            rewards: HashMap::new(),
            credit_limit_range: CreditLimitRange::default(),
            signup_bonus: SignupBonus::default(),
            features: CardFeatures::default(),
            card_type: default_card_type(),
        }
    }
}
