//! Synthetic training data generation.
//!
//! Produces realistic-looking card/transaction records and labels them with
//! a hand-weighted recommendation score plus a little Gaussian noise.

use crate::types::features::{
    FeatureVector, TrainingSample, CARD_TYPES, CATEGORIES, CREDIT_SCORES, DAYS_OF_WEEK,
    TIMES_OF_DAY,
};
use anyhow::Result;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Exp, LogNormal, Normal};
use tracing::info;

/// Default seed so repeated startups train on identical data
pub const DEFAULT_SEED: u64 = 42;

/// Default number of generated samples
pub const DEFAULT_SAMPLES: usize = 10_000;

const ANNUAL_FEES: [f64; 6] = [0.0, 95.0, 195.0, 295.0, 495.0, 695.0];
const ANNUAL_FEE_WEIGHTS: [f64; 6] = [0.3, 0.2, 0.2, 0.15, 0.1, 0.05];
const MAX_ANNUAL_FEE: f64 = 695.0;

const FOREIGN_FEES: [f64; 2] = [0.0, 0.03];
const FOREIGN_FEE_WEIGHTS: [f64; 2] = [0.7, 0.3];

const CREDIT_SCORE_WEIGHTS: [f64; 5] = [0.1, 0.2, 0.3, 0.25, 0.15];

/// Standard deviation of the label noise
const LABEL_NOISE_STD: f64 = 0.05;

/// Seeded generator for labelled training records
pub struct SyntheticDataGenerator {
    rng: StdRng,
}

impl SyntheticDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate `count` labelled samples
    pub fn generate(&mut self, count: usize) -> Result<Vec<TrainingSample>> {
        info!(samples = count, "Generating synthetic training samples");

        let amount_dist = Exp::<f64>::new(1.0 / 50.0)?;
        let income_dist = Normal::<f64>::new(5000.0, 2000.0)?;
        let reward_dist = Beta::<f64>::new(2.0, 5.0)?;
        let limit_dist = LogNormal::<f64>::new(10.0, 0.5)?;
        let bonus_dist = Exp::<f64>::new(1.0 / 200.0)?;
        let noise_dist = Normal::<f64>::new(0.0, LABEL_NOISE_STD)?;
        let fee_index = WeightedIndex::new(ANNUAL_FEE_WEIGHTS)?;
        let foreign_index = WeightedIndex::new(FOREIGN_FEE_WEIGHTS)?;
        let score_index = WeightedIndex::new(CREDIT_SCORE_WEIGHTS)?;

        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let rng = &mut self.rng;

            let transaction_amount = amount_dist.sample(rng) + 10.0;
            let monthly_income = income_dist.sample(rng) + 2000.0;
            let annual_fee = ANNUAL_FEES[fee_index.sample(rng)];
            let reward_rate = reward_dist.sample(rng) * 5.0 + 0.5;
            let credit_limit = limit_dist.sample(rng);
            let signup_bonus = if rng.gen::<f64>() > 0.3 {
                bonus_dist.sample(rng)
            } else {
                0.0
            };
            let foreign_fee = FOREIGN_FEES[foreign_index.sample(rng)];

            let features = FeatureVector {
                transaction_amount,
                monthly_income,
                annual_fee,
                reward_rate,
                credit_limit,
                signup_bonus,
                foreign_fee,
                category: pick(rng, &CATEGORIES),
                credit_score: CREDIT_SCORES[score_index.sample(rng)].to_string(),
                time_of_day: pick(rng, &TIMES_OF_DAY),
                day_of_week: pick(rng, &DAYS_OF_WEEK),
                card_type: pick(rng, &CARD_TYPES),
            };

            let noise = noise_dist.sample(rng);
            let recommendation_score = (base_score(&features) + noise).clamp(0.0, 1.0);

            samples.push(TrainingSample {
                features,
                recommendation_score,
            });
        }

        Ok(samples)
    }
}

impl Default for SyntheticDataGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

fn pick(rng: &mut StdRng, choices: &[&str]) -> String {
    choices[rng.gen_range(0..choices.len())].to_string()
}

/// Weight a credit score band contributes to the label
pub fn credit_score_weight(credit_score: &str) -> f64 {
    match credit_score {
        "poor" => 0.2,
        "fair" => 0.4,
        "good" => 0.6,
        "very_good" => 0.8,
        "excellent" => 1.0,
        _ => 0.0,
    }
}

/// Bonus for categories where card rewards usually matter most
pub fn category_bonus(category: &str) -> f64 {
    match category {
        "travel" => 0.05,
        "dining" => 0.03,
        "groceries" | "gas" => 0.02,
        _ => 0.0,
    }
}

/// Noise-free recommendation score for a record.
///
/// Weights: reward rate 40%, annual fee 20%, credit score 15%, signup bonus
/// 10%, income 10%, category bonus up to 5%.
pub fn base_score(f: &FeatureVector) -> f64 {
    let mut score = 0.0;

    score += (f.reward_rate / 5.0) * 0.4;

    if f.annual_fee == 0.0 {
        score += 0.2;
    } else {
        score += ((1.0 - f.annual_fee / MAX_ANNUAL_FEE) * 0.2).max(0.0);
    }

    score += credit_score_weight(&f.credit_score) * 0.15;
    score += (f.signup_bonus / 1000.0).min(1.0) * 0.1;
    score += (f.monthly_income / 10000.0).min(1.0) * 0.1;
    score += category_bonus(&f.category);

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(category: &str, credit_score: &str) -> FeatureVector {
        FeatureVector {
            transaction_amount: 50.0,
            monthly_income: 5000.0,
            annual_fee: 0.0,
            reward_rate: 2.5,
            credit_limit: 20000.0,
            signup_bonus: 500.0,
            foreign_fee: 0.0,
            category: category.to_string(),
            credit_score: credit_score.to_string(),
            time_of_day: "morning".to_string(),
            day_of_week: "weekday".to_string(),
            card_type: "cashback".to_string(),
        }
    }

    #[test]
    fn test_base_score() {
        // 0.2 (reward) + 0.2 (no fee) + 0.09 (good) + 0.05 (bonus) + 0.05 (income) + 0.05 (travel)
        let score = base_score(&features("travel", "good"));
        assert!((score - 0.64).abs() < 1e-9);

        let mut expensive = features("shopping", "poor");
        expensive.annual_fee = 695.0;
        // 0.2 + 0.0 + 0.03 + 0.05 + 0.05 + 0.0
        assert!((base_score(&expensive) - 0.33).abs() < 1e-9);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = SyntheticDataGenerator::new(42).generate(50).unwrap();
        let b = SyntheticDataGenerator::new(42).generate(50).unwrap();
        assert_eq!(a, b);

        let c = SyntheticDataGenerator::new(7).generate(50).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_generated_ranges() {
        let samples = SyntheticDataGenerator::default().generate(2000).unwrap();
        assert_eq!(samples.len(), 2000);

        for s in &samples {
            let f = &s.features;
            assert!((0.0..=1.0).contains(&s.recommendation_score));
            assert!(f.transaction_amount >= 10.0);
            assert!(f.reward_rate >= 0.5 && f.reward_rate <= 5.5);
            assert!(f.credit_limit > 0.0);
            assert!(f.signup_bonus >= 0.0);
            assert!(ANNUAL_FEES.contains(&f.annual_fee));
            assert!(FOREIGN_FEES.contains(&f.foreign_fee));
            assert!(CATEGORIES.contains(&f.category.as_str()));
            assert!(CREDIT_SCORES.contains(&f.credit_score.as_str()));
            assert!(TIMES_OF_DAY.contains(&f.time_of_day.as_str()));
            assert!(DAYS_OF_WEEK.contains(&f.day_of_week.as_str()));
            assert!(CARD_TYPES.contains(&f.card_type.as_str()));
        }

        // Every card type shows up so encoders cover the full vocabulary
        for card_type in CARD_TYPES {
            assert!(samples.iter().any(|s| s.features.card_type == card_type));
        }
    }
}
