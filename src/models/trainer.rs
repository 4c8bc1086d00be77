//! Mini-batch training loop for the recommendation network

use crate::config::TrainingConfig;
use crate::models::network::{Adam, Network};
use crate::models::ModelError;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Clipping applied to predictions before taking logarithms
const LOSS_EPSILON: f32 = 1e-7;

/// Validation loss must improve by more than this to reset the plateau counter
const PLATEAU_MIN_DELTA: f64 = 1e-4;

/// Hyper-parameters for a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub learning_rate: f32,
    pub seed: u64,
    /// Epochs without validation improvement before stopping
    pub early_stopping_patience: usize,
    /// Epochs without validation improvement before halving the rate
    pub lr_plateau_patience: usize,
    pub lr_plateau_factor: f32,
    pub min_learning_rate: f32,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            validation_split: 0.2,
            learning_rate: 0.001,
            seed: 42,
            early_stopping_patience: 10,
            lr_plateau_patience: 5,
            lr_plateau_factor: 0.5,
            min_learning_rate: 0.0,
        }
    }
}

impl From<&TrainingConfig> for TrainingOptions {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            epochs: config.epochs,
            batch_size: config.batch_size,
            validation_split: config.validation_split,
            learning_rate: config.learning_rate,
            seed: config.seed,
            early_stopping_patience: config.early_stopping_patience,
            lr_plateau_patience: config.lr_plateau_patience,
            lr_plateau_factor: config.lr_plateau_factor,
            min_learning_rate: config.min_learning_rate,
        }
    }
}

/// Loss and thresholded classification metrics over a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl EpochMetrics {
    /// Evaluate predictions against targets.
    ///
    /// Both are thresholded at 0.5 for the classification metrics.
    pub fn evaluate(predictions: &Array1<f32>, targets: &Array1<f32>) -> Self {
        let n = predictions.len();
        if n == 0 {
            return Self::default();
        }

        let mut loss = 0.0_f64;
        let (mut correct, mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize, 0usize);

        for (&p, &y) in predictions.iter().zip(targets.iter()) {
            let clipped = p.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
            loss -= (y * clipped.ln() + (1.0 - y) * (1.0 - clipped).ln()) as f64;

            let predicted = p > 0.5;
            let actual = y > 0.5;
            if predicted == actual {
                correct += 1;
            }
            match (predicted, actual) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

        Self {
            loss: loss / n as f64,
            accuracy: ratio(correct, n),
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
        }
    }
}

/// Metrics recorded after one epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub learning_rate: f32,
    pub train: EpochMetrics,
    pub validation: EpochMetrics,
}

/// Outcome of a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
    /// Epoch (1-based) whose weights were kept
    pub best_epoch: usize,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn epochs_run(&self) -> usize {
        self.epochs.len()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.train.loss)
    }

    pub fn final_accuracy(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.train.accuracy)
    }

    pub fn best_validation_loss(&self) -> Option<f64> {
        self.epochs
            .get(self.best_epoch.checked_sub(1)?)
            .map(|e| e.validation.loss)
    }
}

/// Shuffled train/validation index split
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let test_len = test_len.min(n.saturating_sub(1));
    let train = indices.split_off(test_len);

    (train, indices)
}

/// Fits a network with Adam, binary cross-entropy, early stopping and
/// learning-rate reduction on plateau.
pub struct Trainer {
    options: TrainingOptions,
}

impl Trainer {
    pub fn new(options: TrainingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    /// Train `network` in place on rows of `x` against targets `y`.
    ///
    /// On return the network holds the weights from the epoch with the
    /// lowest validation loss.
    pub fn fit(
        &self,
        network: &mut Network,
        x: &Array2<f32>,
        y: &Array1<f32>,
    ) -> Result<TrainingHistory, ModelError> {
        let opts = &self.options;
        if x.nrows() != y.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} feature rows but {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() < 2 {
            return Err(ModelError::InvalidTrainingData(
                "at least two samples are required".to_string(),
            ));
        }
        if x.ncols() != network.input_dim() {
            return Err(ModelError::DimensionMismatch {
                expected: network.input_dim(),
                actual: x.ncols(),
            });
        }
        if opts.epochs == 0 || opts.batch_size == 0 {
            return Err(ModelError::InvalidTrainingData(
                "epochs and batch size must be positive".to_string(),
            ));
        }

        let (train_idx, val_idx) = train_test_split(x.nrows(), opts.validation_split, opts.seed);
        let x_train = x.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let (x_val, y_val) = if val_idx.is_empty() {
            (x_train.clone(), y_train.clone())
        } else {
            (x.select(Axis(0), &val_idx), y.select(Axis(0), &val_idx))
        };

        info!(
            train_samples = train_idx.len(),
            validation_samples = val_idx.len(),
            epochs = opts.epochs,
            batch_size = opts.batch_size,
            learning_rate = opts.learning_rate,
            "Starting model training"
        );

        let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(1));
        let mut optimizer = Adam::new(opts.learning_rate);
        let mut history = TrainingHistory::default();

        let mut best_loss = f64::INFINITY;
        let mut best_network = network.clone();
        let mut stop_wait = 0;
        let mut plateau_best = f64::INFINITY;
        let mut plateau_wait = 0;

        let mut order: Vec<usize> = (0..x_train.nrows()).collect();

        for epoch in 1..=opts.epochs {
            order.shuffle(&mut rng);

            for batch in order.chunks(opts.batch_size) {
                let xb = x_train.select(Axis(0), batch);
                let yb = y_train.select(Axis(0), batch);

                let (output, caches) = network.forward_train(&xb, &mut rng);
                // Sigmoid output with binary cross-entropy: dL/dz = (p - y) / n
                let delta = (&output.column(0) - &yb).insert_axis(Axis(1)) / batch.len() as f32;
                let grads = network.backward(&caches, delta);
                optimizer.step(network, &grads);
            }

            let train = EpochMetrics::evaluate(&network.predict(&x_train), &y_train);
            let validation = EpochMetrics::evaluate(&network.predict(&x_val), &y_val);

            history.epochs.push(EpochRecord {
                epoch,
                learning_rate: optimizer.learning_rate,
                train,
                validation,
            });

            debug!(
                epoch = epoch,
                loss = train.loss,
                accuracy = train.accuracy,
                val_loss = validation.loss,
                val_accuracy = validation.accuracy,
                learning_rate = optimizer.learning_rate,
                "Epoch complete"
            );

            if validation.loss < best_loss {
                best_loss = validation.loss;
                best_network = network.clone();
                history.best_epoch = epoch;
                stop_wait = 0;
            } else {
                stop_wait += 1;
                if stop_wait >= opts.early_stopping_patience {
                    info!(epoch = epoch, best_epoch = history.best_epoch, "Early stopping");
                    history.stopped_early = true;
                    break;
                }
            }

            if validation.loss < plateau_best - PLATEAU_MIN_DELTA {
                plateau_best = validation.loss;
                plateau_wait = 0;
            } else {
                plateau_wait += 1;
                if plateau_wait >= opts.lr_plateau_patience {
                    let reduced = (optimizer.learning_rate * opts.lr_plateau_factor)
                        .max(opts.min_learning_rate);
                    if reduced < optimizer.learning_rate {
                        info!(
                            epoch = epoch,
                            from = optimizer.learning_rate,
                            to = reduced,
                            "Reducing learning rate"
                        );
                        optimizer.learning_rate = reduced;
                    }
                    plateau_wait = 0;
                }
            }
        }

        *network = best_network;

        info!(
            epochs = history.epochs_run(),
            best_epoch = history.best_epoch,
            best_val_loss = best_loss,
            stopped_early = history.stopped_early,
            "Model training completed"
        );

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::{Activation, LayerSpec};
    use ndarray::array;
    use rand::Rng;

    fn small_network(inputs: usize) -> Network {
        let mut rng = StdRng::seed_from_u64(9);
        Network::new(
            inputs,
            &[
                LayerSpec::Dense(8, Activation::Relu),
                LayerSpec::Dense(1, Activation::Sigmoid),
            ],
            &mut rng,
        )
    }

    /// Target is 1 when the first feature is positive
    fn separable_data(n: usize) -> (Array2<f32>, Array1<f32>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let v = (i as f32 / n as f32) * 2.0 - 1.0;
            if j == 0 {
                v
            } else {
                0.5 - v
            }
        });
        let y = x.column(0).mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        (x, y)
    }

    #[test]
    fn test_train_test_split() {
        let (train, test) = train_test_split(100, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..100).collect::<Vec<_>>());

        assert_eq!(train_test_split(100, 0.2, 42), (train, test));
    }

    #[test]
    fn test_train_test_split_keeps_training_rows() {
        let (train, test) = train_test_split(2, 0.9, 1);
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 1);
    }

    #[test]
    fn test_epoch_metrics() {
        let predictions = array![0.9_f32, 0.2, 0.8, 0.4];
        let targets = array![1.0_f32, 0.0, 0.0, 1.0];

        let metrics = EpochMetrics::evaluate(&predictions, &targets);
        assert_eq!(metrics.accuracy, 0.5);
        assert_eq!(metrics.precision, 0.5);
        assert_eq!(metrics.recall, 0.5);
        assert!(metrics.loss > 0.0);
    }

    #[test]
    fn test_fit_learns_separable_data() {
        let (x, y) = separable_data(200);
        let mut network = small_network(2);
        let trainer = Trainer::new(TrainingOptions {
            epochs: 60,
            batch_size: 16,
            learning_rate: 0.01,
            ..TrainingOptions::default()
        });

        let before = EpochMetrics::evaluate(&network.predict(&x), &y);
        let history = trainer.fit(&mut network, &x, &y).unwrap();
        let after = EpochMetrics::evaluate(&network.predict(&x), &y);

        assert!(history.epochs_run() > 0);
        assert!(history.best_epoch >= 1);
        assert!(after.loss < before.loss);
        assert!(after.accuracy > 0.9);
    }

    #[test]
    fn test_early_stopping_restores_best() {
        // Labels independent of the features: validation loss cannot keep improving
        let mut rng = StdRng::seed_from_u64(21);
        let x = Array2::from_shape_fn((100, 2), |_| rng.gen_range(-1.0_f32..1.0));
        let y = Array1::from_shape_fn(100, |_| if rng.gen_bool(0.5) { 1.0_f32 } else { 0.0 });

        let mut network = small_network(2);
        let trainer = Trainer::new(TrainingOptions {
            epochs: 500,
            batch_size: 8,
            learning_rate: 0.05,
            early_stopping_patience: 3,
            lr_plateau_patience: 2,
            ..TrainingOptions::default()
        });

        let history = trainer.fit(&mut network, &x, &y).unwrap();
        assert!(history.stopped_early);
        assert!(history.epochs_run() < 500);
        assert_eq!(
            history.epochs_run(),
            history.best_epoch + trainer.options().early_stopping_patience
        );

        // Restored weights reproduce the best validation loss
        let (_, val_idx) = train_test_split(100, 0.2, trainer.options().seed);
        let x_val = x.select(Axis(0), &val_idx);
        let y_val = y.select(Axis(0), &val_idx);
        let restored = EpochMetrics::evaluate(&network.predict(&x_val), &y_val);
        let best = history.best_validation_loss().unwrap();
        assert!((restored.loss - best).abs() < 1e-9);
    }

    #[test]
    fn test_learning_rate_reduced_on_plateau() {
        // Labels independent of the features so validation loss stalls
        let mut rng = StdRng::seed_from_u64(33);
        let x = Array2::from_shape_fn((100, 2), |_| rng.gen_range(-1.0_f32..1.0));
        let y = Array1::from_shape_fn(100, |_| if rng.gen_bool(0.5) { 1.0_f32 } else { 0.0 });

        let mut network = small_network(2);
        let trainer = Trainer::new(TrainingOptions {
            epochs: 40,
            batch_size: 8,
            learning_rate: 0.05,
            early_stopping_patience: 100,
            lr_plateau_patience: 2,
            lr_plateau_factor: 0.5,
            min_learning_rate: 0.01,
            ..TrainingOptions::default()
        });

        let history = trainer.fit(&mut network, &x, &y).unwrap();
        let rates: Vec<f32> = history.epochs.iter().map(|e| e.learning_rate).collect();
        let patience = trainer.options().lr_plateau_patience;

        assert_eq!(history.epochs_run(), 40);
        assert_eq!(rates[0], 0.05);

        let changes: Vec<usize> = (1..rates.len()).filter(|&i| rates[i] != rates[i - 1]).collect();
        assert!(!changes.is_empty());

        // The first epoch always improves, so a reduction needs `patience`
        // further epochs before it shows up in the next record
        assert!(changes[0] >= patience + 1);
        for pair in changes.windows(2) {
            assert!(pair[1] - pair[0] >= patience);
        }
        for &i in &changes {
            assert_eq!(rates[i], (rates[i - 1] * 0.5).max(0.01));
        }
        assert!(rates.iter().all(|&r| r >= 0.01));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let mut network = small_network(2);
        let trainer = Trainer::new(TrainingOptions::default());

        let x = Array2::<f32>::zeros((1, 2));
        let y = Array1::<f32>::zeros(1);
        assert!(trainer.fit(&mut network, &x, &y).is_err());

        let x = Array2::<f32>::zeros((4, 3));
        let y = Array1::<f32>::zeros(4);
        assert!(matches!(
            trainer.fit(&mut network, &x, &y),
            Err(ModelError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
