//! Feed-forward neural network built on ndarray
//!
//! Dense and dropout layers only, which is all the recommendation model
//! needs. Rows of the input matrix are samples.

use crate::models::ModelError;
use ndarray::{Array1, Array2, Axis, Zip};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Per-layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: &mut Array2<f32>) {
        match self {
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv_inplace(sigmoid),
        }
    }

    /// Derivative expressed in terms of the activation output
    fn derivative(self, output: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => output.mapv(|a| if a > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => output.mapv(|a| a * (1.0 - a)),
        }
    }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Fully connected layer; `weights` is `inputs x units`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: Activation,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    pub fn new(inputs: usize, units: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + units) as f32).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let weights = Array2::from_shape_fn((inputs, units), |_| dist.sample(rng));

        Self {
            weights,
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn units(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        let mut z = input.dot(&self.weights) + &self.bias;
        self.activation.apply(&mut z);
        z
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Layer {
    Dense(Dense),
    Dropout { rate: f32 },
}

impl Layer {
    pub fn param_count(&self) -> usize {
        match self {
            Layer::Dense(d) => d.weights.len() + d.bias.len(),
            Layer::Dropout { .. } => 0,
        }
    }
}

/// Intermediate values kept from a training-mode forward pass
#[derive(Debug)]
pub enum LayerCache {
    Dense { input: Array2<f32>, output: Array2<f32> },
    Dropout { mask: Array2<f32> },
}

/// Gradients for one dense layer
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

/// Layer shape description used to build a network
#[derive(Debug, Clone, Copy)]
pub enum LayerSpec {
    Dense(usize, Activation),
    Dropout(f32),
}

/// Hidden stack of the recommendation model: three dense+dropout pairs, a
/// final hidden layer and a single sigmoid output.
pub const RECOMMENDER_ARCHITECTURE: [LayerSpec; 8] = [
    LayerSpec::Dense(128, Activation::Relu),
    LayerSpec::Dropout(0.3),
    LayerSpec::Dense(64, Activation::Relu),
    LayerSpec::Dropout(0.2),
    LayerSpec::Dense(32, Activation::Relu),
    LayerSpec::Dropout(0.1),
    LayerSpec::Dense(16, Activation::Relu),
    LayerSpec::Dense(1, Activation::Sigmoid),
];

/// Sequential stack of layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    input_dim: usize,
    layers: Vec<Layer>,
}

impl Network {
    pub fn new(input_dim: usize, spec: &[LayerSpec], rng: &mut StdRng) -> Self {
        let mut layers = Vec::with_capacity(spec.len());
        let mut width = input_dim;

        for layer in spec {
            match *layer {
                LayerSpec::Dense(units, activation) => {
                    layers.push(Layer::Dense(Dense::new(width, units, activation, rng)));
                    width = units;
                }
                LayerSpec::Dropout(rate) => layers.push(Layer::Dropout { rate }),
            }
        }

        Self { input_dim, layers }
    }

    /// The recommendation model architecture for `input_dim` features
    pub fn recommender(input_dim: usize, rng: &mut StdRng) -> Self {
        Self::new(input_dim, &RECOMMENDER_ARCHITECTURE, rng)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(Layer::param_count).sum()
    }

    /// Check that consecutive dense layers chain from `input_dim` down to a
    /// single output unit.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut width = self.input_dim;

        for layer in &self.layers {
            let Layer::Dense(dense) = layer else {
                continue;
            };
            if dense.weights.nrows() != width {
                return Err(ModelError::DimensionMismatch {
                    expected: width,
                    actual: dense.weights.nrows(),
                });
            }
            if dense.bias.len() != dense.weights.ncols() {
                return Err(ModelError::DimensionMismatch {
                    expected: dense.weights.ncols(),
                    actual: dense.bias.len(),
                });
            }
            width = dense.units();
        }

        if width != 1 {
            return Err(ModelError::DimensionMismatch {
                expected: 1,
                actual: width,
            });
        }
        Ok(())
    }

    /// Inference-mode forward pass; dropout is inactive.
    ///
    /// Returns the first output unit for each row.
    pub fn predict(&self, x: &Array2<f32>) -> Array1<f32> {
        let mut activations = x.clone();
        for layer in &self.layers {
            if let Layer::Dense(dense) = layer {
                activations = dense.forward(&activations);
            }
        }
        activations.column(0).to_owned()
    }

    /// Training-mode forward pass with inverted dropout.
    pub(crate) fn forward_train(
        &self,
        x: &Array2<f32>,
        rng: &mut StdRng,
    ) -> (Array2<f32>, Vec<LayerCache>) {
        let mut activations = x.clone();
        let mut caches = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            match layer {
                Layer::Dense(dense) => {
                    let output = dense.forward(&activations);
                    caches.push(LayerCache::Dense {
                        input: activations,
                        output: output.clone(),
                    });
                    activations = output;
                }
                Layer::Dropout { rate } => {
                    let keep = 1.0 - rate;
                    let mask = Array2::from_shape_fn(activations.raw_dim(), |_| {
                        if rng.gen::<f32>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    });
                    activations = activations * &mask;
                    caches.push(LayerCache::Dropout { mask });
                }
            }
        }

        (activations, caches)
    }

    /// Backpropagate from the gradient of the loss with respect to the
    /// pre-activation of the final dense layer.
    ///
    /// Returns one entry per layer, `Some` for dense layers. `caches` must
    /// come from `forward_train` on this network.
    pub(crate) fn backward(
        &self,
        caches: &[LayerCache],
        output_delta: Array2<f32>,
    ) -> Vec<Option<DenseGradients>> {
        assert_eq!(
            caches.len(),
            self.layers.len(),
            "one cache is required per layer"
        );

        let mut grads = vec![None; self.layers.len()];
        let mut grad = output_delta;
        let mut at_output = true;

        for (idx, (layer, cache)) in self.layers.iter().zip(caches).enumerate().rev() {
            match (layer, cache) {
                (Layer::Dense(dense), LayerCache::Dense { input, output }) => {
                    let delta = if at_output {
                        at_output = false;
                        grad
                    } else {
                        grad * &dense.activation.derivative(output)
                    };

                    grads[idx] = Some(DenseGradients {
                        weights: input.t().dot(&delta),
                        bias: delta.sum_axis(Axis(0)),
                    });
                    grad = delta.dot(&dense.weights.t());
                }
                (Layer::Dropout { .. }, LayerCache::Dropout { mask }) => {
                    grad = grad * mask;
                }
                _ => unreachable!("layer cache does not match layer kind"),
            }
        }

        grads
    }

    pub(crate) fn dense_layers_mut(&mut self) -> impl Iterator<Item = (usize, &mut Dense)> {
        self.layers
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, layer)| match layer {
                Layer::Dense(dense) => Some((idx, dense)),
                Layer::Dropout { .. } => None,
            })
    }
}

/// First and second moment estimates for one dense layer
#[derive(Debug, Clone)]
struct Moments {
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_bias: Array1<f32>,
    v_bias: Array1<f32>,
}

/// Adam optimizer
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    moments: Vec<Option<Moments>>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            moments: Vec::new(),
        }
    }

    /// Apply one update using gradients from `Network::backward`
    pub fn step(&mut self, network: &mut Network, grads: &[Option<DenseGradients>]) {
        if self.moments.len() != grads.len() {
            self.moments = vec![None; grads.len()];
        }

        self.step += 1;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let lr_t = self.learning_rate * (1.0 - b2.powi(self.step)).sqrt()
            / (1.0 - b1.powi(self.step));

        for (idx, dense) in network.dense_layers_mut() {
            let Some(grad) = grads.get(idx).and_then(Option::as_ref) else {
                continue;
            };

            let moments = self.moments[idx].get_or_insert_with(|| Moments {
                m_weights: Array2::zeros(dense.weights.raw_dim()),
                v_weights: Array2::zeros(dense.weights.raw_dim()),
                m_bias: Array1::zeros(dense.bias.raw_dim()),
                v_bias: Array1::zeros(dense.bias.raw_dim()),
            });

            Zip::from(&mut dense.weights)
                .and(&mut moments.m_weights)
                .and(&mut moments.v_weights)
                .and(&grad.weights)
                .for_each(|w, m, v, &g| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *w -= lr_t * *m / (v.sqrt() + eps);
                });

            Zip::from(&mut dense.bias)
                .and(&mut moments.m_bias)
                .and(&mut moments.v_bias)
                .and(&grad.bias)
                .for_each(|b, m, v, &g| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *b -= lr_t * *m / (v.sqrt() + eps);
                });
        }
    }
}
