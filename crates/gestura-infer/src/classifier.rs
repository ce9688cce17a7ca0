//! Feed-forward gesture classifier: dense ReLU layers with a softmax head.

use gestura_core::{Error, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

/// One fully connected layer. `weights` is `inputs × outputs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Dense {
    /// He-initialized layer with zero bias.
    pub fn random<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let std = (2.0 / inputs.max(1) as f32).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| {
            let z: f32 = rng.sample(StandardNormal);
            z * std
        });
        Self {
            weights,
            bias: Array1::zeros(outputs),
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    pub(crate) fn affine(&self, x: &ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.weights) + &self.bias
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    layers: Vec<Dense>,
}

impl Classifier {
    /// Randomly initialized network `input → hidden... → classes`.
    pub fn new_random<R: Rng + ?Sized>(input: usize, hidden: &[usize], classes: usize, rng: &mut R) -> Self {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(input);
        sizes.extend_from_slice(hidden);
        sizes.push(classes);
        let layers = sizes
            .windows(2)
            .map(|w| Dense::random(w[0], w[1], rng))
            .collect();
        Self { layers }
    }

    /// Assemble a network from existing layers, checking that shapes chain.
    pub fn from_layers(layers: Vec<Dense>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::Internal("classifier needs at least one layer".into()));
        }
        for (i, layer) in layers.iter().enumerate() {
            if layer.bias.len() != layer.outputs() {
                return Err(Error::Internal(format!(
                    "layer {} has {} outputs but {} biases",
                    i,
                    layer.outputs(),
                    layer.bias.len()
                )));
            }
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].outputs() != pair[1].inputs() {
                return Err(Error::Internal(format!(
                    "layer {} outputs {} but layer {} takes {}",
                    i,
                    pair[0].outputs(),
                    i + 1,
                    pair[1].inputs()
                )));
            }
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Dense] {
        &mut self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(Dense::inputs).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(Dense::outputs).unwrap_or(0)
    }

    /// Class probabilities for a batch of feature rows.
    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let last = self.layers.len() - 1;
        let mut act = x.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&act.view());
            act = if i == last { softmax_rows(z) } else { relu(z) };
        }
        act
    }

    /// Class probabilities for one feature vector.
    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.input_dim() {
            return Err(Error::InvalidInput(format!(
                "expected {} features, got {}",
                self.input_dim(),
                features.len()
            )));
        }
        let x = ArrayView2::from_shape((1, features.len()), features)
            .map_err(|e| Error::Internal(e.to_string()))?;
        let probs = self.forward(x);
        Ok(probs.row(0).to_vec())
    }

    /// Index and probability of the most likely class.
    pub fn predict(&self, features: &[f32]) -> Result<(usize, f32)> {
        let probs = self.predict_proba(features)?;
        Ok(argmax(&probs))
    }
}

pub(crate) fn relu(mut z: Array2<f32>) -> Array2<f32> {
    z.mapv_inplace(|v| v.max(0.0));
    z
}

pub(crate) fn softmax_rows(mut z: Array2<f32>) -> Array2<f32> {
    for mut row in z.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    z
}

/// First index of the maximum value; ties keep the lower index.
pub(crate) fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, &v) in values.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}
