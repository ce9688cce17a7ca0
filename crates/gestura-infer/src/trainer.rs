//! Mini-batch training with softmax cross-entropy and Adam.

use gestura_core::{Error, GestureClassSet, NormalizationMode, Result, TrainingSettings};
use gestura_ingest::TrainingSet;
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{argmax, relu, softmax_rows, Classifier};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub hidden_layers: Vec<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::from(&TrainingSettings::default())
    }
}

impl From<&TrainingSettings> for TrainerConfig {
    fn from(s: &TrainingSettings) -> Self {
        Self {
            epochs: s.epochs,
            batch_size: s.batch_size,
            learning_rate: s.learning_rate,
            hidden_layers: s.hidden_layers.clone(),
        }
    }
}

/// Summary of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub classes: Vec<String>,
    pub samples: usize,
    pub epochs: usize,
    /// Mean cross-entropy over the last epoch.
    pub loss: f32,
    /// Accuracy of the final model on the training set.
    pub accuracy: f32,
}

/// A fitted classifier with its class list. Not persisted yet.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub classifier: Classifier,
    pub classes: GestureClassSet,
    pub mode: NormalizationMode,
    pub report: TrainingReport,
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit a fresh classifier on `set`.
    ///
    /// Weight init and batch order come from `rng`, so two runs on the same
    /// data only agree when seeded identically.
    pub fn train<R: Rng + ?Sized>(&self, set: &TrainingSet, rng: &mut R) -> Result<TrainedModel> {
        let cfg = &self.config;
        if cfg.epochs == 0 || cfg.batch_size == 0 {
            return Err(Error::Training(format!(
                "epochs ({}) and batch size ({}) must be positive",
                cfg.epochs, cfg.batch_size
            )));
        }
        if cfg.hidden_layers.is_empty() || cfg.hidden_layers.contains(&0) {
            return Err(Error::Training(format!(
                "need at least one non-empty hidden layer, got {:?}",
                cfg.hidden_layers
            )));
        }
        if !(cfg.learning_rate.is_finite() && cfg.learning_rate > 0.0) {
            return Err(Error::Training(format!(
                "invalid learning rate {}",
                cfg.learning_rate
            )));
        }
        if set.is_empty() || set.classes.is_empty() {
            return Err(Error::Training("empty training set".into()));
        }

        let n = set.len();
        let num_classes = set.classes.len();
        let mut classifier =
            Classifier::new_random(set.features.ncols(), &cfg.hidden_layers, num_classes, rng);
        let mut adam = Adam::new(&classifier, cfg.learning_rate);

        let mut order: Vec<usize> = (0..n).collect();
        let mut loss = 0.0;
        for epoch in 0..cfg.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;
            for batch in order.chunks(cfg.batch_size) {
                let x = set.features.select(Axis(0), batch);
                let y: Vec<usize> = batch.iter().map(|&i| set.labels[i]).collect();
                epoch_loss += step(&mut classifier, &mut adam, x.view(), &y) * batch.len() as f32;
            }
            loss = epoch_loss / n as f32;
            if !loss.is_finite() {
                return Err(Error::Training(format!("loss diverged at epoch {}", epoch + 1)));
            }
            debug!("Epoch {}/{}: loss {:.4}", epoch + 1, cfg.epochs, loss);
        }

        let accuracy = accuracy(&classifier, set);
        let report = TrainingReport {
            classes: set.classes.labels().to_vec(),
            samples: n,
            epochs: cfg.epochs,
            loss,
            accuracy,
        };
        info!(
            "Trained {}-class model on {} samples: loss {:.4}, accuracy {:.3}",
            num_classes, n, loss, accuracy
        );

        Ok(TrainedModel {
            classifier,
            classes: set.classes.clone(),
            mode: set.mode,
            report,
        })
    }
}

fn accuracy(classifier: &Classifier, set: &TrainingSet) -> f32 {
    let probs = classifier.forward(set.features.view());
    let correct = probs
        .axis_iter(Axis(0))
        .zip(set.labels.iter())
        .filter(|(row, label)| {
            let probs = row.to_vec();
            argmax(&probs).0 == **label
        })
        .count();
    correct as f32 / set.len() as f32
}

/// One forward/backward pass over a batch. Returns the batch's mean loss.
fn step(classifier: &mut Classifier, adam: &mut Adam, x: ArrayView2<f32>, labels: &[usize]) -> f32 {
    let batch = labels.len() as f32;

    // Forward, keeping every activation (input included).
    let layers = classifier.layers();
    let last = layers.len() - 1;
    let mut activations: Vec<Array2<f32>> = Vec::with_capacity(layers.len() + 1);
    activations.push(x.to_owned());
    for (i, layer) in layers.iter().enumerate() {
        let z = layer.affine(&activations[i].view());
        activations.push(if i == last { softmax_rows(z) } else { relu(z) });
    }

    let probs = &activations[layers.len()];
    let loss = labels
        .iter()
        .enumerate()
        .map(|(r, &c)| -(probs[[r, c]].max(EPSILON)).ln())
        .sum::<f32>()
        / batch;

    // Softmax + cross-entropy gradient.
    let mut delta = probs.clone();
    for (r, &c) in labels.iter().enumerate() {
        delta[[r, c]] -= 1.0;
    }
    delta.mapv_inplace(|v| v / batch);

    let mut grads: Vec<(Array2<f32>, Array1<f32>)> = Vec::with_capacity(layers.len());
    for i in (0..layers.len()).rev() {
        let grad_w = activations[i].t().dot(&delta);
        let grad_b = delta.sum_axis(Axis(0));
        if i > 0 {
            let mut prev = delta.dot(&layers[i].weights.t());
            Zip::from(&mut prev)
                .and(&activations[i])
                .for_each(|d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
            delta = prev;
        }
        grads.push((grad_w, grad_b));
    }
    grads.reverse();

    adam.apply(classifier, &grads);
    loss
}

struct Moments {
    m_w: Array2<f32>,
    v_w: Array2<f32>,
    m_b: Array1<f32>,
    v_b: Array1<f32>,
}

struct Adam {
    lr: f32,
    t: i32,
    moments: Vec<Moments>,
}

impl Adam {
    fn new(classifier: &Classifier, lr: f32) -> Self {
        let moments = classifier
            .layers()
            .iter()
            .map(|l| Moments {
                m_w: Array2::zeros(l.weights.raw_dim()),
                v_w: Array2::zeros(l.weights.raw_dim()),
                m_b: Array1::zeros(l.bias.len()),
                v_b: Array1::zeros(l.bias.len()),
            })
            .collect();
        Self { lr, t: 0, moments }
    }

    fn apply(&mut self, classifier: &mut Classifier, grads: &[(Array2<f32>, Array1<f32>)]) {
        self.t += 1;
        let lr = self.lr;
        let c1 = 1.0 - BETA1.powi(self.t);
        let c2 = 1.0 - BETA2.powi(self.t);

        for ((layer, m), (gw, gb)) in classifier
            .layers_mut()
            .iter_mut()
            .zip(self.moments.iter_mut())
            .zip(grads)
        {
            Zip::from(&mut layer.weights)
                .and(&mut m.m_w)
                .and(&mut m.v_w)
                .and(gw)
                .for_each(|w, m, v, &g| adam_update(w, m, v, g, lr, c1, c2));
            Zip::from(&mut layer.bias)
                .and(&mut m.m_b)
                .and(&mut m.v_b)
                .and(gb)
                .for_each(|w, m, v, &g| adam_update(w, m, v, g, lr, c1, c2));
        }
    }
}

fn adam_update(w: &mut f32, m: &mut f32, v: &mut f32, g: f32, lr: f32, c1: f32, c2: f32) {
    *m = BETA1 * *m + (1.0 - BETA1) * g;
    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
    let m_hat = *m / c1;
    let v_hat = *v / c2;
    *w -= lr * m_hat / (v_hat.sqrt() + EPSILON);
}
