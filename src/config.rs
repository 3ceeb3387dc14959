use std::path::Path;

use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  module::Activation,
  loss::LossKind,
  optimize::{ Strategy, SGD, Momentum, Nesterov, Adam },
};


/// Optimization strategy to train with.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
  #[default]
  Sgd,
  Momentum,
  Nesterov,
  Adam,
}

impl OptimizerKind {
  pub fn build<R: Real>(self) -> Box<dyn Strategy<R>> {
    match self {
      Self::Sgd => Box::new(SGD),
      Self::Momentum => Box::new(Momentum::default()),
      Self::Nesterov => Box::new(Nesterov::default()),
      Self::Adam => Box::new(Adam::default()),
    }
  }
}


/// Hyper-parameters of a training run.
///
/// Missing fields in a JSON file fall back to their defaults.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
  pub epochs: usize,
  pub batch_size: usize,
  pub learning_rate: f64,
  /// Sizes of the hidden layers between input and logits.
  pub hidden: Vec<usize>,
  pub activation: Activation,
  pub optimizer: OptimizerKind,
  pub loss: LossKind,
  pub seed: u64,
  /// Share of the training set held back for validation.
  pub validation_fraction: f64,
  /// Log every n-th batch at debug level, zero to disable.
  pub log_interval: usize,
  pub stop_on_divergence: bool,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      epochs: 10,
      batch_size: 64,
      learning_rate: 0.1,
      hidden: vec![128],
      activation: Activation::ReLU,
      optimizer: OptimizerKind::Sgd,
      loss: LossKind::CrossEntropy,
      seed: 42,
      validation_fraction: 0.1,
      log_interval: 100,
      stop_on_divergence: true,
    }
  }
}

impl TrainConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(Error::file(path))?;
    let config: Self = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn validate(&self) -> Result<()> {
    if self.epochs == 0 {
      return Err(Error::Config("epochs must be positive".into()))
    }
    if self.batch_size == 0 {
      return Err(Error::Config("batch_size must be positive".into()))
    }
    if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
      return Err(Error::Config(format!("learning_rate must be positive, got {}", self.learning_rate)))
    }
    if self.hidden.contains(&0) {
      return Err(Error::Config("hidden layers need at least one unit".into()))
    }
    if !(0.0..1.0).contains(&self.validation_fraction) {
      return Err(Error::Config(format!("validation_fraction must lie in [0, 1), got {}", self.validation_fraction)))
    }
    Ok(())
  }

  pub fn epochs(mut self, epochs: usize) -> Self {
    self.epochs = epochs;
    self
  }

  pub fn batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size;
    self
  }

  pub fn learning_rate(mut self, learning_rate: f64) -> Self {
    self.learning_rate = learning_rate;
    self
  }

  pub fn hidden(mut self, hidden: &[usize]) -> Self {
    self.hidden = hidden.to_vec();
    self
  }

  pub fn activation(mut self, activation: Activation) -> Self {
    self.activation = activation;
    self
  }

  pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
    self.optimizer = optimizer;
    self
  }

  pub fn loss(mut self, loss: LossKind) -> Self {
    self.loss = loss;
    self
  }

  pub fn seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self
  }

  pub fn validation_fraction(mut self, fraction: f64) -> Self {
    self.validation_fraction = fraction;
    self
  }

  pub fn log_interval(mut self, interval: usize) -> Self {
    self.log_interval = interval;
    self
  }

  pub fn stop_on_divergence(mut self, stop: bool) -> Self {
    self.stop_on_divergence = stop;
    self
  }
}
