use serde::{ Serialize, Deserialize };

use crate::{
  config::TrainConfig,
  data::{ Batch, Dataset },
  error::{ Error, Result },
  loss::LossKind,
  module::Module,
  optimize::{ Optimizer, Strategy },
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
};


/// Outcome of a single optimization step.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchStats {
  pub loss: f64,
  pub correct: usize,
  pub size: usize,
}


/// Summary of one pass over the training set.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
  pub epoch: usize,
  /// Batch losses averaged by batch size.
  pub train_loss: f64,
  pub train_accuracy: f64,
  pub validation_loss: Option<f64>,
  pub validation_accuracy: Option<f64>,
}


/// Per-epoch statistics of a training run.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
  pub epochs: Vec<EpochStats>,
}

impl History {
  pub fn train_losses(&self) -> Vec<f64> {
    self.epochs.iter().map(|e| e.train_loss ).collect()
  }

  pub fn last(&self) -> Option<&EpochStats> {
    self.epochs.last()
  }

  /// Whether no epoch's loss exceeds its predecessor's by more than `tolerance`.

  pub fn is_non_increasing(&self, tolerance: f64) -> bool {
    self.epochs
      .windows(2)
      .all(|pair| pair[1].train_loss <= pair[0].train_loss + tolerance )
  }
}


/// Result of scoring a model on held out data.

#[derive(Debug, Clone)]
pub struct Evaluation {
  pub loss: f64,
  pub accuracy: f64,
  /// Counts of `[predicted, actual]` class pairs.
  pub confusion: Tensor<usize>,
}


/// Minibatch gradient descent over a [Module].

pub struct Trainer<T: Real> {
  config: TrainConfig,
  optimizer: Optimizer<T, Box<dyn Strategy<T>>>,
}

impl<T: Real> Trainer<T> {
  pub fn new(config: TrainConfig) -> Result<Self> {
    config.validate()?;
    let learning_rate = T::from(config.learning_rate)
      .ok_or_else(|| Error::Config(format!("learning_rate {} is not representable", config.learning_rate)) )?;
    let optimizer = Optimizer::new(learning_rate, config.optimizer.build());
    Ok(Self { config, optimizer })
  }

  pub fn config(&self) -> &TrainConfig {
    &self.config
  }

  pub fn optimizer(&self) -> &Optimizer<T, Box<dyn Strategy<T>>> {
    &self.optimizer
  }

  /// One step: clear gradients, run forward to the loss,
  /// backpropagate and update every parameter.

  pub fn train_batch(&mut self, model: &impl Module<T>, batch: &Batch<T>, num_classes: usize) -> BatchStats {
    let params = model.parameters();
    self.optimizer.zero_grad(&params);
    let logits = model.run(&batch.images.tracked());
    let loss = self.config.loss.compute(&logits, &batch.labels, num_classes);
    loss.backward();
    self.optimizer.step(&params);
    BatchStats {
      loss: to_f64(loss.item()),
      correct: count_correct(&logits, &batch.labels),
      size: batch.len(),
    }
  }

  /// Pass over all of `data` once, returning the average loss and accuracy.

  pub fn train_epoch(&mut self, model: &impl Module<T>, data: &Dataset<T>, epoch: usize) -> Result<(f64, f64)> {
    if data.is_empty() { return Err(Error::EmptyDataset) }
    let num_batches = data.num_batches(self.config.batch_size);
    let mut total_loss = 0.0;
    let mut correct = 0;
    let mut diverged = false;
    for (i, batch) in data.batches(self.config.batch_size, true).enumerate() {
      let stats = self.train_batch(model, &batch, data.num_classes());
      if !stats.loss.is_finite() {
        if self.config.stop_on_divergence {
          return Err(Error::Diverged { epoch, loss: stats.loss })
        }
        diverged = true;
      }
      total_loss += stats.loss * stats.size as f64;
      correct += stats.correct;
      if self.config.log_interval > 0 && (i + 1) % self.config.log_interval == 0 {
        log::debug!("Epoch {} batch {}/{}: loss {:.4}", epoch, i + 1, num_batches, stats.loss);
      }
    }
    if diverged {
      log::warn!("Loss diverged during epoch {epoch}, continuing");
    }
    let n = data.len() as f64;
    Ok((total_loss / n, correct as f64 / n))
  }

  /// Train for the configured number of epochs, scoring
  /// `validation` after each one if given.

  pub fn fit(&mut self, model: &impl Module<T>, train: &Dataset<T>, validation: Option<&Dataset<T>>) -> Result<History> {
    let mut history = History::default();
    for epoch in 1..=self.config.epochs {
      let (train_loss, train_accuracy) = self.train_epoch(model, train, epoch)?;
      let validation = validation
        .filter(|data| !data.is_empty() )
        .map(|data| evaluate(model, data, self.config.batch_size, self.config.loss) )
        .transpose()?;
      let stats = EpochStats {
        epoch,
        train_loss,
        train_accuracy,
        validation_loss: validation.as_ref().map(|v| v.loss ),
        validation_accuracy: validation.as_ref().map(|v| v.accuracy ),
      };
      match &validation {
        Some(v) => log::info!("Epoch {}/{}: loss {:.4}, accuracy {:.2}%, validation loss {:.4}, validation accuracy {:.2}%",
          epoch, self.config.epochs, train_loss, train_accuracy * 100.0, v.loss, v.accuracy * 100.0),
        None => log::info!("Epoch {}/{}: loss {:.4}, accuracy {:.2}%",
          epoch, self.config.epochs, train_loss, train_accuracy * 100.0),
      }
      history.epochs.push(stats);
    }
    Ok(history)
  }
}


/// Score a model on `data` without touching its parameters.

pub fn evaluate<T: Real>(model: &impl Module<T>, data: &Dataset<T>, batch_size: usize, loss: LossKind) -> Result<Evaluation> {
  if data.is_empty() { return Err(Error::EmptyDataset) }
  if batch_size == 0 { return Err(Error::Config("batch_size must be positive".into())) }
  let num_classes = data.num_classes();
  let confusion = Tensor::zeros(&[num_classes, num_classes]);
  let mut total_loss = 0.0;
  let mut correct = 0;
  for batch in data.batches(batch_size, false) {
    let logits = model.run(&batch.images.tracked());
    total_loss += to_f64(loss.compute(&logits, &batch.labels, num_classes).item()) * batch.len() as f64;
    correct += count_correct(&logits, &batch.labels);
    confusion.accumulate(&logits.argmax::<usize>(-1).confusion(&batch.labels, num_classes));
  }
  let n = data.len() as f64;
  Ok(Evaluation {
    loss: total_loss / n,
    accuracy: correct as f64 / n,
    confusion,
  })
}

fn count_correct<T: Real>(logits: &Variable<T>, labels: &Tensor<usize>) -> usize {
  logits.argmax::<usize>(-1).equal(labels).param_iter().filter(|&hit| hit ).count()
}

fn to_f64<T: Real>(value: T) -> f64 {
  value.to_f64().unwrap_or(f64::NAN)
}
