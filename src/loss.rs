use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  ops::{ BaseOps, Hops },
};


/// Scalar objective comparing logits to the true labels.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LossKind {
  /// Negative log likelihood of the labelled class under the softmax of the logits.
  #[default]
  CrossEntropy,
  /// Squared distance between the softmax probabilities and one-hot labels,
  /// averaged over every entry.
  Mse,
}

impl LossKind {
  /// Mean loss over a batch of `[batch, classes]` logits.

  pub fn compute<T: Real>(self, logits: &Variable<T>, labels: &Tensor<usize>, num_classes: usize) -> Variable<T> {
    assert_eq!(logits.shape().dims, vec![labels.size(), num_classes],
      "Logits {} don't match {} labels over {} classes", logits.shape(), labels.size(), num_classes);
    let target = labels.one_hot::<T>(num_classes).tracked();
    match self {
      Self::CrossEntropy => logits.cross_entropy(&target),
      Self::Mse => logits.softmax().mse(&target),
    }
  }
}

impl std::fmt::Display for LossKind {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self {
      Self::CrossEntropy => write!(f, "cross-entropy"),
      Self::Mse => write!(f, "mse"),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cross_entropy_of_confident_logits() {
    let logits = Tensor::<f64>::new(&[2, 2], vec![10.0, -10.0, -10.0, 10.0]).trained();
    let right = LossKind::CrossEntropy.compute(&logits, &Tensor::vec(&[0, 1]), 2).item();
    let wrong = LossKind::CrossEntropy.compute(&logits, &Tensor::vec(&[1, 0]), 2).item();
    assert!(right < 1e-6);
    assert!((wrong - 20.0).abs() < 1e-6);
  }

  #[test]
  fn mse_of_uniform_logits() {
    // Probabilities of 1/4 everywhere differ from each one-hot row
    // by (3/4)² once and (1/4)² three times
    let logits = Tensor::<f64>::zeros(&[3, 4]).trained();
    let loss = LossKind::Mse.compute(&logits, &Tensor::vec(&[0, 1, 3]), 4).item();
    assert!((loss - 0.75 / 4.0).abs() < 1e-12);
  }

  #[test]
  fn gradient_moves_toward_label() {
    let logits = Tensor::<f64>::zeros(&[1, 3]).trained();
    let loss = LossKind::CrossEntropy.compute(&logits, &Tensor::vec(&[2]), 3);
    loss.backward();
    let grad = logits.grad().unwrap();
    assert!(grad.at(&[0, 2]).item() < 0.0);
    assert!(grad.at(&[0, 0]).item() > 0.0);
  }

  #[test]
  #[should_panic]
  fn label_count_mismatch() {
    let logits = Tensor::<f32>::zeros(&[2, 3]).trained();
    LossKind::Mse.compute(&logits, &Tensor::vec(&[0]), 3);
  }
}
