use itertools::Itertools;
use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  ops::{ BaseOps, NumericOps, RealOps, Hops },
};


/// A differentiable building block of a model.

pub trait Module<T: Real> {
  fn run(&self, input: &Variable<T>) -> Variable<T>;

  fn parameters(&self) -> Vec<Variable<T>> {
    vec![]
  }

  fn describe(&self) -> String;
}


/// Collapse every image dimension into a single feature axis.

#[derive(Debug, Clone, Default)]
pub struct Flatten;

impl<T: Real> Module<T> for Flatten {
  fn run(&self, input: &Variable<T>) -> Variable<T> {
    input.flatten()
  }

  fn describe(&self) -> String {
    "Flatten".into()
  }
}


/// Fully connected layer computing `x·W + b`.

#[derive(Debug, Clone)]
pub struct Dense<T: Real> {
  pub weights: Variable<T>,
  pub bias: Variable<T>,
}

impl<T: Real> Dense<T> {
  /// Weights and bias are drawn from `U(-1/√inputs, 1/√inputs)`.

  pub fn new(inputs: usize, outputs: usize) -> Self {
    assert!(inputs > 0 && outputs > 0, "Dense layer needs positive sizes, got {inputs} -> {outputs}");
    let bound = T::one() / T::from(inputs).unwrap().sqrt();
    Self {
      weights: Tensor::uniform(&[inputs, outputs], -bound, bound).trained(),
      bias: Tensor::uniform(&[outputs], -bound, bound).trained(),
    }
  }

  pub fn inputs(&self) -> usize {
    self.weights.dim(0)
  }

  pub fn outputs(&self) -> usize {
    self.weights.dim(1)
  }
}

impl<T: Real> Module<T> for Dense<T> {
  fn run(&self, input: &Variable<T>) -> Variable<T> {
    input.mm(&self.weights) + &self.bias
  }

  fn parameters(&self) -> Vec<Variable<T>> {
    vec![self.weights.clone(), self.bias.clone()]
  }

  fn describe(&self) -> String {
    format!("Dense({} -> {})", self.inputs(), self.outputs())
  }
}


/// Element-wise nonlinearity.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
  #[default]
  #[value(name = "relu")]
  ReLU,
  Sigmoid,
  Tanh,
}

impl<T: Real> Module<T> for Activation {
  fn run(&self, input: &Variable<T>) -> Variable<T> {
    match self {
      Self::ReLU => input.relu(),
      Self::Sigmoid => input.sigmoid(),
      Self::Tanh => input.tanh(),
    }
  }

  fn describe(&self) -> String {
    format!("{self:?}")
  }
}


/// Ordered stack of modules, each feeding the next.

pub struct Sequential<T: Real> {
  layers: Vec<Box<dyn Module<T>>>,
}

impl<T: Real> Default for Sequential<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Real> Sequential<T> {
  pub fn new() -> Self {
    Self { layers: vec![] }
  }

  pub fn add(mut self, layer: impl Module<T> + 'static) -> Self {
    self.layers.push(Box::new(layer));
    self
  }

  /// Flatten, then every hidden size as a dense layer followed by
  /// `activation`, then a final dense layer emitting one logit per class.

  pub fn classifier(input: usize, hidden: &[usize], classes: usize, activation: Activation) -> Self {
    let mut model = Self::new().add(Flatten);
    let mut size = input;
    for &units in hidden {
      model = model
        .add(Dense::new(size, units))
        .add(activation);
      size = units;
    }
    model.add(Dense::new(size, classes))
  }

  pub fn len(&self) -> usize {
    self.layers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  /// Total number of trainable scalars.

  pub fn num_parameters(&self) -> usize {
    Module::parameters(self).iter().map(|p| p.size() ).sum()
  }

  /// Most likely class for every image in a batch.

  pub fn predict(&self, images: &Tensor<T>) -> Tensor<usize> {
    self.run(&images.tracked()).argmax(-1)
  }
}

impl<T: Real> Module<T> for Sequential<T> {
  fn run(&self, input: &Variable<T>) -> Variable<T> {
    self.layers.iter().fold(input.clone(), |x, layer| layer.run(&x) )
  }

  fn parameters(&self) -> Vec<Variable<T>> {
    self.layers.iter().flat_map(|layer| layer.parameters() ).collect()
  }

  fn describe(&self) -> String {
    self.layers.iter().map(|layer| layer.describe() ).join(" -> ")
  }
}

impl<T: Real> std::fmt::Debug for Sequential<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Sequential[{}]", self.describe())
  }
}
