use microtrain::{
  ops::*,
  loss::LossKind,
  module::{ Activation, Module, Sequential },
  manual_seed,
  Tensor,
  Variable,
};

/// Finite difference estimate of d loss / d param[i], nudging the
/// parameter in place and restoring it afterwards.

fn numeric_gradient(param: &Variable<f64>, i: usize, loss: impl Fn() -> f64) -> f64 {
  let eps = 1e-5;
  let original = param.tensor().detach();
  let nudge = Tensor::hot_encode(i, param.size()).reshape(&param.shape().dims) * eps;
  param.tensor().assign(&(&original + &nudge));
  let next = loss();
  param.tensor().assign(&(&original - &nudge));
  let prev = loss();
  param.tensor().assign(&original);
  (next - prev) / (2.0 * eps)
}

#[test]
fn parameter_gradients_match_finite_differences() {
  manual_seed(13);
  let model = Sequential::<f64>::classifier(6, &[5], 3, Activation::Tanh);
  let images = Tensor::randn(&[4, 2, 3]);
  let labels = Tensor::vec(&[0, 2, 1, 2]);
  let loss = || LossKind::CrossEntropy.compute(&model.run(&images.tracked()), &labels, 3);

  let params = model.parameters();
  loss().backward();
  let analytic: Vec<Tensor<f64>> = params.iter().map(|p| p.grad().unwrap().detach() ).collect();

  for (param, grad) in params.iter().zip(&analytic) {
    let grad = grad.contiguous().into_raw();
    for i in 0..param.size() {
      let numeric = numeric_gradient(param, i, || loss().item());
      assert!((numeric - grad[i]).abs() < 1e-6, "Expected {} but got {} at {}", numeric, grad[i], i);
    }
  }
}

#[test]
fn input_gradients_match_finite_differences() {
  manual_seed(14);
  for activation in [Activation::Tanh, Activation::Sigmoid] {
    let model = Sequential::<f64>::classifier(4, &[6, 5], 2, activation);
    let diff = Variable::<f64>::check_gradients(&[3, 2, 2], |x| model.run(x).log_softmax() );
    assert!(diff < 1e-5, "{:?} differs by {}", activation, diff);
  }
}

#[test]
fn loss_gradients_match_finite_differences() {
  manual_seed(15);
  let labels = Tensor::vec(&[1, 0, 3]);
  for loss in [LossKind::CrossEntropy, LossKind::Mse] {
    let diff = Variable::<f64>::check_gradients(&[3, 4], |logits| loss.compute(logits, &labels, 4) );
    assert!(diff < 1e-5, "{} differs by {}", loss, diff);
  }
}

#[test]
fn gradients_accumulate_until_cleared() {
  manual_seed(16);
  let model = Sequential::<f64>::classifier(4, &[3], 2, Activation::ReLU);
  let images = Tensor::randn(&[5, 2, 2]);
  let labels = Tensor::vec(&[0, 1, 1, 0, 1]);
  let pass = || LossKind::CrossEntropy.compute(&model.run(&images.tracked()), &labels, 2).backward();
  let params = model.parameters();

  pass();
  let single: Vec<Tensor<f64>> = params.iter().map(|p| p.grad().unwrap().detach() ).collect();

  // Without clearing, the second pass adds to the first
  pass();
  for (param, single) in params.iter().zip(&single) {
    assert_eq!(param.grad().unwrap(), &(single * 2.0));
  }

  // Cleared gradients start over
  for param in &params {
    param.zero_grad();
  }
  pass();
  for (param, single) in params.iter().zip(&single) {
    assert_eq!(param.grad().unwrap(), single);
  }
}
