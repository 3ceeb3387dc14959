// This example walks through training an image classifier one step at a time:
// inspecting the data, computing an initial loss, back-propagating,
// looking at a gradient and updating parameters by hand.

// Point MICROTRAIN_DATA at a directory with the unpacked Fashion-MNIST
// IDX files to use real images. Generated blobs are used otherwise.

use microtrain::{
  ops::*,
  data::{ Dataset, synthetic },
  loss::LossKind,
  module::{ Activation, Module, Sequential },
  visualize::render_image,
  manual_seed,
  Tensor,
};

fn main() -> microtrain::Result<()> {
  manual_seed(0);

  // Load data
  let data = match std::env::var("MICROTRAIN_DATA") {
    Ok(dir) => Dataset::<f32>::fashion_mnist(dir, true)?,
    Err(_) => synthetic::blobs(600, 10, 14, 14, 0.3)?,
  };
  let (height, width) = data.image_dims();
  println!("{} images of {}x{} pixels in {} classes", data.len(), height, width, data.num_classes());

  let (image, label) = data.sample(0);
  println!("First image shows a {}:\n{}\n", data.class_name(label), render_image(&image, 0.2));

  // Build a model with one hidden layer
  let model = Sequential::classifier(height * width, &[32], data.num_classes(), Activation::ReLU);
  println!("Model: {} ({} parameters)", model.describe(), model.num_parameters());

  // An untrained model guesses: cross entropy starts near ln(classes)
  let batch = data.batches(64, true).next().unwrap();
  let logits = model.run(&batch.images.tracked());
  let loss = LossKind::CrossEntropy.compute(&logits, &batch.labels, data.num_classes());
  println!("Initial loss {:.4}, chance level {:.4}", loss.item(), (data.num_classes() as f32).ln());

  // Back-propagate and look at the gradient of the output bias
  loss.backward();
  let params = model.parameters();
  let bias = params.last().unwrap();
  println!("Gradient of the output bias: {}", bias.grad().unwrap());

  // Plain gradient descent: clear, forward, loss, backward, update
  let learning_rate = 0.1;
  for step in 1..=100 {
    for param in &params {
      param.zero_grad();
    }
    let batch = data.batches(64, true).next().unwrap();
    let logits = model.run(&batch.images.tracked());
    let loss = LossKind::CrossEntropy.compute(&logits, &batch.labels, data.num_classes());
    loss.backward();
    for param in &params {
      let change = -(param.grad().unwrap() * learning_rate);
      param.tensor().accumulate(&change);
    }
    if step % 20 == 0 {
      let accuracy: f32 = logits.argmax::<usize>(-1).accuracy(&batch.labels);
      println!("Step {step}: loss {:.4}, batch accuracy {:.1}%", loss.item(), accuracy * 100.0);
    }
  }

  // Gradients add up until they get cleared. Forgetting to do so between
  // steps makes every update use the sum of all previous gradients.
  let batch = data.batches(64, false).next().unwrap();
  for param in &params {
    param.zero_grad();
  }
  let mut grads: Vec<Tensor<f32>> = vec![];
  for _ in 0..2 {
    let logits = model.run(&batch.images.tracked());
    LossKind::CrossEntropy.compute(&logits, &batch.labels, data.num_classes()).backward();
    grads.push(bias.grad().unwrap().detach());
  }
  println!("Bias gradient after one pass:  {}", grads[0]);
  println!("Bias gradient after two passes: {}", grads[1]);
  println!("Second pass doubled it: {}", (&grads[0] * 2.0 - &grads[1]).abs().max(0).item() < 1e-5);

  Ok(())
}
