use microtrain::{
  ops::*,
  checkpoint,
  config::{ TrainConfig, OptimizerKind },
  data::synthetic,
  loss::LossKind,
  module::{ Activation, Module, Sequential },
  train::{ Trainer, evaluate },
  manual_seed,
};

fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn learns_synthetic_blobs() {
  init_logger();
  manual_seed(7);
  let data = synthetic::blobs::<f32>(1000, 10, 8, 8, 0.3).unwrap();
  let (train, test) = data.split(0.2);
  let model = Sequential::classifier(64, &[64], 10, Activation::ReLU);
  let config = TrainConfig::new().epochs(12).batch_size(32).learning_rate(0.1);
  let history = Trainer::new(config.clone()).unwrap().fit(&model, &train, None).unwrap();
  let losses = history.train_losses();
  assert!(history.is_non_increasing(0.02), "Loss went up: {:?}", losses);
  assert!(losses[losses.len() - 1] < losses[0] * 0.5, "Loss barely moved: {:?}", losses);
  let result = evaluate(&model, &test, 100, config.loss).unwrap();
  assert!(result.accuracy > 0.9, "Test accuracy {}", result.accuracy);
}

#[test]
fn every_optimizer_makes_progress() {
  init_logger();
  for (optimizer, rate) in [
    (OptimizerKind::Sgd, 0.1),
    (OptimizerKind::Momentum, 0.05),
    (OptimizerKind::Nesterov, 0.05),
    (OptimizerKind::Adam, 0.01),
  ] {
    manual_seed(3);
    let data = synthetic::blobs::<f32>(200, 4, 6, 6, 0.2).unwrap();
    let model = Sequential::classifier(36, &[16], 4, Activation::Tanh);
    let config = TrainConfig::new().epochs(4).batch_size(20).learning_rate(rate).optimizer(optimizer);
    let history = Trainer::new(config).unwrap().fit(&model, &data, None).unwrap();
    let losses = history.train_losses();
    assert!(losses[3] < losses[0], "{:?} did not descend: {:?}", optimizer, losses);
  }
}

#[test]
fn mse_loss_trains_too() {
  manual_seed(5);
  let data = synthetic::blobs::<f64>(300, 3, 5, 5, 0.2).unwrap();
  let model = Sequential::classifier(25, &[12], 3, Activation::Sigmoid);
  let config = TrainConfig::new().epochs(6).batch_size(15).learning_rate(0.5).loss(LossKind::Mse);
  let history = Trainer::new(config).unwrap().fit(&model, &data, None).unwrap();
  let losses = history.train_losses();
  assert!(losses[5] < losses[0], "{:?}", losses);
}

#[test]
fn manual_step_matches_trainer() {
  manual_seed(9);
  let data = synthetic::blobs::<f64>(16, 4, 3, 3, 0.2).unwrap();
  let model = Sequential::classifier(9, &[5], 4, Activation::Tanh);
  let batch = data.batches(16, false).next().unwrap();
  let params = model.parameters();

  // Update by hand: clear, forward, loss, backward, subtract
  let before: Vec<_> = params.iter().map(|p| p.detach() ).collect();
  let logits = model.run(&batch.images.tracked());
  LossKind::CrossEntropy.compute(&logits, &batch.labels, 4).backward();
  let expected: Vec<_> = params.iter().map(|p| p.tensor() - p.grad().unwrap() * 0.1 ).collect();

  // Same step through the trainer from the same starting point
  let mut trainer = Trainer::new(TrainConfig::new().learning_rate(0.1)).unwrap();
  trainer.train_batch(&model, &batch, 4);
  for ((param, expected), before) in params.iter().zip(&expected).zip(&before) {
    let diff = (param.tensor() - expected).abs().max(0).item();
    assert!(diff < 1e-12, "Parameters differ by {diff}");
    assert_ne!(param.tensor(), before);
  }
}

#[test]
fn checkpoint_round_trip() {
  init_logger();
  manual_seed(21);
  let data = synthetic::blobs::<f32>(120, 3, 4, 4, 0.2).unwrap();
  let model = Sequential::classifier(16, &[8], 3, Activation::ReLU);
  let config = TrainConfig::new().epochs(2).batch_size(12);
  Trainer::new(config).unwrap().fit(&model, &data, None).unwrap();

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("blobs.ckpt");
  checkpoint::save(&model, &path).unwrap();

  let restored = Sequential::classifier(16, &[8], 3, Activation::ReLU);
  assert_ne!(restored.parameters()[0].tensor(), model.parameters()[0].tensor());
  checkpoint::load(&restored, &path).unwrap();
  assert_eq!(restored.predict(&data.images), model.predict(&data.images));

  let original = evaluate(&model, &data, 32, LossKind::CrossEntropy).unwrap();
  let reloaded = evaluate(&restored, &data, 32, LossKind::CrossEntropy).unwrap();
  assert_eq!(original.loss, reloaded.loss);
  assert_eq!(original.confusion, reloaded.confusion);
}
