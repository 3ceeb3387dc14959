//! Train feed-forward image classifiers with plain gradient descent.
//! Tiny. Few dependencies. CPU only.
//!
//! # Features
//!
//! - **Reverse-mode autodiff** - Every operation on a [Variable] records how
//! it was computed, so calling [Variable::backward] on a scalar loss fills in
//! the gradient of every trainable tensor that contributed to it.
//!
//! - **Explicit training loop** - Gradients accumulate until cleared. One
//! optimization step clears them, runs the model, computes the loss,
//! back-propagates and moves every parameter against its gradient.
//!
//! - **Broadcasting** - Tensors with differing but compatible shapes get
//! broadcasted to matching dimensions automatically for most operations.
//!
//! - **Zero-copy views** - Tensors may be sliced, indexed, reshaped, transposed and
//! broadcasted without actually copying any data in most situations.
//!
//! - **Datasets** - Fashion-MNIST style IDX files or reproducible synthetic
//! blobs, split and served in shuffled minibatches.
//!
//! - **Optimization** - Plain SGD, as well as Momentum, Nesterov and Adam.
//!
//! # Examples
//!
//! Gradient descent by hand:
//! ```
//! use microtrain::{ ops::*, Tensor };
//!
//! let w = Tensor::vec(&[0.5, -0.5]).trained();
//! let x = Tensor::vec(&[1.0, 2.0]).tracked();
//!
//! for _ in 0..20 {
//!   w.zero_grad();
//!   let loss = ((&x * &w).sum(0) - 1.0).sqr();
//!   loss.backward();
//!   let step = w.grad().unwrap() * 0.05;
//!   w.tensor().accumulate(&-step);
//! }
//! let output: f64 = (x.tensor() * w.tensor()).sum(0).item();
//! assert!((output - 1.0).abs() < 1e-3);
//! ```
//!
//! Training a classifier:
//! ```
//! use microtrain::{
//!   config::TrainConfig,
//!   data::synthetic,
//!   module::{ Sequential, Activation },
//!   train::{ Trainer, evaluate },
//!   manual_seed,
//! };
//!
//! manual_seed(1);
//! let data = synthetic::blobs::<f32>(200, 4, 6, 6, 0.2).unwrap();
//! let model = Sequential::classifier(36, &[16], 4, Activation::ReLU);
//! let config = TrainConfig::new().epochs(10).batch_size(20);
//! let history = Trainer::new(config.clone()).unwrap().fit(&model, &data, None).unwrap();
//! assert_eq!(history.epochs.len(), 10);
//! let result = evaluate(&model, &data, 50, config.loss).unwrap();
//! assert!(result.accuracy > 0.5);
//! ```
//!
//! ## More examples
//! Run `cargo run --example walkthrough` for a step by step tour.
//!
//!
//! # Optional features
//!
//! Some features can be toggled in your `Cargo.toml`.
//!
//! - `unsafe` *(default)* - Accelerated matrix math using [matrixmultiply] crate.

mod internal;
mod shape;
mod tensor;
mod variable;

pub mod ops;
pub mod scalar;
pub mod optimize;
pub mod error;
pub mod config;
pub mod data;
pub mod module;
pub mod loss;
pub mod train;
pub mod checkpoint;
pub mod visualize;

pub use shape::Shape;
pub use tensor::Tensor;
pub use variable::{ Variable, UnaryOp, BinaryOp };
pub use internal::manual_seed;
pub use error::{ Error, Result };
