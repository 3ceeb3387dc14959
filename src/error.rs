use std::path::PathBuf;

use thiserror::Error;


/// Recoverable failures of loading data, configuring and running training.

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Could not access {path}: {source}")]
  File { path: PathBuf, source: std::io::Error },

  #[error("Invalid IDX data: {0}")]
  Idx(String),

  #[error("Images and labels disagree: {images} images but {labels} labels")]
  LabelCount { images: usize, labels: usize },

  #[error("Label {label} is out of range for {classes} classes")]
  UnknownClass { label: usize, classes: usize },

  #[error("Dataset is empty")]
  EmptyDataset,

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Loss diverged to {loss} in epoch {epoch}")]
  Diverged { epoch: usize, loss: f64 },

  #[error("Checkpoint holds {found} parameters, model has {expected}")]
  ParameterCount { expected: usize, found: usize },

  #[error("Parameter {index} has shape {found:?}, model expects {expected:?}")]
  ParameterShape { index: usize, expected: Vec<usize>, found: Vec<usize> },

  #[error("Checkpoint encoding error: {0}")]
  Checkpoint(#[from] postcard::Error),

  #[error("Config parse error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  pub(crate) fn file(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::File { path, source }
  }
}
