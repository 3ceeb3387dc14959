use std::fs;
use std::path::Path;

use serde::{ Serialize, Deserialize, de::DeserializeOwned };

use crate::{
  error::{ Error, Result },
  module::Module,
  scalar::Real,
  tensor::Tensor,
  ops::BaseOps,
};


#[derive(Serialize, Deserialize)]
struct ParameterDump<T> {
  dims: Vec<usize>,
  data: Vec<T>,
}

#[derive(Serialize, Deserialize)]
struct CheckpointDump<T> {
  model: String,
  parameters: Vec<ParameterDump<T>>,
}


/// Write every parameter of `model`, in order, to `path`.

pub fn save<T, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
  T: Real + Serialize,
  M: Module<T>,
{
  let parameters = model.parameters()
    .iter()
    .map(|param| ParameterDump {
      dims: param.shape().dims.clone(),
      data: param.tensor().detach().into_raw(),
    })
    .collect();
  let dump = CheckpointDump { model: model.describe(), parameters };
  let bytes = postcard::to_allocvec(&dump)?;
  let path = path.as_ref();
  fs::write(path, &bytes).map_err(Error::file(path))?;
  log::info!("Saved {} to {} ({} bytes)", dump.model, path.display(), bytes.len());
  Ok(())
}

/// Overwrite the parameters of `model` with those stored at `path`.
///
/// The model must have been built with the same architecture.

pub fn load<T, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
  T: Real + DeserializeOwned,
  M: Module<T>,
{
  let path = path.as_ref();
  let bytes = fs::read(path).map_err(Error::file(path))?;
  let dump: CheckpointDump<T> = postcard::from_bytes(&bytes)?;
  let params = model.parameters();
  if dump.parameters.len() != params.len() {
    return Err(Error::ParameterCount { expected: params.len(), found: dump.parameters.len() })
  }
  // Check everything before touching the model
  for (index, (param, stored)) in params.iter().zip(&dump.parameters).enumerate() {
    let size: usize = stored.dims.iter().product();
    if param.shape().dims != stored.dims || size != stored.data.len() {
      return Err(Error::ParameterShape {
        index,
        expected: param.shape().dims.clone(),
        found: stored.dims.clone(),
      })
    }
  }
  for (param, stored) in params.iter().zip(dump.parameters) {
    param.tensor().assign(&Tensor::new(&stored.dims, stored.data));
  }
  log::debug!("Loaded {} from {}", dump.model, path.display());
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::module::{ Sequential, Activation };

  #[test]
  fn round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.ckpt");
    let model = Sequential::<f32>::classifier(6, &[4], 3, Activation::ReLU);
    save(&model, &path).unwrap();
    let restored = Sequential::<f32>::classifier(6, &[4], 3, Activation::ReLU);
    load(&restored, &path).unwrap();
    for (a, b) in Module::parameters(&model).iter().zip(Module::parameters(&restored)) {
      assert_eq!(a.tensor(), b.tensor());
    }
  }

  #[test]
  fn mismatched_architecture() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.ckpt");
    save(&Sequential::<f64>::classifier(6, &[4], 3, Activation::ReLU), &path).unwrap();

    let deeper = Sequential::<f64>::classifier(6, &[4, 4], 3, Activation::ReLU);
    assert!(matches!(load(&deeper, &path), Err(Error::ParameterCount { expected: 6, found: 4 })));

    let wider = Sequential::<f64>::classifier(6, &[5], 3, Activation::ReLU);
    let before = Module::parameters(&wider)[0].detach();
    assert!(matches!(load(&wider, &path), Err(Error::ParameterShape { index: 0, .. })));
    assert_eq!(Module::parameters(&wider)[0].tensor(), &before);
  }

  #[test]
  fn corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.ckpt");
    fs::write(&path, [0xff, 0xff, 0xff]).unwrap();
    let model = Sequential::<f32>::classifier(2, &[], 2, Activation::ReLU);
    assert!(matches!(load(&model, &path), Err(Error::Checkpoint(_))));
    assert!(matches!(load(&model, dir.path().join("missing")), Err(Error::File { .. })));
    assert!(matches!(save(&model, dir.path().join("no/such/dir")), Err(Error::File { .. })));
  }
}
