use crate::{
  data::Dataset,
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
};


/// Noisy copies of one random prototype image per class.
///
/// Draws from the thread's generator, so seeding with
/// [manual_seed](crate::manual_seed) first makes the data reproducible.
/// Labels cycle through the classes, keeping them balanced.

pub fn blobs<T: Real>(samples: usize, classes: usize, height: usize, width: usize, noise: T) -> Result<Dataset<T>> {
  if samples == 0 || height * width == 0 {
    return Err(Error::EmptyDataset)
  }
  if classes == 0 {
    return Err(Error::Config("blobs need at least one class".into()))
  }
  let prototypes = Tensor::rand(&[classes, height, width]);
  let labels: Vec<usize> = (0..samples).map(|i| i % classes ).collect();
  let base = Tensor::rows(&labels.iter().map(|&c| prototypes.at(&[c]) ).collect::<Vec<_>>());
  let images = (base + Tensor::randn(&[samples, height, width]) * noise).clamp(T::zero(), T::one());
  let names = (0..classes).map(|c| format!("blob {c}") ).collect();
  Dataset::new(images, Tensor::from_vec(labels), names)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::internal::manual_seed;

  #[test]
  fn shapes_and_range() {
    let data = blobs::<f32>(25, 4, 3, 5, 0.5).unwrap();
    assert_eq!(data.len(), 25);
    assert_eq!(data.image_dims(), (3, 5));
    assert_eq!(data.num_classes(), 4);
    assert_eq!(data.class_name(3), "blob 3");
    assert!(data.images.param_iter().all(|p| (0.0..=1.0).contains(&p) ));
  }

  #[test]
  fn reproducible() {
    manual_seed(11);
    let a = blobs::<f64>(6, 2, 2, 2, 0.1).unwrap();
    manual_seed(11);
    let b = blobs::<f64>(6, 2, 2, 2, 0.1).unwrap();
    assert_eq!(a.images, b.images);
  }

  #[test]
  fn noiseless_samples_match_prototype() {
    let data = blobs::<f32>(4, 2, 2, 2, 0.0).unwrap();
    assert_eq!(data.sample(0).0, data.sample(2).0);
    assert_eq!(data.labels, Tensor::vec(&[0, 1, 0, 1]));
  }

  #[test]
  fn rejects_empty() {
    assert!(matches!(blobs::<f32>(0, 2, 2, 2, 0.1), Err(Error::EmptyDataset)));
    assert!(blobs::<f32>(3, 0, 2, 2, 0.1).is_err());
  }
}
