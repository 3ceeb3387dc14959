use std::path::Path;

use rand::seq::SliceRandom;

pub mod idx;
pub mod synthetic;

use crate::{
  internal::*,
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  ops::{ BaseOps, Hops },
};


pub const FASHION_MNIST_CLASSES: [&str; 10] = [
  "T-shirt/top", "Trouser", "Pullover", "Dress", "Coat",
  "Sandal", "Shirt", "Sneaker", "Bag", "Ankle boot",
];


/// Labelled grayscale images.
///
/// Images are stored as one `[N, H, W]` tensor with intensities in `[0, 1]`,
/// labels as `[N]` class indices into `classes`.

#[derive(Debug, Clone)]
pub struct Dataset<T: Real> {
  pub images: Tensor<T>,
  pub labels: Tensor<usize>,
  pub classes: Vec<String>,
}

impl<T: Real> Dataset<T> {
  pub fn new(images: Tensor<T>, labels: Tensor<usize>, classes: Vec<String>) -> Result<Self> {
    if images.rank() != 3 {
      return Err(Error::Config(format!("images need 3 dimensions, got {}", images.shape())))
    }
    if labels.rank() != 1 || labels.size() != images.dim(0) {
      return Err(Error::LabelCount { images: images.dim(0), labels: labels.size() })
    }
    if let Some(label) = labels.param_iter().find(|&label| label >= classes.len() ) {
      return Err(Error::UnknownClass { label, classes: classes.len() })
    }
    Ok(Self { images, labels, classes })
  }

  /// Load a pair of IDX files, scaling byte intensities into `[0, 1]`.

  pub fn load_idx(images: impl AsRef<Path>, labels: impl AsRef<Path>, classes: &[&str]) -> Result<Self> {
    let (image_dims, pixels) = idx::read(images)?;
    let (label_dims, label_bytes) = idx::read(labels)?;
    if image_dims.len() != 3 {
      return Err(Error::Idx(format!("image file needs 3 dimensions, got {:?}", image_dims)))
    }
    if label_dims.len() != 1 {
      return Err(Error::Idx(format!("label file needs 1 dimension, got {:?}", label_dims)))
    }
    if image_dims[0] != label_dims[0] {
      return Err(Error::LabelCount { images: image_dims[0], labels: label_dims[0] })
    }
    let scale = T::from(255.0).unwrap();
    let pixels = pixels.into_iter().map(|p| T::from(p).unwrap() / scale ).collect();
    let labels = label_bytes.into_iter().map(|l| l as usize ).collect();
    let dataset = Self::new(
      Tensor::new(&image_dims, pixels),
      Tensor::from_vec(labels),
      classes.iter().map(|c| c.to_string() ).collect(),
    )?;
    log::debug!("Loaded {} images of {:?}", dataset.len(), dataset.image_dims());
    Ok(dataset)
  }

  /// Fashion-MNIST from its four unpacked files in `dir`.

  pub fn fashion_mnist(dir: impl AsRef<Path>, train: bool) -> Result<Self> {
    let dir = dir.as_ref();
    let prefix = if train { "train" } else { "t10k" };
    Self::load_idx(
      dir.join(format!("{prefix}-images-idx3-ubyte")),
      dir.join(format!("{prefix}-labels-idx1-ubyte")),
      &FASHION_MNIST_CLASSES,
    )
  }

  pub fn len(&self) -> usize {
    self.labels.size()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Height and width of every image.

  pub fn image_dims(&self) -> (usize, usize) {
    (self.images.dim(1), self.images.dim(2))
  }

  pub fn num_classes(&self) -> usize {
    self.classes.len()
  }

  pub fn class_name(&self, label: usize) -> &str {
    &self.classes[label]
  }

  /// Image `i` as `[H, W]` view, along with its label.

  pub fn sample(&self, i: usize) -> (Tensor<T>, usize) {
    (self.images.at(&[i]), self.labels.at(&[i]).item())
  }

  /// Copy out the given samples in order.

  pub fn select(&self, indices: &[usize]) -> Self {
    let (height, width) = self.image_dims();
    let images = if indices.is_empty() {
      Tensor::new(&[0, height, width], vec![])
    } else {
      Tensor::rows(&indices.iter().map(|&i| self.images.at(&[i]) ).collect::<Vec<_>>())
    };
    let labels = Tensor::from_vec(indices.iter().map(|&i| self.labels.at(&[i]).item() ).collect());
    Self { images, labels, classes: self.classes.clone() }
  }

  /// Shuffle and split off `fraction` of the samples,
  /// returning `(rest, split)`.

  pub fn split(&self, fraction: f64) -> (Self, Self) {
    assert!((0.0..=1.0).contains(&fraction), "Split fraction {fraction} out of range");
    let mut order: Vec<usize> = (0..self.len()).collect();
    with_rng(|rng| order.shuffle(rng) );
    let cut = ((self.len() as f64) * fraction).round() as usize;
    let (split, rest) = order.split_at(cut);
    (self.select(rest), self.select(split))
  }

  /// Mean and standard deviation over all pixels.

  pub fn pixel_stats(&self) -> (T, T) {
    (self.images.mean(0).item(), self.images.variance(0).sqrt().item())
  }

  /// Shift and scale every pixel.

  pub fn normalize(&self, mean: T, std: T) -> Self {
    assert!(std > T::zero(), "Cannot normalize by non-positive deviation");
    Self {
      images: (&self.images - mean) / std,
      labels: self.labels.clone(),
      classes: self.classes.clone(),
    }
  }

  /// Iterate over minibatches. The last batch holds the remainder.

  pub fn batches(&self, batch_size: usize, shuffle: bool) -> Batches<T> {
    assert!(batch_size > 0, "Batch size must be positive");
    let mut order: Vec<usize> = (0..self.len()).collect();
    if shuffle {
      with_rng(|rng| order.shuffle(rng) );
    }
    Batches { dataset: self, order, shuffle, batch_size, position: 0 }
  }

  /// Number of batches per epoch.

  pub fn num_batches(&self, batch_size: usize) -> usize {
    (self.len() + batch_size - 1) / batch_size
  }
}


/// A minibatch of `[B, H, W]` images and `[B]` labels.

#[derive(Debug, Clone)]
pub struct Batch<T: Real> {
  pub images: Tensor<T>,
  pub labels: Tensor<usize>,
}

impl<T: Real> Batch<T> {
  pub fn len(&self) -> usize {
    self.labels.size()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}


pub struct Batches<'a, T: Real> {
  dataset: &'a Dataset<T>,
  order: Vec<usize>,
  shuffle: bool,
  batch_size: usize,
  position: usize,
}

impl<T: Real> Iterator for Batches<'_, T> {
  type Item = Batch<T>;

  fn next(&mut self) -> Option<Self::Item> {
    let n = self.order.len();
    if self.position >= n { return None }
    let end = (self.position + self.batch_size).min(n);
    let batch = if self.shuffle {
      let picked = self.dataset.select(&self.order[self.position..end]);
      Batch { images: picked.images, labels: picked.labels }
    } else {
      // In order, so views suffice
      let range = [self.position as isize..end as isize];
      Batch {
        images: self.dataset.images.range(&range),
        labels: self.dataset.labels.range(&range),
      }
    };
    self.position = end;
    Some(batch)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = (self.order.len() - self.position + self.batch_size - 1) / self.batch_size;
    (left, Some(left))
  }
}

impl<T: Real> ExactSizeIterator for Batches<'_, T> {}


#[cfg(test)]
mod tests {
  use super::*;

  fn tiny() -> Dataset<f32> {
    let images = Tensor::arrange(&[5, 2, 2], 0.0, 0.05);
    let labels = Tensor::vec(&[0, 1, 2, 0, 1]);
    Dataset::new(images, labels, vec!["a".into(), "b".into(), "c".into()]).unwrap()
  }

  #[test]
  fn validates() {
    let images = Tensor::<f32>::zeros(&[2, 2, 2]);
    assert!(matches!(Dataset::new(images.clone(), Tensor::vec(&[0]), vec!["a".into()]),
      Err(Error::LabelCount { images: 2, labels: 1 })));
    assert!(matches!(Dataset::new(images, Tensor::vec(&[0, 3]), vec!["a".into()]),
      Err(Error::UnknownClass { label: 3, classes: 1 })));
  }

  #[test]
  fn batches_in_order() {
    let data = tiny();
    let batches: Vec<_> = data.batches(2, false).collect();
    assert_eq!(batches.len(), 3);
    assert_eq!(data.num_batches(2), 3);
    assert_eq!(batches[2].labels, Tensor::vec(&[1]));
    assert_eq!(batches[1].images.shape().dims, vec![2, 2, 2]);
    assert_eq!(batches[1].images.at(&[0]), data.sample(2).0);
  }

  #[test]
  fn shuffled_batches_cover_everything() {
    manual_seed(5);
    let data = tiny();
    let batches = data.batches(2, true);
    assert_eq!(batches.len(), 3);
    let mut seen: Vec<usize> = batches
      .flat_map(|batch| batch.images.iter(0).map(|img| (img.at(&[0, 0]).item() / 0.2).round() as usize ).collect::<Vec<_>>() )
      .collect();
    seen.sort();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn split_and_select() {
    manual_seed(2);
    let data = tiny();
    let (rest, held) = data.split(0.4);
    assert_eq!((rest.len(), held.len()), (3, 2));
    assert_eq!(rest.classes, data.classes);
    let picked = data.select(&[4, 0]);
    assert_eq!(picked.labels, Tensor::vec(&[1, 0]));
    assert!(data.select(&[]).is_empty());
  }

  #[test]
  fn normalize() {
    let data = tiny();
    let (mean, std) = data.pixel_stats();
    let (mean, std) = data.normalize(mean, std).pixel_stats();
    assert!(mean.abs() < 1e-5);
    assert!((std - 1.0).abs() < 1e-4);
  }

  #[test]
  fn idx_files() {
    let dir = tempfile::tempdir().unwrap();
    idx::write(dir.path().join("train-images-idx3-ubyte"), &[2, 1, 2], &[0, 255, 51, 102]).unwrap();
    idx::write(dir.path().join("train-labels-idx1-ubyte"), &[2], &[9, 3]).unwrap();
    let data = Dataset::<f64>::fashion_mnist(dir.path(), true).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.image_dims(), (1, 2));
    assert_eq!(data.class_name(data.sample(0).1), "Ankle boot");
    assert_eq!(data.sample(1).0, Tensor::new(&[1, 2], vec![0.2, 0.4]));
    assert!(Dataset::<f64>::fashion_mnist(dir.path(), false).is_err());
  }

  #[test]
  fn idx_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    let labels = dir.path().join("labels");
    idx::write(&images, &[2, 1, 1], &[0, 1]).unwrap();
    idx::write(&labels, &[3], &[0, 1, 2]).unwrap();
    assert!(matches!(Dataset::<f32>::load_idx(&images, &labels, &FASHION_MNIST_CLASSES),
      Err(Error::LabelCount { images: 2, labels: 3 })));
  }
}
