use std::rc::Rc;
use std::cell::{ Ref, RefMut, RefCell };

use rand::Rng;
use num_traits::NumCast;
use serde::{ Serialize, Deserialize };

mod cops;
mod lops;

use crate::{
  internal::*,
  shape::Shape,
  variable::Variable,
  scalar::{ Inner, Numeric, Real, Integer, Signed, Unsigned },
  ops::{ BaseOps, Hops },
};


/// Multidimensional array.
///
/// Tensors may contain any type that satisfies [Inner], but
/// additional methods are available for [Numeric], [Real]
/// and [boolean](bool) inner types.
///
/// Cloning a tensor is cheap and produces another view of the same storage.
/// Use [detach](Tensor::detach) for an independent copy.
///
/// [Real] tensor types can be wrapped in a [Variable] by
/// calling [tracked](Tensor::tracked) or [trained](Tensor::trained).

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor<T: Inner> {
  shape: Shape,
  data: Rc<RefCell<Vec<T>>>,
}

impl<T: Real> Hops<T> for Tensor<T> {}

impl<T: Inner> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    if self.shape.squeeze().dims != rhs.shape.squeeze().dims { return false }
    self.param_iter().zip(rhs.param_iter()).all(|(a, b)| a == b )
  }
}

impl<T: Inner> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data: Rc::new(RefCell::new(data)) }
  }

  pub fn new(shape: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(shape), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn from_vec(vec: Vec<T>) -> Self {
    Self::new(&[vec.len()], vec)
  }

  /// Stack equally shaped tensors along a new leading dimension.

  pub fn rows(rows: &[Tensor<T>]) -> Self {
    assert!(!rows.is_empty(), "Cannot stack zero rows");
    let mut dims = rows[0].shape.dims.clone();
    let mut data = Vec::with_capacity(rows.len() * rows[0].size());
    for row in rows {
      assert_eq!(row.shape.dims, rows[0].shape.dims, "Cannot stack {} with {}", row.shape, rows[0].shape);
      data.extend(row.param_iter());
    }
    dims.insert(0, rows.len());
    Self::new(&dims, data)
  }

  pub fn raw(&self) -> Ref<Vec<T>> {
    self.data.borrow()
  }

  pub(crate) fn raw_mut(&self) -> RefMut<Vec<T>> {
    self.data.borrow_mut()
  }

  /// Elements of this view in row major order.

  pub fn into_raw(self) -> Vec<T> {
    let whole = self.shape.contiguous()
      && self.shape.offset == 0
      && self.size() == self.data.borrow().len();
    if whole {
      return match Rc::try_unwrap(self.data) {
        Ok(cell) => cell.into_inner(),
        Err(data) => data.borrow().clone(),
      }
    }
    self.param_iter().collect()
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn shared_with(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }

  /// Overwrite this view's elements with those of another tensor of equal size.

  pub fn assign(&self, other: &Self) {
    self.write(other, |a, b| *a = b );
  }

  /// Add another tensor of equal size to this view's elements.

  pub fn accumulate(&self, other: &Self) where T: Numeric {
    self.write(other, |a, b| *a += b );
  }

  fn write(&self, other: &Self, cb: impl Fn(&mut T, T)) {
    assert!(self.shape.squeeze().dims == other.shape.squeeze().dims,
      "Could not feed {} tensor with {} tensor", self.shape, other.shape);
    // Avoid clashing borrow when tensors share storage
    let other = if self.shared_with(other) { other.detach() } else { other.clone() };
    let mut data = self.data.borrow_mut();
    let other_data = other.data.borrow();
    for (i, j) in self.shape.iter().zip(other.shape.iter()) {
      cb(&mut data[i], other_data[j]);
    }
  }

  pub fn refill(&self, filler: T) {
    let mut data = self.data.borrow_mut();
    for i in self.shape.iter() {
      data[i] = filler;
    }
  }

  pub fn contiguous(&self) -> Self {
    if self.shape.contiguous() {
      self.clone()
    } else {
      self.detach()
    }
  }

  pub fn detach(&self) -> Self {
    self.vectorize(|a| a )
  }

  pub fn zip<O,F>(&self, rhs: &Self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: Fn((T, T)) -> O,
  {
    let dims = Shape::broadcast_dims(&self.shape.dims, &rhs.shape.dims);
    let target = Shape::new(&dims);
    let lhs = self.broadcast(&target);
    let rhs = rhs.broadcast(&target);
    let data = lhs.param_iter()
      .zip(rhs.param_iter())
      .map(cb)
      .collect();
    Tensor::new(&dims, data)
  }

  pub fn vectorize<O,F>(&self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut(T) -> O,
  {
    let data = self.param_iter().map(cb).collect();
    Tensor::new(&self.shape.dims, data)
  }

  /// Collapse dimension `dim` and all dimensions after it,
  /// handing each block of collapsed values to `cb`.

  pub fn collapse<O,F>(&self, dim: isize, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: Fn(&[T]) -> O,
  {
    let dim = negative_index(dim, self.rank(), false);
    let this = self.contiguous();
    let inner: usize = this.shape.dims[dim..].iter().product();
    let raw = this.raw();
    let start = this.shape.offset;
    let values = &raw[start..start + this.size()];
    let data = if inner == 0 {
      vec![cb(&[]); this.shape.dims[..dim].iter().product()]
    } else {
      values.chunks(inner).map(cb).collect()
    };
    Tensor::new(&this.shape.dims[..dim], data)
  }

  pub fn iter(&self, dim: isize) -> TensorSliceIterator<T> {
    TensorSliceIterator::new(self, dim)
  }

  pub fn param_iter(&self) -> TensorIterator<T> {
    TensorIterator::new(self)
  }

  pub fn at(&self, indices: &[usize]) -> Self {
    Self { shape: self.shape.take(indices), data: self.data.clone() }
  }

  pub fn item(&self) -> T {
    assert!(self.shape.squeeze().rank() == 0,
      "Can't extract item from non-scalar {}", self.shape);
    self.raw()[self.shape.offset]
  }

  pub fn view(&self, dims: &[usize]) -> Self {
    Self { shape: self.shape.view(dims), data: self.data.clone() }
  }

  pub fn equal(&self, rhs: &Self) -> Tensor<bool> {
    self.zip(rhs, |(a, b)| a == b )
  }

  /// Split along the first dimension into pieces of `size`,
  /// the last one holding the remainder.

  pub fn chunks(&self, size: usize) -> Vec<Tensor<T>> {
    assert!(size > 0, "Chunk size must be positive");
    let n = self.shape[0];
    (0..n).step_by(size)
      .map(|start| self.range(&[start as isize..(start + size).min(n) as isize]) )
      .collect()
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn arrange(shape: &[usize], start: T, step: T) -> Self {
    Self::new(shape, (0..shape.iter().product::<usize>())
      .map(|i| T::from(i).unwrap() * step + start )
      .collect())
  }

  pub fn hot_encode(idx: usize, size: usize) -> Self {
    let mut a = vec![T::zero(); size];
    a[idx] = T::one();
    Self::from_vec(a)
  }

  /// Reduce a single dimension, keeping it with size one.

  pub fn sum_over(&self, dim: isize) -> Self {
    let dim = negative_index(dim, self.rank(), false);
    let this = self.contiguous();
    let outer: usize = this.shape.dims[..dim].iter().product();
    let n = this.shape.dims[dim];
    let inner: usize = this.shape.dims[dim + 1..].iter().product();
    let raw = this.raw();
    let offset = this.shape.offset;
    let mut data = vec![T::zero(); outer * inner];
    for o in 0..outer {
      for k in 0..n {
        let row = offset + (o * n + k) * inner;
        for i in 0..inner {
          data[o * inner + i] += raw[row + i];
        }
      }
    }
    let mut dims = this.shape.dims.clone();
    dims[dim] = 1;
    Self::new(&dims, data)
  }

  pub fn gt(&self, rhs: &Self) -> Tensor<bool> {
    self.zip(rhs, |(a, b)| a > b )
  }

  pub fn lt(&self, rhs: &Self) -> Tensor<bool> {
    self.zip(rhs, |(a, b)| a < b )
  }

  /// Collapse the last dimensions from `dim` on, using the index of their greatest value.
  /// Ties resolve to the lowest index.

  pub fn argmax<O: Integer + Unsigned>(&self, dim: isize) -> Tensor<O> {
    self.collapse(dim, |values| {
      let mut index = 0;
      for (i, &value) in values.iter().enumerate() {
        if value > values[index] {
          index = i;
        }
      }
      O::from(index).unwrap()
    })
  }

  pub fn clamp(&self, min: T, max: T) -> Self {
    self.vectorize(|a| if a < min { min } else if a > max { max } else { a } )
  }

  pub fn cast<I: Numeric>(&self) -> Tensor<I> {
    self.vectorize(|a| I::from(a).unwrap() )
  }
}

impl<T: Real> Tensor<T> {
  pub fn rand(shape: &[usize]) -> Self {
    Self::uniform(shape, T::zero(), T::one())
  }

  pub fn uniform(shape: &[usize], low: T, high: T) -> Self {
    let data: Vec<T> = with_rng(|rng| {
      (0..shape.iter().product::<usize>())
        .map(|_| rng.gen_range(low, high) )
        .collect()
    });
    Self::new(shape, data)
  }

  pub fn randn(shape: &[usize]) -> Self {
    let len = shape.iter().product();
    let mut data = vec![T::zero(); len];
    with_rng(|rng| {
      for j in (0..len).step_by(2) {
        let (r1, r2): (T, T) = randn(rng);
        data[j] = r1;
        if j + 1 < len { data[j + 1] = r2 }
      }
    });
    Self::new(shape, data)
  }

  /// Wrap as a trainable parameter that accumulates gradients.

  pub fn trained(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), true)
  }

  /// Wrap as a graph input whose operations get recorded.

  pub fn tracked(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), false)
  }
}

impl<T: Integer> Tensor<T> {
  /// Fraction of equal entries along the first dimension.

  pub fn accuracy<O: Real>(&self, labels: &Self) -> O {
    let hits = self.equal(labels).param_iter().filter(|&hit| hit ).count();
    O::from(hits).unwrap() / O::from(labels.shape[0]).unwrap()
  }
}

impl<T: Integer + Unsigned> Tensor<T> {
  pub fn one_hot<O: Numeric>(&self, size: usize) -> Tensor<O> {
    let mut data = vec![O::zero(); self.size() * size];
    for (row, a) in self.param_iter().enumerate() {
      let i: usize = NumCast::from(a).unwrap();
      assert!(i < size, "Class {} out of range for {} classes", i, size);
      data[row * size + i] = O::one();
    }
    let mut dims = self.shape.dims.clone();
    dims.push(size);
    Tensor::new(&dims, data)
  }

  /// Count matrix of `[predicted, actual]` pairs.

  pub fn confusion(&self, labels: &Self, num_classes: usize) -> Self {
    let confusion = Self::zeros(&[num_classes, num_classes]);
    {
      let mut raw = confusion.raw_mut();
      for (pred, real) in self.param_iter().zip(labels.param_iter()) {
        let pred: usize = NumCast::from(pred).unwrap();
        let real: usize = NumCast::from(real).unwrap();
        raw[pred * num_classes + real] += T::one();
      }
    }
    confusion
  }
}

impl<T: Signed> Tensor<T> {
  pub fn signum(&self) -> Self {
    self.vectorize(|a| a.signum() )
  }
}

impl Tensor<bool> {
  pub fn numeric<O: Numeric>(&self) -> Tensor<O> {
    self.vectorize(|a| if a { O::one() } else { O::zero() })
  }
}

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    let data: Vec<T> = self.param_iter().collect();
    print_chunks(0, &self.shape, &data, f)
  }
}

fn print_chunks<T: std::fmt::Debug>(idx: usize, shape: &Shape, vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = "  ".repeat(idx);
  if shape.rank() == 0 {
    write!(f, "{indent}{:?}", vec[0])?;
  } else if idx == shape.rank() - 1 {
    writeln!(f, "{indent}{:?}", vec)?;
  } else {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks((vec.len() / shape.dims[idx].max(1)).max(1)) {
      print_chunks(idx + 1, shape, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  }
  Ok(())
}


/// Iterate over sub-tensors, stepping through every index
/// of dimensions up to and including `dim`.

pub struct TensorSliceIterator<T: Inner> {
  tensor: Tensor<T>,
  index: usize,
}

impl<T: Inner> TensorSliceIterator<T> {
  fn new(tensor: &Tensor<T>, dim: isize) -> Self {
    let dim = negative_index(dim, tensor.rank(), false);
    let outer: usize = tensor.shape.dims[..=dim].iter().product();
    let dims = [&[outer][..], &tensor.shape.dims[dim + 1..]].concat();
    Self {
      tensor: tensor.reshape(&dims),
      index: 0,
    }
  }
}

impl<T: Inner> Iterator for TensorSliceIterator<T> {
  type Item = Tensor<T>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.index == self.tensor.shape[0] { return None }
    let out = self.tensor.at(&[self.index]);
    self.index += 1;
    Some(out)
  }
}


pub struct TensorIterator<'a, T: Inner> {
  data: Ref<'a, Vec<T>>,
  shape_iter: Box<dyn Iterator<Item=usize> + 'a>,
}

impl<'a, T: Inner> TensorIterator<'a, T> {
  fn new(tensor: &'a Tensor<T>) -> Self {
    Self {
      data: tensor.data.borrow(),
      shape_iter: tensor.shape.iter(),
    }
  }
}

impl<T: Inner> Iterator for TensorIterator<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<Self::Item> {
    self.shape_iter.next().map(|i| self.data[i] )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::NumericOps;

  #[test]
  fn index() {
    let x = Tensor::new(&[2,2,2], vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(x.at(&[0,0]), Tensor::vec(&[1, 2]));
    assert_eq!(x.at(&[1,1]), Tensor::vec(&[7, 8]));
    assert_eq!(x.at(&[0,1,1]), Tensor::vec(&[4]));
    assert_eq!(x.at(&[0]), Tensor::new(&[2,2], vec![1, 2, 3, 4]));
  }

  #[test]
  fn range() {
    let x = Tensor::vec(&[3, 5, 6]);
    assert_eq!(x.range(&[1..-1]), Tensor::vec(&[5, 6]));
  }

  #[test]
  fn broadcast() {
    let x = Tensor::new(&[1,2,3], vec![1, 2, 3, 4, 5, 6]);

    let y = Tensor::new(&[    1], vec![1]);
    assert_eq!(&x + &y, Tensor::new(&[1,2,3], vec![2, 3, 4, 5, 6, 7]));

    let y = Tensor::new(&[    3], vec![1, 2, 3]);
    assert_eq!(&x + &y, Tensor::new(&[1,2,3], vec![2, 4, 6, 5, 7, 9]));

    let y = Tensor::new(&[  2,1], vec![10, 20]);
    assert_eq!(&x + &y, Tensor::new(&[1,2,3], vec![11, 12, 13, 24, 25, 26]));
  }

  #[test]
  fn sum_over() {
    let a = Tensor::arrange(&[3,2,2], 0, 1).sum_over(1);
    assert_eq!(a, Tensor::new(&[3, 1, 2], vec![2, 4, 10, 12, 18, 20]));
  }

  #[test]
  fn sum_over_transposed() {
    let a = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]).transpose(0, 1).sum_over(0);
    assert_eq!(a, Tensor::new(&[1, 2], vec![6, 15]));
  }

  #[test]
  fn assign_view() {
    let a = Tensor::<i32>::zeros(&[2, 2]);
    a.at(&[1]).assign(&Tensor::vec(&[7, 8]));
    assert_eq!(a, Tensor::new(&[2, 2], vec![0, 0, 7, 8]));
  }

  #[test]
  fn accumulate_shared() {
    let a = Tensor::vec(&[1, 2]);
    a.accumulate(&a.clone());
    assert_eq!(a, Tensor::vec(&[2, 4]));
  }

  #[test]
  fn argmax() {
    let a = Tensor::new(&[2, 3], vec![-3.0, -1.0, -2.0, 0.5, 0.5, 0.1]);
    assert_eq!(a.argmax::<usize>(-1), Tensor::vec(&[1, 0]));
  }

  #[test]
  fn one_hot() {
    let labels = Tensor::vec(&[2usize, 0]);
    assert_eq!(labels.one_hot::<f32>(3), Tensor::new(&[2, 3], vec![0., 0., 1., 1., 0., 0.]));
  }

  #[test]
  fn accuracy_and_confusion() {
    let pred = Tensor::vec(&[0usize, 1, 1, 2]);
    let real = Tensor::vec(&[0usize, 1, 2, 2]);
    assert_eq!(pred.accuracy::<f32>(&real), 0.75);
    let confusion = pred.confusion(&real, 3);
    assert_eq!(confusion, Tensor::new(&[3, 3], vec![1, 0, 0, 0, 1, 1, 0, 0, 1]));
  }

  #[test]
  fn chunks() {
    let a = Tensor::arrange(&[5, 2], 0, 1);
    let chunks = a.chunks(2);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2], Tensor::new(&[1, 2], vec![8, 9]));
  }

  #[test]
  fn rows() {
    let a = Tensor::new(&[2, 2], vec![1, 2, 3, 4]);
    let stacked = Tensor::rows(&[a.at(&[1]), a.transpose(0, 1).at(&[0])]);
    assert_eq!(stacked, Tensor::new(&[2, 2], vec![3, 4, 1, 3]));
  }

  #[test]
  fn seeded_random() {
    manual_seed(3);
    let a = Tensor::<f32>::randn(&[5]);
    manual_seed(3);
    let b = Tensor::<f32>::randn(&[5]);
    assert_eq!(a, b);
  }

  #[test]
  fn into_raw_view() {
    let a = Tensor::new(&[2, 2], vec![1, 2, 3, 4]);
    assert_eq!(a.transpose(0, 1).into_raw(), vec![1, 3, 2, 4]);
    assert_eq!(a.sum(0).item(), 10);
  }
}
