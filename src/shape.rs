use std::ops::Range;

use serde::{ Serialize, Deserialize };

use crate::internal::*;


/// The dimensions and memory layout of a [Tensor](crate::Tensor) view.
///
/// Several shapes may describe different views into the same storage,
/// which is what makes slicing, transposing and broadcasting free.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
  pub(crate) strides: Vec<isize>,
  pub(crate) offset: usize,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self {
      dims: dims.to_vec(),
      strides: Self::make_strides(dims),
      offset: 0,
    }
  }

  fn make_strides(dims: &[usize]) -> Vec<isize> {
    let mut strides = vec![1; dims.len()];
    for i in (1..dims.len()).rev() {
      strides[i - 1] = dims[i] as isize * strides[i];
    }
    strides
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  pub(crate) fn index(&self, indices: &[usize]) -> usize {
    assert!(indices.len() <= self.rank(), "Too many indices for {}", self);
    (indices.iter()
      .zip(&self.strides)
      .map(|(&i, &s)| i as isize * s )
      .sum::<isize>() + self.offset as isize
    ) as usize
  }

  pub fn contiguous(&self) -> bool {
    // Size one dimensions never get stepped over
    self.dims.iter()
      .zip(self.strides.iter().zip(Self::make_strides(&self.dims)))
      .all(|(&n, (&s, expected))| n == 1 || s == expected )
  }

  /// Storage indices of all elements in row major order.

  pub fn iter(&self) -> Box<dyn Iterator<Item=usize> + '_> {
    if self.contiguous() {
      Box::new(self.offset..self.offset + self.size())
    } else {
      Box::new(ShapeIterator::new(self))
    }
  }

  /// Reinterpret contiguous data with new dimensions.
  /// A single `0` acts as a placeholder that absorbs the remaining size.

  pub fn view(&self, dims: &[usize]) -> Self {
    assert!(self.contiguous(), "Cannot view non-contiguous {}", self);
    let known: usize = dims.iter().filter(|&&n| n != 0 ).product();
    let dims: Vec<usize> = dims.iter()
      .map(|&n| if n == 0 { self.size() / known.max(1) } else { n })
      .collect();
    assert_eq!(dims.iter().product::<usize>(), self.size(),
      "Cannot view {} as {:?}", self, dims);
    Self { strides: Self::make_strides(&dims), dims, offset: self.offset }
  }

  pub fn take(&self, indices: &[usize]) -> Self {
    for (d, &i) in indices.iter().enumerate() {
      assert!(i < self.dims[d], "Index {} out of bounds for dim {} of {}", i, d, self);
    }
    Self {
      dims: self.dims[indices.len()..].to_vec(),
      strides: self.strides[indices.len()..].to_vec(),
      offset: self.index(indices),
    }
  }

  pub fn range(&self, ranges: &[Range<isize>]) -> Self {
    let mut offset = self.offset as isize;
    let mut dims = self.dims.clone();
    for (d, range) in ranges.iter().enumerate() {
      let n = self.dims[d];
      let start = negative_index(range.start, n, true);
      let end = negative_index(range.end, n, true);
      assert!(start <= end && end <= n, "Range {:?} out of bounds for dim {} of {}", range, d, self);
      offset += self.strides[d] * start as isize;
      dims[d] = end - start;
    }
    Self { dims, strides: self.strides.clone(), offset: offset as usize }
  }

  pub fn squeeze(&self) -> Self {
    self.squeeze_if(|_| true )
  }

  pub fn squeeze_only(&self, dim: isize) -> Self {
    let dim = negative_index(dim, self.rank(), false);
    self.squeeze_if(|d| d == dim )
  }

  fn squeeze_if(&self, cb: impl Fn(usize) -> bool) -> Self {
    let (dims, strides) = self.dims.iter()
      .zip(&self.strides)
      .enumerate()
      .filter(|(d, (&n, _))| n != 1 || !cb(*d) )
      .map(|(_, (&n, &s))| (n, s) )
      .unzip();
    Self { dims, strides, offset: self.offset }
  }

  pub fn unsqueeze(&self, dim: isize) -> Self {
    let d = negative_index(dim, self.rank(), true);
    let mut shape = self.clone();
    let stride = if d < shape.rank() { shape.strides[d] * shape.dims[d] as isize } else { 1 };
    shape.strides.insert(d, stride);
    shape.dims.insert(d, 1);
    shape
  }

  /// Dimensions both shapes broadcast to, following numpy rules.

  pub fn broadcast_dims(lhs: &[usize], rhs: &[usize]) -> Vec<usize> {
    let rank = lhs.len().max(rhs.len());
    let padded = |dims: &[usize], d: usize| {
      let pad = rank - dims.len();
      if d < pad { 1 } else { dims[d - pad] }
    };
    (0..rank).map(|d| {
      let (l, r) = (padded(lhs, d), padded(rhs, d));
      assert!(l == r || l == 1 || r == 1,
        "Could not broadcast Shape{:?} & Shape{:?}", lhs, rhs);
      l.max(r)
    }).collect()
  }

  /// Stretch this view to the broadcasted dimensions of both shapes,
  /// using zero strides for repeated dimensions.

  pub fn broadcast(&self, other: &Self) -> Self {
    let dims = Self::broadcast_dims(&self.dims, &other.dims);
    let pad = dims.len() - self.rank();
    let strides = dims.iter().enumerate().map(|(d, &n)| {
      if d < pad || (self.dims[d - pad] == 1 && n != 1) { 0 } else { self.strides[d - pad] }
    }).collect();
    Self { dims, strides, offset: self.offset }
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    let dim1 = negative_index(dim1, self.rank(), false);
    let dim2 = negative_index(dim2, self.rank(), false);
    let mut shape = self.clone();
    shape.dims.swap(dim1, dim2);
    shape.strides.swap(dim1, dim2);
    shape
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  fn index(&self, i: isize) -> &usize {
    let idx = negative_index(i, self.rank(), false);
    &self.dims[idx]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


/// Iterate through a strided [Shape]'s storage indices.

pub struct ShapeIterator<'a> {
  shape: &'a Shape,
  counter: Vec<usize>,
  idx: isize,
  remaining: usize,
}

impl<'a> ShapeIterator<'a> {
  fn new(shape: &'a Shape) -> Self {
    Self {
      counter: vec![0; shape.rank()],
      idx: shape.offset as isize,
      remaining: shape.size(),
      shape,
    }
  }
}

impl<'a> Iterator for ShapeIterator<'a> {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 { return None }
    self.remaining -= 1;
    let out = self.idx as usize;
    // Odometer increment, rightmost dimension first
    for d in (0..self.counter.len()).rev() {
      self.counter[d] += 1;
      self.idx += self.shape.strides[d];
      if self.counter[d] < self.shape.dims[d] { break }
      self.idx -= self.shape.dims[d] as isize * self.shape.strides[d];
      self.counter[d] = 0;
    }
    Some(out)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strides() {
    let shape = Shape::new(&[3,2,2]);
    assert_eq!(shape.strides, vec![4,2,1]);

    let shape = Shape::new(&[2,3,2]);
    assert_eq!(shape.strides, vec![6,2,1]);
  }

  #[test]
  fn index() {
    let shape = Shape::new(&[2,3]);
    assert_eq!(shape.index(&[0]), 0);
    assert_eq!(shape.index(&[1,0]), 3);
  }

  #[test]
  fn range() {
    let shape = Shape::new(&[4,4,4]).range(&[1..3, 1..3, 1..3]);
    assert_eq!(shape.dims, vec![2,2,2]);
    assert_eq!(shape.offset, 21);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![21, 22, 25, 26, 37, 38, 41, 42]);
  }

  #[test]
  fn view_placeholder() {
    let shape = Shape::new(&[4,3,2]).view(&[4,0]);
    assert_eq!(shape.dims, vec![4,6]);
  }

  #[test]
  fn unsqueeze() {
    let shape = Shape::new(&[3,2,2]).unsqueeze(-1);
    assert_eq!(shape.dims, vec![3,2,2,1]);
    assert_eq!(shape.strides, vec![4,2,1,1]);

    let shape = Shape::new(&[2,3,2]).unsqueeze(0);
    assert_eq!(shape.dims, vec![1,2,3,2]);
    assert_eq!(shape.strides, vec![12,6,2,1]);
  }

  #[test]
  fn squeeze() {
    let shape = Shape::new(&[3,2,1]).squeeze();
    assert_eq!(shape.dims, vec![3,2]);
    assert_eq!(shape.strides, vec![2,1]);

    let shape = Shape::new(&[2,1,3,1,2]).squeeze_only(-2);
    assert_eq!(shape.dims, vec![2,1,3,2]);
    assert_eq!(shape.strides, vec![6,6,2,1]);
  }

  #[test]
  fn broadcast() {
    let shape = Shape::new(&[2,3,2]).broadcast(&Shape::new(&[2,1,2]));
    assert_eq!(shape.dims, vec![2,3,2]);
    assert_eq!(shape.strides, vec![6,2,1]);

    let shape = Shape::new(&[2,1,2]).broadcast(&Shape::new(&[2,3,1]));
    assert_eq!(shape.dims, vec![2,3,2]);
    assert_eq!(shape.strides, vec![2,0,1]);

    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![0, 1, 0, 1, 0, 1, 2, 3, 2, 3, 2, 3]);
  }

  #[test]
  fn broadcast_bias() {
    let shape = Shape::new(&[3]).broadcast(&Shape::new(&[2,3]));
    assert_eq!(shape.dims, vec![2,3]);
    assert_eq!(shape.strides, vec![0,1]);
  }

  #[test]
  #[should_panic]
  fn broadcast_mismatch() {
    Shape::broadcast_dims(&[2,3], &[4]);
  }

  #[test]
  fn transpose() {
    let shape = Shape::new(&[2,3]).transpose(0,1);
    assert_eq!(shape.dims, vec![3,2]);
    assert_eq!(shape.strides, vec![1,3]);
    assert_eq!(shape.index(&[1,0]), 1);
    assert_eq!(shape.index(&[1,1]), 4);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![0, 3, 1, 4, 2, 5]);
  }
}
