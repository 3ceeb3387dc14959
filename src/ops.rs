use std::ops::Range;

use num_traits::NumOps;

use crate::internal::*;
use crate::Shape;
use crate::scalar::{ Inner, Numeric, Signed, Real };


/// Low-level compute kernels.

pub trait Cops<I: Numeric> {
  fn matmul(&self, rhs: &Self) -> Vec<I>;
}


/// Differentiable mid-level operations that are also implemented
/// for non-differentiable [Inner] types.

pub trait BaseOps<I: Inner>: Clone {
  fn scalar(item: I) -> Self;
  fn fill(shape: &[usize], filler: I) -> Self;
  fn shape(&self) -> &Shape;
  fn range(&self, ranges: &[Range<isize>]) -> Self;
  fn broadcast(&self, shape: &Shape) -> Self;
  fn reshape(&self, dims: &[usize]) -> Self;
  fn squeeze(&self) -> Self;
  fn unsqueeze(&self, dim: isize) -> Self;
  fn transpose(&self, dim1: isize, dim2: isize) -> Self;

  fn dim(&self, dim: isize) -> usize {
    self.shape()[dim]
  }
}


/// Differentiable mid-level operations that are also implemented
/// for non-differentiable [Numeric] inner types.
///
/// Reductions collapse the given dimension *and every dimension after it*,
/// so `sum(0)` always produces a scalar and `sum(-1)` reduces rows.

pub trait NumericOps<I: Numeric>: NumOps + NumOps<I, Self> + Sized {
  fn sum(&self, dim: isize) -> Self;
  fn mm(&self, rhs: &Self) -> Self;
  fn min(&self, dim: isize) -> Self;
  fn max(&self, dim: isize) -> Self;
}


/// Differentiable mid-level operations that are also implemented
/// for non-differentiable [Signed] inner types.

pub trait SignedOps<I: Signed>: std::ops::Neg<Output = Self> + Sized {
  fn abs(&self) -> Self;
}


/// Differentiable mid-level operations.

pub trait RealOps<I: Real>: std::ops::Neg<Output = Self> + Sized {
  fn pow(&self, rhs: &Self) -> Self;
  fn exp(&self) -> Self;
  fn log(&self) -> Self;
  fn relu(&self) -> Self;
  fn sigmoid(&self) -> Self;
  fn tanh(&self) -> Self;

  /// Logarithm of the softmax over the last dimension, computed
  /// without overflow by subtracting each row's maximum first.

  fn log_softmax(&self) -> Self;
}


/// High-level operations, implemented exclusively on top of
/// mid-level ops and other Hops. As a result, these are all
/// differentiable when called on a [Variable](crate::Variable).

pub trait Hops<I>: BaseOps<I> + NumericOps<I> + SignedOps<I> + RealOps<I>
where
  I: Real,
  for<'a> &'a Self: NumOps<&'a Self, Self> + NumOps<I, Self>,
{
  fn powf(&self, exp: I) -> Self {
    self.pow(&Self::scalar(exp))
  }

  fn sqr(&self) -> Self {
    self * self
  }

  fn sqrt(&self) -> Self {
    self.powf(I::from(0.5).unwrap())
  }

  fn mean(&self, dim: isize) -> Self {
    let udim = negative_index(dim, self.shape().rank(), false);
    let n: usize = self.shape().dims[udim..].iter().product();
    self.sum(dim) / I::from(n).unwrap()
  }

  fn variance(&self, dim: isize) -> Self {
    let rank = self.shape().rank();
    let udim = negative_index(dim, rank, false);
    let mut mean = self.mean(dim);
    for _ in udim..rank {
      mean = mean.unsqueeze(-1);
    }
    (self - &mean).sqr().mean(dim)
  }

  fn softmax(&self) -> Self {
    self.log_softmax().exp()
  }

  /// Collapse everything but the leading batch dimension.

  fn flatten(&self) -> Self {
    let batch = self.dim(0);
    self.reshape(&[batch, 0])
  }

  /// Mean squared error against a target of the same shape.

  fn mse(&self, target: &Self) -> Self {
    (self - target).sqr().mean(0)
  }

  /// Cross entropy between logits of shape `[batch, classes]` and a target
  /// distribution of the same shape, averaged over the batch.

  fn cross_entropy(&self, target: &Self) -> Self {
    -(target * &self.log_softmax()).sum(-1).mean(0)
  }
}
