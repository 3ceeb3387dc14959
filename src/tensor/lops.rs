use std::ops::Range;

use crate::{
  shape::Shape,
  tensor::Tensor,
  scalar::{ Inner, Numeric, Signed, Real },
  ops::{ Cops, BaseOps, NumericOps, SignedOps, RealOps },
};


impl<T: Inner> BaseOps<T> for Tensor<T> {
  fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  fn shape(&self) -> &Shape {
    &self.shape
  }

  fn range(&self, ranges: &[Range<isize>]) -> Self {
    Self { shape: self.shape.range(ranges), data: self.data.clone() }
  }

  fn broadcast(&self, shape: &Shape) -> Self {
    Self { shape: self.shape.broadcast(shape), data: self.data.clone() }
  }

  fn reshape(&self, dims: &[usize]) -> Self {
    self.contiguous().view(dims)
  }

  fn squeeze(&self) -> Self {
    Self { shape: self.shape.squeeze(), data: self.data.clone() }
  }

  fn unsqueeze(&self, dim: isize) -> Self {
    Self { shape: self.shape.unsqueeze(dim), data: self.data.clone() }
  }

  fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    Self { shape: self.shape.transpose(dim1, dim2), data: self.data.clone() }
  }
}

impl<T: Numeric> NumericOps<T> for Tensor<T> {
  fn sum(&self, dim: isize) -> Self {
    self.collapse(dim, |values| values.iter().copied().sum() )
  }

  fn mm(&self, rhs: &Self) -> Self {
    // Vectors on the left act as a single row
    let vector = self.rank() == 1;
    let lhs = if vector { self.unsqueeze(0) } else { self.clone() };
    assert!(lhs.rank() == 2 && rhs.rank() == 2,
      "Matrix multiply needs rank 2 operands, got {} & {}", self.shape, rhs.shape);
    assert_eq!(lhs.shape[1], rhs.shape[0],
      "Cannot multiply {} by {}", self.shape, rhs.shape);
    let data = lhs.matmul(rhs);
    if vector {
      Self::new(&[rhs.shape[1]], data)
    } else {
      Self::new(&[lhs.shape[0], rhs.shape[1]], data)
    }
  }

  fn min(&self, dim: isize) -> Self {
    self.collapse(dim, |values| {
      values.iter().copied()
        .reduce(|acc, a| if a < acc { a } else { acc } )
        .unwrap_or_else(T::zero)
    })
  }

  fn max(&self, dim: isize) -> Self {
    self.collapse(dim, |values| {
      values.iter().copied()
        .reduce(|acc, a| if a > acc { a } else { acc } )
        .unwrap_or_else(T::zero)
    })
  }
}

impl<T: Signed> SignedOps<T> for Tensor<T> {
  fn abs(&self) -> Self {
    self.vectorize(|a| a.abs() )
  }
}

impl<T: Real> RealOps<T> for Tensor<T> {
  fn pow(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a.powf(b) )
  }

  fn exp(&self) -> Self {
    self.vectorize(|a| a.exp() )
  }

  fn log(&self) -> Self {
    self.vectorize(|a| a.ln() )
  }

  fn relu(&self) -> Self {
    self.vectorize(|a| if a > T::zero() { a } else { T::zero() })
  }

  fn sigmoid(&self) -> Self {
    self.vectorize(|a| T::one() / (T::one() + (-a).exp()) )
  }

  fn tanh(&self) -> Self {
    self.vectorize(|a| a.tanh() )
  }

  fn log_softmax(&self) -> Self {
    Self::new(&self.shape.dims, self.log_softmax_rows())
  }
}

impl<T: Signed> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    self * (-T::one())
  }
}

impl<T: Signed> std::ops::Neg for Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $symbol:tt) => {
    impl<T: Numeric> std::ops::$trait for &Tensor<T> { // &tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        self.zip(rhs, |(a, b)| a $symbol b )
      }
    }

    impl<T: Numeric> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Numeric> std::ops::$trait<Tensor<T>> for &Tensor<T> { // &tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Tensor<T>) -> Tensor<T> {
        self $symbol &rhs
      }
    }

    impl<T: Numeric> std::ops::$trait<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        &self $symbol rhs
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.vectorize(|a| a $symbol rhs )
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        &self $symbol rhs
      }
    }

    impl std::ops::$trait<&Tensor<f32>> for f32 { // f32 * &tensor
      type Output = Tensor<f32>;

      fn $meth(self, tensor: &Tensor<f32>) -> Tensor<f32> {
        tensor.vectorize(|a| self $symbol a )
      }
    }

    impl std::ops::$trait<Tensor<f32>> for f32 { // f32 * tensor
      type Output = Tensor<f32>;

      fn $meth(self, tensor: Tensor<f32>) -> Tensor<f32> {
        self $symbol &tensor
      }
    }

    impl std::ops::$trait<&Tensor<f64>> for f64 { // f64 * &tensor
      type Output = Tensor<f64>;

      fn $meth(self, tensor: &Tensor<f64>) -> Tensor<f64> {
        tensor.vectorize(|a| self $symbol a )
      }
    }

    impl std::ops::$trait<Tensor<f64>> for f64 { // f64 * tensor
      type Output = Tensor<f64>;

      fn $meth(self, tensor: Tensor<f64>) -> Tensor<f64> {
        self $symbol &tensor
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);
add_operator!(Rem, rem, %);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sum() {
    let a = Tensor::new(&[3,2], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(a.sum(0), Tensor::new(&[], vec![21]));
    assert_eq!(a.sum(-1), Tensor::new(&[3], vec![3, 7, 11]));
  }

  #[test]
  fn max_min() {
    let a = Tensor::new(&[2,3], vec![-4.0, -2.0, -3.0, 1.0, 5.0, 0.0]);
    assert_eq!(a.max(-1), Tensor::vec(&[-2.0, 5.0]));
    assert_eq!(a.min(0), Tensor::scalar(-4.0));
  }

  #[test]
  fn scalar_operators() {
    let a = Tensor::vec(&[1.0f32, 2.0]);
    assert_eq!(2.0 * &a, Tensor::vec(&[2.0, 4.0]));
    assert_eq!(1.0 - &a, Tensor::vec(&[0.0, -1.0]));
    assert_eq!(-&a + 1.0, Tensor::vec(&[0.0, -1.0]));
  }

  #[test]
  fn activations() {
    let a = Tensor::vec(&[-1.0f64, 0.0, 2.0]);
    assert_eq!(a.relu(), Tensor::vec(&[0.0, 0.0, 2.0]));
    assert_eq!(a.sigmoid().at(&[1]).item(), 0.5);
    assert_eq!(a.tanh().at(&[1]).item(), 0.0);
  }

  #[test]
  fn reshape_transposed() {
    let a = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]).transpose(0, 1);
    assert_eq!(a.reshape(&[6]).into_raw(), vec![1, 4, 2, 5, 3, 6]);
  }
}
