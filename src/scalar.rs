use rand::distributions::uniform::SampleUniform;
use num_traits::{ PrimInt, NumAssignOps, Num, NumCast };


/// All types that may be used in a [Tensor](crate::Tensor).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + std::fmt::Debug + 'static {}
impl<T: PartialEq + Clone + Copy + std::fmt::Debug + 'static> Inner for T {}


/// All numeric types.
///
/// Implemented for the primitive integer and float types.
/// Matrix products dispatch through [gemm](Numeric::gemm), which
/// floats override with an accelerated kernel when the `unsafe`
/// feature is enabled.

pub trait Numeric: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum {
  /// Multiply a strided `m x k` matrix with a strided `k x n` matrix
  /// into a new, row major `m x n` buffer.

  #[allow(clippy::too_many_arguments)]
  fn gemm(
    m: usize, k: usize, n: usize,
    a: &[Self], rsa: isize, csa: isize,
    b: &[Self], rsb: isize, csb: isize,
  ) -> Vec<Self> {
    let mut c = vec![Self::zero(); m * n];
    for i in 0..m {
      for p in 0..k {
        let lhs = a[(i as isize * rsa + p as isize * csa) as usize];
        for j in 0..n {
          c[i * n + j] += lhs * b[(p as isize * rsb + j as isize * csb) as usize];
        }
      }
    }
    c
  }
}

macro_rules! numeric {
  ($($t:ty),*) => {
    $(impl Numeric for $t {})*
  };
}

numeric!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Numeric for f32 {
  #[cfg(feature = "unsafe")]
  fn gemm(
    m: usize, k: usize, n: usize,
    a: &[Self], rsa: isize, csa: isize,
    b: &[Self], rsb: isize, csb: isize,
  ) -> Vec<Self> {
    let mut c = vec![0.0; m * n];
    if m * n == 0 { return c }
    unsafe {
      matrixmultiply::sgemm(
        m, k, n,
        1.0,
        a.as_ptr(), rsa, csa,
        b.as_ptr(), rsb, csb,
        0.0,
        c.as_mut_ptr(), n as isize, 1,
      );
    }
    c
  }
}

impl Numeric for f64 {
  #[cfg(feature = "unsafe")]
  fn gemm(
    m: usize, k: usize, n: usize,
    a: &[Self], rsa: isize, csa: isize,
    b: &[Self], rsb: isize, csb: isize,
  ) -> Vec<Self> {
    let mut c = vec![0.0; m * n];
    if m * n == 0 { return c }
    unsafe {
      matrixmultiply::dgemm(
        m, k, n,
        1.0,
        a.as_ptr(), rsa, csa,
        b.as_ptr(), rsb, csb,
        0.0,
        c.as_mut_ptr(), n as isize, 1,
      );
    }
    c
  }
}


/// All signed numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Signed: Numeric + num_traits::Signed {}
impl<T: Numeric + num_traits::Signed> Signed for T {}


/// All unsigned numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Unsigned: Numeric + num_traits::Unsigned {}
impl<T: Numeric + num_traits::Unsigned> Unsigned for T {}


/// All integer types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Integer: Numeric + PrimInt {}
impl<T: Numeric + PrimInt> Integer for T {}


/// All continuous numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Real: Signed + num_traits::real::Real + SampleUniform {}
impl<T: Signed + num_traits::real::Real + SampleUniform> Real for T {}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gemm_strided() {
    // [[1,2],[3,4]] * transpose([[1,2],[3,4]])
    let a = [1.0f32, 2.0, 3.0, 4.0];
    let c = f32::gemm(2, 2, 2, &a, 2, 1, &a, 1, 2);
    assert_eq!(c, vec![5.0, 11.0, 11.0, 25.0]);
  }

  #[test]
  fn gemm_integer() {
    let a = [1, 2, 3, 4, 5, 6];
    let b = [1, 2, 3, 4, 5, 6];
    assert_eq!(i32::gemm(2, 3, 2, &a, 3, 1, &b, 2, 1), vec![22, 28, 49, 64]);
  }
}
