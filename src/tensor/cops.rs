use crate::{
  tensor::Tensor,
  scalar::{ Numeric, Real },
  ops::Cops,
};


impl<T: Numeric> Cops<T> for Tensor<T> {
  fn matmul(&self, rhs: &Self) -> Vec<T> {
    let rows_l = self.shape[-2];
    let cols_l = self.shape[-1];
    let cols_r = rhs.shape[-1];

    let data_l = self.data.borrow();
    let data_r = rhs.data.borrow();

    // Strided views go straight into the kernel, so transposes don't copy
    T::gemm(
      rows_l, cols_l, cols_r,
      &data_l[self.shape.offset..], self.shape.strides[0], self.shape.strides[1],
      &data_r[rhs.shape.offset..], rhs.shape.strides[0], rhs.shape.strides[1],
    )
  }
}

impl<T: Real> Tensor<T> {
  pub(crate) fn log_softmax_rows(&self) -> Vec<T> {
    let this = self.contiguous();
    let n = this.shape[-1];
    let raw = this.raw();
    let values = &raw[this.shape.offset..this.shape.offset + this.size()];
    let mut out = Vec::with_capacity(values.len());
    for row in values.chunks(n.max(1)) {
      let max = row.iter().fold(row[0], |acc, &a| if a > acc { a } else { acc } );
      let lse = max + row.iter().map(|&a| (a - max).exp() ).sum::<T>().ln();
      out.extend(row.iter().map(|&a| a - lse ));
    }
    out
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::{ BaseOps, NumericOps, RealOps };

  #[test]
  fn matmul() {
    let x = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]);
    let y = Tensor::new(&[3,2], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,2], vec![22, 28, 49, 64]));
  }

  #[test]
  fn matmul_vector() {
    let x = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]);

    let y = Tensor::new(&[3,1], vec![1, 2, 3]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,1], vec![14, 32]));

    let v = Tensor::vec(&[1, 2]);
    assert_eq!(v.mm(&x), Tensor::vec(&[9, 12, 15]));
  }

  #[test]
  fn matmul_transposed_float() {
    let x = Tensor::new(&[2,3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let gram = x.mm(&x.transpose(0, 1));
    assert_eq!(gram, Tensor::new(&[2,2], vec![14.0, 32.0, 32.0, 77.0]));
  }

  #[test]
  fn matmul_offset_view() {
    let x = Tensor::arrange(&[3,2], 0.0f64, 1.0);
    let rows = x.range(&[1..3]);
    let id = Tensor::new(&[2,2], vec![1.0, 0.0, 0.0, 1.0]);
    assert_eq!(rows.mm(&id), Tensor::new(&[2,2], vec![2.0, 3.0, 4.0, 5.0]));
  }

  #[test]
  fn log_softmax_stable() {
    let x = Tensor::new(&[1, 3], vec![1000.0f64, 1000.0, 1000.0]);
    let ls = x.log_softmax();
    for value in ls.param_iter() {
      assert!((value + 3.0f64.ln()).abs() < 1e-9);
    }
  }
}
