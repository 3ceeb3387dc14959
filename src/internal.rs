use std::cell::RefCell;

use rand::{ Rng, SeedableRng, rngs::StdRng };

use crate::scalar::Real;


thread_local! {
  static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

/// Reseed the generator behind every random tensor, weight
/// initialization and dataset shuffle on the current thread.

pub fn manual_seed(seed: u64) {
  RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed) );
}

pub(crate) fn with_rng<O>(cb: impl FnOnce(&mut StdRng) -> O) -> O {
  RNG.with(|rng| cb(&mut rng.borrow_mut()) )
}


#[inline]
pub(crate) fn negative_index(i: isize, n: usize, start_behind: bool) -> usize {
  if i < 0 {
    let offset = if start_behind { 1 } else { 0 };
    (n as isize + i + offset) as usize
  } else {
    i as usize
  }
}


// Polar Box-Muller transformation

pub(crate) fn randn<T: Real>(rng: &mut StdRng) -> (T, T) {
  loop {
    let u: T = rng.gen_range(-T::one(), T::one());
    let v: T = rng.gen_range(-T::one(), T::one());
    let r = u * u + v * v;
    // Try again if outside interval
    if r == T::zero() || r >= T::one() { continue }
    let c = (T::from(-2.0).unwrap() * r.ln() / r).sqrt();
    return (u * c, v * c)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn negative() {
    assert_eq!(negative_index(-1, 3, false), 2);
    assert_eq!(negative_index(-1, 3, true), 3);
    assert_eq!(negative_index(1, 3, false), 1);
  }

  #[test]
  fn seeded() {
    manual_seed(7);
    let a: (f64, f64) = with_rng(|rng| randn(rng) );
    manual_seed(7);
    let b: (f64, f64) = with_rng(|rng| randn(rng) );
    assert_eq!(a, b);
  }
}
