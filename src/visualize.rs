use itertools::Itertools;

use crate::{
  scalar::Real,
  tensor::Tensor,
  ops::BaseOps,
};


const RAMP: [char; 9] = ['.', ':', '-', '=', '+', '*', '#', '%', '@'];


/// Draw a `[H, W]` image with intensities in `[0, 1]` as ASCII art,
/// one character per pixel. Pixels at or below `threshold` stay blank.

pub fn render_image<T: Real>(image: &Tensor<T>, threshold: T) -> String {
  assert_eq!(image.rank(), 2, "Can only render 2D images, got {}", image.shape());
  image.iter(0)
    .map(|row| row.param_iter().map(|pixel| {
      if !(pixel > threshold) { return ' ' }
      let level = pixel.to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
      RAMP[((level * (RAMP.len() - 1) as f64).round() as usize).min(RAMP.len() - 1)]
    }).collect::<String>() )
    .join("\n")
}

/// Vertical bar chart of `values`, `height` lines tall, with the
/// range of values printed to the left.

pub fn render_curve(values: &[f64], height: usize) -> String {
  let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite() ).collect();
  if finite.is_empty() || height == 0 { return String::new() }
  let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
  let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let span = if max > min { max - min } else { 1.0 };
  // Number of filled cells per column, at least one for finite values
  let bars: Vec<usize> = values.iter().map(|&v| {
    if !v.is_finite() { return 0 }
    1 + ((v - min) / span * (height - 1) as f64).round() as usize
  }).collect();
  let top = format!("{:.4}", max);
  let bottom = format!("{:.4}", min);
  let width = top.len().max(bottom.len());
  (0..height).rev()
    .map(|level| {
      let label = match level {
        l if l == height - 1 => top.clone(),
        0 => bottom.clone(),
        _ => String::new(),
      };
      let cells: String = bars.iter().map(|&bar| if bar > level { '#' } else { ' ' }).collect();
      format!("{:>width$} |{}", label, cells.trim_end())
    })
    .join("\n")
}

/// Table of `[predicted, actual]` counts with one row per predicted class.

pub fn render_confusion(matrix: &Tensor<usize>, classes: &[String]) -> String {
  let n = classes.len();
  assert_eq!(matrix.shape().dims, vec![n, n], "Confusion matrix doesn't match {} classes", n);
  let counts: Vec<usize> = matrix.param_iter().collect();
  let label_width = classes.iter().map(|c| c.len() ).max().unwrap_or(0).max("pred \\ true".len());
  let cell_width = counts.iter().map(|c| c.to_string().len() ).max().unwrap_or(1).max(3);
  let header = (0..n).map(|j| format!("{:>cell_width$}", j) ).join(" ");
  let mut lines = vec![format!("{:<label_width$} {}", "pred \\ true", header)];
  for (i, class) in classes.iter().enumerate() {
    let row = counts[i * n..(i + 1) * n].iter().map(|c| format!("{:>cell_width$}", c) ).join(" ");
    lines.push(format!("{:<label_width$} {}", class, row));
  }
  let legend = classes.iter().enumerate().map(|(i, c)| format!("{i}: {c}") ).join(", ");
  lines.push(legend);
  lines.join("\n")
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image() {
    let image = Tensor::new(&[2, 3], vec![0.0, 0.5, 1.0, 1.0, 0.05, 0.0]);
    assert_eq!(render_image(&image, 0.1), " +@\n@  ");
    assert_eq!(render_image(&image, 0.0), " +@\n@. ");
  }

  #[test]
  #[should_panic]
  fn image_rank() {
    render_image(&Tensor::<f32>::zeros(&[1, 2, 2]), 0.0);
  }

  #[test]
  fn curve() {
    let chart = render_curve(&[2.0, 1.0, 0.0], 3);
    let lines: Vec<&str> = chart.lines().collect();
    assert_eq!(lines, vec![
      "2.0000 |#",
      "       |##",
      "0.0000 |###",
    ]);
    assert_eq!(render_curve(&[], 4), "");
    assert_eq!(render_curve(&[f64::NAN, 1.0], 2).lines().count(), 2);
  }

  #[test]
  fn flat_curve() {
    let chart = render_curve(&[0.5, 0.5], 2);
    assert_eq!(chart, "0.5000 |\n0.5000 |##");
  }

  #[test]
  fn confusion() {
    let matrix = Tensor::new(&[2, 2], vec![3, 1, 0, 12]);
    let table = render_confusion(&matrix, &["cat".to_string(), "dog".to_string()]);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "pred \\ true   0   1");
    assert_eq!(lines[1], "cat           3   1");
    assert_eq!(lines[2], "dog           0  12");
    assert_eq!(lines[3], "0: cat, 1: dog");
  }
}
