// src/brain_utils.rs
use ndarray::ArrayView1;

/// 最近时间戳查找
///
/// Returns the index of the entry in `timestamps` closest to `target`.
/// `timestamps` must be non-decreasing. The search locates the first entry
/// strictly greater than `target` and compares it with its left neighbour;
/// the left neighbour wins an exact tie. Targets before the first entry map
/// to 0, targets after the last entry map to the last index.
pub fn nearest_index(timestamps: &[f64], target: f64) -> Option<usize> {
    if timestamps.is_empty() {
        return None;
    }
    let (mut lo, mut hi) = (0usize, timestamps.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if timestamps[mid] <= target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let pos = lo;
    if pos == 0 {
        return Some(0);
    }
    if pos == timestamps.len() {
        return Some(timestamps.len() - 1);
    }
    if (timestamps[pos] - target).abs() < (timestamps[pos - 1] - target).abs() {
        Some(pos)
    } else {
        Some(pos - 1)
    }
}

/// Pearson correlation coefficient of two equally long series.
///
/// `None` when either series has (numerically) zero variance or is not finite.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let mean_x = x.sum() / n as f64;
    let mean_y = y.sum() / n as f64;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let floor = f64::EPSILON * n as f64;
    if !(var_x > floor && var_y > floor) {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Indices of the stream channels whose label contains any of `patterns`.
///
/// Substring matching lets "O" pick up O1/O2/Oz. Indices keep stream order and
/// a channel matched by several patterns is selected once.
pub fn select_channels(labels: &[String], patterns: &[String]) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, label)| patterns.iter().any(|p| label.contains(p.as_str())))
        .map(|(idx, _)| idx)
        .collect()
}
