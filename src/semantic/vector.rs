//! Vector math for embedding comparison.

/// Errors that can occur when comparing vectors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VectorError {
    #[error("Dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Compute L2 norm of a vector, accumulated in f64.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Compute cosine similarity between two vectors of equal length.
///
/// Returns `0.0` when either vector has zero norm or a component that is
/// NaN or infinite. Sums are taken in f64, so large finite components do not
/// overflow.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();

    let similarity = dot_product / (norm_a * norm_b);
    if !similarity.is_finite() {
        return Ok(0.0);
    }

    // rounding can push the ratio a hair past the unit interval
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}
