mod metrics;

use glam::Mat4;

pub use self::metrics::*;

const MIN_DETERMINANT: f32 = 1e-12;

/// Returns whether `transform` can be handed to the renderer: every element
/// has to be finite and not a negative zero, and the matrix has to be
/// invertible (a collapsed matrix, e.g. all zeros, would make the
/// inverse-transform workaround in instance removal produce garbage).
pub fn is_valid_transform(transform: &Mat4) -> bool {
    let signed_zero = transform
        .to_cols_array()
        .iter()
        .any(|&value| value == 0.0 && value.is_sign_negative());

    !signed_zero && is_invertible(transform)
}

/// Returns whether `matrix` is finite and has a usable inverse.
///
/// Unlike [`is_valid_transform()`], negative zeros are fine here; camera
/// matrices built by glam carry them routinely.
pub fn is_invertible(matrix: &Mat4) -> bool {
    if !matrix.is_finite() {
        return false;
    }

    let det = matrix.determinant();

    det.is_finite() && det.abs() >= MIN_DETERMINANT
}
