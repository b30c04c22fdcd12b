//! Per-path coordinate precision policy.
//!
//! The legacy upload path narrows every coordinate through single-precision
//! floating point before storage, reproducing the precision the original
//! wire format carried. The native JSON path never goes through this module
//! and preserves full double precision. The two policies are deliberately
//! per-path and are not unified.

/// Narrows a coordinate to single precision.
#[must_use]
pub fn reduce_coordinate(value: f64) -> f64 {
    f64::from(value as f32)
}

/// Narrows a longitude/latitude pair to single precision.
#[must_use]
pub fn reduce_position(lon: f64, lat: f64) -> [f64; 2] {
    [reduce_coordinate(lon), reduce_coordinate(lat)]
}
