// src/utils/fixed_point.rs
use crate::processing::NODATA;

/// No-data sentinel used by fixed-point (i16) outputs.
pub const NODATA_VALUE_INT: i16 = -10000;

/// Convert float index values to scaled int16, mapping the no-data sentinel
/// through. Values are clamped just inside (-1, 1) so the scaled result
/// never collides with the sentinel or overflows.
pub fn to_fixed_point(data: &[f32], scale_factor: i32) -> Vec<i16> {
    data.iter()
        .map(|&value| {
            if value == NODATA {
                NODATA_VALUE_INT
            } else {
                let clamped = value.clamp(-0.9999, 0.9999);
                (clamped * scale_factor as f32).round() as i16
            }
        })
        .collect()
}
