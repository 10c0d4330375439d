use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Scalar type of knots and control point coordinates (f32, f64)
/// Mainly used to identify the type of the field in nalgebra
pub trait FloatingPoint: RealField + ToPrimitive + Copy {
    /// Widen the value to `f64` for error reporting, `NaN` if it cannot be represented
    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}
