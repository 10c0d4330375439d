use thiserror::Error;

/// Malformed knot vector or control polygon, raised only at construction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Too few knots for degree {degree}, got {provided}, expected at least {required}")]
    TooFewKnots {
        degree: usize,
        required: usize,
        provided: usize,
    },

    #[error("Degree {degree} is too large, the knot count overflows")]
    DegreeTooLarge { degree: usize },

    #[error("Knot value at index {index} is not finite")]
    NonFiniteKnot { index: usize },

    #[error("Knots must be non-decreasing, but knots[{index}] = {previous} > knots[{}] = {next}", .index + 1)]
    Decreasing {
        index: usize,
        previous: f64,
        next: f64,
    },

    #[error("Knot domain [{start}, {end}] has zero width")]
    EmptyDomain { start: f64, end: f64 },

    #[error("Too few control points for degree {degree}, got {provided}")]
    TooFewControlPoints { degree: usize, provided: usize },

    #[error("Invalid number of control points, got {provided}, expected {expected}")]
    ControlPointCount { expected: usize, provided: usize },
}

/// Parameter outside of the curve's defined domain
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DomainError {
    #[error("Parameter {parameter} is outside the domain [{start}, {end}]")]
    OutOfDomain { parameter: f64, start: f64, end: f64 },

    #[error("Fraction {0} is outside [0, 1]")]
    FractionOutOfRange(f64),
}
