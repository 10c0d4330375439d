#![allow(clippy::needless_range_loop)]
//! B-spline curve evaluation by De Boor's algorithm.
//!
//! A [`KnotVector`](prelude::KnotVector) is validated once, a
//! [`DeBoorEvaluator`](prelude::DeBoorEvaluator) pairs it with control points,
//! then points and derivatives of any order are evaluated inside the domain.

mod curve;
mod error;
mod knot;
mod misc;

pub mod prelude {
    pub use crate::curve::*;
    pub use crate::error::*;
    pub use crate::knot::*;
    pub use crate::misc::FloatingPoint;
}
