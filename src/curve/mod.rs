pub mod de_boor_evaluator;
pub use de_boor_evaluator::*;
