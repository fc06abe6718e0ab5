pub mod evaluator;
pub mod rules;

pub use evaluator::SafetyEvaluator;
pub use rules::SafetyRule;
