pub mod checkpoint;
pub mod evaluator;
pub mod trainer;
