// Domain layer - Core extraction logic

pub mod errors;
pub mod model;
pub mod rules;
