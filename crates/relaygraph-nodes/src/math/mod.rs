//! Math nodes

mod pow;

pub use pow::MathPowNode;
