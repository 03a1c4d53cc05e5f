//! Fixed-point math: WAD decimals for prices and values, RAY for indices.

pub mod common;
pub mod decimal;
pub mod ray;

pub use common::{Rounding, TryAdd, TryMul, TrySub};
pub use decimal::Decimal;
pub use ray::Ray;
