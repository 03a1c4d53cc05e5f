//! Plain state records stored by the core.

pub mod asset;
pub mod pair;
pub mod pending_burn;
pub mod pool;
pub mod position;

pub use asset::*;
pub use pair::*;
pub use pending_burn::*;
pub use pool::*;
pub use position::*;
