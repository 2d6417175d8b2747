//! Domain layer for the Ledger Engine

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod keys;
pub mod profit;
pub mod split;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use value_objects::*;
