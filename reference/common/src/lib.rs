//! Custodian Common Types
//!
//! Shared types used across the custodian workspace, including asset
//! identifiers, wide unsigned quantities, ledger time and the error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;
pub use time::*;
