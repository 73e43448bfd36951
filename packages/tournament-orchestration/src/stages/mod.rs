//! Pipeline stages
//!
//! - `extract`: named reads against the relational source
//! - `transform`: pure row-to-record mapping
//! - `load`: idempotent target writes

pub mod extract;
pub mod load;
pub mod transform;

pub use load::LoadCount;
pub use transform::BracketMerge;
