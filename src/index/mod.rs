pub mod key;
pub mod manager;
pub mod secondary;

pub use manager::{IndexInfo, IndexManager, PreparedKeys, PreparedUpdate};
pub use secondary::{IndexDefinition, IndexField, IndexOptions, SecondaryIndex};
