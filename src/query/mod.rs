pub mod ast;
pub mod matcher;
pub mod parser;
pub mod planner;
pub mod types;

pub use ast::{Condition, Query};
pub use matcher::DocumentMatcher;
pub use parser::QueryParser;
pub use planner::{ExecutionPlan, QueryPlanner, ScanBound};
pub use types::{FindOptions, SortOrder};
