pub mod apply;
pub mod expression;

pub use apply::UpdateEngine;
pub use expression::{PopEnd, PullFilter, UpdateExpression, UpdateOperation};
