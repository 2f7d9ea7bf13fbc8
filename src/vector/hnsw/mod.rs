pub mod graph;
pub mod insert;
pub mod delete;
pub mod search;
pub mod visited;

pub use graph::{HnswGraph, HnswParams, Node};
