pub mod document;
pub mod vector;

pub use document::{decode_document, encode_document};
pub use vector::VectorPayload;
