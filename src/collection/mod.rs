pub mod collection;
pub mod cursor;

pub use collection::Collection;
pub use cursor::Cursor;
