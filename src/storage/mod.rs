pub mod backend;
pub mod catalog;
pub mod file_lock;
pub mod heap;
pub mod page;
pub mod pager;

pub use heap::{HeapStats, RecordHeap};
pub use page::{PageId, RecordPtr};
pub use pager::{Pager, PagerStats};
