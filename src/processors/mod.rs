pub mod aggregator;
pub mod block_indexer;
pub mod location_table;

pub use aggregator::{Aggregator, MonthlyValue};
pub use block_indexer::BlockIndexer;
pub use location_table::LocationTable;
