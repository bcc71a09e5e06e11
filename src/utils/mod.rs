pub mod constants;
pub mod filename;
pub mod widths;

pub use filename::dataset_filename;
pub use widths::bytes_for_index;
