pub mod disk;
pub mod last;

pub use disk::DiskCache;
pub use last::{LastResults, LastResultsStore, LAST_RESULTS_FILE};
