mod detector;
mod reading_log;

pub use detector::DetectorService;
pub use reading_log::{ReadingLog, ReadingStats};
