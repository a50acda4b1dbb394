pub mod stakes;
pub mod time;

pub use stakes::{Stakes, parse_stakes};
pub use time::{TimeParseError, parse_flexible_time};
