pub mod scenario;
pub mod util;

pub use util::{load_rules, report_timestamp, split_csv};
