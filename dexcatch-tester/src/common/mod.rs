pub mod scenario;
pub mod util;

pub use util::{artifacts_dir, load_config, split_csv, write_failure_artifacts};
