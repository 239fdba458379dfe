mod sample_csv_writer;
pub mod uuids;

use std::path::{Path, PathBuf};

pub use sample_csv_writer::SampleCSVWriter;

pub fn extend_path(path: &Path, extend: &str) -> PathBuf {
    let mut path = path.to_path_buf();
    path.push(extend);
    path
}

/// `{output_dir}/{address with '-' instead of ':'}_{recording_name}.csv`
pub fn recording_path(output_dir: &Path, address: &str, recording_name: &str) -> PathBuf {
    extend_path(
        output_dir,
        format!("{}_{}.csv", address.replace(':', "-"), recording_name).as_str(),
    )
}
