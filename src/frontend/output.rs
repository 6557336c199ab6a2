use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::backend::report::ConflictReport;

use super::FrontendError;


const REPORT_SUFFIX: &str          = "conflict_report.json";
const RECOMMENDATIONS_SUFFIX: &str = "recommendations.txt";


/// Writes the JSON report and its text digest into `output_directory`,
/// named after the local time. Without a directory the JSON goes to stdout.
///
/// # Errors
///
/// Will return `Err` if serialization or writing fails.
pub fn write_report(
    output_directory: Option<&Path>,
    report: &ConflictReport,
) -> Result<Option<PathBuf>, FrontendError> {
    let json = report.to_json()?;

    let Some(output_directory) = output_directory else {
        println!("{json}");
        return Ok(None);
    };

    fs::create_dir_all(output_directory)
        .map_err(|error| FrontendError::Io(output_directory.to_path_buf(), error))?;

    let local_time = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");

    let report_path = output_directory.join(format!("{local_time}_{REPORT_SUFFIX}"));
    write_file(&report_path, &json)?;

    let digest_path = output_directory
        .join(format!("{local_time}_{RECOMMENDATIONS_SUFFIX}"));
    write_file(&digest_path, &report.to_string())?;

    info!("Report written to {}", report_path.display());

    Ok(Some(report_path))
}

fn write_file(path: &Path, contents: &str) -> Result<(), FrontendError> {
    fs::write(path, contents)
        .map_err(|error| FrontendError::Io(path.to_path_buf(), error))
}
