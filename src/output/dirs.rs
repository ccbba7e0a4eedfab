//! Output directory preparation and page persistence.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// self
use crate::{_prelude::*, error::OutputError, obs::emit, output::filename::sanitize_filename};

/// Recreates every given directory empty.
///
/// `csv_dir` and `json_dir` are optional output locations; `temp_dir` always exists afterwards.
/// Existing contents are removed.
pub fn prepare_output_dirs(
	csv_dir: Option<&Path>,
	json_dir: Option<&Path>,
	temp_dir: &Path,
) -> Result<(), OutputError> {
	if let Some(dir) = csv_dir {
		emit!(info, dir = %dir.display(), "Saving data in CSV format.");

		reset_dir(dir)?;
	}
	if let Some(dir) = json_dir {
		emit!(info, dir = %dir.display(), "Saving data in JSON format.");

		reset_dir(dir)?;
	}

	reset_dir(temp_dir)
}

/// Removes `dir` (if present) and creates it again, parents included.
pub fn reset_dir(dir: &Path) -> Result<(), OutputError> {
	let to_err = |source| OutputError::Directory { path: dir.display().to_string(), source };

	if dir.is_dir() {
		fs::remove_dir_all(dir).map_err(to_err)?;
	}

	fs::create_dir_all(dir).map_err(to_err)
}

/// Writes `payload` as pretty JSON to `dir/<sanitized file_name>` and returns the path.
pub fn write_json_page<T>(dir: &Path, file_name: &str, payload: &T) -> Result<PathBuf, OutputError>
where
	T: ?Sized + Serialize,
{
	let path = dir.join(sanitize_filename(file_name));
	let serialized = serde_json::to_vec_pretty(payload).map_err(|source| {
		OutputError::Serialize { path: path.display().to_string(), source }
	})?;

	fs::write(&path, serialized)
		.map_err(|source| OutputError::Write { path: path.display().to_string(), source })?;

	emit!(debug, path = %path.display(), "Page written.");

	Ok(path)
}
