//! Output publishing and error routing.
//!
//! - [`publish`] writes the enriched rows as CSV and Parquet, both or neither
//! - [`route_to_error`] copies a rejected input file, byte for byte, into the
//!   error directory
//!
//! Output files are named `<stem>_<YYYY-MM-DD>.csv` / `.parquet`, where the
//! stem is the input file name up to its first `.` and the date is the
//! publish date. Re-running on the same day overwrites both files.

pub mod csv_file;
pub mod parquet_file;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PublishError, PublishResult};
use crate::transform::enrich::EnrichedDataset;

pub use csv_file::write_csv;
pub use parquet_file::write_parquet;

/// Final locations of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedOutputs {
    pub csv: PathBuf,
    pub parquet: PathBuf,
}

/// `<stem>_<date>.<extension>` for an input file name.
pub fn output_file_name(input_file: &str, publish_date: NaiveDate, extension: &str) -> PublishResult<String> {
    let file_name = Path::new(input_file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(input_file);
    let stem = file_name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        return Err(PublishError::InvalidFileName(input_file.to_string()));
    }
    Ok(format!("{}_{}.{}", stem, publish_date.format("%Y-%m-%d"), extension))
}

/// Write both outputs, then move them into place together.
///
/// Each file is first written to a hidden staging file next to its final
/// path. Only when both staging writes succeed are they renamed over the
/// final names. On any failure the staged files are removed and the final
/// names hold what they held before the run.
pub fn publish(
    dataset: &EnrichedDataset,
    input_file: &str,
    csv_dir: &Path,
    parquet_dir: &Path,
    publish_date: NaiveDate,
) -> PublishResult<PublishedOutputs> {
    let csv_path = csv_dir.join(output_file_name(input_file, publish_date, "csv")?);
    let parquet_path = parquet_dir.join(output_file_name(input_file, publish_date, "parquet")?);

    let csv_staged = staging_path(&csv_path);
    let parquet_staged = staging_path(&parquet_path);

    let staged = write_staged(&csv_staged, |w| write_csv(w, dataset))
        .and_then(|()| write_staged(&parquet_staged, |w| write_parquet(w, dataset)));
    if let Err(err) = staged {
        discard(&[csv_staged.as_path(), parquet_staged.as_path()]);
        return Err(err);
    }

    let moves = [
        (csv_staged.as_path(), csv_path.as_path()),
        (parquet_staged.as_path(), parquet_path.as_path()),
    ];
    if let Err(err) = swap_into_place(&moves) {
        discard(&[csv_staged.as_path(), parquet_staged.as_path()]);
        return Err(err);
    }

    info!(
        rows = dataset.len(),
        csv = %csv_path.display(),
        parquet = %parquet_path.display(),
        "published outputs"
    );

    Ok(PublishedOutputs {
        csv: csv_path,
        parquet: parquet_path,
    })
}

/// Copy a rejected input file into `error_dir` under its own name.
pub fn route_to_error(input_path: &Path, error_dir: &Path) -> PublishResult<PathBuf> {
    let file_name = input_path
        .file_name()
        .ok_or_else(|| PublishError::InvalidFileName(input_path.display().to_string()))?;
    let target = error_dir.join(file_name);

    fs::copy(input_path, &target).map_err(|e| PublishError::io(&target, e))?;
    info!(target = %target.display(), "copied rejected file to error directory");

    Ok(target)
}

/// Create every directory in `dirs` that does not exist yet.
pub fn ensure_dirs<'a, I>(dirs: I) -> PublishResult<()>
where
    I: IntoIterator<Item = &'a Path>,
{
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|e| PublishError::io(dir, e))?;
    }
    Ok(())
}

fn staging_path(final_path: &Path) -> PathBuf {
    hidden_sibling(final_path, "partial")
}

/// `.<name>.<suffix>` next to `path`.
fn hidden_sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", name, suffix))
}

/// Rename every staged file over its final name, all or none.
///
/// Existing final files are moved aside to `.<name>.bak` first. If any
/// rename fails, files placed by this call are removed and the backups
/// restored.
fn swap_into_place(moves: &[(&Path, &Path)]) -> PublishResult<()> {
    let mut backups: Vec<(PathBuf, &Path)> = Vec::new();
    for &(_, target) in moves {
        if target.is_file() {
            let backup = hidden_sibling(target, "bak");
            if let Err(e) = fs::rename(target, &backup) {
                rollback(&[], &backups);
                return Err(PublishError::io(target, e));
            }
            backups.push((backup, target));
        }
    }

    let mut placed: Vec<&Path> = Vec::new();
    for &(staged, target) in moves {
        if let Err(e) = fs::rename(staged, target) {
            rollback(&placed, &backups);
            return Err(PublishError::io(target, e));
        }
        placed.push(target);
    }

    let backups: Vec<&Path> = backups.iter().map(|(b, _)| b.as_path()).collect();
    discard(&backups);
    Ok(())
}

fn rollback(placed: &[&Path], backups: &[(PathBuf, &Path)]) {
    discard(placed);
    for (backup, target) in backups {
        if let Err(e) = fs::rename(backup, target) {
            warn!(path = %target.display(), error = %e, "failed to restore previous output");
        }
    }
}

fn write_staged<F>(path: &Path, write: F) -> PublishResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> PublishResult<()>,
{
    debug!(path = %path.display(), "staging output");
    let file = File::create(path).map_err(|e| PublishError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| PublishError::io(path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| PublishError::io(path, e))?;
    Ok(())
}

fn discard(paths: &[&Path]) {
    for path in paths {
        if path.exists() {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove file");
            }
        }
    }
}
