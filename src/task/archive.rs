//! The `archive-create` task: zip up a filtered subset of a directory tree
//! under a date-templated archive name.

use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::config::ConfigError;
use crate::task::filter::{list_files, PathFilter};
use crate::task::{Action, TaskError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchiveParams {
    archive_name: String,
    dst: PathBuf,
    src: PathBuf,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// Create a compressed archive of a directory tree.
///
/// The archive base name comes from `archive_name` with `$YYYY`/`$MM`/`$DD`
/// placeholders substituted from the current local date; the file lands at
/// `<dst>/<name>.zip`. Files are discovered recursively under `src`
/// (symlinks followed) and narrowed by the include/exclude patterns.
#[derive(Debug)]
pub struct ArchiveCreate {
    archive_name: String,
    dst: PathBuf,
    src: PathBuf,
    filter: PathFilter,
}

impl ArchiveCreate {
    pub const KIND: &'static str = "archive-create";

    /// Build from a config parameter mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParams` on missing or ill-typed fields
    /// and `ConfigError::InvalidPattern` for an uncompilable regex.
    pub fn from_params(params: serde_json::Value) -> Result<Box<dyn Action>, ConfigError> {
        let p: ArchiveParams = serde_json::from_value(params)
            .map_err(|source| ConfigError::invalid_params(Self::KIND, source))?;
        let filter = PathFilter::new(&p.include, &p.exclude)?;
        Ok(Box::new(Self {
            archive_name: p.archive_name,
            dst: p.dst,
            src: p.src,
            filter,
        }))
    }
}

impl Action for ArchiveCreate {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&self) -> Result<(), TaskError> {
        let name = render_archive_name(&self.archive_name, Local::now().date_naive())?;
        info!("Creating archive {}/{}.zip...", self.dst.display(), name);

        let files = list_files(&self.src, true)?;
        let files = self.filter.apply(files);

        fs::create_dir_all(&self.dst).map_err(|e| TaskError::io(&self.dst, e))?;
        let zip_path = self.dst.join(format!("{name}.zip"));
        let file = fs::File::create(&zip_path).map_err(|e| TaskError::io(&zip_path, e))?;
        let mut zip = zip::ZipWriter::new(BufWriter::new(file));
        // Ratio over speed for backup archives.
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Bzip2);

        for path in &files {
            let rel = path.strip_prefix(&self.src).unwrap_or(path);
            zip.start_file(rel.to_string_lossy().replace('\\', "/"), options)?;
            let mut reader = fs::File::open(path).map_err(|e| TaskError::io(path, e))?;
            std::io::copy(&mut reader, &mut zip).map_err(|e| TaskError::io(path, e))?;
        }
        zip.finish()?;

        info!("Archived {} files into {}", files.len(), zip_path.display());
        Ok(())
    }
}

/// Substitute date placeholders into an archive name template.
///
/// Supports `$NAME` and `${NAME}` forms plus `$$` as a literal dollar, with
/// `YYYY` (4-digit year), `MM` and `DD` (zero-padded) as the recognized
/// names. An unrecognized placeholder is an error, not silently kept.
pub(crate) fn render_archive_name(template: &str, date: NaiveDate) -> Result<String, TaskError> {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))").unwrap()
    });
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in re.captures_iter(template) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        if caps.get(1).is_some() {
            out.push('$');
            continue;
        }
        let name = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match name {
            "YYYY" => out.push_str(&format!("{:04}", date.year())),
            "MM" => out.push_str(&format!("{:02}", date.month())),
            "DD" => out.push_str(&format!("{:02}", date.day())),
            other => return Err(TaskError::Template(other.to_string())),
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}
