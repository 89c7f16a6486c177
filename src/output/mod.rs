//! Output writer - expands the filename pattern and persists documents
//!
//! Filenames are derived from the configured pattern once per document.
//! The clock is injected and sampled once per run, so every document of
//! a run shares the same `{date}` and `{time}` tokens while `{seq}`
//! increases monotonically.

use crate::config::OutputConfig;
use crate::error::{SheetdocError, SheetdocResult};
use crate::types::GeneratedDocument;
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Time source for filename tokens.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the local timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fixed time source for deterministic runs (used by tests).
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub struct OutputWriter {
    directory: PathBuf,
    pattern: String,
    date: String,
    time: String,
    seq: u32,
    collision_retries: u32,
    used: HashSet<String>,
}

impl OutputWriter {
    /// Create the output directory and fix the run timestamp.
    pub fn create(output: &OutputConfig, clock: &dyn Clock) -> SheetdocResult<Self> {
        fs::create_dir_all(&output.directory).map_err(|e| {
            SheetdocError::OutputWrite(format!(
                "Failed to create output directory '{}': {}",
                output.directory.display(),
                e
            ))
        })?;
        let now = clock.now();
        Ok(OutputWriter {
            directory: output.directory.clone(),
            pattern: output.pattern.clone(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H%M%S").to_string(),
            seq: 0,
            collision_retries: output.collision_retries,
            used: HashSet::new(),
        })
    }

    /// Persist one document. The bytes land under a temporary name and
    /// are renamed into place, so an interrupted run never leaves a
    /// partially written document under the final name.
    pub fn write(&mut self, document: &GeneratedDocument) -> SheetdocResult<PathBuf> {
        let path = self.next_path(&document.name)?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = self.directory.join(format!(".{}.tmp", filename));

        fs::write(&temp, &document.bytes).map_err(|e| {
            SheetdocError::OutputWrite(format!("Failed to write '{}': {}", temp.display(), e))
        })?;
        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            SheetdocError::OutputWrite(format!(
                "Failed to move '{}' into place as '{}': {}",
                temp.display(),
                path.display(),
                e
            ))
        })?;
        Ok(path)
    }

    /// Next free output path for the given `{name}` token value.
    ///
    /// The sequence counter makes names unique within a run whenever the
    /// pattern carries `{seq}`. A collision with a file from an earlier
    /// run, or a pattern without `{seq}`, is disambiguated by retrying
    /// with bumped sequence values (appending `_{seq}` to the stem when
    /// the pattern has no sequence token).
    fn next_path(&mut self, name: &str) -> SheetdocResult<PathBuf> {
        self.seq += 1;
        let filename = self.expand(&self.pattern, name);
        if self.claim(&filename) {
            return Ok(self.directory.join(filename));
        }

        let fallback = if self.pattern.contains("{seq}") {
            self.pattern.clone()
        } else {
            with_seq_suffix(&self.pattern)
        };
        for attempt in 0..=self.collision_retries {
            if attempt > 0 {
                self.seq += 1;
            }
            let filename = self.expand(&fallback, name);
            if self.claim(&filename) {
                return Ok(self.directory.join(filename));
            }
        }
        Err(SheetdocError::OutputWrite(format!(
            "No free output filename for '{}' in '{}' after {} attempts",
            name,
            self.directory.display(),
            self.collision_retries + 1
        )))
    }

    fn expand(&self, pattern: &str, name: &str) -> String {
        pattern
            .replace("{date}", &self.date)
            .replace("{time}", &self.time)
            .replace("{seq}", &self.seq.to_string())
            .replace("{name}", name)
    }

    fn claim(&mut self, filename: &str) -> bool {
        if self.used.contains(filename) || self.directory.join(filename).exists() {
            return false;
        }
        self.used.insert(filename.to_string());
        true
    }
}

/// Insert a `_{seq}` token before the filename extension.
fn with_seq_suffix(pattern: &str) -> String {
    match pattern.rfind('.') {
        Some(dot) => format!("{}_{{seq}}{}", &pattern[..dot], &pattern[dot..]),
        None => format!("{}_{{seq}}", pattern),
    }
}
