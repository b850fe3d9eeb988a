//! File and directory scrambling

use crate::engine::{Engine, Outcome};
use crate::language::Language;
use crate::{ScrambleConfig, ScrambleError, ScrambleResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of scrambling a single file
#[derive(Debug)]
pub struct ScrambledFile {
    /// Original source path
    pub source: PathBuf,
    /// Written output path
    pub output: PathBuf,
    pub language: Language,
    /// Original file size
    pub original_size: u64,
    /// Scrambled file size
    pub scrambled_size: u64,
}

/// Tally of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successfully scrambled files
    pub scrambled: Vec<ScrambledFile>,
    /// Files copied unchanged into a mirror (non-code, no-op or failed)
    pub copied: Vec<PathBuf>,
    /// Inputs that produced nothing: symlinks and special files, plus
    /// empty, Rust or unsupported files given directly
    pub skipped: Vec<PathBuf>,
    /// Inputs that failed, with the reason
    pub failed: Vec<(PathBuf, ScrambleError)>,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.scrambled.extend(other.scrambled);
        self.copied.extend(other.copied);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// One-line summary for the end of a run
    pub fn summary(&self) -> String {
        let original: u64 = self.scrambled.iter().map(|f| f.original_size).sum();
        let scrambled: u64 = self.scrambled.iter().map(|f| f.scrambled_size).sum();
        format!(
            "{} scrambled ({} -> {} bytes), {} copied, {} skipped, {} failed",
            self.scrambled.len(),
            original,
            scrambled,
            self.copied.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Drives the engine over files and directory trees
pub struct Scrambler {
    engine: Engine,
}

impl Scrambler {
    pub fn new(config: ScrambleConfig) -> ScrambleResult<Self> {
        Ok(Self {
            engine: Engine::new(config)?,
        })
    }

    pub fn config(&self) -> &ScrambleConfig {
        self.engine.config()
    }

    /// `dir/name.py` -> `dir/name.<marker>.py`
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let marker = &self.config().output_marker;
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match source.extension() {
            Some(ext) => format!("{}.{}.{}", stem, marker, ext.to_string_lossy()),
            None => format!("{}.{}", stem, marker),
        };
        source.with_file_name(name)
    }

    /// Sibling directory `<dir>.<marker>` receiving the mirrored tree
    pub fn mirror_root_for(&self, dir: &Path) -> ScrambleResult<PathBuf> {
        let dir = dir
            .canonicalize()
            .map_err(|e| ScrambleError::from_io(e, dir))?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ScrambleError::NotAFile(dir.clone()))?;
        Ok(dir.with_file_name(format!("{}.{}", name, self.config().output_marker)))
    }

    /// Read and transform one file without writing anything.
    pub fn transform_file(&mut self, path: &Path) -> ScrambleResult<(Language, Outcome)> {
        let language = Language::from_path(path)
            .ok_or_else(|| ScrambleError::UnsupportedExtension(path.to_path_buf()))?;
        let source = read_source(path)?;
        if source.trim().is_empty() {
            tracing::warn!("Skipping empty file: {}", path.display());
            return Ok((language, Outcome::NoOp("empty file")));
        }
        let outcome = self.engine.transform_language(&source, language)?;
        Ok((language, outcome))
    }

    /// Scramble `source` into `output`. `None` when there was nothing to write.
    fn scramble_into(&mut self, source: &Path, output: &Path) -> ScrambleResult<Option<ScrambledFile>> {
        let original_size = fs::metadata(source)
            .map_err(|e| ScrambleError::from_io(e, source))?
            .len();
        let (language, outcome) = self.transform_file(source)?;
        let text = match outcome {
            Outcome::Output(text) => text,
            Outcome::NoOp(message) => {
                tracing::info!("{}: {}", source.display(), message);
                return Ok(None);
            }
        };
        write_output(output, &text)?;

        let scrambled = ScrambledFile {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            language,
            original_size,
            scrambled_size: text.len() as u64,
        };
        tracing::info!(
            "Scrambled ({}): {} -> {} ({} -> {} bytes)",
            scrambled.language,
            scrambled.source.display(),
            scrambled.output.display(),
            scrambled.original_size,
            scrambled.scrambled_size
        );
        Ok(Some(scrambled))
    }

    /// Scramble a single file next to itself.
    pub fn scramble_file(&mut self, source: &Path) -> ScrambleResult<Option<ScrambledFile>> {
        let meta = fs::metadata(source).map_err(|e| ScrambleError::from_io(e, source))?;
        if !meta.is_file() {
            return Err(ScrambleError::NotAFile(source.to_path_buf()));
        }
        let output = self.output_path_for(source);
        self.scramble_into(source, &output)
    }

    /// Mirror `input_dir` into its sibling output directory.
    ///
    /// Per-file errors are recorded in the report and the file is copied
    /// unchanged; only failing to create the mirror root aborts.
    pub fn scramble_directory(&mut self, input_dir: &Path) -> ScrambleResult<BatchReport> {
        let output_dir = self.mirror_root_for(input_dir)?;
        let input_dir = input_dir
            .canonicalize()
            .map_err(|e| ScrambleError::from_io(e, input_dir))?;
        fs::create_dir_all(&output_dir).map_err(|e| ScrambleError::from_io(e, &output_dir))?;
        tracing::info!(
            "Mirroring {} -> {}",
            input_dir.display(),
            output_dir.display()
        );

        let mut report = BatchReport::default();
        let mut walker = WalkDir::new(&input_dir)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name();
        if !self.config().recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| input_dir.clone());
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                    report.failed.push((path, ScrambleError::Io(e.into())));
                    continue;
                }
            };
            let path = entry.path();
            let rel_path = path.strip_prefix(&input_dir).unwrap_or(path);
            let dest = output_dir.join(rel_path);
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                tracing::info!("Skipping symbolic link: {}", path.display());
                report.skipped.push(path.to_path_buf());
                continue;
            }
            if file_type.is_dir() {
                if let Err(e) = fs::create_dir_all(&dest) {
                    let err = ScrambleError::from_io(e, &dest);
                    tracing::warn!("Failed to mirror directory {}: {}", path.display(), err);
                    report.failed.push((path.to_path_buf(), err));
                }
                continue;
            }
            if !file_type.is_file() {
                // sockets, fifos and devices have no content to mirror
                tracing::info!("Skipping special file: {}", path.display());
                report.skipped.push(path.to_path_buf());
                continue;
            }

            match self.scramble_into(path, &dest) {
                Ok(Some(output)) => report.scrambled.push(output),
                Ok(None) => mirror_unchanged(&mut report, path, &dest),
                Err(e) if e.is_skip() => {
                    tracing::debug!("Copying non-code file: {}", rel_path.display());
                    mirror_unchanged(&mut report, path, &dest);
                }
                Err(e) => {
                    tracing::warn!("Failed to scramble {}: {}", path.display(), e);
                    // Keep the mirror complete
                    match copy_unchanged(path, &dest) {
                        Ok(()) => report.copied.push(path.to_path_buf()),
                        Err(copy_err) => {
                            tracing::warn!("Failed to copy {}: {}", path.display(), copy_err)
                        }
                    }
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }

        Ok(report)
    }

    /// Dispatch on what `path` is. Errors land in the report.
    pub fn scramble_path(&mut self, path: &Path) -> BatchReport {
        let mut report = BatchReport::default();
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                let err = ScrambleError::from_io(e, path);
                tracing::warn!("{}", err);
                report.failed.push((path.to_path_buf(), err));
                return report;
            }
        };

        if meta.file_type().is_symlink() {
            tracing::info!("Skipping symbolic link: {}", path.display());
            report.skipped.push(path.to_path_buf());
        } else if meta.is_dir() {
            match self.scramble_directory(path) {
                Ok(dir_report) => report.merge(dir_report),
                Err(e) => {
                    tracing::warn!("Failed to mirror {}: {}", path.display(), e);
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        } else {
            match self.scramble_file(path) {
                Ok(Some(output)) => report.scrambled.push(output),
                Ok(None) => report.skipped.push(path.to_path_buf()),
                Err(e) if e.is_skip() => {
                    tracing::warn!("{}", e);
                    report.skipped.push(path.to_path_buf());
                }
                Err(e) => {
                    tracing::warn!("Failed to scramble {}: {}", path.display(), e);
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }
        report
    }

    pub fn scramble_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            report.merge(self.scramble_path(path.as_ref()));
        }
        report
    }
}

fn read_source(path: &Path) -> ScrambleResult<String> {
    let bytes = fs::read(path).map_err(|e| ScrambleError::from_io(e, path))?;
    String::from_utf8(bytes).map_err(|e| ScrambleError::Decode {
        path: path.to_path_buf(),
        message: e.utf8_error().to_string(),
    })
}

fn write_output(path: &Path, text: &str) -> ScrambleResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScrambleError::from_io(e, parent))?;
    }
    fs::write(path, text).map_err(|e| ScrambleError::from_io(e, path))
}

/// Copy `source` into the mirror; a failed copy is charged to `source` alone.
fn mirror_unchanged(report: &mut BatchReport, source: &Path, dest: &Path) {
    match copy_unchanged(source, dest) {
        Ok(()) => report.copied.push(source.to_path_buf()),
        Err(e) => {
            tracing::warn!("Failed to copy {}: {}", source.display(), e);
            report.failed.push((source.to_path_buf(), e));
        }
    }
}

fn copy_unchanged(source: &Path, dest: &Path) -> ScrambleResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ScrambleError::from_io(e, parent))?;
    }
    fs::copy(source, dest).map_err(|e| ScrambleError::from_io(e, dest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scrambler() -> Scrambler {
        Scrambler::new(ScrambleConfig::new().seed(3)).unwrap()
    }

    #[test]
    fn test_output_path_for() {
        let s = scrambler();
        assert_eq!(
            s.output_path_for(Path::new("pkg/mod.py")),
            PathBuf::from("pkg/mod.scrambled.py")
        );
        assert_eq!(s.output_path_for(Path::new("Makefile")), PathBuf::from("Makefile.scrambled"));

        let custom = Scrambler::new(ScrambleConfig::new().output_marker("ugly")).unwrap();
        assert_eq!(custom.output_path_for(Path::new("a.go")), PathBuf::from("a.ugly.go"));
    }

    #[test]
    fn test_mirror_root_is_sibling() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("project");
        fs::create_dir(&dir).unwrap();

        let root = scrambler().mirror_root_for(&dir).unwrap();
        assert_eq!(root.file_name().unwrap(), "project.scrambled");
        assert_eq!(root.parent(), dir.canonicalize().unwrap().parent());
    }

    #[test]
    fn test_non_utf8_is_decode_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.py");
        fs::write(&path, [0x66u8, 0xff, 0xfe, 0x0a]).unwrap();

        let err = scrambler().scramble_file(&path).unwrap_err();
        assert!(matches!(err, ScrambleError::Decode { .. }));
    }

    #[test]
    fn test_missing_and_directory_inputs() {
        let temp = TempDir::new().unwrap();
        let mut s = scrambler();

        let err = s.scramble_file(&temp.path().join("gone.py")).unwrap_err();
        assert!(matches!(err, ScrambleError::FileNotFound(_)));

        let err = s.scramble_file(temp.path()).unwrap_err();
        assert!(matches!(err, ScrambleError::NotAFile(_)));
    }

    #[test]
    fn test_empty_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.py");
        fs::write(&path, "\n\n").unwrap();

        let mut s = scrambler();
        assert!(s.scramble_file(&path).unwrap().is_none());
        assert!(!temp.path().join("empty.scrambled.py").exists());
    }

    #[test]
    fn test_report_summary() {
        let mut report = BatchReport::default();
        report.copied.push(PathBuf::from("a.txt"));
        report
            .failed
            .push((PathBuf::from("b.py"), ScrambleError::Splice("x".into())));
        assert!(report.has_failures());
        assert_eq!(
            report.summary(),
            "0 scrambled (0 -> 0 bytes), 1 copied, 0 skipped, 1 failed"
        );
    }
}
