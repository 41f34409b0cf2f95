//! Archive-then-delete: compress files into one archive, then remove the
//! originals that made it in.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::delete::{DeleteOptions, delete_files_with_progress};
use crate::progress::{OperationComplete, OperationProgress, OperationType};
use crate::{OPERATION_CHANNEL_SIZE, OperationError, OpsError};

/// Supported archive containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Deflate-compressed zip.
    #[default]
    Zip,
    /// Gzip-compressed tarball.
    TarGz,
}

impl ArchiveFormat {
    /// Conventional file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Guess the format from an archive file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// What an archive-then-delete run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
    pub format: ArchiveFormat,
    /// Inputs written to the archive, in input order.
    pub archived: Vec<PathBuf>,
    /// Inputs that could not be read; left untouched on disk.
    pub skipped: Vec<OperationError>,
    /// Size of the finished archive in bytes.
    pub archive_size: u64,
    /// Deletion of the archived originals.
    pub deletion: OperationComplete,
}

impl ArchiveOutcome {
    /// Number of originals removed.
    pub fn deleted(&self) -> usize {
        self.deletion.succeeded
    }

    /// Whether every input was archived and removed.
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.deletion.is_success()
    }
}

/// Result sent through the channel during an archive operation.
#[derive(Debug)]
pub enum ArchiveResult {
    /// Progress of the archive phase, then of the delete phase.
    Progress(OperationProgress),
    /// The operation finished or failed.
    Complete(Result<ArchiveOutcome, OpsError>),
}

/// Write `paths` into a new archive at `archive_path`, then delete the
/// originals that were archived.
///
/// Entries are named by base name; clashing names get a numeric suffix.
/// Unreadable inputs are skipped and kept. If the archive cannot be
/// created or finished, no original is deleted.
pub fn archive_then_delete(
    paths: &[PathBuf],
    archive_path: &Path,
    format: ArchiveFormat,
) -> Result<ArchiveOutcome, OpsError> {
    archive_then_delete_with_progress(paths, archive_path, format, |_| {})
}

/// [`archive_then_delete`] with progress reporting.
pub fn archive_then_delete_with_progress<F>(
    paths: &[PathBuf],
    archive_path: &Path,
    format: ArchiveFormat,
    mut on_progress: F,
) -> Result<ArchiveOutcome, OpsError>
where
    F: FnMut(&OperationProgress),
{
    ensure_not_input(paths, archive_path)?;

    let file = File::create(archive_path).map_err(|source| OpsError::CreateArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut sink: Box<dyn ArchiveSink> = match format {
        ArchiveFormat::Zip => Box::new(ZipSink(ZipWriter::new(file))),
        ArchiveFormat::TarGz => Box::new(TarGzSink(tar::Builder::new(GzEncoder::new(
            file,
            Compression::default(),
        )))),
    };

    let mut progress = OperationProgress::new(OperationType::Archive, paths.len());
    let mut names = EntryNames::default();
    let mut archived = Vec::new();

    for path in paths {
        progress.set_current_file(Some(path.clone()));
        on_progress(&progress);

        match add_entry(sink.as_mut(), path, &mut names) {
            Ok(bytes) => {
                progress.complete_file(bytes);
                archived.push(path.clone());
            }
            Err(EntryError::Skipped(err)) => {
                tracing::warn!(path = %path.display(), error = %err, "not archived");
                progress.add_error(OperationError::new(path.clone(), err.to_string()));
            }
            Err(EntryError::Corrupted(source)) => {
                drop(sink);
                let _ = fs::remove_file(archive_path);
                tracing::warn!(path = %path.display(), error = %source, "archive abandoned");
                return Err(OpsError::WriteArchive {
                    path: archive_path.to_path_buf(),
                    entry: path.clone(),
                    source,
                });
            }
        }
    }

    if let Err(source) = sink.finish() {
        let _ = fs::remove_file(archive_path);
        return Err(OpsError::FinishArchive {
            path: archive_path.to_path_buf(),
            source,
        });
    }

    let archive_size = fs::metadata(archive_path).map(|m| m.len()).unwrap_or(0);
    tracing::info!(
        archive = %archive_path.display(),
        entries = archived.len(),
        bytes = archive_size,
        "archive written"
    );

    let skipped = progress.errors.clone();
    let deletion = delete_files_with_progress(&archived, DeleteOptions::default(), on_progress);

    Ok(ArchiveOutcome {
        archive_path: archive_path.to_path_buf(),
        format,
        archived,
        skipped,
        archive_size,
        deletion,
    })
}

/// Start an async archive-then-delete operation.
pub fn start_archive(
    paths: Vec<PathBuf>,
    archive_path: PathBuf,
    format: ArchiveFormat,
) -> mpsc::Receiver<ArchiveResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::task::spawn_blocking(move || {
        let result = archive_then_delete_with_progress(&paths, &archive_path, format, |progress| {
            let _ = tx.blocking_send(ArchiveResult::Progress(progress.clone()));
        });
        let _ = tx.blocking_send(ArchiveResult::Complete(result));
    });

    rx
}

/// Refuse an archive target that resolves to one of the inputs, however
/// either path is spelled.
fn ensure_not_input(paths: &[PathBuf], archive_path: &Path) -> Result<(), OpsError> {
    let target = resolve_target(archive_path);
    let target_id = fs::metadata(archive_path).ok().and_then(|m| file_id(&m));

    let clashes = paths.iter().any(|path| {
        path == archive_path
            || target
                .as_ref()
                .is_some_and(|t| fs::canonicalize(path).is_ok_and(|p| &p == t))
            || target_id.is_some()
                && fs::metadata(path).ok().and_then(|m| file_id(&m)) == target_id
    });

    if clashes {
        return Err(OpsError::ArchiveIsInput {
            path: archive_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Absolute, symlink-free form of a path that may not exist yet.
fn resolve_target(archive_path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = fs::canonicalize(archive_path) {
        return Some(resolved);
    }
    let name = archive_path.file_name()?;
    let parent = match archive_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(name))
}

#[cfg(unix)]
fn file_id(metadata: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_id(_metadata: &fs::Metadata) -> Option<(u64, u64)> {
    None
}

/// Why an input did not make it into the archive.
#[derive(Debug)]
enum EntryError {
    /// The input was not written; the archive is still consistent.
    Skipped(io::Error),
    /// The archive stream is no longer consistent.
    Corrupted(io::Error),
}

fn add_entry(
    sink: &mut dyn ArchiveSink,
    path: &Path,
    names: &mut EntryNames,
) -> Result<u64, EntryError> {
    let mut file = File::open(path).map_err(EntryError::Skipped)?;
    let metadata = file.metadata().map_err(EntryError::Skipped)?;
    if !metadata.is_file() {
        return Err(EntryError::Skipped(io::Error::other("not a regular file")));
    }
    let name = names.claim(path);
    sink.add(&name, &mut file, &metadata)?;
    Ok(metadata.len())
}

/// Hands out unique entry names derived from base names.
#[derive(Default)]
struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    fn claim(&mut self, path: &Path) -> String {
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        if self.used.insert(base.clone()) {
            return base;
        }

        let (stem, ext) = match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
            _ => (base.clone(), String::new()),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Container-specific entry writer.
trait ArchiveSink {
    fn add(
        &mut self,
        name: &str,
        file: &mut dyn io::Read,
        metadata: &fs::Metadata,
    ) -> Result<(), EntryError>;
    fn finish(self: Box<Self>) -> io::Result<()>;
}

struct ZipSink<W: io::Write + io::Seek>(ZipWriter<W>);

impl<W: io::Write + io::Seek> ArchiveSink for ZipSink<W> {
    fn add(
        &mut self,
        name: &str,
        file: &mut dyn io::Read,
        metadata: &fs::Metadata,
    ) -> Result<(), EntryError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(metadata.len() >= u64::from(u32::MAX));
        self.0
            .start_file(name, options)
            .map_err(|e| EntryError::Corrupted(io::Error::other(e)))?;
        if let Err(err) = io::copy(file, &mut self.0) {
            // Rewinds to the entry's start, so later entries stay readable.
            return match self.0.abort_file() {
                Ok(()) => Err(EntryError::Skipped(err)),
                Err(abort) => Err(EntryError::Corrupted(io::Error::other(abort))),
            };
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let ZipSink(writer) = *self;
        writer.finish().map_err(io::Error::other)?;
        Ok(())
    }
}

struct TarGzSink<W: io::Write>(tar::Builder<GzEncoder<W>>);

impl<W: io::Write> ArchiveSink for TarGzSink<W> {
    fn add(
        &mut self,
        name: &str,
        file: &mut dyn io::Read,
        metadata: &fs::Metadata,
    ) -> Result<(), EntryError> {
        let size = metadata.len();
        let mut header = tar::Header::new_gnu();
        header.set_metadata(metadata);
        header.set_size(size);
        // The header commits to `size` bytes; a short or failed read
        // leaves the stream misaligned for every later entry.
        self.0
            .append_data(&mut header, name, ExactSize { inner: file, remaining: size })
            .map_err(EntryError::Corrupted)
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let TarGzSink(builder) = *self;
        builder.into_inner()?.finish()?;
        Ok(())
    }
}

/// Reader that errors unless it yields exactly `remaining` bytes.
struct ExactSize<'a> {
    inner: &'a mut dyn io::Read,
    remaining: u64,
}

impl io::Read for ExactSize<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let cap = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..cap])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file shrank while being archived",
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::NamedTempFile;

    /// Yields `left` bytes, then fails.
    struct FailAfter {
        left: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.left == 0 {
                return Err(io::Error::other("device went away"));
            }
            let n = buf.len().min(self.left);
            buf[..n].fill(b'x');
            self.left -= n;
            Ok(n)
        }
    }

    fn metadata_of_len(len: usize) -> (NamedTempFile, fs::Metadata) {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), vec![b'x'; len]).unwrap();
        let metadata = fs::metadata(file.path()).unwrap();
        (file, metadata)
    }

    #[test]
    fn test_tar_read_failure_is_fatal() {
        let (_file, metadata) = metadata_of_len(4096);
        let mut sink = TarGzSink(tar::Builder::new(GzEncoder::new(
            Vec::new(),
            Compression::default(),
        )));

        let result = sink.add("big.bin", &mut FailAfter { left: 1000 }, &metadata);
        assert!(matches!(result, Err(EntryError::Corrupted(_))));
    }

    #[test]
    fn test_tar_short_read_is_fatal() {
        let (_file, metadata) = metadata_of_len(4096);
        let mut sink = TarGzSink(tar::Builder::new(GzEncoder::new(
            Vec::new(),
            Compression::default(),
        )));

        let result = sink.add("shrunk.bin", &mut &b"abc"[..], &metadata);
        assert!(matches!(result, Err(EntryError::Corrupted(_))));
    }

    #[test]
    fn test_tar_entry_round_trip() {
        let (_file, metadata) = metadata_of_len(5);
        let mut sink = TarGzSink(tar::Builder::new(GzEncoder::new(
            Vec::new(),
            Compression::default(),
        )));
        sink.add("five.txt", &mut &b"hello"[..], &metadata).unwrap();

        let bytes = sink.0.into_inner().unwrap().finish().unwrap();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(&bytes[..]));
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_zip_read_failure_skips_entry_only() {
        let (_file, metadata) = metadata_of_len(4096);
        let mut sink = ZipSink(ZipWriter::new(Cursor::new(Vec::new())));

        let result = sink.add("big.bin", &mut FailAfter { left: 1000 }, &metadata);
        assert!(matches!(result, Err(EntryError::Skipped(_))));
        sink.add("good.txt", &mut &b"fine"[..], &metadata).unwrap();

        let cursor = sink.0.finish().unwrap();
        let mut zip = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(zip.len(), 1);
        let mut content = String::new();
        zip.by_name("good.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "fine");
    }

    #[test]
    fn test_entry_names_deduplicated() {
        let mut names = EntryNames::default();
        assert_eq!(names.claim(Path::new("/a/report.pdf")), "report.pdf");
        assert_eq!(names.claim(Path::new("/b/report.pdf")), "report (1).pdf");
        assert_eq!(names.claim(Path::new("/c/report.pdf")), "report (2).pdf");
        assert_eq!(names.claim(Path::new("/a/Makefile")), "Makefile");
        assert_eq!(names.claim(Path::new("/b/Makefile")), "Makefile (1)");
        assert_eq!(names.claim(Path::new("/a/.env")), ".env");
        assert_eq!(names.claim(Path::new("/b/.env")), ".env (1)");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ArchiveFormat::from_path(Path::new("old.ZIP")), Some(ArchiveFormat::Zip));
        assert_eq!(
            ArchiveFormat::from_path(Path::new("/tmp/old.tar.gz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("old.tgz")), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path(Path::new("old.rar")), None);
    }
}
