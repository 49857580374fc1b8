//! Local file system document source.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::models::SourceDocument;
use crate::sources::DocumentSource;
use crate::utils::file::{check_file_size, read_file_content};

/// Extensions read as UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];
const PDF_EXTENSION: &str = "pdf";

/// Loads `.txt`, `.md` and `.pdf` files under a directory.
#[derive(Debug)]
pub struct LocalSource {
    /// Root path to scan
    root: PathBuf,

    /// Glob patterns matched against full paths
    exclude_patterns: Vec<glob::Pattern>,

    /// Files above this size in bytes are skipped
    max_file_size: u64,
}

impl LocalSource {
    /// Create a new local source. Invalid exclude globs are logged and ignored.
    pub fn new(root: PathBuf, exclude_patterns: &[String], max_file_size: u64) -> Self {
        let exclude_patterns = exclude_patterns
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            root,
            exclude_patterns,
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect all supported files, in file-name order within each directory.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::NotFound(self.root.display().to_string()));
        }

        if self.root.is_file() {
            return Ok(if is_supported(&self.root) {
                vec![self.root.clone()]
            } else {
                Vec::new()
            });
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| SourceError::WalkError(e.to_string()))?;
            let path = entry.path();

            if !entry.file_type().is_file() || !is_supported(path) {
                continue;
            }

            let path_str = path.to_string_lossy();
            if self.exclude_patterns.iter().any(|p| p.matches(&path_str)) {
                tracing::debug!(path = %path_str, "excluded");
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Read one file. Returns `Ok(None)` for files with whitespace-only text.
    pub fn read_document(&self, path: &Path) -> Result<Option<SourceDocument>, SourceError> {
        let content = if has_extension(path, PDF_EXTENSION) {
            extract_pdf_text(path, self.max_file_size)?
        } else {
            read_file_content(path, self.max_file_size).map_err(|e| SourceError::ReadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(SourceDocument::new(path.display().to_string(), content)))
    }
}

impl DocumentSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    fn load(&self) -> Result<Vec<SourceDocument>, SourceError> {
        let files = self.collect_files()?;
        let mut documents = Vec::with_capacity(files.len());

        for path in &files {
            match self.read_document(path) {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => tracing::debug!(path = %path.display(), "skipping empty file"),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable file"),
            }
        }

        tracing::info!(
            root = %self.root.display(),
            files = files.len(),
            documents = documents.len(),
            "loaded documents"
        );

        Ok(documents)
    }
}

fn extract_pdf_text(path: &Path, max_file_size: u64) -> Result<String, SourceError> {
    let read_error = |e: std::io::Error| SourceError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    check_file_size(path, max_file_size).map_err(read_error)?;
    let bytes = std::fs::read(path).map_err(read_error)?;

    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| SourceError::PdfError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

fn is_supported(path: &Path) -> bool {
    has_extension(path, PDF_EXTENSION) || TEXT_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn source(root: &Path) -> LocalSource {
        LocalSource::new(root.to_path_buf(), &[], 1024 * 1024)
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("notes.txt")));
        assert!(is_supported(Path::new("README.MD")));
        assert!(is_supported(Path::new("paper.pdf")));
        assert!(!is_supported(Path::new("main.rs")));
        assert!(!is_supported(Path::new("Makefile")));
    }

    #[test]
    fn test_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            source(&missing).load(),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "# Beta\nsecond").unwrap();
        fs::write(dir.path().join("a.txt"), "alpha first").unwrap();
        fs::write(dir.path().join("blank.txt"), "  \n\t ").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "gamma").unwrap();

        let documents = source(dir.path()).load().unwrap();
        let names: Vec<String> = documents
            .iter()
            .map(|d| {
                Path::new(&d.source)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();

        assert_eq!(names, vec!["a.txt", "b.md", "c.txt"]);
        assert_eq!(documents[0].content, "alpha first");
        assert!(documents[0].source.ends_with("a.txt"));
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts").join("wip.md"), "draft").unwrap();
        fs::write(dir.path().join("final.md"), "final").unwrap();

        let src = LocalSource::new(
            dir.path().to_path_buf(),
            &["**/drafts/**".to_string(), "[".to_string()],
            1024,
        );
        let files = src.collect_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("final.md"));
    }

    #[test]
    fn test_oversized_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(200)).unwrap();
        fs::write(dir.path().join("small.txt"), "tiny").unwrap();

        let src = LocalSource::new(dir.path().to_path_buf(), &[], 100);
        let documents = src.load().unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].source.ends_with("small.txt"));

        let err = src.read_document(&dir.path().join("big.txt")).unwrap_err();
        assert!(matches!(err, SourceError::ReadError { .. }));
    }

    #[test]
    fn test_invalid_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();
        fs::write(dir.path().join("ok.txt"), "fine").unwrap();

        let src = source(dir.path());
        assert!(matches!(
            src.read_document(&dir.path().join("broken.pdf")),
            Err(SourceError::PdfError { .. })
        ));
        assert_eq!(src.load().unwrap().len(), 1);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.md");
        fs::write(&file, "only").unwrap();

        let documents = source(&file).load().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(source(&file).name(), "local");
    }
}
