use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use std::fs::OpenOptions;
use std::io::Write;
use chrono::Local;

// @module: File and directory utilities

/// Suffix of interchange files
pub const INTERCHANGE_SUFFIX: &str = ".tu.json";
/// Suffix of final skeletons
pub const SKELETON_SUFFIX: &str = ".skl";
/// Suffix of format tables
pub const FORMATS_SUFFIX: &str = ".fmt.json";
/// Suffix of kept pseudo-skeletons
pub const PSEUDO_SKELETON_SUFFIX: &str = ".pskl";

const MARKUP_EXTENSIONS: [&str; 4] = ["html", "htm", "xhtml", "shtml"];

const OFFICE_EXTENSIONS: [&str; 10] = [
    "doc", "docx", "odt", "rtf", "ppt", "pptx", "odp", "xls", "xlsx", "ods",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for an exported document
    // @params: input_file, output_dir, target_language, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
        extension: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let output_dir = output_dir.as_ref();

        let mut output_filename = Self::document_stem(input_file);
        output_filename.push('.');
        output_filename.push_str(target_language);
        if !extension.is_empty() {
            output_filename.push('.');
            output_filename.push_str(extension);
        }

        output_dir.join(output_filename)
    }

    /// Document name without extension; artifact suffixes count as one extension
    pub fn document_stem<P: AsRef<Path>>(path: P) -> String {
        let path = path.as_ref();
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        for suffix in [INTERCHANGE_SUFFIX, FORMATS_SUFFIX] {
            if let Some(stem) = name.strip_suffix(suffix) {
                return stem.to_string();
            }
        }
        path.file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let normalized_ext = extension.trim_start_matches('.');
        Self::walk_files(dir, |path| {
            path.extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(normalized_ext))
        })
    }

    /// Find every document an import can read, in path order
    pub fn find_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        Self::walk_files(dir, |path| FileType::from_path(path) != FileType::Unknown)
    }

    /// Find every interchange file, in path order
    pub fn find_interchange_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut files = Self::find_files(dir, "json")?;
        files.retain(|path| path.to_string_lossy().ends_with(INTERCHANGE_SUFFIX));
        Ok(files)
    }

    fn walk_files<P: AsRef<Path>>(dir: P, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if path.is_file() && keep(path) {
                result.push(path.to_path_buf());
            }
        }
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Read a file's raw bytes
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        Self::write_bytes(path, content.as_bytes())
    }

    /// Write raw bytes to a file, creating the parent directory
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        // Ensure the target directory exists
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        // Open file in append mode, create if it doesn't exist
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect whether a file is markup, an office document or neither
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        Ok(FileType::from_path(path))
    }
}

/// Enum representing different file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// HTML or XHTML, tokenized directly
    Markup,
    /// Office document, converted through the bridge
    Office,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Classify by extension, case-insensitively
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_lowercase();
        if MARKUP_EXTENSIONS.contains(&ext.as_str()) {
            Self::Markup
        } else if OFFICE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Office
        } else {
            Self::Unknown
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        path.as_ref()
            .extension()
            .map_or(Self::Unknown, |ext| Self::from_extension(&ext.to_string_lossy()))
    }
}

/// The artifacts an import writes for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    // @field: Interchange file
    pub interchange: PathBuf,
    // @field: Final skeleton
    pub skeleton: PathBuf,
    // @field: Format table
    pub formats: PathBuf,
    // @field: Pseudo-skeleton, kept on request
    pub pseudo_skeleton: PathBuf,
}

impl ArtifactPaths {
    /// Artifact paths for `document` inside `dir`.
    ///
    /// `document` may be the source document or any of its artifacts.
    pub fn for_document<P1: AsRef<Path>, P2: AsRef<Path>>(document: P1, dir: P2) -> Self {
        let stem = FileManager::document_stem(document);
        let dir = dir.as_ref();
        Self {
            interchange: dir.join(format!("{}{}", stem, INTERCHANGE_SUFFIX)),
            skeleton: dir.join(format!("{}{}", stem, SKELETON_SUFFIX)),
            formats: dir.join(format!("{}{}", stem, FORMATS_SUFFIX)),
            pseudo_skeleton: dir.join(format!("{}{}", stem, PSEUDO_SKELETON_SUFFIX)),
        }
    }
}
