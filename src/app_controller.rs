use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::app_config::Config;
use crate::bridge::{DocumentBridge, SofficeBridge};
use crate::emit::Emitter;
use crate::errors::ConversionError;
use crate::export::{encode_document, ExportReport, Recombiner};
use crate::file_utils::{ArtifactPaths, FileManager, FileType};
use crate::format::FormatTable;
use crate::interchange::InterchangeDocument;
use crate::language_utils;
use crate::markup::{LenientHtmlProducer, TokenProducer};
use crate::segment::{Preener, Splitter};
use crate::skeleton::{MergeReport, SkeletonMerger};

// @module: Application controller for document import and export

/// Name of the folder run log written next to the documents
pub const FOLDER_LOG_FILE: &str = "tuforge.log";

/// What to do with each input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Document to interchange, skeleton and format table
    Import {
        // @field: Also write the pseudo-skeleton
        keep_intermediate: bool,
        // @field: Replace existing artifacts
        force_overwrite: bool,
    },
    /// Artifacts back to a document
    Export {
        // @field: Output language; the interchange target language when unset
        language: Option<String>,
    },
}

/// How one file was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Imported(ImportSummary),
    Exported(ExportSummary),
    /// Existing artifacts were left alone
    Skipped,
}

/// Result of importing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub artifacts: ArtifactPaths,
    pub units: usize,
    pub formats: usize,
    pub merge: MergeReport,
}

/// Result of exporting one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub report: ExportReport,
}

/// Counters of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller
#[derive(Clone)]
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Office-suite bridge for binary formats
    bridge: Arc<dyn DocumentBridge>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let bridge = Arc::new(SofficeBridge::new(config.bridge.program.clone()));
        Ok(Self { config, bridge })
    }

    /// Create a controller that converts office documents through `bridge`
    pub fn with_bridge(config: Config, bridge: Arc<dyn DocumentBridge>) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config, bridge })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `task` on a file or on every matching file of a directory
    pub async fn run(&self, task: Task, input: PathBuf, output_dir: Option<PathBuf>) -> Result<()> {
        if let Task::Import { .. } = task {
            let name = |code: &str| language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string());
            info!(
                "Importing {:?} ({} -> {})",
                input,
                name(&self.config.source_language),
                name(&self.config.target_language)
            );
        }

        if FileManager::dir_exists(&input) {
            self.run_folder(task, input, output_dir).await?;
            return Ok(());
        }

        let start_time = Instant::now();
        let output_dir = output_dir.unwrap_or_else(|| parent_dir(&input));
        match self.run_file(&task, &input, &output_dir)? {
            FileOutcome::Skipped => {}
            _ => info!("Done in {}", Self::format_duration(start_time.elapsed())),
        }
        Ok(())
    }

    /// Run `task` on one file
    pub fn run_file(&self, task: &Task, input: &Path, output_dir: &Path) -> Result<FileOutcome> {
        match task {
            Task::Import { keep_intermediate, force_overwrite } => {
                let artifacts = ArtifactPaths::for_document(input, output_dir);
                if FileManager::file_exists(&artifacts.interchange) && !force_overwrite {
                    warn!(
                        "Skipping {:?}, {:?} already exists (use -f to force overwrite)",
                        input, artifacts.interchange
                    );
                    return Ok(FileOutcome::Skipped);
                }
                self.import_file(input, output_dir, *keep_intermediate)
                    .map(FileOutcome::Imported)
            }
            Task::Export { language } => self
                .export_file(input, output_dir, language.as_deref())
                .map(FileOutcome::Exported),
        }
    }

    /// Import one document into `output_dir`
    pub fn import_file(&self, input: &Path, output_dir: &Path, keep_intermediate: bool) -> Result<ImportSummary> {
        if !FileManager::file_exists(input) {
            return Err(ConversionError::MissingFile(input.to_path_buf()).into());
        }
        let extension = extension_of(input);

        match FileManager::detect_file_type(input)? {
            FileType::Markup => {
                let bytes = FileManager::read_bytes(input)?;
                self.import_markup(input, &bytes, "html", output_dir, keep_intermediate)
            }
            FileType::Office => {
                let workdir = tempfile::tempdir().context("Failed to create a bridge work directory")?;
                let html = self.bridge.convert(input, &extension, "html", workdir.path())?;
                debug!("Bridge wrote {:?}", html);
                let bytes = FileManager::read_bytes(&html)?;
                self.import_markup(input, &bytes, &extension, output_dir, keep_intermediate)
            }
            FileType::Unknown => Err(anyhow!("Unsupported file type: {:?}", input)),
        }
    }

    fn import_markup(
        &self,
        input: &Path,
        bytes: &[u8],
        datatype: &str,
        output_dir: &Path,
        keep_intermediate: bool,
    ) -> Result<ImportSummary> {
        let (encoding, bom_len) = language_utils::detect_encoding(bytes, &self.config.source_language);
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .ok_or_else(|| {
                ConversionError::Encoding(format!("{:?} is not valid {}", input, encoding.name()))
            })?;
        debug!("Reading {:?} as {}", input, encoding.name());

        let mut producer = LenientHtmlProducer::new(&self.config.markup.raw_text_elements);
        let tokens = producer
            .produce(&text)
            .with_context(|| format!("Failed to parse {:?}", input))?;

        let splitter = Splitter::new(Preener::new(self.config.preen_options()));
        let emission = Emitter::new(splitter, self.config.emit_options()).emit(&tokens);
        let outcome = SkeletonMerger::new(&self.config.merge)
            .with_raw_text_elements(self.config.markup.raw_text_elements.as_slice())
            .merge_str(&emission.skeleton, &text);
        if outcome.report != MergeReport::default() {
            debug!("Merge of {:?}: {:?}", input, outcome.report);
        }

        let original = input
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut document = InterchangeDocument::new(
            original,
            datatype,
            encoding.name(),
            &self.config.source_language,
            &self.config.target_language,
        );
        document.bom = bom_len > 0 && encoding == encoding_rs::UTF_8;
        document.units = emission.units;

        let artifacts = ArtifactPaths::for_document(input, output_dir);
        document.save(&artifacts.interchange)?;
        FileManager::write_to_file(&artifacts.skeleton, &outcome.skeleton)?;
        emission.formats.save(&artifacts.formats)?;
        if keep_intermediate {
            FileManager::write_to_file(&artifacts.pseudo_skeleton, &emission.skeleton.to_string())?;
        }

        info!(
            "Imported {:?}: {} units, {} format entries",
            input,
            document.units.len(),
            emission.formats.entries.len()
        );
        Ok(ImportSummary {
            artifacts,
            units: document.units.len(),
            formats: emission.formats.entries.len(),
            merge: outcome.report,
        })
    }

    /// Export the document whose artifacts belong to `input`.
    ///
    /// Artifacts are looked up next to `input` first, then in `output_dir`.
    pub fn export_file(&self, input: &Path, output_dir: &Path, language: Option<&str>) -> Result<ExportSummary> {
        let artifacts = Self::locate_artifacts(input, output_dir)?;
        let document = InterchangeDocument::from_file(&artifacts.interchange)?;
        let formats = FormatTable::from_file(&artifacts.formats)?;
        if !FileManager::file_exists(&artifacts.skeleton) {
            return Err(ConversionError::MissingFile(artifacts.skeleton.clone()).into());
        }
        let skeleton = FileManager::read_to_string(&artifacts.skeleton)?;

        let recombination = Recombiner::new(&document, &formats).recombine(&skeleton);
        let language = language.unwrap_or(&document.target_language);
        let extension = extension_of(Path::new(&document.original));
        let output = FileManager::generate_output_path(&document.original, output_dir, language, &extension);

        if FileType::from_extension(&extension) == FileType::Office {
            let workdir = tempfile::tempdir().context("Failed to create a bridge work directory")?;
            let html = FileManager::generate_output_path(&document.original, workdir.path(), language, "html");
            FileManager::write_to_file(&html, &recombination.text)?;
            let converted = self.bridge.convert(&html, "html", &document.datatype, workdir.path())?;
            FileManager::copy_file(&converted, &output)?;
        } else {
            let bytes = encode_document(&recombination.text, &document.encoding, document.bom)?;
            FileManager::write_bytes(&output, &bytes)?;
        }

        if !recombination.report.fallback_units.is_empty() {
            warn!(
                "{} units of {:?} were written without markup",
                recombination.report.fallback_units.len(),
                output
            );
        }
        info!("Success: {}", output.display());
        Ok(ExportSummary {
            output,
            report: recombination.report,
        })
    }

    fn locate_artifacts(input: &Path, output_dir: &Path) -> Result<ArtifactPaths> {
        let beside = ArtifactPaths::for_document(input, parent_dir(input));
        if FileManager::file_exists(&beside.interchange) {
            return Ok(beside);
        }
        let in_output = ArtifactPaths::for_document(input, output_dir);
        if FileManager::file_exists(&in_output.interchange) {
            return Ok(in_output);
        }
        Err(ConversionError::MissingFile(beside.interchange).into())
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Run `task` on every matching file below `input_dir`.
    ///
    /// Documents are converted in parallel, each one on a blocking thread.
    /// Output goes next to each file, or below `output_dir` keeping the
    /// relative layout.
    pub async fn run_folder(&self, task: Task, input_dir: PathBuf, output_dir: Option<PathBuf>) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let files = match task {
            Task::Import { .. } => FileManager::find_documents(&input_dir)?,
            Task::Export { .. } => FileManager::find_interchange_files(&input_dir)?,
        };
        if files.is_empty() {
            return Err(anyhow!("No files to process in directory: {:?}", input_dir));
        }

        let folder_pb = ProgressBar::new(files.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let parallel = self.config.concurrency.max_parallel_documents.max(1);
        let semaphore = Arc::new(Semaphore::new(parallel));

        let results = stream::iter(files)
            .map(|file| {
                let controller = self.clone();
                let semaphore = semaphore.clone();
                let task = task.clone();
                let folder_pb = folder_pb.clone();
                let target_dir = match &output_dir {
                    Some(root) => {
                        let relative = parent_dir(&file);
                        let relative = relative.strip_prefix(&input_dir).unwrap_or(Path::new(""));
                        root.join(relative)
                    }
                    None => parent_dir(&file),
                };

                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| anyhow!("Failed to acquire a conversion slot: {}", e))?;

                    let file_name = file
                        .file_name()
                        .map(|f| f.to_string_lossy().to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    folder_pb.set_message(format!("Processing: {}", file_name));

                    let outcome = tokio::task::spawn_blocking(move || {
                        controller.run_file(&task, &file, &target_dir)
                    })
                    .await
                    .map_err(|e| anyhow!("Conversion of {} panicked: {}", file_name, e))
                    .and_then(|result| result.with_context(|| format!("Error processing file {}", file_name)));

                    folder_pb.inc(1);
                    outcome
                }
            })
            .buffer_unordered(parallel)
            .collect::<Vec<Result<FileOutcome>>>()
            .await;

        let mut summary = FolderSummary::default();
        for result in results {
            match result {
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Ok(_) => summary.processed += 1,
                Err(e) => {
                    error!("{:#}", e);
                    summary.failed += 1;
                }
            }
        }

        folder_pb.finish_with_message("Folder processing complete");

        let duration = start_time.elapsed();
        let summary_message = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            summary.processed, summary.skipped, summary.failed
        );
        info!("{}", summary_message);

        let log_file_path = input_dir.join(FOLDER_LOG_FILE);
        let entry = format!(
            "{} ({}) - Duration: {}",
            summary_message,
            input_dir.display(),
            Self::format_duration(duration)
        );
        if let Err(e) = FileManager::append_to_log_file(&log_file_path, &entry) {
            warn!("Failed to write folder log to file: {}", e);
        }

        Ok(summary)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().unwrap_or(Path::new("")).to_path_buf()
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
