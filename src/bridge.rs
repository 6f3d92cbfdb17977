/*!
 * Office-suite bridge.
 *
 * Binary office formats are not tokenized directly: the bridge converts
 * them to HTML on import and converts the recombined HTML back on export.
 * `SofficeBridge` drives a headless office suite through its command line.
 */

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, error};

use crate::errors::BridgeError;

/// Converts a document between formats through an external program
pub trait DocumentBridge: Send + Sync {
    /// Convert `input` (in `source_format`) to `target_format`, writing the
    /// result into `output_dir` and returning its path.
    ///
    /// Formats are file extensions, optionally followed by `:` and a filter
    /// name (`html:XHTML Writer File`).
    fn convert(
        &self,
        input: &Path,
        source_format: &str,
        target_format: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, BridgeError>;
}

/// Headless office suite invoked as `<program> --headless --convert-to ...`
#[derive(Debug, Clone)]
pub struct SofficeBridge {
    // @field: Executable name or path
    program: String,
}

impl SofficeBridge {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Path the suite writes its output to
    fn expected_output(input: &Path, target_format: &str, output_dir: &Path) -> PathBuf {
        let extension = target_format.split(':').next().unwrap_or(target_format);
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        output_dir.join(format!("{}.{}", stem, extension))
    }
}

impl Default for SofficeBridge {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl DocumentBridge for SofficeBridge {
    fn convert(
        &self,
        input: &Path,
        source_format: &str,
        target_format: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, BridgeError> {
        debug!(
            "Bridge: {} {:?} from {} to {}",
            self.program, input, source_format, target_format
        );

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg(target_format)
            .arg("--outdir")
            .arg(output_dir)
            .arg(input)
            .output()
            .map_err(|e| BridgeError::Connection(format!("Failed to start {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Bridge conversion failed: {}", stderr.trim());
            return Err(BridgeError::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let converted = Self::expected_output(input, target_format, output_dir);
        if !converted.is_file() {
            return Err(BridgeError::Conversion(format!(
                "{} produced no output at {:?}",
                self.program, converted
            )));
        }
        Ok(converted)
    }
}
