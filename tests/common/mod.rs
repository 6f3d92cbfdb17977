/*!
 * Common test utilities for the tuforge test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use tuforge::app_config::Config;
use tuforge::app_controller::Controller;
use tuforge::bridge::DocumentBridge;
use tuforge::errors::BridgeError;
use tuforge::interchange::InterchangeDocument;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    create_test_bytes(dir, filename, content.as_bytes())
}

/// Creates a test file with raw bytes
pub fn create_test_bytes(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A small but complete HTML page
pub fn sample_page() -> &'static str {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Release notes</title>
</head>
<body>
  <!-- generated -->
  <h1>What is new</h1>
  <p>Hello <b>world</b>. This release is <i>faster</i>.</p>
  <p><img src="logo.png" alt="Company logo"> Welcome aboard!</p>
  <ul>
    <li>First item
    <li>Second item
  </ul>
  <script>if (a < b) { note.innerHTML = '<p>' + text + '</p>'; }</script>
  <p>&nbsp;</p>
</body>
</html>
"#
}

/// Configuration used by the tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "de".to_string();
    config.concurrency.max_parallel_documents = 2;
    config
}

/// Controller with the default test configuration and a fake bridge
pub fn test_controller() -> Result<(Controller, Arc<FakeBridge>)> {
    let bridge = Arc::new(FakeBridge::default());
    let controller = Controller::with_bridge(test_config(), bridge.clone())?;
    Ok((controller, bridge))
}

/// Replace every unit's target with `translate(source)`
pub fn translate_interchange(path: &Path, translate: impl Fn(&str) -> String) -> Result<()> {
    let mut document = InterchangeDocument::from_file(path)?;
    for unit in &mut document.units {
        unit.target = Some(translate(&unit.source));
    }
    document.save(path)
}

/// Bridge that "converts" by copying bytes, recording each call
#[derive(Debug, Default)]
pub struct FakeBridge {
    pub calls: AtomicUsize,
    pub fail_with_connection: bool,
}

impl FakeBridge {
    pub fn unreachable() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with_connection: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentBridge for FakeBridge {
    fn convert(
        &self,
        input: &Path,
        _source_format: &str,
        target_format: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_with_connection {
            return Err(BridgeError::Connection("office suite unreachable".to_string()));
        }
        let extension = target_format.split(':').next().unwrap_or(target_format);
        let stem = input.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let output = output_dir.join(format!("{}.{}", stem, extension));
        fs::copy(input, &output).map_err(|e| BridgeError::Conversion(e.to_string()))?;
        Ok(output)
    }
}
