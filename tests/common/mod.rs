/*!
 * Common test utilities for the mdtrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use mdtrans::translation::{MarkdownSegmenter, ModelRegistry, MtTranslator, TranslationPipeline};


use mock_models::MockModelLoader;

/// Route library logs through the test harness; `RUST_LOG=debug` shows pipeline phases
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A small README-like document touching every block kind
pub fn sample_markdown() -> &'static str {
    "---\ntitle: Guide\n---\n# Getting started\n\nInstall the tool and read [the guide](https://example.com/guide).\n\n- First step\n- Run `make build` twice\n\n```sh\nmake build\n```\n\n> Note: costs 12.50 EUR.\n"
}

/// Pipeline with the default registry on top of `loader`
pub fn pipeline_with(loader: MockModelLoader) -> TranslationPipeline {
    TranslationPipeline::new(MarkdownSegmenter::new(), ModelRegistry::new(), MtTranslator::new(Arc::new(loader)))
}
