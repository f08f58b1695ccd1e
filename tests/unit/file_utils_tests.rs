/*!
 * Tests for file utilities
 */

use std::fs;
use std::path::{Path, PathBuf};

use mdtrans::file_utils::FileManager;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_file_exists_withFileAndDirectory_shouldOnlyAcceptFiles() {
    let dir = create_temp_dir().unwrap();
    let file = create_test_file(dir.path(), "a.md", "# A").unwrap();

    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::file_exists(dir.path()));
    assert!(!FileManager::file_exists(dir.path().join("missing.md")));
}

#[test]
fn test_writeAtomic_withNestedDirectory_shouldCreateParents() {
    let dir = create_temp_dir().unwrap();
    let target = dir.path().join("deep").join("er").join("out.md");

    FileManager::write_atomic(&target, "Hallo").unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "Hallo");
    // No temporary file is left behind
    assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
}

#[test]
fn test_generateOutputPath_withVariousInputs_shouldKeepDirectory() {
    assert_eq!(
        FileManager::generate_output_path("docs/guide.md", "pt"),
        PathBuf::from("docs/guide.pt.md")
    );
    assert_eq!(
        FileManager::generate_output_path(Path::new("README"), "de"),
        PathBuf::from("README.de.md")
    );
    assert_eq!(
        FileManager::generate_output_path("notes.markdown", "ja"),
        PathBuf::from("notes.ja.markdown")
    );
}

#[test]
fn test_loadGlossary_withKeepEntry_shouldLoad() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "g.json", r#"{"Rust": "KEEP", "crate": "Kiste"}"#).unwrap();

    let glossary = FileManager::load_glossary(&path).unwrap();

    assert_eq!(glossary.len(), 2);
    assert!(glossary.entries().iter().any(|e| e.source == "Rust" && e.keeps_source()));
}

#[test]
fn test_loadGlossary_withArrayJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "g.json", r#"["Rust"]"#).unwrap();
    assert!(FileManager::load_glossary(&path).is_err());
}

#[test]
fn test_readToString_withMissingFile_shouldNameThePath() {
    let err = FileManager::read_to_string("/definitely/not/here.md").unwrap_err();
    assert!(err.to_string().contains("here.md"));
}
