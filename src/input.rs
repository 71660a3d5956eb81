//! Loading the fragment stream produced by the extraction collaborator

use crate::error::{ChunkerError, InputError};
use crate::types::DocumentInput;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read one document's fragment stream from a JSON file
pub fn load_document(path: &Path) -> Result<DocumentInput, ChunkerError> {
    if !path.exists() {
        return Err(InputError::FileNotFound(path.display().to_string()).into());
    }

    let content = std::fs::read_to_string(path)?;
    let mut input: DocumentInput =
        serde_json::from_str(&content).map_err(|e| InputError::ParseFailed {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if input.source.is_empty() {
        input.source = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
    }

    tracing::debug!(
        "Loaded {} fragments and {} bookmarks from {}",
        input.fragments.len(),
        input.bookmarks.len(),
        path.display()
    );

    Ok(input)
}

/// Find every `*.json` fragment stream below `root`, in a stable order
pub fn discover_inputs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        anyhow::bail!("Input directory does not exist: {:?}", root);
    }
    if !root.is_dir() {
        anyhow::bail!("Input path is not a directory: {:?}", root);
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_json = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    tracing::info!("Found {} fragment streams in {}", paths.len(), root.display());
    Ok(paths)
}

/// Check the stream against the extraction contract: pages are 1-indexed
/// and non-decreasing, boxes are well formed, font sizes are positive.
pub fn validate_stream(input: &DocumentInput) -> Result<(), InputError> {
    let mut previous = 0;
    for (index, fragment) in input.fragments.iter().enumerate() {
        if fragment.page == 0 {
            return Err(InputError::InvalidPage {
                index,
                page: fragment.page,
            });
        }
        if fragment.page < previous {
            return Err(InputError::NonMonotonicPages {
                index,
                page: fragment.page,
                previous,
            });
        }
        if !fragment.bbox.is_well_formed() {
            return Err(InputError::InvalidBoundingBox { index });
        }
        if fragment.font_size.is_some_and(|s| !(s.is_finite() && s > 0.0)) {
            return Err(InputError::InvalidFontSize { index });
        }
        previous = fragment.page;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Fragment};
    use tempfile::TempDir;

    fn fragment(page: u32) -> Fragment {
        Fragment::new("text", page, BoundingBox::new(10.0, 10.0, 100.0, 20.0))
    }

    #[test]
    fn test_load_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.json");
        let input = DocumentInput::new("book.pdf", vec![fragment(1), fragment(2)]);
        std::fs::write(&path, serde_json::to_string(&input).unwrap()).unwrap();

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded.source, "book.pdf");
        assert_eq!(loaded.fragments.len(), 2);
    }

    #[test]
    fn test_load_document_defaults_source_to_file_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manual.json");
        std::fs::write(&path, r#"{"source": "", "fragments": []}"#).unwrap();

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded.source, "manual");
    }

    #[test]
    fn test_load_document_missing_file() {
        let result = load_document(Path::new("/nonexistent/doc.json"));
        assert!(matches!(
            result.unwrap_err(),
            ChunkerError::Input(InputError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_document_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            load_document(&path).unwrap_err(),
            ChunkerError::Input(InputError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_discover_inputs_sorted_json_only() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("nested/c.JSON"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = discover_inputs(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.JSON"]);
    }

    #[test]
    fn test_discover_inputs_missing_dir() {
        assert!(discover_inputs(Path::new("/nonexistent/dir")).is_err());
    }

    #[test]
    fn test_validate_stream_ok() {
        let input = DocumentInput::new("doc", vec![fragment(1), fragment(1), fragment(3)]);
        assert!(validate_stream(&input).is_ok());
    }

    #[test]
    fn test_validate_stream_rejects_page_zero() {
        let input = DocumentInput::new("doc", vec![fragment(0)]);
        assert!(matches!(
            validate_stream(&input),
            Err(InputError::InvalidPage { index: 0, page: 0 })
        ));
    }

    #[test]
    fn test_validate_stream_rejects_backwards_pages() {
        let input = DocumentInput::new("doc", vec![fragment(2), fragment(1)]);
        assert!(matches!(
            validate_stream(&input),
            Err(InputError::NonMonotonicPages { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_stream_rejects_bad_font_size() {
        let input = DocumentInput::new("doc", vec![fragment(1).with_font_size(0.0)]);
        assert!(matches!(
            validate_stream(&input),
            Err(InputError::InvalidFontSize { index: 0 })
        ));
    }

    #[test]
    fn test_validate_stream_rejects_inverted_box() {
        let mut bad = fragment(1);
        bad.bbox = BoundingBox::new(100.0, 10.0, 10.0, 20.0);
        let input = DocumentInput::new("doc", vec![bad]);
        assert!(matches!(
            validate_stream(&input),
            Err(InputError::InvalidBoundingBox { index: 0 })
        ));
    }
}
