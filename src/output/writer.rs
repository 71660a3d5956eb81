use crate::config::OutputConfig;
use crate::error::{ChunkerError, OutputError};
use crate::pipeline::{ChunkedDocument, ChunkedNode};
use crate::structure::NodeKind;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Separator replacing `/` in flattened file names
const FLAT_SEPARATOR: &str = "__";

/// What a write produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub chunks_written: usize,
    pub metadata_files: usize,
    pub index_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

/// Per-node `metadata.json` contents
#[derive(Debug, Clone, Serialize)]
struct NodeMetadata<'a> {
    source: &'a str,
    kind: NodeKind,
    title: Option<&'a str>,
    path: &'a str,
    heading_path: &'a [String],
    chunk_count: usize,
    char_count: usize,
    pages: &'a [u32],
    page_range: Option<(u32, u32)>,
    chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Clone, Serialize)]
struct ChunkRecord {
    file: String,
    sequence: usize,
    char_count: usize,
    pages: Vec<u32>,
    overlap_chars: usize,
}

/// Persists chunk files, node metadata and the index manifest
pub struct OutputWriter {
    create_metadata: bool,
    create_index: bool,
    create_report: bool,
    preserve_structure: bool,
}

impl OutputWriter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            create_metadata: config.create_metadata,
            create_index: config.create_index,
            create_report: config.create_report,
            preserve_structure: config.preserve_structure,
        }
    }

    /// Write one document below `dir`
    pub fn write(&self, doc: &ChunkedDocument, dir: &Path) -> Result<WriteReport, ChunkerError> {
        create_dir(dir)?;
        let mut report = WriteReport::default();

        for node in doc.nodes.iter().filter(|n| !n.chunks.is_empty()) {
            let node_dir = if self.preserve_structure {
                let node_dir = dir.join(&node.path);
                create_dir(&node_dir)?;
                node_dir
            } else {
                dir.to_path_buf()
            };

            let mut records = Vec::with_capacity(node.chunks.len());
            for chunk in &node.chunks {
                let file = self.file_name(node, &format!("chunk_{:04}.txt", chunk.sequence));
                write_file(&node_dir.join(&file), &chunk.content)?;
                records.push(ChunkRecord {
                    file,
                    sequence: chunk.sequence,
                    char_count: chunk.char_count,
                    pages: chunk.pages.clone(),
                    overlap_chars: chunk.overlap_chars,
                });
            }
            report.chunks_written += records.len();

            if self.create_metadata {
                let metadata = NodeMetadata {
                    source: &doc.source,
                    kind: node.kind,
                    title: node.title.as_deref(),
                    path: &node.path,
                    heading_path: node
                        .chunks
                        .first()
                        .map(|c| c.heading_path.as_slice())
                        .unwrap_or_default(),
                    chunk_count: node.chunk_count(),
                    char_count: node.char_count(),
                    pages: &node.pages,
                    page_range: node.page_range,
                    chunks: records,
                };
                let path = node_dir.join(self.file_name(node, "metadata.json"));
                write_file(&path, &to_json("node metadata", &metadata)?)?;
                report.metadata_files += 1;
            }
        }

        if self.create_index {
            let path = dir.join("index.json");
            write_file(&path, &to_json("index manifest", &doc.manifest())?)?;
            report.index_path = Some(path);
        }

        if self.create_report {
            let path = dir.join("report.json");
            write_file(&path, &to_json("processing report", &doc.report())?)?;
            report.report_path = Some(path);
        }

        tracing::info!(
            "Wrote {} chunks and {} metadata files for '{}' to {}",
            report.chunks_written,
            report.metadata_files,
            doc.source,
            dir.display()
        );
        Ok(report)
    }

    fn file_name(&self, node: &ChunkedNode, name: &str) -> String {
        if self.preserve_structure || node.path.is_empty() {
            name.to_string()
        } else {
            format!(
                "{}{}{}",
                node.path.replace('/', FLAT_SEPARATOR),
                FLAT_SEPARATOR,
                name
            )
        }
    }
}

fn create_dir(path: &Path) -> Result<(), ChunkerError> {
    fs::create_dir_all(path).map_err(|e| {
        OutputError::DirectoryCreationFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), ChunkerError> {
    fs::write(path, content).map_err(|e| {
        OutputError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn to_json<T: Serialize>(what: &str, value: &T) -> Result<String, ChunkerError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        OutputError::SerializationFailed {
            what: what.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::DocumentPipeline;
    use crate::types::{BoundingBox, DocumentInput, Fragment};
    use tempfile::TempDir;

    fn line(content: &str, page: u32, y: f64) -> Fragment {
        Fragment::new(content, page, BoundingBox::new(72.0, y, 540.0, y + 12.0))
    }

    fn document() -> ChunkedDocument {
        let mut config = PipelineConfig::default();
        config.structure.use_heuristics = false;
        let input = DocumentInput::new(
            "guide.pdf",
            vec![
                line("Preface text before any chapter.", 1, 100.0),
                line("Chapter 1: Setup", 1, 150.0),
                line("Install the tools first.", 1, 180.0),
                line("1.1 Requirements", 2, 100.0),
                line("A recent compiler.", 2, 130.0),
            ],
        );
        DocumentPipeline::new(config).unwrap().process(&input).unwrap()
    }

    #[test]
    fn test_write_preserves_structure() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(&OutputConfig::default());
        let report = writer.write(&document(), dir.path()).unwrap();

        assert_eq!(report.chunks_written, 3);
        assert_eq!(report.metadata_files, 3);
        assert_eq!(report.index_path, Some(dir.path().join("index.json")));

        let root_chunk = fs::read_to_string(dir.path().join("chunk_0000.txt")).unwrap();
        assert_eq!(root_chunk, "Preface text before any chapter.");

        let section = dir.path().join("chapter_1_setup/1_1_requirements");
        assert_eq!(fs::read_to_string(section.join("chunk_0000.txt")).unwrap(), "A recent compiler.");

        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(section.join("metadata.json")).unwrap()).unwrap();
        assert_eq!(metadata["kind"], "section");
        assert_eq!(metadata["chunk_count"], 1);
        assert_eq!(metadata["chunks"][0]["file"], "chunk_0000.txt");
        assert_eq!(metadata["heading_path"][1], "1.1 Requirements");

        let index: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("index.json")).unwrap()).unwrap();
        assert_eq!(index["source"], "guide.pdf");
        assert_eq!(index["total_chunks"], 3);

        assert_eq!(report.report_path, Some(dir.path().join("report.json")));
        let processing: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
        assert_eq!(processing["source"], "guide.pdf");
        assert_eq!(processing["structure"]["chapters_found"], 1);
        assert_eq!(processing["structure"]["sections_found"], 1);
        assert_eq!(processing["chunking"]["total_chunks"], 3);
        assert_eq!(processing["filter"]["fragments_input"], 5);
        assert!(processing.get("input_error").is_none());
    }

    #[test]
    fn test_write_flattened() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            preserve_structure: false,
            ..OutputConfig::default()
        };
        OutputWriter::new(&config).write(&document(), dir.path()).unwrap();

        assert!(dir.path().join("chunk_0000.txt").exists());
        assert!(dir.path().join("chapter_1_setup__chunk_0000.txt").exists());
        assert!(
            dir.path()
                .join("chapter_1_setup__1_1_requirements__chunk_0000.txt")
                .exists()
        );
        assert!(
            dir.path()
                .join("chapter_1_setup__1_1_requirements__metadata.json")
                .exists()
        );
        assert!(!dir.path().join("chapter_1_setup").exists());
    }

    #[test]
    fn test_write_without_metadata_or_index() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            create_metadata: false,
            create_index: false,
            create_report: false,
            ..OutputConfig::default()
        };
        let report = OutputWriter::new(&config).write(&document(), dir.path()).unwrap();

        assert_eq!(report.chunks_written, 3);
        assert_eq!(report.metadata_files, 0);
        assert!(report.index_path.is_none());
        assert!(report.report_path.is_none());
        assert!(!dir.path().join("index.json").exists());
        assert!(!dir.path().join("report.json").exists());
        assert!(!dir.path().join("metadata.json").exists());
    }

    #[test]
    fn test_empty_document_writes_index_only() {
        let dir = TempDir::new().unwrap();
        let doc = DocumentPipeline::new(PipelineConfig::default())
            .unwrap()
            .process(&DocumentInput::new("empty.pdf", Vec::new()))
            .unwrap();
        let report = OutputWriter::new(&OutputConfig::default())
            .write(&doc, dir.path())
            .unwrap();

        assert_eq!(report.chunks_written, 0);
        assert!(dir.path().join("index.json").exists());
    }

    #[test]
    fn test_write_fails_on_file_in_place_of_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("out");
        fs::write(&blocker, "not a directory").unwrap();

        let result = OutputWriter::new(&OutputConfig::default()).write(&document(), &blocker);
        assert!(matches!(
            result,
            Err(ChunkerError::Output(OutputError::DirectoryCreationFailed { .. }))
        ));
    }
}
