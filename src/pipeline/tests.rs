use super::*;
use crate::chunking::reconstruct;
use crate::types::{Bookmark, BoundingBox, Fragment};

fn line(content: &str, page: u32, y: f64) -> Fragment {
    Fragment::new(content, page, BoundingBox::new(72.0, y, 540.0, y + 12.0)).with_font("Times", 11.0)
}

fn regex_only() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.structure.use_heuristics = false;
    config
}

fn book() -> DocumentInput {
    DocumentInput::new(
        "book.pdf",
        vec![
            line("Chapter 1: Getting Started", 1, 100.0),
            line("The first paragraph explains the basics.", 1, 130.0),
            line("1.1 Installation", 1, 170.0),
            line("Run the installer and follow the prompts.", 1, 200.0),
            line("Chapter 2: Usage", 2, 100.0),
            line("Open a document to begin.", 2, 130.0),
        ],
    )
}

#[test]
fn test_process_builds_nodes_in_tree_order() {
    let pipeline = DocumentPipeline::new(regex_only()).unwrap();
    let doc = pipeline.process(&book()).unwrap();

    assert!(doc.input_error.is_none());
    assert_eq!(doc.source, "book.pdf");
    assert_eq!(doc.total_pages, 2);
    assert_eq!(doc.root().kind, NodeKind::Document);
    assert!(doc.root().chunks.is_empty());

    let kinds: Vec<NodeKind> = doc.nodes.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Document,
            NodeKind::Part,
            NodeKind::Chapter,
            NodeKind::Section,
            NodeKind::Chapter,
        ]
    );
    assert!(doc.nodes[1].implicit);
    assert_eq!(doc.nodes[1].path, "");

    let section = doc.find_node("1.1 Installation").unwrap();
    assert_eq!(section.path, "chapter_1_getting_started/1_1_installation");
    assert_eq!(section.chunk_count(), 1);
    let chunk = &section.chunks[0];
    assert_eq!(chunk.content, "Run the installer and follow the prompts.");
    assert_eq!(chunk.sequence, 0);
    assert_eq!(chunk.pages, vec![1]);
    assert_eq!(chunk.node_path, section.path);
    assert_eq!(
        chunk.heading_path,
        vec!["Chapter 1: Getting Started".to_string(), "1.1 Installation".to_string()]
    );

    assert_eq!(doc.total_chunks(), 3);
    assert_eq!(doc.chunking_stats.total_chunks, 3);
    assert_eq!(doc.structure_stats.chapters_found, 2);
    assert_eq!(doc.structure_stats.sections_found, 1);
}

#[test]
fn test_heading_text_never_appears_in_chunks() {
    let pipeline = DocumentPipeline::new(regex_only()).unwrap();
    let doc = pipeline.process(&book()).unwrap();

    for chunk in doc.chunks() {
        assert!(!chunk.content.contains("Chapter 1"));
        assert!(!chunk.content.contains("1.1 Installation"));
    }
}

#[test]
fn test_footer_excluded_from_chunks() {
    let mut input = book();
    input
        .fragments
        .push(Fragment::new("Confidential draft", 2, BoundingBox::new(72.0, 770.0, 300.0, 782.0)));

    let doc = DocumentPipeline::new(regex_only()).unwrap().process(&input).unwrap();
    assert_eq!(doc.structure_stats.footers, 1);
    assert!(doc.chunks().all(|c| !c.content.contains("Confidential")));
}

#[test]
fn test_invalid_stream_degrades_to_empty_root() {
    let input = DocumentInput::new("broken.pdf", vec![line("Orphan text", 0, 100.0)]);
    let doc = DocumentPipeline::new(PipelineConfig::default())
        .unwrap()
        .process(&input)
        .unwrap();

    assert!(doc.input_error.is_some());
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.total_chunks(), 0);
    assert!(doc.classified.is_empty());
}

#[test]
fn test_empty_stream_yields_root_only() {
    let input = DocumentInput::new("empty.pdf", Vec::new());
    let doc = DocumentPipeline::new(PipelineConfig::default())
        .unwrap()
        .process(&input)
        .unwrap();

    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.total_chunks(), 0);
}

#[test]
fn test_excluded_section_produces_no_chunks() {
    let input = DocumentInput::new(
        "paper.pdf",
        vec![
            line("Introduction", 1, 100.0),
            line("This paper studies chunking.", 1, 130.0),
            line("Bibliography", 2, 100.0),
            line("Smith, J. A book about text.", 2, 130.0),
        ],
    )
    .with_bookmarks(vec![
        Bookmark::new(1, "Introduction", 1),
        Bookmark::new(1, "Bibliography", 2),
    ]);

    let doc = DocumentPipeline::new(regex_only()).unwrap().process(&input).unwrap();
    assert!(doc.find_node("Bibliography").is_none());
    assert!(doc.chunks().all(|c| !c.content.contains("Smith")));

    let intro = doc.find_node("introduction").unwrap();
    assert_eq!(intro.chunks[0].content, "This paper studies chunking.");
}

#[test]
fn test_overlap_reconstructs_node_text() {
    let mut config = regex_only();
    config.chunking.max_chunk_size = 40;
    config.chunking.chunk_overlap = 8;

    let input = DocumentInput::new(
        "overlap.pdf",
        vec![
            line("Alpha beta gamma delta epsilon zeta eta theta.", 1, 100.0),
            line("Iota kappa lambda mu nu xi omicron pi rho.", 1, 140.0),
        ],
    );
    let doc = DocumentPipeline::new(config).unwrap().process(&input).unwrap();
    let chunks = &doc.root().chunks;

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.char_count <= 40));
    assert_eq!(chunks[0].overlap_chars, 0);
    assert!(chunks[1..].iter().all(|c| c.overlap_chars == 8));
    assert_eq!(
        reconstruct(chunks),
        "Alpha beta gamma delta epsilon zeta eta theta.\n\nIota kappa lambda mu nu xi omicron pi rho."
    );
}

#[test]
fn test_process_is_deterministic() {
    let pipeline = DocumentPipeline::new(PipelineConfig::default()).unwrap();
    let first = pipeline.process(&book()).unwrap();
    let second = pipeline.process(&book()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.source_digest.len(), 64);
}

#[test]
fn test_digest_tracks_content() {
    let pipeline = DocumentPipeline::new(regex_only()).unwrap();
    let original = pipeline.process(&book()).unwrap();

    let mut changed = book();
    changed.fragments[1].content.push_str(" Extra.");
    let changed = pipeline.process(&changed).unwrap();
    assert_ne!(original.source_digest, changed.source_digest);
}

#[test]
fn test_invalid_config_rejected_before_processing() {
    let mut config = PipelineConfig::default();
    config.chunking.chunk_overlap = config.chunking.max_chunk_size;

    let result = DocumentPipeline::new(config);
    assert!(matches!(result, Err(ChunkerError::Config(_))));
}

#[test]
fn test_cancelled_before_start() {
    let flag = Arc::new(AtomicBool::new(true));
    let pipeline = DocumentPipeline::new(PipelineConfig::default())
        .unwrap()
        .with_cancellation_flag(flag);

    let result = pipeline.process(&book());
    assert!(matches!(result, Err(ChunkerError::Cancelled(ref source)) if source == "book.pdf"));
}

#[test]
fn test_process_batch_keeps_input_order() {
    let pipeline = DocumentPipeline::new(regex_only()).unwrap();
    let mut second = book();
    second.source = "second.pdf".to_string();
    let inputs = vec![
        book(),
        DocumentInput::new("broken.pdf", vec![line("x", 0, 100.0)]),
        second,
    ];

    let results = pipeline.process_batch(&inputs);
    let sources: Vec<String> = results
        .iter()
        .map(|r| r.as_ref().unwrap().source.clone())
        .collect();
    assert_eq!(sources, vec!["book.pdf", "broken.pdf", "second.pdf"]);
    assert!(results[1].as_ref().unwrap().input_error.is_some());
}
