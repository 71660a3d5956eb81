/// Configuration system for pdf-rag-chunker
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
///
/// Unknown keys are rejected at every level so a typo never silently falls
/// back to a default.
use crate::error::{ChunkerError, ConfigError};
use crate::types::HeadingLevel;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Extraction collaborator settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Structure classification settings
    #[serde(default)]
    pub structure: StructureConfig,

    /// Noise filtering and crop region settings
    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Chunk packing settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Persistence settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Extraction engine that produced the fragment stream ("pymupdf", "pdfplumber", ...)
    #[serde(default = "default_library")]
    pub library: String,

    /// Use bookmark metadata from the input when present
    #[serde(default = "default_true")]
    pub extract_metadata: bool,
}

/// Named heading pattern used by the regex tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadingPattern {
    pub name: String,
    pub level: HeadingLevel,
    pub pattern: String,
}

impl HeadingPattern {
    pub fn new(name: &str, level: HeadingLevel, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            level,
            pattern: pattern.to_string(),
        }
    }
}

/// Whether a page change ends the current paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageBreakPolicy {
    /// Every page change starts a new paragraph
    Always,
    /// Page changes never start a new paragraph
    Never,
    /// Page changes start a new paragraph only after terminal punctuation
    Sentence,
}

/// Structure classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureConfig {
    #[serde(default = "default_true")]
    pub use_bookmarks: bool,

    #[serde(default = "default_true")]
    pub use_heuristics: bool,

    #[serde(default = "default_true")]
    pub use_regex: bool,

    /// Absolute font size (points) at or above which a fragment looks like a heading
    #[serde(default = "default_font_size_threshold")]
    pub font_size_threshold: f64,

    /// Font size relative to the body size at or above which a fragment looks like a heading
    #[serde(default = "default_heading_size_ratio")]
    pub heading_size_ratio: f64,

    /// Maximum fraction of the page width a horizontally isolated heading may occupy
    #[serde(default = "default_heading_isolation_threshold")]
    pub heading_isolation_threshold: f64,

    /// Composite heuristic score a fragment must reach to become a heading
    #[serde(default = "default_heading_score_threshold")]
    pub heading_score_threshold: f64,

    /// Fragments longer than this are never heading candidates
    #[serde(default = "default_max_heading_chars")]
    pub max_heading_chars: usize,

    /// Heading level for bookmark level 1, 2, ...; deeper levels reuse the last entry
    #[serde(default = "default_bookmark_levels")]
    pub bookmark_levels: Vec<HeadingLevel>,

    #[serde(default = "default_page_break_policy")]
    pub page_break_policy: PageBreakPolicy,

    /// Vertical gap, in line heights, that separates two paragraphs
    #[serde(default = "default_paragraph_gap_ratio")]
    pub paragraph_gap_ratio: f64,

    /// Ordered patterns for the regex tier; the first match wins
    #[serde(default = "default_heading_patterns")]
    pub heading_patterns: Vec<HeadingPattern>,
}

/// Cleaning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleaningConfig {
    /// Section titles whose whole subtree is dropped
    #[serde(default = "default_exclude_sections")]
    pub exclude_sections: Vec<String>,

    /// Fragments whose whole text equals one of these, ignoring case, are dropped
    #[serde(default)]
    pub exclude_exact_blocks: Vec<String>,

    /// Fragments matching any of these patterns are dropped
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Pages whose fragments are dropped
    #[serde(default)]
    pub exclude_pages: Vec<u32>,

    #[serde(default)]
    pub crop_top_percent: f64,

    #[serde(default = "default_crop_bottom_percent")]
    pub crop_bottom_percent: f64,

    #[serde(default)]
    pub crop_left_percent: f64,

    #[serde(default)]
    pub crop_right_percent: f64,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Hard upper bound on chunk length in characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Characters of the previous chunk repeated at the start of the next
    #[serde(default)]
    pub chunk_overlap: usize,

    #[serde(default = "default_true")]
    pub split_by_paragraph: bool,

    #[serde(default = "default_true")]
    pub split_by_sentence: bool,

    #[serde(default = "default_true")]
    pub split_by_word: bool,

    /// Sentence boundary; capture group 1 marks the separator between sentences
    #[serde(default = "default_sentence_boundary_pattern")]
    pub sentence_boundary_pattern: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Write a metadata.json next to each node's chunks
    #[serde(default = "default_true")]
    pub create_metadata: bool,

    /// Write the root index.json manifest
    #[serde(default = "default_true")]
    pub create_index: bool,

    /// Write report.json with filter, structure and chunking statistics
    #[serde(default = "default_true")]
    pub create_report: bool,

    /// Mirror the structure tree as directories instead of flat file names
    #[serde(default = "default_true")]
    pub preserve_structure: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_library() -> String {
    "pymupdf".to_string()
}

fn default_font_size_threshold() -> f64 {
    14.0
}

fn default_heading_size_ratio() -> f64 {
    1.2
}

fn default_heading_isolation_threshold() -> f64 {
    0.7
}

fn default_heading_score_threshold() -> f64 {
    0.6
}

fn default_max_heading_chars() -> usize {
    200
}

fn default_bookmark_levels() -> Vec<HeadingLevel> {
    vec![HeadingLevel::Chapter, HeadingLevel::Section]
}

fn default_page_break_policy() -> PageBreakPolicy {
    PageBreakPolicy::Sentence
}

fn default_paragraph_gap_ratio() -> f64 {
    1.0
}

fn default_heading_patterns() -> Vec<HeadingPattern> {
    vec![
        HeadingPattern::new(
            "part",
            HeadingLevel::Part,
            r"^(?:Part|PART)\s+([IVXLC]+|[0-9]+)[\s:.]*(.*)$",
        ),
        HeadingPattern::new(
            "chapter",
            HeadingLevel::Chapter,
            r"^(?:Chapter|CHAPTER)\s+([0-9]+)[\s:.]*(.*)$",
        ),
        HeadingPattern::new(
            "subsection",
            HeadingLevel::Section,
            r"^([0-9]+\.[0-9]+\.[0-9]+)\s+(.*)$",
        ),
        HeadingPattern::new("section", HeadingLevel::Section, r"^([0-9]+\.[0-9]+)\s+(.*)$"),
    ]
}

fn default_exclude_sections() -> Vec<String> {
    vec![
        "Index".to_string(),
        "Bibliography".to_string(),
        "Appendix".to_string(),
        "References".to_string(),
    ]
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        r"^\s*[Pp]age\s+\d+(\s+of\s+\d+)?\s*$".to_string(),
        r"^\s*$".to_string(),
        r"^\s*-{3,}\s*$".to_string(),
    ]
}

fn default_crop_bottom_percent() -> f64 {
    5.0
}

fn default_max_chunk_size() -> usize {
    800
}

fn default_sentence_boundary_pattern() -> String {
    r#"[.!?]["'”’)\]]*(\s+)\p{Lu}"#.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output/")
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            library: default_library(),
            extract_metadata: true,
        }
    }
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            use_bookmarks: true,
            use_heuristics: true,
            use_regex: true,
            font_size_threshold: default_font_size_threshold(),
            heading_size_ratio: default_heading_size_ratio(),
            heading_isolation_threshold: default_heading_isolation_threshold(),
            heading_score_threshold: default_heading_score_threshold(),
            max_heading_chars: default_max_heading_chars(),
            bookmark_levels: default_bookmark_levels(),
            page_break_policy: default_page_break_policy(),
            paragraph_gap_ratio: default_paragraph_gap_ratio(),
            heading_patterns: default_heading_patterns(),
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            exclude_sections: default_exclude_sections(),
            exclude_exact_blocks: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
            exclude_pages: Vec::new(),
            crop_top_percent: 0.0,
            crop_bottom_percent: default_crop_bottom_percent(),
            crop_left_percent: 0.0,
            crop_right_percent: 0.0,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            chunk_overlap: 0,
            split_by_paragraph: true,
            split_by_sentence: true,
            split_by_word: true,
            sentence_boundary_pattern: default_sentence_boundary_pattern(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            create_metadata: true,
            create_index: true,
            create_report: true,
            preserve_structure: true,
        }
    }
}

impl ChunkingConfig {
    /// Budget for chunks after the first once the overlap prefix is reserved
    pub fn continuation_budget(&self) -> usize {
        self.max_chunk_size.saturating_sub(self.chunk_overlap)
    }
}

/// Serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn compile_pattern(key: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        key: key.to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn check_percent(key: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("must be between 0 and 100, got {}", value),
        });
    }
    Ok(())
}

impl PipelineConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self, ChunkerError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: PipelineConfig = match format {
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?,
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(format!("Invalid JSON: {}", e)))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or defaults when none is given
    pub fn load(path: Option<&Path>) -> Result<Self, ChunkerError> {
        match path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)
            }
            None => {
                tracing::info!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to file, in the format implied by its extension
    pub fn save(&self, path: &Path) -> Result<(), ChunkerError> {
        let format = ConfigFormat::from_path(path)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = match format {
            ConfigFormat::Toml => self.to_toml_string()?,
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to serialize config: {}", e))
            })?,
        };

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ChunkerError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)).into())
    }

    /// Validate configuration values; every error here is fatal and must
    /// surface before any document is processed
    pub fn validate(&self) -> Result<(), ChunkerError> {
        if self.extraction.library.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "extraction.library".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        let structure = &self.structure;
        if !structure.use_bookmarks && !structure.use_heuristics && !structure.use_regex {
            return Err(ConfigError::NoClassificationMethod.into());
        }

        if !(0.0..=1.0).contains(&structure.heading_isolation_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "structure.heading_isolation_threshold".to_string(),
                reason: format!(
                    "must be between 0.0 and 1.0, got {}",
                    structure.heading_isolation_threshold
                ),
            }
            .into());
        }

        if structure.font_size_threshold <= 0.0 || structure.heading_size_ratio <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "structure.font_size_threshold".to_string(),
                reason: "font size thresholds must be positive".to_string(),
            }
            .into());
        }

        if structure.paragraph_gap_ratio < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "structure.paragraph_gap_ratio".to_string(),
                reason: "must not be negative".to_string(),
            }
            .into());
        }

        if structure.use_bookmarks && structure.bookmark_levels.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "structure.bookmark_levels".to_string(),
                reason: "must name at least one level when bookmarks are used".to_string(),
            }
            .into());
        }

        for pattern in &structure.heading_patterns {
            compile_pattern(
                &format!("structure.heading_patterns.{}", pattern.name),
                &pattern.pattern,
            )?;
        }

        let cleaning = &self.cleaning;
        check_percent("cleaning.crop_top_percent", cleaning.crop_top_percent)?;
        check_percent("cleaning.crop_bottom_percent", cleaning.crop_bottom_percent)?;
        check_percent("cleaning.crop_left_percent", cleaning.crop_left_percent)?;
        check_percent("cleaning.crop_right_percent", cleaning.crop_right_percent)?;

        if cleaning.crop_top_percent + cleaning.crop_bottom_percent >= 100.0 {
            return Err(ConfigError::InvalidValue {
                key: "cleaning.crop_top_percent".to_string(),
                reason: "top and bottom crop together must leave part of the page".to_string(),
            }
            .into());
        }

        if cleaning.crop_left_percent + cleaning.crop_right_percent >= 100.0 {
            return Err(ConfigError::InvalidValue {
                key: "cleaning.crop_left_percent".to_string(),
                reason: "left and right crop together must leave part of the page".to_string(),
            }
            .into());
        }

        for pattern in &cleaning.exclude_patterns {
            compile_pattern("cleaning.exclude_patterns", pattern)?;
        }

        let chunking = &self.chunking;
        if chunking.max_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.max_chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if chunking.chunk_overlap >= chunking.max_chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_overlap".to_string(),
                reason: format!(
                    "must be less than max_chunk_size ({}), got {}",
                    chunking.max_chunk_size, chunking.chunk_overlap
                ),
            }
            .into());
        }

        compile_pattern(
            "chunking.sentence_boundary_pattern",
            &chunking.sentence_boundary_pattern,
        )?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("PDF_RAG_MAX_CHUNK_SIZE")
            && let Ok(size) = size.parse()
        {
            self.chunking.max_chunk_size = size;
        }

        if let Ok(overlap) = std::env::var("PDF_RAG_CHUNK_OVERLAP")
            && let Ok(overlap) = overlap.parse()
        {
            self.chunking.chunk_overlap = overlap;
        }

        if let Ok(dir) = std::env::var("PDF_RAG_OUTPUT_DIR") {
            self.output.output_dir = PathBuf::from(dir);
        }

        if let Ok(flag) = std::env::var("PDF_RAG_USE_BOOKMARKS")
            && let Ok(flag) = flag.parse()
        {
            self.structure.use_bookmarks = flag;
        }
    }
}
