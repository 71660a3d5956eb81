//! Data model shared by every pipeline stage
//!
//! Coordinates are in page space with the origin at the top-left corner and
//! `y` increasing downward, matching the extraction collaborator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Width of a US Letter page in points, used when the input carries no page size
pub const DEFAULT_PAGE_WIDTH: f64 = 612.0;
/// Height of a US Letter page in points
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Axis-aligned bounding box of a fragment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Finite coordinates with `x0 <= x1` and `y0 <= y1`
    pub fn is_well_formed(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }

    /// Whether two boxes share a text line (their vertical spans overlap by
    /// at least half of the shorter one)
    pub fn shares_line_with(&self, other: &BoundingBox) -> bool {
        let overlap = self.y1.min(other.y1) - self.y0.max(other.y0);
        let shorter = self.height().min(other.height());
        if shorter <= 0.0 {
            return overlap >= 0.0;
        }
        overlap >= shorter / 2.0
    }
}

/// A single positioned piece of extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Fragment {
    /// Text content as extracted (may be blank)
    pub content: String,
    /// 1-indexed page number, non-decreasing across the stream
    pub page: u32,
    /// Position on the page
    pub bbox: BoundingBox,
    #[serde(default)]
    pub font_name: Option<String>,
    /// Font size in points, positive when present
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl Fragment {
    pub fn new(content: impl Into<String>, page: u32, bbox: BoundingBox) -> Self {
        Self {
            content: content.into(),
            page,
            bbox,
            font_name: None,
            font_size: None,
            bold: false,
            italic: false,
        }
    }

    pub fn with_font(mut self, name: impl Into<String>, size: f64) -> Self {
        self.font_name = Some(name.into());
        self.font_size = Some(size);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Number of characters in the content
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// One table-of-contents entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Bookmark {
    /// 1 is the outermost level
    pub level: u32,
    pub title: String,
    /// 1-indexed target page
    pub page: u32,
}

impl Bookmark {
    pub fn new(level: u32, title: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            title: title.into(),
            page,
        }
    }
}

/// Dimensions of a single page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageSize {
    pub page: u32,
    pub width: f64,
    pub height: f64,
}

/// Everything extraction hands over for one document
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DocumentInput {
    /// Source document identifier (usually the PDF file name)
    #[serde(default)]
    pub source: String,
    /// Page count reported by extraction; 0 when unknown
    #[serde(default)]
    pub total_pages: u32,
    /// Per-page dimensions; missing pages default to US Letter
    #[serde(default)]
    pub pages: Vec<PageSize>,
    /// Fragments in page order
    #[serde(default)]
    pub fragments: Vec<Fragment>,
    /// Table of contents in document order
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

impl DocumentInput {
    pub fn new(source: impl Into<String>, fragments: Vec<Fragment>) -> Self {
        Self {
            source: source.into(),
            fragments,
            ..Default::default()
        }
    }

    pub fn with_bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    pub fn with_page_size(mut self, page: u32, width: f64, height: f64) -> Self {
        self.pages.push(PageSize {
            page,
            width,
            height,
        });
        self
    }

    /// Width and height of `page`
    pub fn page_size(&self, page: u32) -> (f64, f64) {
        self.pages
            .iter()
            .find(|p| p.page == page)
            .map(|p| (p.width, p.height))
            .unwrap_or((DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT))
    }

    /// Reported page count, or the last fragment's page when that is larger
    pub fn page_count(&self) -> u32 {
        let last_fragment_page = self.fragments.iter().map(|f| f.page).max().unwrap_or(0);
        self.total_pages.max(last_fragment_page)
    }
}

/// Heading depth below the document root
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    Part,
    Chapter,
    Section,
}

impl HeadingLevel {
    /// Tree depth; the document root is 0
    pub fn depth(self) -> usize {
        match self {
            HeadingLevel::Part => 1,
            HeadingLevel::Chapter => 2,
            HeadingLevel::Section => 3,
        }
    }

    pub fn role(self) -> Role {
        match self {
            HeadingLevel::Part => Role::PartHeading,
            HeadingLevel::Chapter => Role::ChapterHeading,
            HeadingLevel::Section => Role::SectionHeading,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeadingLevel::Part => "part",
            HeadingLevel::Chapter => "chapter",
            HeadingLevel::Section => "section",
        }
    }
}

/// Structural role of a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    PartHeading,
    ChapterHeading,
    SectionHeading,
    BodyText,
    Header,
    Footer,
}

impl Role {
    pub fn heading_level(self) -> Option<HeadingLevel> {
        match self {
            Role::PartHeading => Some(HeadingLevel::Part),
            Role::ChapterHeading => Some(HeadingLevel::Chapter),
            Role::SectionHeading => Some(HeadingLevel::Section),
            Role::BodyText | Role::Header | Role::Footer => None,
        }
    }

    pub fn is_heading(self) -> bool {
        self.heading_level().is_some()
    }

    /// Running headers and footers
    pub fn is_page_furniture(self) -> bool {
        matches!(self, Role::Header | Role::Footer)
    }
}

/// Which tier of the cascade assigned a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Bookmark,
    Heuristic,
    Regex,
    Default,
}

/// A fragment with its assigned role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFragment {
    /// Position in the classified stream
    pub index: usize,
    pub fragment: Fragment,
    pub role: Role,
    pub source: DetectionSource,
}
