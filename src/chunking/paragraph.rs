use crate::config::{PageBreakPolicy, StructureConfig};
use crate::filter::clean_content;
use crate::types::ClassifiedFragment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Line height multiplier applied to a font size
const LINE_HEIGHT_FACTOR: f64 = 1.2;
/// Font size assumed when neither the fragment nor the document has one
const FALLBACK_FONT_SIZE: f64 = 12.0;

/// Separator between paragraphs in a node's assembled text
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Where one fragment's text sits inside an assembled string (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub start: usize,
    pub end: usize,
    pub page: u32,
    pub fragment: usize,
}

/// Contiguous body fragments merged into one paragraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphUnit {
    pub text: String,
    pub pages: BTreeSet<u32>,
    pub spans: Vec<PageSpan>,
}

impl ParagraphUnit {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Indices of the fragments merged into this paragraph
    pub fn fragments(&self) -> impl Iterator<Item = usize> + '_ {
        self.spans.iter().map(|span| span.fragment)
    }
}

/// Merges a node's body fragments into paragraphs.
///
/// Pure and order preserving; sizes are the packer's concern.
pub struct ParagraphAssembler {
    page_break_policy: PageBreakPolicy,
    gap_ratio: f64,
    body_font_size: Option<f64>,
}

impl ParagraphAssembler {
    pub fn new(config: &StructureConfig) -> Self {
        Self {
            page_break_policy: config.page_break_policy,
            gap_ratio: config.paragraph_gap_ratio,
            body_font_size: None,
        }
    }

    /// Line height fallback for fragments without a font size
    pub fn with_body_font_size(mut self, size: Option<f64>) -> Self {
        self.body_font_size = size;
        self
    }

    /// Group `body` into paragraphs in page, top-to-bottom, left-to-right order
    pub fn assemble(&self, body: &[&ClassifiedFragment]) -> Vec<ParagraphUnit> {
        let mut ordered: Vec<&ClassifiedFragment> = body.to_vec();
        ordered.sort_by(|a, b| {
            let (fa, fb) = (&a.fragment, &b.fragment);
            fa.page
                .cmp(&fb.page)
                .then(fa.bbox.y0.total_cmp(&fb.bbox.y0))
                .then(fa.bbox.x0.total_cmp(&fb.bbox.x0))
        });

        let mut paragraphs = Vec::new();
        let mut current: Option<ParagraphUnit> = None;
        let mut previous: Option<&ClassifiedFragment> = None;

        for item in ordered {
            let text = clean_content(&item.fragment.content);
            if text.is_empty() {
                continue;
            }

            let starts_paragraph = previous.is_none_or(|prev| self.is_break(prev, item));
            if starts_paragraph && let Some(done) = current.take() {
                paragraphs.push(done);
            }

            let unit = current.get_or_insert_with(|| ParagraphUnit {
                text: String::new(),
                pages: BTreeSet::new(),
                spans: Vec::new(),
            });
            if !unit.text.is_empty() && !unit.text.ends_with(char::is_whitespace) {
                unit.text.push(' ');
            }
            let start = unit.text.len();
            unit.text.push_str(&text);
            unit.spans.push(PageSpan {
                start,
                end: unit.text.len(),
                page: item.fragment.page,
                fragment: item.index,
            });
            unit.pages.insert(item.fragment.page);

            previous = Some(item);
        }

        paragraphs.extend(current);
        paragraphs
    }

    fn is_break(&self, prev: &ClassifiedFragment, next: &ClassifiedFragment) -> bool {
        let (prev, next) = (&prev.fragment, &next.fragment);

        if prev.page != next.page {
            return match self.page_break_policy {
                PageBreakPolicy::Always => true,
                PageBreakPolicy::Never => false,
                PageBreakPolicy::Sentence => ends_sentence(&prev.content),
            };
        }

        let font_size = prev
            .font_size
            .or(self.body_font_size)
            .unwrap_or(FALLBACK_FONT_SIZE);
        let gap = next.bbox.y0 - prev.bbox.y1;
        gap > self.gap_ratio * LINE_HEIGHT_FACTOR * font_size
    }
}

/// Terminal punctuation, optionally followed by closing quotes or brackets
fn ends_sentence(text: &str) -> bool {
    let trimmed = text
        .trim_end()
        .trim_end_matches(['"', '\'', '”', '’', ')', ']']);
    trimmed.ends_with(['.', '!', '?', ':', ';'])
}

/// Paragraph texts joined by blank lines, with spans shifted to match
pub fn join_paragraphs(paragraphs: &[ParagraphUnit]) -> (String, Vec<PageSpan>) {
    let mut text = String::new();
    let mut spans = Vec::new();

    for (i, paragraph) in paragraphs.iter().enumerate() {
        if i > 0 {
            text.push_str(PARAGRAPH_SEPARATOR);
        }
        let offset = text.len();
        text.push_str(&paragraph.text);
        spans.extend(paragraph.spans.iter().map(|span| PageSpan {
            start: span.start + offset,
            end: span.end + offset,
            ..*span
        }));
    }

    (text, spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, DetectionSource, Fragment, Role};

    fn body(index: usize, content: &str, page: u32, y: f64) -> ClassifiedFragment {
        ClassifiedFragment {
            index,
            fragment: Fragment::new(content, page, BoundingBox::new(72.0, y, 540.0, y + 12.0))
                .with_font_size(10.0),
            role: Role::BodyText,
            source: DetectionSource::Default,
        }
    }

    fn assembler(policy: PageBreakPolicy) -> ParagraphAssembler {
        let config = StructureConfig {
            page_break_policy: policy,
            ..Default::default()
        };
        ParagraphAssembler::new(&config)
    }

    fn texts(paragraphs: &[ParagraphUnit]) -> Vec<&str> {
        paragraphs.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_consecutive_lines_join_with_space() {
        let a = body(0, "The first line", 1, 100.0);
        let b = body(1, "continues here.", 1, 113.0);
        let paragraphs = assembler(PageBreakPolicy::Sentence).assemble(&[&a, &b]);
        assert_eq!(texts(&paragraphs), vec!["The first line continues here."]);
        assert_eq!(paragraphs[0].fragments().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_vertical_gap_breaks_paragraph() {
        let a = body(0, "First paragraph.", 1, 100.0);
        let b = body(1, "Second paragraph.", 1, 140.0);
        let paragraphs = assembler(PageBreakPolicy::Sentence).assemble(&[&a, &b]);
        assert_eq!(texts(&paragraphs), vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn test_sorted_by_position() {
        let lower = body(0, "world", 1, 113.0);
        let upper = body(1, "hello", 1, 100.0);
        let paragraphs = assembler(PageBreakPolicy::Sentence).assemble(&[&lower, &upper]);
        assert_eq!(texts(&paragraphs), vec!["hello world"]);
    }

    #[test]
    fn test_page_break_policies() {
        let end_open = body(0, "a sentence that runs", 1, 700.0);
        let continued = body(1, "onto the next page.", 2, 72.0);
        let next = body(2, "New thought.", 3, 72.0);
        let items = [&end_open, &continued, &next];

        let sentence = assembler(PageBreakPolicy::Sentence).assemble(&items);
        assert_eq!(
            texts(&sentence),
            vec!["a sentence that runs onto the next page.", "New thought."]
        );
        assert_eq!(sentence[0].pages.iter().copied().collect::<Vec<_>>(), vec![1, 2]);

        let always = assembler(PageBreakPolicy::Always).assemble(&items);
        assert_eq!(always.len(), 3);

        let never = assembler(PageBreakPolicy::Never).assemble(&items);
        assert_eq!(never.len(), 1);
    }

    #[test]
    fn test_whitespace_normalized_and_blank_skipped() {
        let a = body(0, "  spaced \n text ", 1, 100.0);
        let blank = body(1, "   ", 1, 113.0);
        let paragraphs = assembler(PageBreakPolicy::Sentence).assemble(&[&a, &blank]);
        assert_eq!(texts(&paragraphs), vec!["spaced text"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(assembler(PageBreakPolicy::Sentence).assemble(&[]).is_empty());
    }

    #[test]
    fn test_ends_sentence() {
        assert!(ends_sentence("Done."));
        assert!(ends_sentence("He said \"stop!\" "));
        assert!(ends_sentence("(see above.)"));
        assert!(!ends_sentence("and then"));
    }

    #[test]
    fn test_join_paragraphs_shifts_spans() {
        let a = body(0, "One.", 1, 100.0);
        let b = body(1, "Two.", 2, 100.0);
        let paragraphs = assembler(PageBreakPolicy::Always).assemble(&[&a, &b]);
        let (text, spans) = join_paragraphs(&paragraphs);
        assert_eq!(text, "One.\n\nTwo.");
        assert_eq!(&text[spans[1].start..spans[1].end], "Two.");
        assert_eq!(spans[1].page, 2);
    }
}
