//! Bookmark-derived skeleton (the authoritative classification tier)

use crate::types::{Bookmark, Fragment, HeadingLevel};

/// One bookmark resolved against the fragment stream
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonEntry {
    pub level: HeadingLevel,
    pub title: String,
    /// Inclusive page range the bookmark covers
    pub page_range: (u32, u32),
    /// Fragment consumed as the heading, if one matched the title
    pub heading: Option<usize>,
    /// Stream position where the node opens
    pub position: usize,
}

/// Reason the bookmark list cannot be trusted, or `None` when it is usable
pub fn check_bookmarks(bookmarks: &[Bookmark], page_count: u32) -> Option<String> {
    let first = bookmarks.first()?;
    if first.level != 1 {
        return Some(format!("first bookmark has level {}, expected 1", first.level));
    }

    let mut previous: Option<&Bookmark> = None;
    for (i, bookmark) in bookmarks.iter().enumerate() {
        if bookmark.level == 0 {
            return Some(format!("bookmark {} has level 0", i));
        }
        if bookmark.page == 0 {
            return Some(format!("bookmark {} targets page 0", i));
        }
        if page_count > 0 && bookmark.page > page_count {
            return Some(format!(
                "bookmark {} targets page {} of {}",
                i, bookmark.page, page_count
            ));
        }
        if let Some(prev) = previous {
            if bookmark.level > prev.level.saturating_add(1) {
                return Some(format!(
                    "bookmark {} jumps from level {} to {}",
                    i, prev.level, bookmark.level
                ));
            }
            if bookmark.page < prev.page {
                return Some(format!(
                    "bookmark {} targets page {} before page {}",
                    i, bookmark.page, prev.page
                ));
            }
        }
        previous = Some(bookmark);
    }

    None
}

/// Heading level for a bookmark level; deeper levels reuse the last mapping
pub fn level_for(bookmark_level: u32, mapping: &[HeadingLevel]) -> HeadingLevel {
    let index = (bookmark_level.max(1) - 1) as usize;
    mapping
        .get(index)
        .or_else(|| mapping.last())
        .copied()
        .unwrap_or(HeadingLevel::Chapter)
}

/// Lowercase alphanumerics separated by single spaces
pub fn normalize_title(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve well-formed bookmarks against the stream.
///
/// `claimed` marks fragments that cannot become headings (cropped ones);
/// fragments consumed here are marked as they are matched.
pub fn build_skeleton(
    bookmarks: &[Bookmark],
    fragments: &[Fragment],
    claimed: &mut [bool],
    mapping: &[HeadingLevel],
    page_count: u32,
    max_heading_chars: usize,
) -> Vec<SkeletonEntry> {
    let last_page = fragments
        .iter()
        .map(|f| f.page)
        .max()
        .unwrap_or(0)
        .max(page_count);

    bookmarks
        .iter()
        .enumerate()
        .map(|(i, bookmark)| {
            let end = bookmarks[i + 1..]
                .iter()
                .find(|next| next.level <= bookmark.level)
                .map(|next| next.page.saturating_sub(1).max(bookmark.page))
                .unwrap_or_else(|| last_page.max(bookmark.page));

            let heading = match_heading(bookmark, fragments, claimed, max_heading_chars);
            if let Some(index) = heading {
                claimed[index] = true;
            }

            let position = heading.unwrap_or_else(|| {
                fragments
                    .iter()
                    .position(|f| f.page >= bookmark.page)
                    .unwrap_or(fragments.len())
            });

            SkeletonEntry {
                level: level_for(bookmark.level, mapping),
                title: bookmark.title.trim().to_string(),
                page_range: (bookmark.page, end),
                heading,
                position,
            }
        })
        .collect()
}

/// True when the words of `short` open `long`, compared whole-word
fn is_word_prefix(short: &str, long: &str) -> bool {
    let mut long = long.split(' ');
    short.split(' ').all(|word| long.next() == Some(word))
}

/// Exact normalized match first, then a whole-word prefix match in either
/// direction
fn match_heading(
    bookmark: &Bookmark,
    fragments: &[Fragment],
    claimed: &[bool],
    max_heading_chars: usize,
) -> Option<usize> {
    let title = normalize_title(&bookmark.title);
    if title.is_empty() {
        return None;
    }

    let candidates: Vec<(usize, String)> = fragments
        .iter()
        .enumerate()
        .filter(|(i, f)| f.page == bookmark.page && !claimed[*i])
        .map(|(i, f)| (i, normalize_title(&f.content)))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    if let Some((index, _)) = candidates.iter().find(|(_, text)| *text == title) {
        return Some(*index);
    }

    candidates
        .iter()
        .find(|(i, text)| {
            fragments[*i].char_count() <= max_heading_chars
                && (is_word_prefix(&title, text) || is_word_prefix(text, &title))
        })
        .map(|(i, _)| *i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn fragment(content: &str, page: u32) -> Fragment {
        Fragment::new(content, page, BoundingBox::new(72.0, 100.0, 540.0, 120.0))
    }

    fn levels() -> Vec<HeadingLevel> {
        vec![HeadingLevel::Chapter, HeadingLevel::Section]
    }

    #[test]
    fn test_check_accepts_nested_outline() {
        let bookmarks = vec![
            Bookmark::new(1, "One", 1),
            Bookmark::new(2, "One.A", 2),
            Bookmark::new(2, "One.B", 3),
            Bookmark::new(1, "Two", 5),
        ];
        assert_eq!(check_bookmarks(&bookmarks, 10), None);
        assert_eq!(check_bookmarks(&[], 10), None);
    }

    #[test]
    fn test_check_rejects_malformed() {
        assert!(check_bookmarks(&[Bookmark::new(2, "Deep", 1)], 5).is_some());
        assert!(check_bookmarks(&[Bookmark::new(1, "A", 1), Bookmark::new(3, "C", 2)], 5).is_some());
        assert!(check_bookmarks(&[Bookmark::new(1, "A", 3), Bookmark::new(1, "B", 2)], 5).is_some());
        assert!(check_bookmarks(&[Bookmark::new(1, "A", 0)], 5).is_some());
        assert!(check_bookmarks(&[Bookmark::new(1, "A", 9)], 5).is_some());
    }

    #[test]
    fn test_level_mapping_reuses_last() {
        let mapping = levels();
        assert_eq!(level_for(1, &mapping), HeadingLevel::Chapter);
        assert_eq!(level_for(2, &mapping), HeadingLevel::Section);
        assert_eq!(level_for(4, &mapping), HeadingLevel::Section);
        assert_eq!(level_for(1, &[]), HeadingLevel::Chapter);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Chapter 1: The Start! "), "chapter 1 the start");
        assert_eq!(normalize_title("---"), "");
    }

    #[test]
    fn test_skeleton_page_ranges() {
        let bookmarks = vec![
            Bookmark::new(1, "One", 1),
            Bookmark::new(2, "Inner", 2),
            Bookmark::new(1, "Two", 4),
        ];
        let fragments = vec![fragment("x", 1), fragment("y", 6)];
        let mut claimed = vec![false; fragments.len()];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 6, 200);

        assert_eq!(skeleton[0].page_range, (1, 3));
        assert_eq!(skeleton[1].page_range, (2, 3));
        assert_eq!(skeleton[2].page_range, (4, 6));
    }

    #[test]
    fn test_skeleton_matches_heading_text() {
        let bookmarks = vec![Bookmark::new(1, "Chapter 1: Origins", 1)];
        let fragments = vec![
            fragment("Some preface text on the page.", 1),
            fragment("CHAPTER 1 - ORIGINS", 1),
            fragment("Body.", 1),
        ];
        let mut claimed = vec![false; fragments.len()];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 1, 200);

        assert_eq!(skeleton[0].heading, Some(1));
        assert_eq!(skeleton[0].position, 1);
        assert_eq!(claimed, vec![false, true, false]);
    }

    #[test]
    fn test_skeleton_prefix_match() {
        let bookmarks = vec![Bookmark::new(1, "Introduction", 2)];
        let fragments = vec![fragment("intro text", 1), fragment("1 Introduction", 2)];
        let mut claimed = vec![false; fragments.len()];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 2, 200);
        assert_eq!(skeleton[0].heading, None);
        assert_eq!(skeleton[0].position, 1);

        let fragments = vec![fragment("Introduction and scope", 2)];
        let mut claimed = vec![false];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 2, 200);
        assert_eq!(skeleton[0].heading, Some(0));
    }

    #[test]
    fn test_prefix_match_respects_word_boundaries() {
        let bookmarks = vec![Bookmark::new(1, "Chapter 1", 1)];
        let fragments = vec![fragment("Chapter 12 Results", 1), fragment("Chapter 1 Getting Started", 1)];
        let mut claimed = vec![false; fragments.len()];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 1, 200);
        assert_eq!(skeleton[0].heading, Some(1));

        let bookmarks = vec![Bookmark::new(1, "Introduction", 1)];
        let fragments = vec![fragment("In", 1), fragment("Intro", 1)];
        let mut claimed = vec![false; fragments.len()];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 1, 200);
        assert_eq!(skeleton[0].heading, None);
        assert!(claimed.iter().all(|c| !c));
    }

    #[test]
    fn test_word_prefix() {
        assert!(is_word_prefix("chapter 1", "chapter 1 getting started"));
        assert!(is_word_prefix("chapter 1", "chapter 1"));
        assert!(!is_word_prefix("chapter 1", "chapter 12 results"));
        assert!(!is_word_prefix("in", "introduction"));
        assert!(!is_word_prefix("chapter 1 getting started", "chapter 1"));
    }

    #[test]
    fn test_unmatched_bookmark_opens_at_target_page() {
        let bookmarks = vec![Bookmark::new(1, "Chapter 1", 1)];
        let fragments = vec![fragment(&"a".repeat(50), 1), fragment(&"b".repeat(80), 1)];
        let mut claimed = vec![false; fragments.len()];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 1, 200);

        assert_eq!(skeleton[0].heading, None);
        assert_eq!(skeleton[0].position, 0);
        assert!(claimed.iter().all(|c| !c));
    }

    #[test]
    fn test_claimed_fragments_not_matched() {
        let bookmarks = vec![Bookmark::new(1, "Running Title", 1)];
        let fragments = vec![fragment("Running Title", 1)];
        let mut claimed = vec![true];
        let skeleton = build_skeleton(&bookmarks, &fragments, &mut claimed, &levels(), 1, 200);
        assert_eq!(skeleton[0].heading, None);
    }
}
