//! Noise filtering applied before classification
//!
//! Positional cropping is not done here: the classifier tags cropped
//! fragments as headers and footers, and doing it in both places would
//! double-count them.

use crate::config::CleaningConfig;
use crate::structure::StructureTree;
use crate::types::Fragment;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Counts reported by the filtering pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub fragments_input: usize,
    pub fragments_output: usize,
    pub characters_input: usize,
    pub characters_output: usize,
    pub fragments_removed: usize,
    pub characters_removed: usize,
    /// Fragments dropped by `exclude_exact_blocks`
    pub exact_blocks_removed: usize,
}

pub struct NoiseFilter {
    patterns: Vec<Regex>,
    exact_blocks: HashSet<String>,
    exclude_pages: HashSet<u32>,
}

impl NoiseFilter {
    /// Build a filter; patterns that fail to compile are skipped with a warning
    pub fn new(config: &CleaningConfig) -> Self {
        let patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Invalid exclude pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        let exact_blocks = config
            .exclude_exact_blocks
            .iter()
            .map(|block| clean_content(block).to_lowercase())
            .filter(|block| !block.is_empty())
            .collect();

        Self {
            patterns,
            exact_blocks,
            exclude_pages: config.exclude_pages.iter().copied().collect(),
        }
    }

    /// Drop excluded pages, noise patterns and bare page numbers; clean the
    /// content of everything that survives
    pub fn apply(&self, fragments: &[Fragment]) -> (Vec<Fragment>, FilterStats) {
        let characters_input = fragments.iter().map(Fragment::char_count).sum();
        let mut kept = Vec::with_capacity(fragments.len());
        let mut exact_blocks_removed = 0;

        for fragment in fragments {
            if self.exclude_pages.contains(&fragment.page) {
                tracing::debug!("Skipping fragment on excluded page {}", fragment.page);
                continue;
            }

            let cleaned = clean_content(&fragment.content);
            if self.is_exact_block(&cleaned) {
                tracing::debug!("Skipping excluded block: {}", preview(&cleaned));
                exact_blocks_removed += 1;
                continue;
            }

            if self.matches_exclude_pattern(&fragment.content) {
                tracing::debug!("Skipping pattern match: {}", preview(&fragment.content));
                continue;
            }

            if cleaned.is_empty() || is_page_number(&cleaned) {
                continue;
            }

            let mut fragment = fragment.clone();
            fragment.content = cleaned;
            kept.push(fragment);
        }

        let characters_output: usize = kept.iter().map(Fragment::char_count).sum();
        let stats = FilterStats {
            fragments_input: fragments.len(),
            fragments_output: kept.len(),
            characters_input,
            characters_output,
            fragments_removed: fragments.len() - kept.len(),
            characters_removed: characters_input.saturating_sub(characters_output),
            exact_blocks_removed,
        };

        tracing::info!(
            "Filtering complete: {} fragments remaining ({} removed, {} characters removed)",
            stats.fragments_output,
            stats.fragments_removed,
            stats.characters_removed
        );

        (kept, stats)
    }

    fn is_exact_block(&self, cleaned: &str) -> bool {
        !self.exact_blocks.is_empty() && self.exact_blocks.contains(&cleaned.to_lowercase())
    }

    fn matches_exclude_pattern(&self, content: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(content))
    }
}

/// Remove control characters and collapse whitespace runs to single spaces
pub fn clean_content(content: &str) -> String {
    let mut cleaned = String::with_capacity(content.len());
    let mut pending_space = false;

    for c in content.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !cleaned.is_empty() {
                cleaned.push(' ');
            }
            pending_space = false;
            cleaned.push(c);
        }
    }

    cleaned
}

/// A fragment that is nothing but digits is a page number
fn is_page_number(content: &str) -> bool {
    !content.is_empty() && content.chars().all(|c| c.is_numeric())
}

/// Whether a node title names an excluded section: equal ignoring case, or
/// starting with the excluded name followed by a non-alphanumeric character
pub fn is_excluded_section(title: &str, exclude_sections: &[String]) -> bool {
    let title = title.trim().to_lowercase();
    exclude_sections.iter().any(|section| {
        let section = section.trim().to_lowercase();
        if section.is_empty() {
            return false;
        }
        match title.strip_prefix(&section) {
            Some(rest) => rest.chars().next().is_none_or(|c| !c.is_alphanumeric()),
            None => false,
        }
    })
}

/// A copy of `tree` without the nodes (and their subtrees) whose titles name
/// an excluded section
pub fn prune_excluded_sections(tree: &StructureTree, exclude_sections: &[String]) -> StructureTree {
    if exclude_sections.is_empty() {
        return tree.clone();
    }
    tree.pruned(|node| {
        node.title
            .as_deref()
            .is_some_and(|title| is_excluded_section(title, exclude_sections))
    })
}

fn preview(content: &str) -> String {
    content.chars().take(50).collect()
}
