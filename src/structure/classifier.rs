use super::bookmarks::{build_skeleton, check_bookmarks};
use super::heuristics::{HeadingCandidate, LayoutProfile, assign_levels, heading_score};
use super::layout::{CropRegion, PageGeometry};
use super::patterns::HeadingMatcher;
use super::tree::{NodeId, NodeKind, NodeSpec, StructureTree};
use super::{Classification, StructureStats, StructureWarning};
use crate::config::{PipelineConfig, StructureConfig};
use crate::types::{Bookmark, ClassifiedFragment, DetectionSource, Fragment, HeadingLevel, Role};

/// Absorbs float noise when summing heuristic weights
const SCORE_EPSILON: f64 = 1e-9;

/// A heading that opens a structure node at a stream position
#[derive(Debug, Clone)]
struct Opening {
    position: usize,
    level: HeadingLevel,
    title: String,
    heading: Option<usize>,
    source: DetectionSource,
    page_range: Option<(u32, u32)>,
}

/// Priority cascade: crop, bookmarks, heuristics, regex, default.
///
/// Holds only configuration; every call is independent, so one classifier can
/// be shared across threads.
pub struct Classifier {
    config: StructureConfig,
    crop: CropRegion,
    use_bookmarks: bool,
    matcher: Option<HeadingMatcher>,
    disabled_pattern: Option<StructureWarning>,
}

impl Classifier {
    pub fn new(config: &PipelineConfig) -> Self {
        let (matcher, disabled_pattern) = match HeadingMatcher::new(&config.structure.heading_patterns) {
            Ok(matcher) => (Some(matcher), None),
            Err((pattern, e)) => {
                let warning = StructureWarning::PatternTierDisabled {
                    pattern,
                    reason: e.to_string(),
                };
                tracing::warn!("{}", warning);
                (None, Some(warning))
            }
        };

        Self {
            config: config.structure.clone(),
            crop: CropRegion::from_config(&config.cleaning),
            use_bookmarks: config.structure.use_bookmarks && config.extraction.extract_metadata,
            matcher,
            disabled_pattern,
        }
    }

    /// Assign every fragment exactly one role and build the structure tree
    pub fn classify(
        &self,
        fragments: &[Fragment],
        bookmarks: &[Bookmark],
        geometry: &PageGeometry,
    ) -> Classification {
        let mut warnings: Vec<StructureWarning> = self.disabled_pattern.iter().cloned().collect();
        let mut assigned: Vec<Option<(Role, DetectionSource)>> = vec![None; fragments.len()];
        let mut openings = Vec::new();

        // Positional furniture first: a footer is never promoted to a heading
        if !self.crop.is_empty() {
            for (i, fragment) in fragments.iter().enumerate() {
                if let Some(role) = self.crop.classify(&fragment.bbox, geometry.size(fragment.page)) {
                    assigned[i] = Some((role, DetectionSource::Heuristic));
                }
            }
        }

        if self.use_bookmarks && !bookmarks.is_empty() {
            self.apply_bookmarks(fragments, bookmarks, geometry, &mut assigned, &mut openings, &mut warnings);
        }

        if self.config.use_heuristics {
            self.apply_heuristics(fragments, geometry, &mut assigned, &mut openings, &mut warnings);
        }

        if self.config.use_regex
            && let Some(matcher) = &self.matcher
        {
            for (i, fragment) in fragments.iter().enumerate() {
                if assigned[i].is_some() || fragment.char_count() > self.config.max_heading_chars {
                    continue;
                }
                if let Some(found) = matcher.find(&fragment.content) {
                    tracing::debug!(
                        "Pattern '{}' tagged fragment {} as {}",
                        found.pattern,
                        i,
                        found.level.as_str()
                    );
                    assigned[i] = Some((found.level.role(), DetectionSource::Regex));
                    openings.push(Opening {
                        position: i,
                        level: found.level,
                        title: fragment.content.trim().to_string(),
                        heading: Some(i),
                        source: DetectionSource::Regex,
                        page_range: None,
                    });
                }
            }
        }

        let classified: Vec<ClassifiedFragment> = fragments
            .iter()
            .zip(assigned)
            .enumerate()
            .map(|(index, (fragment, tag))| {
                let (role, source) = tag.unwrap_or((Role::BodyText, DetectionSource::Default));
                ClassifiedFragment {
                    index,
                    fragment: fragment.clone(),
                    role,
                    source,
                }
            })
            .collect();

        let tree = build_tree(&classified, openings);
        let stats = StructureStats::collect(&classified, &tree);

        tracing::info!(
            "Classified {} fragments: {} parts, {} chapters, {} sections, {} headers/footers",
            classified.len(),
            stats.parts_found,
            stats.chapters_found,
            stats.sections_found,
            stats.headers + stats.footers
        );

        Classification {
            classified,
            tree,
            warnings,
            stats,
        }
    }

    fn apply_bookmarks(
        &self,
        fragments: &[Fragment],
        bookmarks: &[Bookmark],
        geometry: &PageGeometry,
        assigned: &mut [Option<(Role, DetectionSource)>],
        openings: &mut Vec<Opening>,
        warnings: &mut Vec<StructureWarning>,
    ) {
        if let Some(reason) = check_bookmarks(bookmarks, geometry.page_count()) {
            let warning = StructureWarning::MalformedBookmarks { reason };
            tracing::warn!("{}; falling back to heuristics", warning);
            warnings.push(warning);
            return;
        }

        let mut claimed: Vec<bool> = assigned.iter().map(Option::is_some).collect();
        let skeleton = build_skeleton(
            bookmarks,
            fragments,
            &mut claimed,
            &self.config.bookmark_levels,
            geometry.page_count(),
            self.config.max_heading_chars,
        );

        tracing::debug!("Built bookmark skeleton with {} entries", skeleton.len());

        for entry in skeleton {
            if let Some(heading) = entry.heading {
                assigned[heading] = Some((entry.level.role(), DetectionSource::Bookmark));
            }
            openings.push(Opening {
                position: entry.position,
                level: entry.level,
                title: entry.title,
                heading: entry.heading,
                source: DetectionSource::Bookmark,
                page_range: Some(entry.page_range),
            });
        }
    }

    fn apply_heuristics(
        &self,
        fragments: &[Fragment],
        geometry: &PageGeometry,
        assigned: &mut [Option<(Role, DetectionSource)>],
        openings: &mut Vec<Opening>,
        warnings: &mut Vec<StructureWarning>,
    ) {
        let eligible: Vec<bool> = assigned
            .iter()
            .map(|tag| !tag.is_some_and(|(role, _)| role.is_page_furniture()))
            .collect();
        let profile = LayoutProfile::measure(fragments, &eligible);

        let candidates: Vec<HeadingCandidate> = fragments
            .iter()
            .enumerate()
            .filter(|(i, fragment)| {
                assigned[*i].is_none()
                    && !fragment.content.trim().is_empty()
                    && fragment.char_count() <= self.config.max_heading_chars
                    && heading_score(*i, fragment, &profile, geometry, &self.config) + SCORE_EPSILON
                        >= self.config.heading_score_threshold
            })
            .map(|(index, fragment)| HeadingCandidate {
                index,
                font_size: fragment.font_size,
                bold: fragment.bold,
            })
            .collect();

        if candidates.is_empty() {
            return;
        }

        let assignment = assign_levels(&candidates);
        for font_size in assignment.ties {
            let warning = StructureWarning::FontSizeTie { font_size };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        for (index, level) in assignment.levels {
            assigned[index] = Some((level.role(), DetectionSource::Heuristic));
            openings.push(Opening {
                position: index,
                level,
                title: fragments[index].content.trim().to_string(),
                heading: Some(index),
                source: DetectionSource::Heuristic,
                page_range: None,
            });
        }
    }
}

/// Open nodes in stream order and hang body fragments under the deepest open node
fn build_tree(classified: &[ClassifiedFragment], mut openings: Vec<Opening>) -> StructureTree {
    openings.sort_by_key(|opening| opening.position);

    let mut tree = StructureTree::new();
    let root = tree.root();
    let mut open: Vec<NodeId> = vec![root];
    let mut pending = openings.into_iter().peekable();

    for position in 0..=classified.len() {
        while let Some(opening) = pending.next_if(|o| o.position == position) {
            let heading = opening.heading;
            let id = open_node(&mut tree, &mut open, opening);
            if let Some(index) = heading {
                tree.record_page(id, classified[index].fragment.page);
            }
        }

        let Some(fragment) = classified.get(position) else {
            break;
        };
        if fragment.role == Role::BodyText {
            let node = open.last().copied().unwrap_or(root);
            tree.attach_body(node, position, fragment.fragment.page);
        }
    }

    tree
}

fn open_node(tree: &mut StructureTree, open: &mut Vec<NodeId>, opening: Opening) -> NodeId {
    let kind = NodeKind::from(opening.level);

    while open.len() > 1
        && open
            .last()
            .is_some_and(|top| tree.node(*top).kind.depth() >= kind.depth())
    {
        open.pop();
    }

    let mut parent = open.last().copied().unwrap_or(tree.root());
    if kind == NodeKind::Chapter && tree.node(parent).kind == NodeKind::Document {
        let part = tree.add_child(
            parent,
            NodeSpec {
                kind: NodeKind::Part,
                title: None,
                heading: None,
                source: None,
                page_range: None,
            },
        );
        tree.mark_implicit(part);
        open.push(part);
        parent = part;
    }

    let id = tree.add_child(
        parent,
        NodeSpec {
            kind,
            title: Some(opening.title),
            heading: opening.heading,
            source: Some(opening.source),
            page_range: opening.page_range,
        },
    );
    open.push(id);
    id
}

impl StructureStats {
    fn collect(classified: &[ClassifiedFragment], tree: &StructureTree) -> Self {
        let mut stats = StructureStats {
            parts_found: tree.nodes().iter().filter(|n| n.kind == NodeKind::Part && !n.implicit).count(),
            implicit_parts: tree.nodes().iter().filter(|n| n.implicit).count(),
            chapters_found: tree.count(NodeKind::Chapter),
            sections_found: tree.count(NodeKind::Section),
            ..Default::default()
        };

        for fragment in classified {
            match fragment.role {
                Role::Header => stats.headers += 1,
                Role::Footer => stats.footers += 1,
                Role::BodyText => stats.body_fragments += 1,
                Role::PartHeading | Role::ChapterHeading | Role::SectionHeading => {
                    match fragment.source {
                        DetectionSource::Bookmark => stats.by_bookmark += 1,
                        DetectionSource::Heuristic => stats.by_heuristic += 1,
                        DetectionSource::Regex => stats.by_regex += 1,
                        DetectionSource::Default => {}
                    }
                }
            }
        }

        stats
    }
}
