use crate::config::HeadingPattern;
use crate::types::HeadingLevel;
use regex::Regex;

struct CompiledPattern {
    name: String,
    level: HeadingLevel,
    regex: Regex,
}

/// A regex match on a heading candidate
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch<'a> {
    pub pattern: &'a str,
    pub level: HeadingLevel,
}

/// Ordered heading patterns; the first pattern that matches decides the level
pub struct HeadingMatcher {
    patterns: Vec<CompiledPattern>,
}

impl HeadingMatcher {
    /// Compile every pattern. A single bad pattern fails the whole set so the
    /// caller can disable the tier instead of matching with a partial cascade.
    pub fn new(patterns: &[HeadingPattern]) -> Result<Self, (String, regex::Error)> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|regex| CompiledPattern {
                        name: p.name.clone(),
                        level: p.level,
                        regex,
                    })
                    .map_err(|e| (p.name.clone(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Test trimmed content against the patterns in order
    pub fn find(&self, content: &str) -> Option<PatternMatch<'_>> {
        let content = content.trim();
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(content))
            .map(|p| PatternMatch {
                pattern: &p.name,
                level: p.level,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StructureConfig;

    fn default_matcher() -> HeadingMatcher {
        HeadingMatcher::new(&StructureConfig::default().heading_patterns).unwrap()
    }

    #[test]
    fn test_default_patterns() {
        let matcher = default_matcher();
        assert_eq!(matcher.len(), 4);

        let part = matcher.find("Part IV: Synthesis").unwrap();
        assert_eq!((part.pattern, part.level), ("part", HeadingLevel::Part));

        let chapter = matcher.find("  CHAPTER 12 Results ").unwrap();
        assert_eq!(chapter.level, HeadingLevel::Chapter);

        let sub = matcher.find("2.3.1 Edge cases").unwrap();
        assert_eq!((sub.pattern, sub.level), ("subsection", HeadingLevel::Section));

        let section = matcher.find("2.3 Method").unwrap();
        assert_eq!((section.pattern, section.level), ("section", HeadingLevel::Section));
    }

    #[test]
    fn test_body_text_does_not_match() {
        let matcher = default_matcher();
        assert!(matcher.find("The chapter 3 results were strong.").is_none());
        assert!(matcher.find("Partial results follow").is_none());
    }

    #[test]
    fn test_first_pattern_wins() {
        let patterns = vec![
            HeadingPattern::new("broad", HeadingLevel::Section, r"^[A-Z]"),
            HeadingPattern::new("chapter", HeadingLevel::Chapter, r"^Chapter"),
        ];
        let matcher = HeadingMatcher::new(&patterns).unwrap();
        assert_eq!(matcher.find("Chapter 1").unwrap().pattern, "broad");
    }

    #[test]
    fn test_invalid_pattern_reports_name() {
        let patterns = vec![
            HeadingPattern::new("ok", HeadingLevel::Chapter, r"^Ch"),
            HeadingPattern::new("broken", HeadingLevel::Section, r"(["),
        ];
        let (name, _) = HeadingMatcher::new(&patterns).err().unwrap();
        assert_eq!(name, "broken");
    }
}
