use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::models::{ChatResponse, DocumentReference};

/// Absolute start page of each chapter in the reference textbook.
const TEXTBOOK_CHAPTER_PAGES: [(u64, i64); 16] = [
    (1, 11),
    (2, 34),
    (3, 51),
    (4, 80),
    (5, 111),
    (6, 134),
    (7, 155),
    (8, 173),
    (9, 195),
    (10, 209),
    (11, 227),
    (12, 244),
    (13, 254),
    (14, 274),
    (15, 294),
    (16, 312),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterPageMap {
    pages: BTreeMap<u64, i64>,
}

impl ChapterPageMap {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, i64)>) -> Self {
        Self {
            pages: pairs.into_iter().collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading chapter map {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("invalid chapter map in {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: BTreeMap<String, i64> =
            serde_json::from_str(raw).context("chapter map must be a JSON object of page numbers")?;

        let mut pages = BTreeMap::new();
        for (chapter, page) in parsed {
            let chapter: u64 = chapter
                .trim()
                .parse()
                .with_context(|| format!("chapter key is not a number: {chapter:?}"))?;
            pages.insert(chapter, page);
        }

        Ok(Self { pages })
    }

    /// A stored start page of 0 counts as unmapped.
    pub fn base_page(&self, chapter: u64) -> Option<i64> {
        self.pages.get(&chapter).copied().filter(|page| *page != 0)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for ChapterPageMap {
    fn default() -> Self {
        Self::from_pairs(TEXTBOOK_CHAPTER_PAGES)
    }
}

// Label shows the chapter-relative page, the link targets the absolute page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Citation {
    pub chapter: u64,
    pub page: i64,
    pub absolute_page: i64,
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[教材第{}章第{}页](textbook:{})",
            self.chapter, self.page, self.absolute_page
        )
    }
}

#[derive(Clone, Debug)]
pub struct CitationResolver {
    chapters: ChapterPageMap,
    source_re: Regex,
}

impl CitationResolver {
    pub fn new(chapters: ChapterPageMap) -> Result<Self> {
        let source_re = Regex::new(r"ch([0-9]+)\.pdf")?;
        Ok(Self {
            chapters,
            source_re,
        })
    }

    pub fn resolve(&self, doc: &DocumentReference) -> Option<Citation> {
        let captures = self.source_re.captures(&doc.source)?;
        let chapter: u64 = captures.get(1)?.as_str().parse().ok()?;

        let absolute_page = match self.chapters.base_page(chapter) {
            Some(base) => base.saturating_add(doc.page).saturating_sub(1),
            None => doc.page,
        };

        Some(Citation {
            chapter,
            page: doc.page,
            absolute_page,
        })
    }

    pub fn citation_suffix(&self, documents: &[DocumentReference]) -> Option<String> {
        let references: Vec<String> = documents
            .iter()
            .filter_map(|doc| self.resolve(doc))
            .map(|citation| citation.to_string())
            .collect();

        if references.is_empty() {
            return None;
        }

        Some(format!(" 您可以参考 {} 获取更多信息。", references.join("、")))
    }

    pub fn annotate(&self, response: &mut ChatResponse) -> usize {
        let cited = response
            .documents
            .iter()
            .filter(|doc| self.resolve(doc).is_some())
            .count();

        if let Some(suffix) = self.citation_suffix(&response.documents) {
            response.answer.push_str(&suffix);
        }
        cited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, page: i64) -> DocumentReference {
        DocumentReference {
            source: source.to_string(),
            page,
            content: "摘要".to_string(),
        }
    }

    fn resolver() -> CitationResolver {
        CitationResolver::new(ChapterPageMap::default()).expect("resolver")
    }

    #[test]
    fn chapter_three_page_five_links_to_page_55() {
        let citation = resolver().resolve(&doc("ch3.pdf", 5)).expect("citation");
        assert_eq!(citation.absolute_page, 55);
        assert_eq!(citation.to_string(), "[教材第3章第5页](textbook:55)");
    }

    #[test]
    fn absolute_page_is_offset_from_chapter_start() {
        let resolver = resolver();
        for (chapter, base) in TEXTBOOK_CHAPTER_PAGES {
            for page in 1..=10 {
                let citation = resolver
                    .resolve(&doc(&format!("ch{chapter}.pdf"), page))
                    .expect("mapped chapter");
                assert_eq!(citation.absolute_page, base + page - 1);
                assert_eq!(citation.page, page);
            }
        }
    }

    #[test]
    fn unmatched_source_is_skipped() {
        let resolver = resolver();
        assert!(resolver.resolve(&doc("chapter3.pdf", 2)).is_none());
        assert!(resolver.resolve(&doc("ch3.txt", 2)).is_none());
        assert!(resolver.resolve(&doc("", 2)).is_none());
        assert!(resolver
            .citation_suffix(&[doc("notes.pdf", 1), doc("chX.pdf", 1)])
            .is_none());
    }

    #[test]
    fn unmapped_chapter_falls_back_to_relative_page() {
        let citation = resolver().resolve(&doc("ch17.pdf", 4)).expect("citation");
        assert_eq!(citation.to_string(), "[教材第17章第4页](textbook:4)");
    }

    #[test]
    fn zero_base_page_counts_as_unmapped() {
        let map = ChapterPageMap::from_pairs([(1, 0), (2, 40)]);
        let resolver = CitationResolver::new(map).expect("resolver");
        assert_eq!(resolver.resolve(&doc("ch1.pdf", 6)).map(|c| c.absolute_page), Some(6));
        assert_eq!(resolver.resolve(&doc("ch2.pdf", 6)).map(|c| c.absolute_page), Some(45));
    }

    #[test]
    fn leading_zeros_and_surrounding_text_are_tolerated() {
        let resolver = resolver();
        let citation = resolver
            .resolve(&doc("textbook/ch03.pdf", 2))
            .expect("citation");
        assert_eq!(citation.chapter, 3);
        assert_eq!(citation.absolute_page, 52);
    }

    #[test]
    fn only_ascii_digits_name_a_chapter() {
        let resolver = resolver();
        assert!(resolver.resolve(&doc("ch\u{0663}.pdf", 5)).is_none());

        let citation = resolver
            .resolve(&doc("ch\u{0663}.pdf|ch3.pdf", 5))
            .expect("ascii chapter after a non-ascii one");
        assert_eq!(citation.to_string(), "[教材第3章第5页](textbook:55)");
    }

    #[test]
    fn oversized_chapter_number_is_skipped() {
        let source = format!("ch{}.pdf", "9".repeat(40));
        assert!(resolver().resolve(&doc(&source, 1)).is_none());
    }

    #[test]
    fn annotate_joins_citations_with_enumeration_comma() {
        let mut response = ChatResponse {
            thought: "t".to_string(),
            answer: "答案。".to_string(),
            documents: vec![doc("ch1.pdf", 1), doc("readme.md", 3), doc("ch16.pdf", 10)],
        };

        let cited = resolver().annotate(&mut response);
        assert_eq!(cited, 2);
        assert_eq!(
            response.answer,
            "答案。 您可以参考 [教材第1章第1页](textbook:11)、[教材第16章第10页](textbook:321) 获取更多信息。"
        );
    }

    #[test]
    fn annotate_leaves_answer_without_resolvable_documents() {
        let mut response = ChatResponse {
            thought: "t".to_string(),
            answer: "答案。".to_string(),
            documents: vec![],
        };
        assert_eq!(resolver().annotate(&mut response), 0);
        assert_eq!(response.answer, "答案。");
    }

    #[test]
    fn chapter_map_loads_from_json() {
        let map = ChapterPageMap::from_json_str(r#"{"1": 5, " 2 ": 20}"#).expect("map");
        assert_eq!(map.len(), 2);
        assert_eq!(map.base_page(2), Some(20));
        assert!(ChapterPageMap::from_json_str(r#"{"one": 5}"#).is_err());
        assert!(ChapterPageMap::from_json_str("[1, 2]").is_err());
        assert!(ChapterPageMap::from_json_str("{}").unwrap().is_empty());
    }
}
