//! A minimal document host: source text split into claimable regions.

use std::any::Any;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::dialect::EndPattern;
use crate::error::{DocError, MatcherError};

/// A contiguous span of a document's text.
#[derive(Debug)]
pub struct Region {
    lineno: usize,
    offset: usize,
    source: String,
    claimed: bool,
    parsed: Option<Box<dyn Any>>,
}

impl Region {
    fn unclaimed(lineno: usize, offset: usize, source: &str) -> Self {
        Region {
            lineno,
            offset,
            source: source.to_string(),
            claimed: false,
            parsed: None,
        }
    }

    /// 1-based document line the region starts on.
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Byte offset of the region within the document.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    fn end(&self) -> usize {
        self.offset + self.source.len()
    }

    fn covers(&self, offset: usize, len: usize) -> bool {
        self.offset <= offset && offset + len <= self.end()
    }

    /// The attached artifact, if there is one and it is a `T`.
    pub fn parsed<T: Any>(&self) -> Option<&T> {
        self.parsed.as_ref()?.downcast_ref::<T>()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }

    /// Attach the region's parsed artifact. A region holds at most one.
    pub fn set_parsed<T: Any>(&mut self, value: T) -> Result<(), MatcherError> {
        if self.parsed.is_some() {
            return Err(MatcherError::AlreadyParsed { line: self.lineno });
        }
        self.parsed = Some(Box::new(value));
        Ok(())
    }
}

/// A span found by [`Document::find_regions`], not yet claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub offset: usize,
    pub lineno: usize,
    pub source: String,
}

/// A prose document being processed.
///
/// Starts as a single unclaimed region. Claiming a candidate splits the
/// region that contains it, so the regions always tile the whole text.
#[derive(Debug)]
pub struct Document {
    location: String,
    source: String,
    regions: Vec<Region>,
}

impl Document {
    pub fn new(location: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let regions = if source.is_empty() {
            Vec::new()
        } else {
            vec![Region::unclaimed(1, 0, &source)]
        };
        Document {
            location: location.into(),
            source,
            regions,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocError> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|source| DocError::Io {
            path: location.clone(),
            source,
        })?;
        Ok(Document::new(location, source))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// All regions in textual order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Scan every unclaimed region for spans opened by `start` and closed by
    /// `end`.
    ///
    /// The end pattern is searched from where the start match stops. Scanning
    /// resumes after each candidate, so the returned spans never overlap.
    pub fn find_regions(
        &self,
        start: &Regex,
        end: &EndPattern,
    ) -> Result<Vec<Candidate>, MatcherError> {
        let mut found = Vec::new();
        for region in self.regions.iter().filter(|r| !r.claimed) {
            let text = region.source.as_str();
            let mut pos = 0;
            while let Some(start_match) = start.find_at(text, pos) {
                let lineno = region.lineno + text[..start_match.start()].matches('\n').count();
                if !at_line_start(text, start_match.start()) {
                    return Err(self.misaligned(lineno, "start"));
                }
                let Some(boundary) = end.find_boundary(text, start_match.end()) else {
                    return Err(MatcherError::UnterminatedRegion {
                        location: self.location.clone(),
                        line: lineno,
                    });
                };
                if boundary < text.len() && !at_line_start(text, boundary) {
                    return Err(self.misaligned(lineno, "end"));
                }

                let candidate = Candidate {
                    offset: region.offset + start_match.start(),
                    lineno,
                    source: text[start_match.start()..boundary].to_string(),
                };
                debug!(
                    location = %self.location,
                    line = lineno,
                    len = candidate.source.len(),
                    "found region"
                );
                found.push(candidate);
                pos = boundary.max(start_match.end());
                if pos >= text.len() {
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Mark a candidate's span as owned, splitting the unclaimed region that
    /// holds it.
    pub fn claim_region(&mut self, candidate: &Candidate) -> Result<&mut Region, MatcherError> {
        let len = candidate.source.len();
        if self
            .regions
            .iter()
            .any(|r| r.claimed && r.offset < candidate.offset + len && candidate.offset < r.end())
        {
            return Err(MatcherError::AlreadyClaimed {
                location: self.location.clone(),
                line: candidate.lineno,
            });
        }
        let Some(index) = self
            .regions
            .iter()
            .position(|r| r.covers(candidate.offset, len))
        else {
            return Err(self.unknown(candidate));
        };

        let region = &self.regions[index];
        let relative = candidate.offset - region.offset;
        if region.source.get(relative..relative + len) != Some(candidate.source.as_str()) {
            return Err(self.unknown(candidate));
        }

        let before = &region.source[..relative];
        let after = &region.source[relative + len..];
        let after_lineno = candidate.lineno + candidate.source.matches('\n').count();

        let mut pieces = Vec::with_capacity(3);
        if !before.is_empty() {
            pieces.push(Region::unclaimed(region.lineno, region.offset, before));
        }
        let claimed_at = index + pieces.len();
        pieces.push(Region {
            lineno: candidate.lineno,
            offset: candidate.offset,
            source: candidate.source.clone(),
            claimed: true,
            parsed: None,
        });
        if !after.is_empty() {
            pieces.push(Region::unclaimed(
                after_lineno,
                candidate.offset + len,
                after,
            ));
        }
        self.regions.splice(index..=index, pieces);

        debug!(location = %self.location, line = candidate.lineno, "claimed region");
        Ok(&mut self.regions[claimed_at])
    }

    fn misaligned(&self, line: usize, edge: &'static str) -> MatcherError {
        MatcherError::Misaligned {
            location: self.location.clone(),
            line,
            edge,
        }
    }

    fn unknown(&self, candidate: &Candidate) -> MatcherError {
        MatcherError::UnknownRegion {
            location: self.location.clone(),
            line: candidate.lineno,
        }
    }
}

fn at_line_start(text: &str, offset: usize) -> bool {
    offset == 0 || text.as_bytes().get(offset - 1) == Some(&b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(text: &str) -> Regex {
        Regex::new(text).unwrap()
    }

    #[test]
    fn regions_tile_the_document_after_a_claim() {
        let mut doc = Document::new("a.rst", "one\nSTART\nbody\nEND\ntail\n");
        let candidates = doc
            .find_regions(&pattern(r"(?m)^START"), &EndPattern::new(r"END\n").unwrap())
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lineno, 2);

        doc.claim_region(&candidates[0]).unwrap();
        let spans: Vec<(usize, bool, &str)> = doc
            .regions()
            .map(|r| (r.lineno(), r.is_claimed(), r.source()))
            .collect();
        assert_eq!(
            spans,
            vec![
                (1, false, "one\n"),
                (2, true, "START\nbody\nEND\n"),
                (5, false, "tail\n"),
            ]
        );
    }

    #[test]
    fn claimed_spans_are_not_scanned_again() {
        let mut doc = Document::new("a.rst", "START\nEND\n");
        let start = pattern(r"(?m)^START");
        let end = EndPattern::new(r"END\n").unwrap();
        let first = doc.find_regions(&start, &end).unwrap();
        doc.claim_region(&first[0]).unwrap();
        assert!(doc.find_regions(&start, &end).unwrap().is_empty());

        let err = doc.claim_region(&first[0]).unwrap_err();
        assert!(matches!(err, MatcherError::AlreadyClaimed { line: 1, .. }));
    }

    #[test]
    fn missing_end_is_unterminated() {
        let doc = Document::new("a.rst", "x\nSTART\nbody\n");
        let err = doc
            .find_regions(&pattern(r"(?m)^START"), &EndPattern::new("END").unwrap())
            .unwrap_err();
        assert!(matches!(err, MatcherError::UnterminatedRegion { line: 2, .. }));
        assert_eq!(
            err.to_string(),
            "a.rst:2: couldn't find the end of the region starting here"
        );
    }

    #[test]
    fn boundaries_must_sit_on_line_edges() {
        let doc = Document::new("a.rst", "x START\nEND\n");
        let err = doc
            .find_regions(&pattern("START"), &EndPattern::new(r"END\n").unwrap())
            .unwrap_err();
        assert!(matches!(err, MatcherError::Misaligned { edge: "start", .. }));

        let doc = Document::new("a.rst", "START\nEND and more\n");
        let err = doc
            .find_regions(&pattern(r"(?m)^START"), &EndPattern::new("END").unwrap())
            .unwrap_err();
        assert!(matches!(err, MatcherError::Misaligned { edge: "end", .. }));
    }

    #[test]
    fn one_artifact_per_region() {
        let mut doc = Document::new("a.rst", "START\n");
        let candidates = doc
            .find_regions(&pattern(r"(?m)^START"), &EndPattern::new(r"\z").unwrap())
            .unwrap();
        let region = doc.claim_region(&candidates[0]).unwrap();
        region.set_parsed(7_u32).unwrap();
        assert_eq!(region.parsed::<u32>(), Some(&7));
        assert_eq!(region.parsed::<String>(), None);
        assert!(region.set_parsed(8_u32).is_err());
    }

    #[test]
    fn empty_document_has_no_regions() {
        let doc = Document::new("a.md", "");
        assert_eq!(doc.regions().count(), 0);
    }
}
