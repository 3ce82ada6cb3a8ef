// HWBENCH SCOPED GREP
// LINE MATCHING RESTRICTED TO A WINDOW: OPENS AFTER EVERY START MARKER HAS
// BEEN SEEN IN ORDER, CLOSES FOR GOOD AT THE FIRST LINE CARRYING THE END
// MARKER. THE LINE THAT CARRIES THE LAST START MARKER IS ALREADY INSIDE.

use std::path::Path;

use crate::error::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Match {
    // PATTERN ANYWHERE IN THE LINE
    Contains,
    // LINE BEGINS WITH PATTERN. NEEDED WHERE A MARKER IS ALSO A SUBSTRING
    // OF UNRELATED TEXT (DASH RUNS INSIDE DEEPER TIMER NAMES)
    StartsWith,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// One scoped lookup. Built with chained setters, run against a [`LogText`].
#[derive(Clone, Debug)]
pub struct Query<'p> {
    pattern: &'p str,
    start_markers: &'p [&'p str],
    end_marker: Option<&'p str>,
    discipline: Match,
    strip_pattern: bool,
    presence: Presence,
}

impl<'p> Query<'p> {
    pub fn new(pattern: &'p str) -> Self {
        Self {
            pattern,
            start_markers: &[],
            end_marker: None,
            discipline: Match::Contains,
            strip_pattern: false,
            presence: Presence::Required,
        }
    }

    pub fn after(mut self, start_markers: &'p [&'p str]) -> Self {
        self.start_markers = start_markers;
        self
    }

    pub fn until(mut self, end_marker: &'p str) -> Self {
        self.end_marker = Some(end_marker);
        self
    }

    pub fn starts_with(mut self) -> Self {
        self.discipline = Match::StartsWith;
        self
    }

    // DROP EVERYTHING UP TO AND INCLUDING THE PATTERN SO THE NAME CANNOT
    // LEAK TOKENS INTO NUMERIC EXTRACTION
    pub fn strip(mut self) -> Self {
        self.strip_pattern = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn pattern(&self) -> &'p str {
        self.pattern
    }

    fn matches(&self, line: &str) -> bool {
        match self.discipline {
            Match::Contains => line.contains(self.pattern),
            Match::StartsWith => line.starts_with(self.pattern),
        }
    }

    fn project<'l>(&self, line: &'l str) -> &'l str {
        if !self.strip_pattern {
            return line;
        }
        match line.find(self.pattern) {
            Some(at) => &line[at + self.pattern.len()..],
            None => line,
        }
    }
}

/// A whole log held in memory. Every query is one pass over its lines.
#[derive(Clone, Debug)]
pub struct LogText {
    text: String,
}

impl LogText {
    pub fn read(path: &Path) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { text })
    }

    pub fn from_string(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn grep<'a>(&'a self, query: &Query<'_>) -> Result<Vec<&'a str>, ParseError> {
        let mut pending = query.start_markers.iter().peekable();
        let mut results = Vec::new();

        for line in self.text.lines() {
            if let Some(marker) = pending.peek() {
                if line.contains(**marker) {
                    pending.next();
                }
            }
            if let Some(end) = query.end_marker {
                if line.contains(end) {
                    break;
                }
            }
            if pending.peek().is_none() && query.matches(line) {
                results.push(query.project(line));
            }
        }

        if results.is_empty() && query.presence == Presence::Required {
            return Err(ParseError::MissingPattern(query.pattern.to_string()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONED: &str = "\
TARGET 1 before everything
SECTION1
TARGET 2 between the two starts
SECTION2
TARGET 3 inside
TARGET 4 inside
END
TARGET 5 after end
";

    #[test]
    fn window_bounds() {
        let log = LogText::from_string(SECTIONED);
        let q = Query::new("TARGET").after(&["SECTION1", "SECTION2"]).until("END");
        let hits = log.grep(&q).unwrap();
        assert_eq!(hits, vec!["TARGET 3 inside", "TARGET 4 inside"]);
    }

    #[test]
    fn start_markers_must_come_in_order() {
        let log = LogText::from_string("SECTION2\nSECTION1\nTARGET 1\n");
        let q = Query::new("TARGET").after(&["SECTION1", "SECTION2"]).optional();
        assert!(log.grep(&q).unwrap().is_empty());
    }

    #[test]
    fn last_start_marker_line_is_eligible() {
        let log = LogText::from_string("Model Throughput\n--Run 1 40.0\n");
        let q = Query::new("--Run").after(&["Model Throughput", "--Run"]).starts_with();
        assert_eq!(log.grep(&q).unwrap(), vec!["--Run 1 40.0"]);
    }

    #[test]
    fn end_marker_closes_scan_even_before_window() {
        let log = LogText::from_string("END\nSECTION1\nTARGET 1\n");
        let q = Query::new("TARGET").after(&["SECTION1"]).until("END").optional();
        assert!(log.grep(&q).unwrap().is_empty());
    }

    #[test]
    fn starts_with_ignores_embedded_occurrences() {
        let log = LogText::from_string("----GCM 1 2\n------AGCM 3 4\n  ----GCM 5\n");
        let q = Query::new("----GCM").starts_with();
        assert_eq!(log.grep(&q).unwrap(), vec!["----GCM 1 2"]);
        let q = Query::new("----GCM");
        assert_eq!(log.grep(&q).unwrap().len(), 2);
    }

    #[test]
    fn strip_drops_prefix_through_pattern() {
        let log = LogText::from_string("Resource Parameter: NX: 4\n");
        let q = Query::new("Resource Parameter: NX:").strip();
        assert_eq!(log.grep(&q).unwrap(), vec![" 4"]);
    }

    #[test]
    fn required_missing_is_fatal() {
        let log = LogText::from_string("nothing here\n");
        let err = log.grep(&Query::new("Resolution of dynamics restart")).unwrap_err();
        assert!(matches!(err, ParseError::MissingPattern(p) if p == "Resolution of dynamics restart"));
    }

    #[test]
    fn optional_missing_is_empty() {
        let log = LogText::from_string("nothing here\n");
        assert!(log.grep(&Query::new("RUN_GTFV3:1").optional()).unwrap().is_empty());
    }
}
