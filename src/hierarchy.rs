// HWBENCH TIMER HIERARCHY
// PROFILER OUTPUT ENCODES NESTING ONLY THROUGH THE LENGTH OF A DASH RUN IN
// FRONT OF EACH TIMER NAME. LINES ARRIVE IN PREORDER. A STACK OF
// (NAME, DEPTH) RECOVERS EACH TIMER'S PARENT WITHOUT EXPLICIT POINTERS.

use serde::Serialize;

pub const HIERARCHY_MARKER: char = '-';

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimingRecord {
    pub name: String,
    pub duration_seconds: f64,
    // EMPTY FOR ROOTS
    pub parent_name: String,
}

/// Split a depth-coded marker like `"------AGCM"` into `("AGCM", 6)`.
pub fn split_depth(marker: &str) -> (&str, usize) {
    let name = marker.trim_start_matches(HIERARCHY_MARKER);
    (name, marker.len() - name.len())
}

pub struct HierarchyBuilder {
    root: String,
    stack: Vec<(String, usize)>,
    records: Vec<TimingRecord>,
}

impl HierarchyBuilder {
    /// Unrooted forest: top-level timers get an empty parent.
    pub fn new() -> Self {
        Self::rooted("")
    }

    /// Top-level timers get `root` as parent (component sections).
    pub fn rooted(root: &str) -> Self {
        Self {
            root: root.to_string(),
            stack: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, depth: usize, duration_seconds: f64) {
        while self.stack.last().is_some_and(|(_, d)| *d >= depth) {
            self.stack.pop();
        }
        let parent_name = match self.stack.last() {
            Some((parent, _)) => parent.clone(),
            None => self.root.clone(),
        };
        self.stack.push((name.to_string(), depth));
        self.records.push(TimingRecord {
            name: name.to_string(),
            duration_seconds,
            parent_name,
        });
    }

    pub fn finish(self) -> Vec<TimingRecord> {
        self.records
    }
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuild a forest from `(name, depth, seconds)` entries given in preorder.
pub fn reconstruct<'a, I>(entries: I) -> Vec<TimingRecord>
where
    I: IntoIterator<Item = (&'a str, usize, f64)>,
{
    let mut builder = HierarchyBuilder::new();
    for (name, depth, seconds) in entries {
        builder.push(name, depth, seconds);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parents(records: &[TimingRecord]) -> Vec<&str> {
        records.iter().map(|r| r.parent_name.as_str()).collect()
    }

    #[test]
    fn siblings_and_single_pop() {
        let records = reconstruct([
            ("A", 1, 1.0),
            ("B", 2, 2.0),
            ("C", 2, 3.0),
            ("D", 3, 4.0),
            ("E", 1, 5.0),
        ]);
        assert_eq!(parents(&records), vec!["", "A", "A", "C", ""]);
        assert_eq!(records[3].name, "D");
        assert_eq!(records[3].duration_seconds, 4.0);
    }

    #[test]
    fn multi_level_pop() {
        // 4 -> 2 POPS TWO FRAMES AT ONCE
        let records = reconstruct([
            ("RUN", 2, 0.0),
            ("GCM", 4, 0.0),
            ("AGCM", 6, 0.0),
            ("SUPERDYNAMICS", 8, 0.0),
            ("DYN", 10, 0.0),
            ("PHYSICS", 8, 0.0),
            ("HIST", 4, 0.0),
            ("OTHER", 2, 0.0),
        ]);
        assert_eq!(
            parents(&records),
            vec!["", "RUN", "GCM", "AGCM", "SUPERDYNAMICS", "AGCM", "RUN", ""]
        );
    }

    #[test]
    fn depth_gaps_nest_under_nearest_shallower() {
        let records = reconstruct([("A", 1, 0.0), ("B", 5, 0.0), ("C", 3, 0.0)]);
        assert_eq!(parents(&records), vec!["", "A", "A"]);
    }

    #[test]
    fn rooted_section() {
        let mut b = HierarchyBuilder::rooted("DYN");
        b.push("DYN_PROLOGUE", 8, 0.1);
        b.push("DYN_CORE", 8, 2.0);
        b.push("FV_DYNAMICS", 10, 1.5);
        b.push("DYN_EPILOGUE", 8, 0.2);
        let records = b.finish();
        assert_eq!(parents(&records), vec!["DYN", "DYN", "DYN_CORE", "DYN"]);
    }

    #[test]
    fn split_depth_counts_dashes() {
        assert_eq!(split_depth("------AGCM"), ("AGCM", 6));
        assert_eq!(split_depth("--Run"), ("Run", 2));
        assert_eq!(split_depth("NAME"), ("NAME", 0));
    }
}
