// HWBENCH NUMERIC TOKEN EXTRACTION
// ONE SHARED GRAMMAR FOR EVERY MEASUREMENT PULLED OUT OF FREE-TEXT LOGS.
// CALL SITES SELECT TOKENS BY FIXED POSITION AFTER EXTRACTION.

use std::sync::OnceLock;

use regex::Regex;

// OPTIONALLY SIGNED, OPTIONAL FRACTION, OPTIONAL EXPONENT.
// ".5", "5.", "5.0", "-3.5e2" ARE ALL TOKENS.
const NUMERIC_PATTERN: &str = r"[-+]?(?:\d*\.\d+|\d+\.?)(?:[Ee][+-]?\d+)?";

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NUMERIC_PATTERN).expect("numeric grammar is a valid regex"))
}

/// All numeric tokens of one line, left to right.
pub fn numerics_in(line: &str) -> Vec<f64> {
    numeric_regex()
        .find_iter(line)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Tokens of every line, concatenated in line order.
pub fn extract_numerics<S: AsRef<str>>(lines: &[S]) -> Vec<f64> {
    lines.iter().flat_map(|l| numerics_in(l.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_exponent_then_integer() {
        let v = numerics_in("RUN took -3.5e2 seconds and 4 retries");
        assert_eq!(v, vec![-3.5e2, 4.0]);
    }

    #[test]
    fn fraction_forms() {
        assert_eq!(numerics_in(".5 5. 5.25 +7"), vec![0.5, 5.0, 5.25, 7.0]);
    }

    #[test]
    fn exponent_forms() {
        assert_eq!(numerics_in("1E3 2e-2 3.0e+1"), vec![1000.0, 0.02, 30.0]);
    }

    #[test]
    fn digits_inside_names_are_tokens() {
        // THE PARSER SHIFTS ITS INDEX FOR THESE NAMES
        assert_eq!(numerics_in("GOCART2G 12.5 3.0"), vec![2.0, 12.5, 3.0]);
    }

    #[test]
    fn no_tokens() {
        assert!(numerics_in("profiler: Times for component <DYN>").is_empty());
    }

    #[test]
    fn concatenates_across_lines() {
        let lines = ["a 1 2", "b", "c 3"];
        assert_eq!(extract_numerics(&lines), vec![1.0, 2.0, 3.0]);
    }
}
