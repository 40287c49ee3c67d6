use crate::model::Entry;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};

pub struct FuzzyMatcher {
    matcher: Matcher,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Score entries by display name; non-matches get -1.
    pub fn match_entries(&mut self, query: &str, entries: &mut [Entry]) {
        let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
        let mut buf = Vec::new();

        for entry in entries.iter_mut() {
            let haystack = Utf32Str::new(entry.record.display_name(), &mut buf);
            entry.score = match pattern.score(haystack, &mut self.matcher) {
                Some(score) => score as i64,
                None => -1,
            };
        }
    }

    /// Indices of matching entries, best first. An empty query keeps everything in name order.
    pub fn filter(&mut self, query: &str, entries: &mut [Entry]) -> Vec<usize> {
        if query.is_empty() {
            let mut indices: Vec<usize> = (0..entries.len()).collect();
            indices.sort_by(|&a, &b| entries[a].name().to_lowercase().cmp(&entries[b].name().to_lowercase()));
            return indices;
        }

        self.match_entries(query, entries);
        let mut indices: Vec<usize> = entries.iter().enumerate()
            .filter(|(_, e)| e.score > 0)
            .map(|(i, _)| i)
            .collect();
        indices.sort_by(|&a, &b| entries[b].score.cmp(&entries[a].score));
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AppRecord;

    fn entries(names: &[&str]) -> Vec<Entry> {
        names.iter()
            .map(|n| Entry::new(AppRecord::new(format!("{}.desktop", n), *n, "", *n), false))
            .collect()
    }

    #[test]
    fn empty_query_sorts_by_name() {
        let mut list = entries(&["zed", "Firefox", "maps"]);
        let order = FuzzyMatcher::new().filter("", &mut list);
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn query_drops_non_matches() {
        let mut list = entries(&["Firefox", "Maps", "Files"]);
        let order = FuzzyMatcher::new().filter("map", &mut list);
        assert_eq!(order, vec![1]);
    }
}
