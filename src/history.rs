use std::collections::VecDeque;

/// Maximum number of remembered queries.
pub const MAX_HISTORY: usize = 20;

/// Most-recent-first list of distinct search queries.
#[derive(Debug, Clone, Default)]
pub struct SearchHistory {
    queries: VecDeque<String>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a most-recent-first list, e.g. one read back from
    /// storage. Duplicates and overflow are dropped.
    pub fn from_queries<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries: Vec<String> =
            queries.into_iter().map(Into::into).collect();
        let mut history = Self::new();
        // Oldest first so the front ends up most recent.
        for query in queries.into_iter().rev() {
            history.add(&query);
        }
        history
    }

    /// Move `query` to the front, inserting it if new. Blank queries are
    /// ignored.
    pub fn add(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.queries.retain(|q| q != query);
        self.queries.push_front(query.to_string());
        self.queries.truncate(MAX_HISTORY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.queries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.queries.clear();
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_recent_first() {
        let mut history = SearchHistory::new();
        history.add("math");
        history.add("art");
        assert_eq!(history.to_vec(), vec!["art", "math"]);
    }

    #[test]
    fn repeated_query_moves_to_front() {
        let mut history = SearchHistory::new();
        history.add("math");
        history.add("art");
        history.add("math");
        assert_eq!(history.to_vec(), vec!["math", "art"]);
    }

    #[test]
    fn capped_at_twenty() {
        let mut history = SearchHistory::new();
        for i in 0..30 {
            history.add(&format!("query {i}"));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.iter().next(), Some("query 29"));
        assert_eq!(history.iter().last(), Some("query 10"));
    }

    #[test]
    fn blank_ignored() {
        let mut history = SearchHistory::new();
        history.add("   ");
        assert!(history.is_empty());
    }

    #[test]
    fn from_queries_keeps_order() {
        let history = SearchHistory::from_queries(["c", "b", "a", "b"]);
        assert_eq!(history.to_vec(), vec!["c", "b", "a"]);
    }
}
