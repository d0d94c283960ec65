use std::sync::Arc;

use crate::models::DirectoryEntry;

/// Current search results with a highlighted row
#[derive(Debug)]
pub struct ResultList {
    results: Arc<[DirectoryEntry]>,
    selected_index: usize,
}

impl ResultList {
    pub fn new() -> Self {
        Self {
            results: Arc::from(Vec::new()),
            selected_index: 0,
        }
    }

    /// Replace the results, keeping the highlight when the list is unchanged
    pub fn set_results(&mut self, results: Arc<[DirectoryEntry]>) {
        if Arc::ptr_eq(&self.results, &results) {
            return;
        }
        self.results = results;
        self.selected_index = 0;
    }

    pub fn results(&self) -> &[DirectoryEntry] {
        &self.results
    }

    pub fn selected(&self) -> Option<&DirectoryEntry> {
        self.results.get(self.selected_index)
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn next(&mut self) {
        if self.selected_index + 1 < self.results.len() {
            self.selected_index += 1;
        }
    }

    pub fn prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }
}

/// Symbols the user has picked, in pick order, without duplicates
///
/// One row is highlighted; newly added entries take the highlight.
#[derive(Debug, Default)]
pub struct Selection {
    entries: Vec<DirectoryEntry>,
    highlighted: usize,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns false if its symbol is already selected
    pub fn add(&mut self, entry: DirectoryEntry) -> bool {
        if self.entries.iter().any(|e| e.symbol == entry.symbol) {
            return false;
        }
        self.entries.push(entry);
        self.highlighted = self.entries.len() - 1;
        true
    }

    /// Remove the highlighted entry, moving the highlight to its neighbour
    pub fn remove_highlighted(&mut self) -> Option<DirectoryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let removed = self.entries.remove(self.highlighted);
        self.highlighted = self.highlighted.min(self.entries.len().saturating_sub(1));
        Some(removed)
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    pub fn next(&mut self) {
        if self.highlighted + 1 < self.entries.len() {
            self.highlighted += 1;
        }
    }

    pub fn prev(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(symbols: &[&str]) -> Arc<[DirectoryEntry]> {
        symbols
            .iter()
            .map(|s| DirectoryEntry::new(*s, format!("{} Inc", s)))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut list = ResultList::new();
        list.set_results(entries(&["AAPL", "AAPB"]));

        list.prev();
        assert_eq!(list.selected_index(), 0);
        list.next();
        list.next();
        assert_eq!(list.selected().unwrap().symbol, "AAPB");
    }

    #[test]
    fn test_new_results_reset_highlight() {
        let mut list = ResultList::new();
        let first = entries(&["AAPL", "AAPB"]);
        list.set_results(first.clone());
        list.next();

        list.set_results(first);
        assert_eq!(list.selected_index(), 1);

        list.set_results(entries(&["MSFT"]));
        assert_eq!(list.selected_index(), 0);
    }

    #[test]
    fn test_selection_rejects_duplicates() {
        let mut selection = Selection::new();
        assert!(selection.add(DirectoryEntry::new("NVDA", "NVIDIA Corp")));
        assert!(selection.add(DirectoryEntry::new("AMD", "Advanced Micro Devices")));
        assert!(!selection.add(DirectoryEntry::new("NVDA", "NVIDIA Corp")));

        assert_eq!(selection.symbols(), vec!["NVDA", "AMD"]);
        assert_eq!(selection.highlighted_index(), 1);
        assert_eq!(selection.remove_highlighted().unwrap().symbol, "AMD");
    }

    #[test]
    fn test_remove_any_highlighted_entry() {
        let mut selection = Selection::new();
        for symbol in ["AAPL", "MSFT", "TSLA"] {
            selection.add(DirectoryEntry::new(symbol, ""));
        }

        selection.prev();
        selection.prev();
        assert_eq!(selection.remove_highlighted().unwrap().symbol, "AAPL");
        assert_eq!(selection.symbols(), vec!["MSFT", "TSLA"]);
        assert_eq!(selection.highlighted_index(), 0);

        selection.next();
        assert_eq!(selection.remove_highlighted().unwrap().symbol, "TSLA");
        assert_eq!(selection.highlighted_index(), 0);
        assert_eq!(selection.remove_highlighted().unwrap().symbol, "MSFT");
        assert!(selection.remove_highlighted().is_none());
        assert!(selection.is_empty());
    }
}
