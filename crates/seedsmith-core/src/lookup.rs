use std::collections::HashMap;

use crate::sql::first_quoted;

/// How names are compared when resolving ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    CaseInsensitive,
}

/// Lines of a list file that hold one quoted entry each, e.g. `('Acme'),`.
pub fn list_entries(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("('"))
}

/// Name to 1-based id table built from the order of a list file.
#[derive(Debug, Clone)]
pub struct LookupMap {
    ids: HashMap<String, usize>,
    mode: MatchMode,
    entries: usize,
    malformed: Vec<String>,
}

impl LookupMap {
    /// Build a map from a list file.
    ///
    /// Every entry line takes the next id, even when its name cannot be read,
    /// because the same file is inserted row for row into the table. The
    /// first occurrence of a repeated name keeps its id.
    pub fn from_list(text: &str, mode: MatchMode) -> Self {
        let mut ids = HashMap::new();
        let mut entries = 0;
        let mut malformed = Vec::new();

        for line in list_entries(text) {
            entries += 1;
            match first_quoted(line) {
                Some(name) => {
                    ids.entry(normalize(name, mode)).or_insert(entries);
                }
                None => malformed.push(line.to_string()),
            }
        }

        Self {
            ids,
            mode,
            entries,
            malformed,
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.ids.get(&normalize(name, self.mode)).copied()
    }

    /// Number of entry lines, including malformed ones.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Entry lines whose name could not be read.
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }
}

fn normalize(name: &str, mode: MatchMode) -> String {
    match mode {
        MatchMode::Exact => name.to_string(),
        MatchMode::CaseInsensitive => name.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRANDS: &str = "INSERT INTO `Brand` (`name`) VALUES\n('Acme'),\n('Globex'),\n('Broken),\n('acme');\n";

    #[test]
    fn ids_follow_line_order() {
        let map = LookupMap::from_list(BRANDS, MatchMode::Exact);
        assert_eq!(map.get("Acme"), Some(1));
        assert_eq!(map.get("Globex"), Some(2));
        assert_eq!(map.get("acme"), Some(4));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn malformed_lines_keep_their_slot() {
        let map = LookupMap::from_list(BRANDS, MatchMode::Exact);
        assert_eq!(map.malformed().to_vec(), vec!["('Broken),".to_string()]);
        assert_eq!(map.get("Broken"), None);
    }

    #[test]
    fn case_insensitive_keeps_first_id() {
        let map = LookupMap::from_list(BRANDS, MatchMode::CaseInsensitive);
        assert_eq!(map.get("ACME"), Some(1));
        assert_eq!(map.get("globex"), Some(2));
    }
}
