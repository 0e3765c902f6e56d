use crate::entry::Entry;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub search_text: String,
    pub category: Option<String>,
}

impl FilterCriteria {
    pub fn new(search_text: impl Into<String>, category: Option<String>) -> Self {
        Self {
            search_text: search_text.into(),
            category,
        }
    }

    pub fn active_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.search_text.is_empty() && self.active_category().is_none()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        let needle = self.search_text.to_lowercase();
        entry.name.to_lowercase().contains(&needle)
            && self
                .active_category()
                .map_or(true, |category| entry.has_category(category))
    }
}

pub fn apply(entries: &[Entry], criteria: &FilterCriteria) -> Vec<Entry> {
    entries
        .iter()
        .filter(|entry| criteria.matches(entry))
        .cloned()
        .collect()
}

pub fn matching_indices(entries: &[Entry], criteria: &FilterCriteria) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| criteria.matches(entry))
        .map(|(idx, _)| idx)
        .collect()
}

pub fn retain_category(entries: &mut Vec<Entry>, category: &str) {
    let category = category.trim();
    if category.is_empty() {
        return;
    }
    entries.retain(|entry| entry.has_category(category));
}
