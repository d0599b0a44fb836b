//! Human-readable names for numeric codes
//!
//! Tables only carry numeric event and status codes. Display text lives with
//! the caller and is looked up through `DescriptionLookup`.

use std::collections::HashMap;

/// Maps a numeric code to display text
pub trait DescriptionLookup {
    fn describe(&self, id: u32) -> Option<&str>;
}

/// Fixed map of codes to descriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDescriptions {
    entries: HashMap<u32, String>,
}

impl StaticDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: u32, description: impl Into<String>) -> Self {
        self.insert(id, description);
        self
    }

    pub fn insert(&mut self, id: u32, description: impl Into<String>) {
        self.entries.insert(id, description.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DescriptionLookup for StaticDescriptions {
    fn describe(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for StaticDescriptions {
    fn from_iter<T: IntoIterator<Item = (u32, S)>>(iter: T) -> Self {
        let mut descriptions = Self::new();
        for (id, description) in iter {
            descriptions.insert(id, description);
        }
        descriptions
    }
}

impl<L: DescriptionLookup + ?Sized> DescriptionLookup for &L {
    fn describe(&self, id: u32) -> Option<&str> {
        (**self).describe(id)
    }
}
