//! The scan-level page list of an Index page.

use std::collections::HashMap;

/// One scanned page of an Index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageListEntry {
    /// Page number within the scan file, when the href carries one.
    pub number: Option<u32>,
    /// Human-readable label (roman numerals, "Cover", ...). For lists built
    /// from the API this is the page number, since the API does not expose
    /// the label.
    pub label: String,
    /// Proofreading quality 0-4, if known.
    pub quality: Option<u8>,
    /// Full page title, e.g. `Page:Foo.djvu/12`.
    pub title: Option<String>,
    /// Absolute URL of the page.
    pub url: String,
}

impl PageListEntry {
    /// Lookup key of the form `page-<number>`.
    #[must_use]
    pub fn key(&self) -> String {
        match self.number {
            Some(number) => format!("page-{number}"),
            None => "page-".to_string(),
        }
    }

    fn field_text(&self, field: PageListField) -> Option<String> {
        match field {
            PageListField::Number => self.number.map(|n| n.to_string()),
            PageListField::Label => Some(self.label.clone()),
            PageListField::Quality => self.quality.map(|q| q.to_string()),
            PageListField::Title => self.title.clone(),
            PageListField::Url => Some(self.url.clone()),
        }
    }
}

/// Field to search by in [`PageList::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageListField {
    /// Page number.
    #[default]
    Number,
    /// Display label.
    Label,
    /// Quality digit.
    Quality,
    /// Page title.
    Title,
    /// Page URL.
    Url,
}

/// Ordered page list with lookup by `page-<number>` key.
///
/// An entry whose key repeats an earlier one replaces it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageList {
    entries: Vec<PageListEntry>,
    positions: HashMap<String, usize>,
}

impl PageList {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in page-list order.
    pub fn iter(&self) -> std::slice::Iter<'_, PageListEntry> {
        self.entries.iter()
    }

    /// Entry stored under `key` (`page-<number>`).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PageListEntry> {
        self.positions.get(key).map(|&i| &self.entries[i])
    }

    /// Entry for page `number`.
    #[must_use]
    pub fn by_number(&self, number: u32) -> Option<&PageListEntry> {
        self.get(&format!("page-{number}"))
    }

    /// First entry whose `field` equals `value` as text.
    #[must_use]
    pub fn find(&self, field: PageListField, value: &str) -> Option<&PageListEntry> {
        self.entries
            .iter()
            .find(|entry| entry.field_text(field).as_deref() == Some(value))
    }

    /// Lowest nonzero quality across the entries.
    #[must_use]
    pub fn quality(&self) -> Option<u8> {
        self.entries
            .iter()
            .filter_map(|entry| entry.quality)
            .filter(|&q| q > 0)
            .min()
    }

    fn insert(&mut self, entry: PageListEntry) {
        let key = entry.key();
        if let Some(&i) = self.positions.get(&key) {
            self.entries[i] = entry;
        } else {
            self.positions.insert(key, self.entries.len());
            self.entries.push(entry);
        }
    }
}

impl FromIterator<PageListEntry> for PageList {
    fn from_iter<I: IntoIterator<Item = PageListEntry>>(iter: I) -> Self {
        let mut list = Self::default();
        for entry in iter {
            list.insert(entry);
        }
        list
    }
}

impl<'a> IntoIterator for &'a PageList {
    type Item = &'a PageListEntry;
    type IntoIter = std::slice::Iter<'a, PageListEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
