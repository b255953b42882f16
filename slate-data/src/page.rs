use serde::{Deserialize, Serialize};

/// Pagination parameters.
///
/// `sort` is `"column"` or `"column,asc"` / `"column,desc"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort: None,
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Rows to skip. Saturates, so an absurd `page` reads past the end
    /// instead of overflowing.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// Split `sort` into `(column, ascending)`. Direction defaults to ascending;
    /// anything other than `desc` (case-insensitive) reads as ascending.
    pub fn sort_order(&self) -> Option<(String, bool)> {
        let sort = self.sort.as_deref()?.trim();
        if sort.is_empty() {
            return None;
        }
        let (column, direction) = match sort.split_once(',') {
            Some((column, direction)) => (column.trim(), direction.trim()),
            None => (sort, "asc"),
        };
        Some((column.to_string(), !direction.eq_ignore_ascii_case("desc")))
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.size == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.size)
        };
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total_elements,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let pageable = Pageable::new(0, 20);
        let page = Page::new(vec![1, 2, 3], &pageable, 41);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
    }

    #[test]
    fn zero_size_has_no_pages() {
        let page: Page<u8> = Page::new(vec![], &Pageable::new(0, 0), 10);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn offset_is_page_times_size() {
        assert_eq!(Pageable::new(3, 25).offset(), 75);
    }

    #[test]
    fn huge_page_number_saturates() {
        let pageable = Pageable::new(u64::MAX, 20);
        assert_eq!(pageable.offset(), u64::MAX);

        let page: Page<u8> = Page::new(vec![], &pageable, 5);
        assert_eq!(page.page, u64::MAX);
        assert!(!page.has_next());
    }

    #[test]
    fn sort_order_parsing() {
        let p = Pageable::default().sorted_by("name,DESC");
        assert_eq!(p.sort_order(), Some(("name".to_string(), false)));
        let p = Pageable::default().sorted_by("email");
        assert_eq!(p.sort_order(), Some(("email".to_string(), true)));
        assert_eq!(Pageable::default().sorted_by("  ").sort_order(), None);
        assert_eq!(Pageable::default().sort_order(), None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let p: Pageable = serde_json::from_str(r#"{"page": 2}"#).unwrap();
        assert_eq!(p, Pageable::new(2, 20));
    }

    #[test]
    fn page_serializes_metadata() {
        let page = Page::new(vec!["a"], &Pageable::new(0, 1), 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["total_elements"], 1);
        assert_eq!(json["content"][0], "a");
    }
}
