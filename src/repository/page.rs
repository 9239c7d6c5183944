use serde::Serialize;

/// One page of a cursor-paged listing.
///
/// `has_next` is true exactly when the page came back full, so a listing that
/// ends on a page boundary reports one extra, empty page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Id of the last document read; pass it back to fetch the next page.
    pub last_item_id: Option<String>,
    pub has_next: bool,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            last_item_id: None,
            has_next: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
