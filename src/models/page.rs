use serde::Serialize;

/// One page of rows together with the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageList<T> {
    pub list: Vec<T>,
    pub record_count: i64,
}

impl<T> PageList<T> {
    pub fn new(list: Vec<T>, record_count: i64) -> Self {
        Self { list, record_count }
    }

    /// Convert every row, keeping the record count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageList<U> {
        PageList {
            list: self.list.into_iter().map(f).collect(),
            record_count: self.record_count,
        }
    }

    /// Number of pages needed for `record_count` rows at `page_size`.
    pub fn page_count(&self, page_size: u64) -> u64 {
        if page_size == 0 || self.record_count <= 0 {
            return 0;
        }
        (self.record_count as u64).div_ceil(page_size)
    }
}

impl<T> Default for PageList<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            record_count: 0,
        }
    }
}
