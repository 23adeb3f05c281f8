use serde::{Deserialize, Serialize};

use crate::params::{FilterParams, PAGE_KEY, SELECT_KEY, SIZE_KEY, SORT_KEY};
use crate::{SieveError, SieveResult};

pub const MIN_PAGE_SIZE: u64 = 1;
pub const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub ascending: bool,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

pub fn parse_sort(raw: &str) -> Vec<SortOrder> {
    let mut orders = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let lower = token.to_ascii_lowercase();
        let (field, ascending) = if let Some(rest) = token.strip_prefix('-') {
            (rest, false)
        } else if let Some(rest) = token.strip_prefix('+') {
            (rest, true)
        } else if lower.ends_with(".desc") {
            (&token[..token.len() - 5], false)
        } else if lower.ends_with(".asc") {
            (&token[..token.len() - 4], true)
        } else {
            (token, true)
        };
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        orders.push(SortOrder {
            field: field.to_string(),
            ascending,
        });
    }
    orders
}

pub fn clamp_page_size(size: i64) -> u64 {
    size.clamp(MIN_PAGE_SIZE as i64, MAX_PAGE_SIZE as i64) as u64
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: u64,
    pub size: Option<u64>,
    pub sort: Vec<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

impl PageRequest {
    pub fn new(number: u64, size: u64) -> Self {
        Self {
            number,
            size: Some(clamp_page_size(size.min(i64::MAX as u64) as i64)),
            sort: Vec::new(),
        }
    }

    pub fn unpaged() -> Self {
        Self {
            number: 0,
            size: None,
            sort: Vec::new(),
        }
    }

    pub fn with_sort(mut self, sort: Vec<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    pub fn is_paged(&self) -> bool {
        self.size.is_some()
    }

    pub fn offset(&self) -> u64 {
        self.size
            .map(|size| self.number.saturating_mul(size))
            .unwrap_or(0)
    }

    pub fn apply_params(mut self, params: &mut FilterParams) -> SieveResult<Self> {
        if let Some(raw) = params.remove(SORT_KEY) {
            let sort = parse_sort(&raw);
            if !sort.is_empty() {
                self.sort = sort;
            }
        }
        if let Some(raw) = params.remove(SIZE_KEY) {
            let size = parse_int(SIZE_KEY, &raw)?;
            self.size = Some(clamp_page_size(size));
        }
        if let Some(raw) = params.remove(PAGE_KEY) {
            let number = parse_int(PAGE_KEY, &raw)?;
            self.number = number.max(0) as u64;
        }
        params.remove(SELECT_KEY);
        Ok(self)
    }
}

fn parse_int(key: &str, raw: &str) -> SieveResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|err| SieveError::invalid_value(key, raw, err.to_string()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub page_number: u64,
    pub page_size: u64,
}

impl<T> PageResult<T> {
    pub fn new(content: Vec<T>, total_elements: u64, page: &PageRequest) -> Self {
        let page_size = page.size.unwrap_or(content.len() as u64);
        Self {
            content,
            total_elements,
            page_number: page.number,
            page_size,
        }
    }

    pub fn empty(page: &PageRequest) -> Self {
        Self::new(Vec::new(), 0, page)
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return if self.total_elements == 0 { 0 } else { 1 };
        }
        self.total_elements.div_ceil(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page_number + 1 < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}
