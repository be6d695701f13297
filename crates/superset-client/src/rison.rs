//! Rison encoding of list queries.
//!
//! Superset list endpoints take their paging and filters in a single `q`
//! query parameter written in [Rison](https://github.com/Nanonid/rison),
//! e.g. `(filters:!((col:username,opr:eq,value:'alice')),page:0,page_size:100)`.

/// A single `col opr value` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column to filter on.
    pub col: &'static str,
    /// Operator, e.g. `eq`.
    pub opr: &'static str,
    /// Value to compare against.
    pub value: String,
}

impl Filter {
    /// Equality filter.
    pub fn eq(col: &'static str, value: impl Into<String>) -> Self {
        Self {
            col,
            opr: "eq",
            value: value.into(),
        }
    }
}

/// Paging and filters of one list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Filters, combined with AND.
    pub filters: Vec<Filter>,
    /// Zero-based page number.
    pub page: Option<usize>,
    /// Page size.
    pub page_size: Option<usize>,
}

impl ListQuery {
    /// Query for one page.
    #[must_use]
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            filters: Vec::new(),
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Query matching `col == value`.
    #[must_use]
    pub fn filter_eq(col: &'static str, value: impl Into<String>) -> Self {
        Self {
            filters: vec![Filter::eq(col, value)],
            page: None,
            page_size: None,
        }
    }

    /// Encode as a Rison object.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut fields = Vec::new();

        if !self.filters.is_empty() {
            let filters: Vec<String> = self
                .filters
                .iter()
                .map(|f| {
                    format!(
                        "(col:{},opr:{},value:{})",
                        f.col,
                        f.opr,
                        quote(&f.value)
                    )
                })
                .collect();
            fields.push(format!("filters:!({})", filters.join(",")));
        }
        if let Some(page) = self.page {
            fields.push(format!("page:{page}"));
        }
        if let Some(page_size) = self.page_size {
            fields.push(format!("page_size:{page_size}"));
        }

        format!("({})", fields.join(","))
    }
}

/// Quote a string value, escaping `!` and `'` with `!`.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '!' || ch == '\'' {
            out.push('!');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}
