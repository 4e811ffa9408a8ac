use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::TableError;
use super::filter::{Filter, ALL};

/// Per-table defaults applied the first time a user opens a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDefaults {
    pub current_page: usize,
    pub per_page: usize,
    pub order_by: Option<usize>,
    pub order_asc: bool,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            current_page: 0,
            per_page: 20,
            order_by: None,
            order_asc: false,
        }
    }
}

/// What a user is currently looking at in one table. Sticky across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub search: String,
    pub order_by: Option<usize>,
    pub order_asc: bool,
    /// Filter index -> selected label indices. Missing index means `[ALL]`.
    #[serde(default)]
    pub filters: BTreeMap<usize, Vec<usize>>,
    pub current_page: usize,
    pub per_page: usize,
}

impl SessionState {
    pub fn new(defaults: &SessionDefaults) -> Self {
        Self {
            search: String::new(),
            order_by: defaults.order_by,
            order_asc: defaults.order_asc,
            filters: BTreeMap::new(),
            current_page: defaults.current_page,
            per_page: defaults.per_page,
        }
    }

    pub fn filter_selection(&self, index: usize) -> &[usize] {
        match self.filters.get(&index) {
            Some(selected) => selected.as_slice(),
            None => &[ALL],
        }
    }

    /// Applies one request's parameters. Fields without a parameter are left as they are.
    pub fn merge<C, D>(&mut self, params: &TableParams, filters: &[Box<dyn Filter<C, D>>]) {
        if let Some(page) = params.goto_page {
            self.current_page = page;
        }
        if let Some(per_page) = params.per_page {
            self.per_page = per_page;
        }
        if let Some(search) = &params.search {
            self.search = search.clone();
        }
        if let Some(column) = params.order_by {
            if self.order_by == Some(column) {
                self.order_asc = !self.order_asc;
            } else {
                self.order_by = Some(column);
                self.order_asc = true;
            }
        }
        for (i, filter) in filters.iter().enumerate() {
            let current = self.filter_selection(i).to_vec();
            let selected = filter.get_selected(&current, params.filter_selected.get(&i).copied());
            self.filters.insert(i, selected);
        }
    }

    /// Resets selections that point past the end of a filter's labels back to `[ALL]`.
    ///
    /// Labels can shrink between requests (an examiner leaves the assignment), and a
    /// stored index that no longer exists must not wedge every later request.
    pub fn drop_stale_selections(&mut self, label_counts: &[usize]) -> bool {
        let mut changed = false;
        for (i, count) in label_counts.iter().enumerate() {
            if let Some(selected) = self.filters.get_mut(&i) {
                if selected.iter().any(|s| s >= count) {
                    *selected = vec![ALL];
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Request parameters as a browser sends them: mostly strings, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestQuery(Map<String, Value>);

impl RequestQuery {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builds a query from `params.<key>`. Missing or null means an empty query.
    pub fn from_params(params: &Value, key: &str) -> Result<Self, TableError> {
        match params.get(key) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self::new(map.clone())),
            Some(other) => Err(TableError::bad_param(
                key,
                other.to_string(),
                "expected an object of request parameters",
            )),
        }
    }

    /// Scalar parameter as text. Numbers are accepted and rendered as written.
    pub fn get(&self, name: &str) -> Result<Option<String>, TableError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(TableError::bad_param(
                name,
                other.to_string(),
                "expected a single value",
            )),
        }
    }

    /// Multi-valued parameter, e.g. a checkbox group. A scalar counts as one value.
    pub fn get_list(&self, name: &str) -> Result<Vec<String>, TableError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(TableError::bad_param(
                        name,
                        other.to_string(),
                        "expected strings",
                    )),
                })
                .collect(),
            Some(_) => Ok(self.get(name)?.into_iter().collect()),
        }
    }

    fn get_index(&self, name: &str) -> Result<Option<usize>, TableError> {
        let Some(raw) = self.get(name)? else {
            return Ok(None);
        };
        match raw.parse::<usize>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(TableError::bad_param(
                name,
                raw,
                "expected a non-negative integer",
            )),
        }
    }
}

/// Largest page size a client may ask for.
pub const MAX_PER_PAGE: usize = 1000;

/// The state-mutating parameters of one request, fully parsed.
///
/// Parsing is all-or-nothing so a bad value never half-updates the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableParams {
    pub goto_page: Option<usize>,
    pub per_page: Option<usize>,
    pub search: Option<String>,
    pub order_by: Option<usize>,
    pub filter_selected: BTreeMap<usize, usize>,
}

impl TableParams {
    pub fn parse(query: &RequestQuery, filter_count: usize) -> Result<Self, TableError> {
        let goto_page = query.get_index("gotopage")?;
        let per_page = query.get_index("perpage")?;
        match per_page {
            Some(0) => return Err(TableError::bad_param("perpage", "0", "must be at least 1")),
            Some(n) if n > MAX_PER_PAGE => {
                return Err(TableError::bad_param(
                    "perpage",
                    n.to_string(),
                    format!("must be at most {MAX_PER_PAGE}"),
                ))
            }
            _ => {}
        }
        let search = query.get("search")?;
        let order_by = query.get_index("order_by")?;

        let mut filter_selected = BTreeMap::new();
        for i in 0..filter_count {
            if let Some(selected) = query.get_index(&filter_param(i))? {
                filter_selected.insert(i, selected);
            }
        }

        Ok(Self {
            goto_page,
            per_page,
            search,
            order_by,
            filter_selected,
        })
    }
}

pub fn filter_param(index: usize) -> String {
    format!("filter_selected_{index}")
}
