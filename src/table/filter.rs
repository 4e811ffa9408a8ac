use serde::Serialize;

use super::error::TableError;

/// Label index that means "no filtering". Always the first label of a filter.
pub const ALL: usize = 0;

/// A named predicate over a dataset, plus the facet labels a client picks from.
///
/// Filters are stateless; the selected label indices live in the session state.
/// `labels` and `filter` must agree on index semantics, with index [`ALL`]
/// meaning the dataset is returned unchanged.
pub trait Filter<C, D> {
    fn title(&self) -> &str;

    fn multi_select(&self) -> bool {
        false
    }

    /// Facet labels, `"All"` first.
    fn labels(&self, ctx: &C) -> Result<Vec<String>, TableError>;

    /// Restricts `dataset` to elements matching any of `selected`.
    fn filter(&self, ctx: &C, dataset: D, selected: &[usize]) -> Result<D, TableError>;

    /// Next selection given the current one and the index sent with this request.
    ///
    /// A new index always replaces the whole selection, even for multi-select filters.
    fn get_selected(&self, current: &[usize], selected: Option<usize>) -> Vec<usize> {
        match selected {
            None => current.to_vec(),
            Some(i) => vec![i],
        }
    }
}

/// True when a selection does not narrow the dataset.
pub fn selects_all(selected: &[usize]) -> bool {
    selected.is_empty() || selected.contains(&ALL)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetLabel {
    pub selected: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterView {
    pub title: String,
    pub multi_select: bool,
    pub selected: Vec<usize>,
    pub labels: Vec<FacetLabel>,
}

impl FilterView {
    pub fn new<C, D>(filter: &dyn Filter<C, D>, labels: &[String], selected: &[usize]) -> Self {
        Self {
            title: filter.title().to_string(),
            multi_select: filter.multi_select(),
            selected: selected.to_vec(),
            labels: labels
                .iter()
                .enumerate()
                .map(|(i, label)| FacetLabel {
                    selected: selected.contains(&i),
                    label: label.clone(),
                })
                .collect(),
        }
    }
}
