use serde::Serialize;
use tracing::{debug, warn};

use super::action::{Action, ActionView};
use super::error::TableError;
use super::filter::{selects_all, Filter, FilterView};
use super::model::{Column, Row};
use super::session::{filter_param, RequestQuery, SessionDefaults, SessionState, TableParams};
use super::store::SessionStore;

/// Dataset hooks of one concrete table. The pipeline order is fixed by [`FilterTable`].
pub trait TableSource {
    type Context;
    /// Composable, lazily evaluated view of the backing data.
    type Dataset;
    type Item;

    /// Unfiltered dataset and its cardinality.
    fn create_dataset(&self, ctx: &Self::Context) -> Result<(usize, Self::Dataset), TableError>;

    fn search(&self, dataset: Self::Dataset, query: &str) -> Result<Self::Dataset, TableError>;

    fn order_by(
        &self,
        dataset: Self::Dataset,
        _column: usize,
        _ascending: bool,
    ) -> Result<Self::Dataset, TableError> {
        Ok(dataset)
    }

    /// Count after search and filters, plus the elements of one page.
    fn limit(
        &self,
        dataset: Self::Dataset,
        page: usize,
        per_page: usize,
    ) -> Result<(usize, Vec<Self::Item>), TableError>;

    fn create_row(&self, ctx: &Self::Context, item: &Self::Item) -> Result<Row, TableError>;
}

pub type BoxedFilter<S> =
    Box<dyn Filter<<S as TableSource>::Context, <S as TableSource>::Dataset>>;
pub type BoxedAction<S> = Box<dyn Action<<S as TableSource>::Context>>;

/// The response body of one table request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub total_size: usize,
    pub filtered_size: usize,
    pub current_page: usize,
    pub per_page: usize,
    pub search: String,
    pub filter_view: Vec<FilterView>,
    pub columns: Vec<Column>,
    pub use_row_actions: bool,
    pub selection_actions: Vec<ActionView>,
    pub related_actions: Vec<ActionView>,
    pub data: Vec<Row>,
}

/// A filterable, sortable, paginated table over one [`TableSource`].
pub struct FilterTable<S: TableSource> {
    pub id: String,
    pub columns: Vec<Column>,
    pub filters: Vec<BoxedFilter<S>>,
    pub selection_actions: Vec<BoxedAction<S>>,
    pub related_actions: Vec<BoxedAction<S>>,
    pub use_row_actions: bool,
    pub defaults: SessionDefaults,
    pub source: S,
}

impl<S: TableSource> FilterTable<S> {
    pub fn new(id: impl Into<String>, source: S) -> Self {
        Self {
            id: id.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            selection_actions: Vec::new(),
            related_actions: Vec::new(),
            use_row_actions: false,
            defaults: SessionDefaults::default(),
            source,
        }
    }

    /// Name of the checkbox group carrying selected row ids for bulk actions.
    pub fn checkbox_name(&self) -> String {
        format!("{}-checkbox", self.id)
    }

    pub fn selected_ids(&self, query: &RequestQuery) -> Result<Vec<String>, TableError> {
        query.get_list(&self.checkbox_name())
    }

    /// Stored state for `user_id`, or the table defaults on a first visit.
    pub fn session(
        &self,
        store: &dyn SessionStore,
        user_id: &str,
    ) -> Result<SessionState, TableError> {
        let stored = store.load(user_id, &self.id).map_err(TableError::Store)?;
        Ok(stored.unwrap_or_else(|| SessionState::new(&self.defaults)))
    }

    /// Merges the request into the user's session, persists it, then runs the pipeline.
    ///
    /// The session is saved before any dataset hook runs, so a failing query still
    /// keeps the user's navigation.
    pub fn produce_response(
        &self,
        ctx: &S::Context,
        query: &RequestQuery,
        store: &mut dyn SessionStore,
        user_id: &str,
    ) -> Result<Envelope, TableError> {
        let params = TableParams::parse(query, self.filters.len())?;
        let labels = self.filter_labels(ctx)?;
        self.validate(&params, &labels)?;

        let mut state = self.session(&*store, user_id)?;
        state.merge(&params, &self.filters);
        let counts: Vec<usize> = labels.iter().map(Vec::len).collect();
        if state.drop_stale_selections(&counts) {
            warn!(table = %self.id, user = user_id, "stale filter selection reset to all");
        }
        store
            .save(user_id, &self.id, &state)
            .map_err(TableError::Store)?;
        debug!(table = %self.id, user = user_id, ?state, "session merged");

        self.run(ctx, &state, &labels)
    }

    fn filter_labels(&self, ctx: &S::Context) -> Result<Vec<Vec<String>>, TableError> {
        self.filters.iter().map(|f| f.labels(ctx)).collect()
    }

    fn validate(&self, params: &TableParams, labels: &[Vec<String>]) -> Result<(), TableError> {
        if let Some(column) = params.order_by {
            match self.columns.get(column) {
                Some(c) if c.sortable => {}
                Some(c) => {
                    return Err(TableError::bad_param(
                        "order_by",
                        column.to_string(),
                        format!("column {:?} is not sortable", c.title),
                    ))
                }
                None => {
                    return Err(TableError::bad_param(
                        "order_by",
                        column.to_string(),
                        format!("table has {} columns", self.columns.len()),
                    ))
                }
            }
        }
        for (&i, &selected) in &params.filter_selected {
            let count = labels.get(i).map(Vec::len).unwrap_or(0);
            if selected >= count {
                return Err(TableError::bad_param(
                    filter_param(i),
                    selected.to_string(),
                    format!("filter has {count} labels"),
                ));
            }
        }
        Ok(())
    }

    fn run(
        &self,
        ctx: &S::Context,
        state: &SessionState,
        labels: &[Vec<String>],
    ) -> Result<Envelope, TableError> {
        let (total_size, dataset) = self.source.create_dataset(ctx)?;

        let filter_view = self
            .filters
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (f, labels))| FilterView::new(f.as_ref(), labels, state.filter_selection(i)))
            .collect();

        let mut dataset = if state.search.is_empty() {
            dataset
        } else {
            self.source.search(dataset, &state.search)?
        };

        for (i, f) in self.filters.iter().enumerate() {
            let selected = state.filter_selection(i);
            if !selects_all(selected) {
                dataset = f.filter(ctx, dataset, selected)?;
            }
        }

        if let Some(column) = state.order_by {
            dataset = self.source.order_by(dataset, column, state.order_asc)?;
        }

        let (filtered_size, page) =
            self.source
                .limit(dataset, state.current_page, state.per_page)?;

        let data = page
            .iter()
            .map(|item| self.source.create_row(ctx, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Envelope {
            total_size,
            filtered_size,
            current_page: state.current_page,
            per_page: state.per_page,
            search: state.search.clone(),
            filter_view,
            columns: self.columns.clone(),
            use_row_actions: self.use_row_actions,
            selection_actions: self
                .selection_actions
                .iter()
                .map(|a| ActionView::new(a.as_ref(), ctx))
                .collect(),
            related_actions: self
                .related_actions
                .iter()
                .map(|a| ActionView::new(a.as_ref(), ctx))
                .collect(),
            data,
        })
    }
}
