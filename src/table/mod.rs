//! Filterable, sortable, paginated tables with per-user sticky view state.

mod action;
mod engine;
mod error;
mod filter;
mod model;
mod session;
mod store;

pub use action::{Action, Confirm};
pub use engine::{FilterTable, TableSource};
pub use error::TableError;
pub use filter::{selects_all, Filter};
pub use model::{Column, Row};
pub use session::RequestQuery;
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
