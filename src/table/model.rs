use serde::Serialize;

/// Static column description. Defines the response shape of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub title: String,
    pub sortable: bool,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sortable: false,
        }
    }

    pub fn sortable(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sortable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAction {
    pub label: String,
    pub url: String,
}

/// One rendered dataset element. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: String,
    pub cells: Vec<String>,
    pub style_class: Option<String>,
    pub actions: Vec<RowAction>,
}

impl Row {
    pub fn new(id: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            id: id.into(),
            cells,
            style_class: None,
            actions: Vec::new(),
        }
    }

    pub fn with_style_class(mut self, class: impl Into<String>) -> Self {
        self.style_class = Some(class.into());
        self
    }

    pub fn with_action(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.actions.push(RowAction {
            label: label.into(),
            url: url.into(),
        });
        self
    }
}
