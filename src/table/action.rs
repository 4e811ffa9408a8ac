use serde::Serialize;

/// Client-side confirmation shown before an action is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirm {
    pub title: String,
    pub button_label: String,
    pub confirm_message: Option<String>,
}

impl Confirm {
    pub fn new(title: impl Into<String>, button_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            button_label: button_label.into(),
            confirm_message: None,
        }
    }
}

/// Bulk (selection) or related (navigational) operation offered by a table.
///
/// The context type is fixed per table, so URL resolution cannot miss a key.
pub trait Action<C> {
    fn label(&self) -> &str;

    fn css_classes(&self) -> &[&'static str] {
        &[]
    }

    fn url(&self, ctx: &C) -> String;

    fn confirm(&self) -> Option<&Confirm> {
        None
    }

    /// Per-context message; overrides the static one on [`Confirm`].
    fn confirm_message(&self, _ctx: &C) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
    pub label: String,
    pub url: String,
    pub css_classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirm>,
}

impl ActionView {
    pub fn new<C>(action: &dyn Action<C>, ctx: &C) -> Self {
        let confirm = action.confirm().map(|c| {
            let mut c = c.clone();
            if let Some(message) = action.confirm_message(ctx) {
                c.confirm_message = Some(message);
            }
            c
        });
        Self {
            label: action.label().to_string(),
            url: action.url(ctx),
            css_classes: action.css_classes().iter().map(|c| c.to_string()).collect(),
            confirm,
        }
    }
}
