use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::query::{placeholders, SqlQuery};
use crate::table::{
    selects_all, Action, Column, Confirm, Filter, FilterTable, Row, TableError, TableSource,
};

pub const TABLE_ID: &str = "assignmentgroups";

/// Group status names, indexed by the stored status code.
pub const STATUS_LABELS: [&str; 4] = [
    "No deliveries",
    "Not corrected",
    "Corrected, not published",
    "Corrected and published",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub id: String,
    pub name: String,
}

pub struct GroupsContext<'c> {
    pub conn: &'c Connection,
    pub assignment: Assignment,
}

impl<'c> GroupsContext<'c> {
    /// Loads the assignment and checks that `user_id` administers it.
    pub fn open(
        conn: &'c Connection,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Self, TableError> {
        let assignment = conn
            .query_row(
                "SELECT id, name FROM assignments WHERE id = ?",
                [assignment_id],
                |r| {
                    Ok(Assignment {
                        id: r.get(0)?,
                        name: r.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| TableError::not_found("assignment", assignment_id))?;

        let is_admin: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM assignment_admins WHERE assignment_id = ? AND user_id = ?)",
            (assignment_id, user_id),
            |r| r.get(0),
        )?;
        if !is_admin {
            return Err(TableError::Forbidden(format!(
                "user {user_id} does not administer assignment {:?}",
                assignment.name
            )));
        }

        Ok(Self { conn, assignment })
    }

    pub fn json_url(&self) -> String {
        format!("/admin/assignment/{}/groups/table.json", self.assignment.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupItem {
    pub id: String,
    pub name: String,
    pub status: i64,
    pub candidates: Vec<String>,
    pub examiners: Vec<String>,
}

impl GroupItem {
    fn status_label(&self) -> &'static str {
        usize::try_from(self.status)
            .ok()
            .and_then(|s| STATUS_LABELS.get(s))
            .copied()
            .unwrap_or("Unknown")
    }
}

fn member_names(conn: &Connection, table: &str, group_id: &str) -> rusqlite::Result<Vec<String>> {
    let sql = format!(
        "SELECT u.username FROM {table} m JOIN users u ON u.id = m.user_id
         WHERE m.group_id = ? ORDER BY u.username"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([group_id], |r| r.get(0))?;
    let out = rows.collect::<rusqlite::Result<Vec<String>>>();
    out
}

fn load_members(conn: &Connection, group: &mut GroupItem) -> rusqlite::Result<()> {
    group.candidates = member_names(conn, "group_candidates", &group.id)?;
    group.examiners = member_names(conn, "group_examiners", &group.id)?;
    Ok(())
}

fn group_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<GroupItem> {
    Ok(GroupItem {
        id: r.get(0)?,
        name: r.get(1)?,
        status: r.get(2)?,
        candidates: Vec::new(),
        examiners: Vec::new(),
    })
}

pub struct AssignmentGroupsSource<'c> {
    conn: &'c Connection,
}

impl<'c> TableSource for AssignmentGroupsSource<'c> {
    type Context = GroupsContext<'c>;
    type Dataset = SqlQuery;
    type Item = GroupItem;

    fn create_dataset(&self, ctx: &GroupsContext<'c>) -> Result<(usize, SqlQuery), TableError> {
        let dataset = SqlQuery::new("g.id, g.name, g.status", "assignment_groups g")
            .filter(
                "g.assignment_id = ?",
                [Value::Text(ctx.assignment.id.clone())],
            )
            .order_by("g.rowid", true);
        let total = dataset.count(self.conn)?;
        Ok((total, dataset))
    }

    fn search(&self, dataset: SqlQuery, query: &str) -> Result<SqlQuery, TableError> {
        Ok(dataset.filter(
            "EXISTS (SELECT 1 FROM group_candidates gc JOIN users u ON u.id = gc.user_id
                     WHERE gc.group_id = g.id AND instr(u.username, ?) > 0)",
            [Value::Text(query.to_string())],
        ))
    }

    // Status is the only sortable column.
    fn order_by(
        &self,
        dataset: SqlQuery,
        _column: usize,
        ascending: bool,
    ) -> Result<SqlQuery, TableError> {
        Ok(dataset
            .order_by("g.status", ascending)
            .then_order_by("g.rowid", true))
    }

    fn limit(
        &self,
        dataset: SqlQuery,
        page: usize,
        per_page: usize,
    ) -> Result<(usize, Vec<GroupItem>), TableError> {
        let (filtered, mut groups) = dataset.paginate(self.conn, page, per_page, group_from_row)?;
        for group in &mut groups {
            load_members(self.conn, group)?;
        }
        Ok((filtered, groups))
    }

    fn create_row(&self, ctx: &GroupsContext<'c>, group: &GroupItem) -> Result<Row, TableError> {
        let cells = vec![
            group.candidates.join(", "),
            group.examiners.join(", "),
            group.name.clone(),
            group.status_label().to_string(),
        ];
        let mut row = Row::new(group.id.clone(), cells)
            .with_action(
                "edit",
                format!(
                    "/admin/assignment/{}/group/{}/edit",
                    ctx.assignment.id, group.id
                ),
            )
            .with_action("examine", format!("/examiner/group/{}", group.id));
        if group.examiners.is_empty() {
            row = row.with_style_class("no-examiners");
        }
        Ok(row)
    }
}

pub struct StatusFilter;

impl<'c> Filter<GroupsContext<'c>, SqlQuery> for StatusFilter {
    fn title(&self) -> &str {
        "Status"
    }

    fn multi_select(&self) -> bool {
        true
    }

    fn labels(&self, _ctx: &GroupsContext<'c>) -> Result<Vec<String>, TableError> {
        let mut labels = vec!["All".to_string()];
        labels.extend(STATUS_LABELS.iter().map(|s| s.to_string()));
        Ok(labels)
    }

    fn filter(
        &self,
        _ctx: &GroupsContext<'c>,
        dataset: SqlQuery,
        selected: &[usize],
    ) -> Result<SqlQuery, TableError> {
        if selects_all(selected) {
            return Ok(dataset);
        }
        let statuses: Vec<Value> = selected
            .iter()
            .map(|&i| Value::Integer(i as i64 - 1))
            .collect();
        Ok(dataset.filter(
            format!("g.status IN ({})", placeholders(statuses.len())),
            statuses,
        ))
    }
}

pub struct ExaminerFilter;

impl ExaminerFilter {
    fn examiners(ctx: &GroupsContext<'_>) -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = ctx.conn.prepare(
            "SELECT DISTINCT u.id, u.username
             FROM users u
             JOIN group_examiners ge ON ge.user_id = u.id
             JOIN assignment_groups g ON g.id = ge.group_id
             WHERE g.assignment_id = ?
             ORDER BY u.username",
        )?;
        let rows = stmt.query_map([&ctx.assignment.id], |r| Ok((r.get(0)?, r.get(1)?)))?;
        let out = rows.collect::<rusqlite::Result<Vec<_>>>();
        out
    }
}

impl<'c> Filter<GroupsContext<'c>, SqlQuery> for ExaminerFilter {
    fn title(&self) -> &str {
        "Examiners"
    }

    fn labels(&self, ctx: &GroupsContext<'c>) -> Result<Vec<String>, TableError> {
        let mut labels = vec!["All".to_string(), "No examiners".to_string()];
        labels.extend(Self::examiners(ctx)?.into_iter().map(|(_, name)| name));
        Ok(labels)
    }

    fn filter(
        &self,
        ctx: &GroupsContext<'c>,
        dataset: SqlQuery,
        selected: &[usize],
    ) -> Result<SqlQuery, TableError> {
        if selects_all(selected) {
            return Ok(dataset);
        }
        let examiners = Self::examiners(ctx)?;
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        for &i in selected {
            if i == 1 {
                clauses.push(
                    "NOT EXISTS (SELECT 1 FROM group_examiners ge WHERE ge.group_id = g.id)",
                );
                continue;
            }
            let (user_id, _) = examiners
                .get(i - 2)
                .ok_or_else(|| TableError::not_found("examiner", i.to_string()))?;
            clauses.push(
                "EXISTS (SELECT 1 FROM group_examiners ge WHERE ge.group_id = g.id AND ge.user_id = ?)",
            );
            params.push(Value::Text(user_id.clone()));
        }
        Ok(dataset.filter(clauses.join(" OR "), params))
    }
}

/// Bulk or navigational action scoped to the assignment in the context.
pub struct AssignmentAction {
    label: &'static str,
    path: &'static str,
    css: &'static [&'static str],
    confirm: Option<Confirm>,
}

impl AssignmentAction {
    fn new(label: &'static str, path: &'static str) -> Self {
        Self {
            label,
            path,
            css: &[],
            confirm: None,
        }
    }

    fn with_css(mut self, css: &'static [&'static str]) -> Self {
        self.css = css;
        self
    }

    fn confirmed(mut self, confirm: Confirm) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

impl<'c> Action<GroupsContext<'c>> for AssignmentAction {
    fn label(&self) -> &str {
        self.label
    }

    fn css_classes(&self) -> &[&'static str] {
        self.css
    }

    fn url(&self, ctx: &GroupsContext<'c>) -> String {
        format!("/admin/assignment/{}/{}", ctx.assignment.id, self.path)
    }

    fn confirm(&self) -> Option<&Confirm> {
        self.confirm.as_ref()
    }

    fn confirm_message(&self, ctx: &GroupsContext<'c>) -> Option<String> {
        self.confirm.as_ref().map(|_| {
            format!(
                "{} for the selected groups in {}?",
                self.label, ctx.assignment.name
            )
        })
    }
}

pub fn table(conn: &Connection, per_page: usize) -> FilterTable<AssignmentGroupsSource<'_>> {
    let mut t = FilterTable::new(TABLE_ID, AssignmentGroupsSource { conn });
    t.columns = vec![
        Column::new("Candidates"),
        Column::new("Examiners"),
        Column::new("Name"),
        Column::sortable("Status"),
    ];
    t.filters = vec![Box::new(StatusFilter), Box::new(ExaminerFilter)];
    t.selection_actions = vec![
        Box::new(AssignmentAction::new("Create/replace deadline", "deadline/create")),
        Box::new(
            AssignmentAction::new("Set examiners", "examiners/set")
                .confirmed(Confirm::new("Set examiners", "Replace examiners")),
        ),
    ];
    t.related_actions = vec![
        Box::new(AssignmentAction::new("Create new", "group/create").with_css(&["primary"])),
        Box::new(AssignmentAction::new("Create many (advanced)", "groups/create")),
        Box::new(AssignmentAction::new("Create by copy", "groups/copy")),
    ];
    t.use_row_actions = true;
    t.defaults.per_page = per_page;
    t
}

/// Resolves checkbox ids into groups of the assignment. Any unknown id fails the whole call.
pub fn selected_groups(
    ctx: &GroupsContext<'_>,
    ids: &[String],
) -> Result<Vec<GroupItem>, TableError> {
    let mut groups = Vec::with_capacity(ids.len());
    for id in ids {
        let group = ctx
            .conn
            .query_row(
                "SELECT id, name, status FROM assignment_groups WHERE id = ? AND assignment_id = ?",
                (id, &ctx.assignment.id),
                group_from_row,
            )
            .optional()?;
        let Some(mut group) = group else {
            return Err(TableError::not_found("assignment group", id.clone()));
        };
        load_members(ctx.conn, &mut group)?;
        groups.push(group);
    }
    Ok(groups)
}
