mod test_support;

use serde_json::json;
use test_support::{
    data_len, fetch_params, request_err_code, request_ok, seed_assignment, spawn_sidecar,
    temp_dir, usize_field,
};

fn first_row_cell(envelope: &serde_json::Value, cell: usize) -> String {
    envelope
        .get("data")
        .and_then(|v| v.get(0))
        .and_then(|r| r.get("cells"))
        .and_then(|c| c.get(cell))
        .and_then(|v| v.as_str())
        .expect("first row cell")
        .to_string()
}

#[test]
fn fetch_pages_through_groups_and_keeps_total_size() {
    let workspace = temp_dir("filtertable-fetch-pages");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seeded = seed_assignment(&mut stdin, &mut reader, 45);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.fetch",
        fetch_params(&seeded, json!({})),
    );
    assert_eq!(usize_field(&first, "totalSize"), 45);
    assert_eq!(usize_field(&first, "filteredSize"), 45);
    assert_eq!(usize_field(&first, "currentPage"), 0);
    assert_eq!(usize_field(&first, "perPage"), 20);
    assert_eq!(data_len(&first), 20);
    assert_eq!(first_row_cell(&first, 2), "group 0");

    let last = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "table.fetch",
        fetch_params(&seeded, json!({ "gotopage": "2" })),
    );
    assert_eq!(usize_field(&last, "currentPage"), 2);
    assert_eq!(data_len(&last), 5);
    assert_eq!(first_row_cell(&last, 2), "group 40");

    let past_end = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "table.fetch",
        fetch_params(&seeded, json!({ "gotopage": 99 })),
    );
    assert_eq!(usize_field(&past_end, "totalSize"), 45);
    assert_eq!(usize_field(&past_end, "filteredSize"), 45);
    assert_eq!(data_len(&past_end), 0);

    let bigger = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "table.fetch",
        fetch_params(&seeded, json!({ "gotopage": "0", "perpage": "50" })),
    );
    assert_eq!(usize_field(&bigger, "perPage"), 50);
    assert_eq!(data_len(&bigger), 45);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn status_filter_and_search_compose() {
    let workspace = temp_dir("filtertable-fetch-filters");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seeded = seed_assignment(&mut stdin, &mut reader, 45);

    // Label 2 is "Not corrected", status 1.
    let not_corrected = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.fetch",
        fetch_params(&seeded, json!({ "filter_selected_0": "2" })),
    );
    assert_eq!(usize_field(&not_corrected, "totalSize"), 45);
    assert_eq!(usize_field(&not_corrected, "filteredSize"), 11);
    let status_view = not_corrected
        .get("filterView")
        .and_then(|v| v.get(0))
        .expect("status filter view");
    assert_eq!(status_view.get("selected"), Some(&json!([2])));
    assert_eq!(status_view.get("multiSelect"), Some(&json!(true)));
    assert_eq!(
        status_view
            .get("labels")
            .and_then(|l| l.get(2))
            .cloned(),
        Some(json!({ "selected": true, "label": "Not corrected" }))
    );

    // cand01, cand05 and cand09 match both.
    let narrowed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "table.fetch",
        fetch_params(&seeded, json!({ "search": "cand0" })),
    );
    assert_eq!(narrowed.get("search"), Some(&json!("cand0")));
    assert_eq!(usize_field(&narrowed, "filteredSize"), 3);
    assert_eq!(usize_field(&narrowed, "totalSize"), 45);
    let names: Vec<String> = narrowed
        .get("data")
        .and_then(|v| v.as_array())
        .expect("data")
        .iter()
        .filter_map(|r| r.get("cells").and_then(|c| c.get(0)).and_then(|v| v.as_str()))
        .map(str::to_string)
        .collect();
    assert_eq!(names, vec!["cand01", "cand05", "cand09"]);

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "table.fetch",
        fetch_params(&seeded, json!({ "search": "", "filter_selected_0": "0" })),
    );
    assert_eq!(usize_field(&cleared, "filteredSize"), 45);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn examiner_facet_lists_examiners_and_filters_by_them() {
    let workspace = temp_dir("filtertable-fetch-examiners");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seeded = seed_assignment(&mut stdin, &mut reader, 12);

    let unassigned = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.fetch",
        fetch_params(&seeded, json!({ "filter_selected_1": "1" })),
    );
    let labels: Vec<&str> = unassigned
        .get("filterView")
        .and_then(|v| v.get(1))
        .and_then(|f| f.get("labels"))
        .and_then(|l| l.as_array())
        .expect("examiner labels")
        .iter()
        .filter_map(|l| l.get("label").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(labels, vec!["All", "No examiners", "ex1", "ex2"]);
    assert_eq!(usize_field(&unassigned, "filteredSize"), 4);
    let first = unassigned
        .get("data")
        .and_then(|v| v.get(0))
        .expect("first row");
    assert_eq!(first.get("styleClass"), Some(&json!("no-examiners")));

    let ex2 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "table.fetch",
        fetch_params(&seeded, json!({ "filter_selected_1": "3" })),
    );
    assert_eq!(usize_field(&ex2, "filteredSize"), 4);
    assert_eq!(first_row_cell(&ex2, 1), "ex2");
    assert_eq!(first_row_cell(&ex2, 2), "group 2");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "table.fetch",
        fetch_params(&seeded, json!({ "filter_selected_1": "4" })),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn ordering_by_status_toggles_direction() {
    let workspace = temp_dir("filtertable-fetch-order");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seeded = seed_assignment(&mut stdin, &mut reader, 8);

    let asc = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.fetch",
        fetch_params(&seeded, json!({ "order_by": "3" })),
    );
    assert_eq!(first_row_cell(&asc, 3), "No deliveries");
    assert_eq!(first_row_cell(&asc, 2), "group 0");

    let desc = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "table.fetch",
        fetch_params(&seeded, json!({ "order_by": "3" })),
    );
    assert_eq!(first_row_cell(&desc, 3), "Corrected and published");
    assert_eq!(first_row_cell(&desc, 2), "group 3");

    let sticky = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "table.fetch",
        fetch_params(&seeded, json!({})),
    );
    assert_eq!(first_row_cell(&sticky, 2), "group 3");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "table.fetch",
        fetch_params(&seeded, json!({ "order_by": "0" })),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn envelope_carries_columns_and_actions() {
    let workspace = temp_dir("filtertable-fetch-envelope");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seeded = seed_assignment(&mut stdin, &mut reader, 2);
    let a = seeded.assignment_id.clone();

    let env = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "table.fetch",
        fetch_params(&seeded, json!({})),
    );
    assert_eq!(
        env.get("columns"),
        Some(&json!([
            { "title": "Candidates", "sortable": false },
            { "title": "Examiners", "sortable": false },
            { "title": "Name", "sortable": false },
            { "title": "Status", "sortable": true },
        ]))
    );
    assert_eq!(env.get("useRowActions"), Some(&json!(true)));
    assert_eq!(
        env.get("selectionActions").and_then(|v| v.get(1)),
        Some(&json!({
            "label": "Set examiners",
            "url": format!("/admin/assignment/{a}/examiners/set"),
            "cssClasses": [],
            "confirm": {
                "title": "Set examiners",
                "buttonLabel": "Replace examiners",
                "confirmMessage": "Set examiners for the selected groups in Oblig 1?",
            },
        }))
    );
    assert_eq!(
        env.get("relatedActions").and_then(|v| v.get(0)),
        Some(&json!({
            "label": "Create new",
            "url": format!("/admin/assignment/{a}/group/create"),
            "cssClasses": ["primary"],
        }))
    );

    let g = seeded.group_ids[1].clone();
    let row = env.get("data").and_then(|v| v.get(1)).expect("second row");
    assert_eq!(row.get("id"), Some(&json!(g)));
    assert_eq!(
        row.get("cells"),
        Some(&json!(["cand01", "ex1", "group 1", "Not corrected"]))
    );
    assert_eq!(
        row.get("actions"),
        Some(&json!([
            { "label": "edit", "url": format!("/admin/assignment/{a}/group/{g}/edit") },
            { "label": "examine", "url": format!("/examiner/group/{g}") },
        ]))
    );

    let _ = std::fs::remove_dir_all(workspace);
}
