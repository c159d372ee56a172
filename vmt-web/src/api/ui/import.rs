//! CSV import page

use axum::{
    extract::{Multipart, Query, State},
    response::{Html, IntoResponse},
};
use vmt_common::db::models::VehicleName;
use vmt_common::db::vehicles;
use vmt_common::html::escape_html;
use vmt_common::parse::format_thousands;

use super::layout::{
    date_cell, failed_form, form_failure, page, vehicle_options, Banner, PageQuery, PageResult,
    Section,
};
use crate::api::transfer::{run_import, ImportUpload};
use crate::services::csv_import::DuplicateAction;
use crate::services::{DuplicatePolicy, ImportReport};
use crate::AppState;

fn import_form(names: &[VehicleName], selected: Option<i64>, policy: DuplicatePolicy) -> String {
    let replace = policy == DuplicatePolicy::Replace;
    format!(
        r#"<p>Columns are matched by header: date, mileage (or miles, odometer), description (or service), cost (or price, amount).
Dates may be written in most common formats; mileage like <code>45.5k</code> and costs with currency symbols are accepted.
Rows without a usable date are stored with an unknown date.</p>
<form method="post" action="/import" enctype="multipart/form-data">
<fieldset>
    <div class="field"><label>Vehicle</label><select name="vehicle_id" required>{vehicles}</select></div>
    <div class="field"><label>CSV file</label><input type="file" name="file" accept=".csv,text/csv" required></div>
    <div class="field"><label>Duplicates</label>
        <label><input type="radio" name="handle_duplicates" value="skip"{skip}>Skip rows matching an existing record</label>
        <label><input type="radio" name="handle_duplicates" value="replace"{replace_checked}>Replace the existing record</label>
    </div>
</fieldset>
<button type="submit">Import</button>
</form>"#,
        vehicles = vehicle_options(names, selected, Some("Select a vehicle")),
        skip = if replace { "" } else { " checked" },
        replace_checked = if replace { " checked" } else { "" },
    )
}

/// GET /import
pub async fn import_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let names = vehicles::vehicle_names(&state.db).await?;
    let body = import_form(&names, query.vehicle_filter(), DuplicatePolicy::default());
    Ok(Html(page("Import Maintenance CSV", Section::Import, query.banner(), &body)).into_response())
}

fn report_body(report: &ImportReport, vehicle_id: i64) -> String {
    let mut body = format!(
        r#"<div class="cards">
    <div class="card"><div class="muted">Rows read</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Imported</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Duplicates</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Replaced</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Skipped</div><div class="value">{}</div></div>
</div>"#,
        report.total_rows,
        report.imported_rows,
        report.duplicate_rows,
        report.replaced_rows,
        report.skipped_rows,
    );

    if !report.errors.is_empty() {
        body.push_str("<h3>Errors</h3><ul>");
        for e in &report.errors {
            body.push_str(&format!("<li class=\"high\">{}</li>", escape_html(e)));
        }
        body.push_str("</ul>");
    }
    if !report.notes.is_empty() {
        body.push_str("<h3>Notes</h3><ul>");
        for n in &report.notes {
            body.push_str(&format!("<li>{}</li>", escape_html(n)));
        }
        body.push_str("</ul>");
    }
    if !report.duplicate_details.is_empty() {
        body.push_str(
            r#"<h3>Duplicates</h3><table><tr><th>Row</th><th>Date</th><th class="num">Mileage</th><th>Description</th><th>Existing records</th><th>Action</th></tr>"#,
        );
        for d in &report.duplicate_details {
            let ids = d
                .existing_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let action = match d.action {
                DuplicateAction::Skipped => "skipped",
                DuplicateAction::Replaced => "replaced",
            };
            body.push_str(&format!(
                r#"<tr><td>{}</td><td>{}</td><td class="num">{}</td><td>{}</td><td>{ids}</td><td>{action}</td></tr>"#,
                d.row,
                d.date
                    .map(|date| date_cell(date, false))
                    .unwrap_or_else(|| r#"<span class="muted">Unknown</span>"#.to_string()),
                format_thousands(d.mileage),
                escape_html(&d.description),
            ));
        }
        body.push_str("</table>");
    }

    body.push_str(&format!(
        r#"<p><a class="button" href="/maintenance?vehicle_id={vehicle_id}">View records</a> <a href="/import">Import another file</a></p>"#
    ));
    body
}

/// POST /import
///
/// The result page lists counts, notes and every duplicate found.
pub async fn import_submit(State(state): State<AppState>, multipart: Multipart) -> PageResult {
    let upload = ImportUpload::read(multipart).await?;
    let vehicle_id = upload.vehicle_id.as_deref().and_then(|s| s.parse::<i64>().ok());
    let policy = upload
        .handle_duplicates
        .as_deref()
        .and_then(DuplicatePolicy::parse)
        .unwrap_or_default();

    match run_import(&state, upload).await {
        Ok(report) => {
            let banner = if report.success() {
                Banner::None
            } else {
                Banner::Error("Nothing was imported")
            };
            let body = report_body(&report, vehicle_id.unwrap_or_default());
            Ok(Html(page("Import Results", Section::Import, banner, &body)).into_response())
        }
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let names = vehicles::vehicle_names(&state.db).await?;
            let body = import_form(&names, vehicle_id, policy);
            Ok(failed_form("Import Maintenance CSV", Section::Import, status, &message, &body))
        }
    }
}
