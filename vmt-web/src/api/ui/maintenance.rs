//! Maintenance record list and form pages
//!
//! The record form is large (oil change details and tire measurements),
//! so it is decoded into [`FormFields`] rather than a struct.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use vmt_common::db::models::{
    MaintenanceRecord, NewMaintenanceRecord, RotationPattern, TireMeta, TreadDepths, TreadReading,
    VehicleName,
};
use vmt_common::db::{maintenance, vehicles};
use vmt_common::html::escape_html;
use vmt_common::parse::{format_thousands, is_placeholder_date};
use vmt_common::Error;

use super::layout::{
    attr, checked, date_cell, failed_form, form_failure, money, page, vehicle_filter,
    vehicle_options, Banner, PageQuery, PageResult, Section,
};
use crate::forms::{required, FormFields};
use crate::AppState;

const TIRES: [(&str, &str); 4] = [
    ("fl", "Front left"),
    ("fr", "Front right"),
    ("rl", "Rear left"),
    ("rr", "Rear right"),
];
const GROOVES: [&str; 3] = ["inner", "middle", "outer"];
const ROTATION_PATTERNS: [RotationPattern; 5] = [
    RotationPattern::FrontToRear,
    RotationPattern::Cross,
    RotationPattern::FiveTire,
    RotationPattern::Custom,
    RotationPattern::Unknown,
];

/// GET /maintenance?vehicle_id=
pub async fn maintenance_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let vehicle_id = query.vehicle_filter();
    let names = vehicles::vehicle_names(&state.db).await?;
    let records = maintenance::list_records(&state.db, vehicle_id).await?;

    let new_link = match vehicle_id {
        Some(id) => format!("/maintenance/new?vehicle_id={id}"),
        None => "/maintenance/new".to_string(),
    };
    let mut body = vehicle_filter("/maintenance", &names, vehicle_id);
    body.push_str(&format!(
        r#"<p><a class="button" href="{new_link}">Add record</a> <a href="/api/export/maintenance{}">Export CSV</a></p>"#,
        vehicle_id.map(|id| format!("?vehicle_id={id}")).unwrap_or_default()
    ));

    if records.is_empty() {
        body.push_str(r#"<p class="muted">No maintenance records.</p>"#);
    } else {
        let total: f64 = records.iter().filter_map(|r| r.cost).sum();
        body.push_str(&format!(
            r#"<p class="muted">{} records, {} total</p>"#,
            records.len(),
            money(Some(total))
        ));
        body.push_str(
            r#"<table><tr><th>Date</th><th>Vehicle</th><th class="num">Mileage</th><th>Description</th><th class="num">Cost</th><th></th></tr>"#,
        );
        for r in &records {
            body.push_str(&record_row(r, &names));
        }
        body.push_str("</table>");
    }

    Ok(Html(page("Maintenance", Section::Maintenance, query.banner(), &body)).into_response())
}

fn record_row(r: &MaintenanceRecord, names: &[VehicleName]) -> String {
    let vehicle = names
        .iter()
        .find(|v| v.id == r.vehicle_id)
        .map(|v| escape_html(&v.name))
        .unwrap_or_default();
    let mut description = escape_html(&r.description);
    if r.is_oil_change {
        description.push_str(r#" <span class="badge ok">oil</span>"#);
    }
    if r.tire_meta.is_some() {
        description.push_str(r#" <span class="badge soon">tires</span>"#);
    }
    format!(
        r#"<tr><td>{date}</td><td>{vehicle}</td><td class="num">{mileage}</td><td>{description}</td><td class="num">{cost}</td>
<td><a href="/maintenance/{id}/edit">Edit</a>
<form class="inline" method="post" action="/maintenance/{id}/delete" data-confirm="Delete this record?"><button class="small danger" type="submit">Delete</button></form></td></tr>"#,
        id = r.id,
        date = date_cell(r.date, r.date_estimated),
        mileage = format_thousands(r.mileage),
        cost = money(r.cost),
    )
}

/// Form values for an existing record
fn record_fields(r: &MaintenanceRecord) -> FormFields {
    let opt = |v: Option<String>| v.unwrap_or_default();
    let mut fields = FormFields::from_pairs([
        ("vehicle_id", r.vehicle_id.to_string()),
        (
            "date",
            if is_placeholder_date(r.date) {
                String::new()
            } else {
                r.date.to_string()
            },
        ),
        ("mileage", r.mileage.to_string()),
        ("description", r.description.clone()),
        ("cost", opt(r.cost.map(|c| format!("{c:.2}")))),
        ("oil_change_interval", opt(r.oil_change_interval.map(|i| i.to_string()))),
        ("oil_type", opt(r.oil_type.clone())),
        ("oil_brand", opt(r.oil_brand.clone())),
        ("oil_filter_brand", opt(r.oil_filter_brand.clone())),
        ("oil_filter_part_number", opt(r.oil_filter_part_number.clone())),
        ("oil_cost", opt(r.oil_cost.map(|c| format!("{c:.2}")))),
        ("filter_cost", opt(r.filter_cost.map(|c| format!("{c:.2}")))),
        ("labor_cost", opt(r.labor_cost.map(|c| format!("{c:.2}")))),
    ]);
    if r.date_estimated {
        fields.set("date_estimated", "on");
    }
    if r.is_oil_change {
        fields.set("is_oil_change", "on");
    }

    if let Some(meta) = r.tire_meta() {
        if let Some(pattern) = meta.rotation_pattern {
            fields.set("rotation_pattern", pattern.as_str());
        }
        if let Some(measured) = meta.measured_at {
            fields.set("tire_measured_at", measured.to_string());
        }
        let readings = [meta.tread.fl, meta.tread.fr, meta.tread.rl, meta.tread.rr];
        for ((tire, _), reading) in TIRES.iter().zip(readings) {
            for (groove, depth) in GROOVES.iter().zip([reading.inner, reading.middle, reading.outer]) {
                if let Some(depth) = depth {
                    fields.set(&format!("tread_{tire}_{groove}"), depth.to_string());
                }
            }
        }
    }
    fields
}

fn tread_reading(fields: &FormFields, tire: &str, label: &str) -> vmt_common::Result<TreadReading> {
    let depth = |groove: &str| -> vmt_common::Result<Option<u8>> {
        fields
            .int(&format!("tread_{tire}_{groove}"), &format!("{label} {groove} tread"))?
            .map(|v| {
                u8::try_from(v)
                    .map_err(|_| Error::invalid(format!("{label} {groove} tread is out of range")))
            })
            .transpose()
    };
    Ok(TreadReading {
        inner: depth("inner")?,
        middle: depth("middle")?,
        outer: depth("outer")?,
    })
}

fn tire_meta(fields: &FormFields) -> vmt_common::Result<Option<TireMeta>> {
    let rotation_pattern = match fields.text("rotation_pattern") {
        Some(raw) => Some(
            RotationPattern::parse(raw)
                .ok_or_else(|| Error::invalid(format!("Unknown rotation pattern: {raw}")))?,
        ),
        None => None,
    };
    let tread = TreadDepths {
        fl: tread_reading(fields, "fl", "Front left")?,
        fr: tread_reading(fields, "fr", "Front right")?,
        rl: tread_reading(fields, "rl", "Rear left")?,
        rr: tread_reading(fields, "rr", "Rear right")?,
    };
    let meta = TireMeta::new(fields.date("tire_measured_at")?, rotation_pattern, tread);
    Ok((!meta.is_empty()).then_some(meta))
}

/// Decode the record form
pub fn record_input(fields: &FormFields) -> vmt_common::Result<NewMaintenanceRecord> {
    let is_oil_change = fields.flag("is_oil_change");
    Ok(NewMaintenanceRecord {
        vehicle_id: required(fields.int("vehicle_id", "Vehicle")?, "Vehicle")?,
        date: fields.date("date")?,
        date_estimated: fields.flag("date_estimated"),
        mileage: required(fields.int("mileage", "Mileage")?, "Mileage")?,
        description: required(fields.owned("description"), "Description")?,
        cost: fields.money("cost", "Cost")?,
        oil_change_interval: if is_oil_change {
            fields.int("oil_change_interval", "Oil change interval")?
        } else {
            None
        },
        is_oil_change,
        oil_type: fields.owned("oil_type"),
        oil_brand: fields.owned("oil_brand"),
        oil_filter_brand: fields.owned("oil_filter_brand"),
        oil_filter_part_number: fields.owned("oil_filter_part_number"),
        oil_cost: fields.money("oil_cost", "Oil cost")?,
        filter_cost: fields.money("filter_cost", "Filter cost")?,
        labor_cost: fields.money("labor_cost", "Labor cost")?,
        tire_meta: tire_meta(fields)?,
        ..Default::default()
    })
}

fn record_form(action: &str, fields: &FormFields, names: &[VehicleName], submit: &str) -> String {
    let v = |key: &str| escape_html(fields.raw(key));
    let selected = fields.text("vehicle_id").and_then(|s| s.parse().ok());

    let pattern_options: String = std::iter::once(r#"<option value="">-</option>"#.to_string())
        .chain(ROTATION_PATTERNS.iter().map(|p| {
            let sel = if fields.text("rotation_pattern") == Some(p.as_str()) { " selected" } else { "" };
            format!(r#"<option value="{0}"{sel}>{0}</option>"#, p.as_str())
        }))
        .collect();

    let tread_rows: String = TIRES
        .iter()
        .map(|(tire, label)| {
            let cells: String = GROOVES
                .iter()
                .map(|groove| {
                    let key = format!("tread_{tire}_{groove}");
                    format!(r#"<td><input name="{key}" value="{}" size="3"></td>"#, v(&key))
                })
                .collect();
            format!("<tr><td>{label}</td>{cells}</tr>")
        })
        .collect();

    format!(
        r#"<form method="post" action="{action}">
<fieldset><legend>Service</legend>
    <div class="field"><label>Vehicle</label><select name="vehicle_id" required>{vehicles}</select></div>
    <div class="field"><label>Date (MM/DD/YYYY, blank if unknown)</label><input name="date" value="{date}" size="12"></div>
    <div class="field"><label><input type="checkbox" name="date_estimated"{estimated}>Date is estimated</label></div>
    <div class="field"><label>Mileage</label><input name="mileage" value="{mileage}" size="10" required></div>
    <div class="field"><label>Description</label><input name="description" value="{description}" size="40" maxlength="500" required></div>
    <div class="field"><label>Cost</label><input name="cost" value="{cost}" size="10"></div>
</fieldset>
<fieldset><legend><label><input type="checkbox" name="is_oil_change"{oil}>Oil change</label></legend>
    <div class="field"><label>Interval (miles)</label><input name="oil_change_interval" value="{interval}" size="8"></div>
    <div class="field"><label>Oil type</label><input name="oil_type" value="{oil_type}"></div>
    <div class="field"><label>Oil brand</label><input name="oil_brand" value="{oil_brand}"></div>
    <div class="field"><label>Filter brand</label><input name="oil_filter_brand" value="{filter_brand}"></div>
    <div class="field"><label>Filter part number</label><input name="oil_filter_part_number" value="{filter_part}"></div>
    <div class="field"><label>Oil cost</label><input name="oil_cost" value="{oil_cost}" size="8"></div>
    <div class="field"><label>Filter cost</label><input name="filter_cost" value="{filter_cost}" size="8"></div>
    <div class="field"><label>Labor cost</label><input name="labor_cost" value="{labor_cost}" size="8"></div>
</fieldset>
<fieldset><legend>Tires (tread in 32nds)</legend>
    <div class="field"><label>Rotation pattern</label><select name="rotation_pattern">{pattern_options}</select></div>
    <div class="field"><label>Measured on</label><input name="tire_measured_at" value="{measured}" size="12"></div>
    <table><tr><th>Tire</th><th>Inner</th><th>Middle</th><th>Outer</th></tr>{tread_rows}</table>
</fieldset>
<button type="submit">{submit}</button> <a href="/maintenance">Cancel</a>
</form>"#,
        vehicles = vehicle_options(names, selected, None),
        date = v("date"),
        estimated = checked(fields.flag("date_estimated")),
        mileage = v("mileage"),
        description = v("description"),
        cost = v("cost"),
        oil = checked(fields.flag("is_oil_change")),
        interval = v("oil_change_interval"),
        oil_type = v("oil_type"),
        oil_brand = v("oil_brand"),
        filter_brand = v("oil_filter_brand"),
        filter_part = v("oil_filter_part_number"),
        oil_cost = v("oil_cost"),
        filter_cost = v("filter_cost"),
        labor_cost = v("labor_cost"),
        measured = v("tire_measured_at"),
    )
}

/// GET /maintenance/new?vehicle_id=
pub async fn new_record_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let names = vehicles::vehicle_names(&state.db).await?;
    let mut fields = FormFields::default();
    if let Some(id) = query.vehicle_filter() {
        fields.set("vehicle_id", id.to_string());
        if let Some(current) = vehicles::current_mileage(&state.db, id).await? {
            fields.set("mileage", current.to_string());
        }
    }
    fields.set("date", state.today().to_string());
    fields.set(
        "oil_change_interval",
        state.config.reminders.oil_change_interval.to_string(),
    );

    let body = record_form("/maintenance", &fields, &names, "Add record");
    Ok(Html(page("Add Maintenance", Section::Maintenance, Banner::None, &body)).into_response())
}

async fn rejected(
    state: &AppState,
    title: &str,
    action: &str,
    fields: &FormFields,
    err: Error,
) -> PageResult {
    let (status, message) = form_failure(err)?;
    let names = vehicles::vehicle_names(&state.db).await?;
    let submit = if action == "/maintenance" { "Add record" } else { "Save changes" };
    let body = record_form(action, fields, &names, submit);
    Ok(failed_form(title, Section::Maintenance, status, &message, &body))
}

fn back_to_list(vehicle_id: i64, notice: &str) -> Response {
    Redirect::to(&format!("/maintenance?vehicle_id={vehicle_id}&notice={notice}")).into_response()
}

/// POST /maintenance
pub async fn create_record(
    State(state): State<AppState>,
    Form(fields): Form<FormFields>,
) -> PageResult {
    let result = match record_input(&fields) {
        Ok(input) => maintenance::create_record(&state.db, &input).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(record) => Ok(back_to_list(record.vehicle_id, "record_created")),
        Err(err) => rejected(&state, "Add Maintenance", "/maintenance", &fields, err).await,
    }
}

/// GET /maintenance/:id/edit
pub async fn edit_record_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> PageResult {
    let record = maintenance::get_record(&state.db, id).await?;
    let names = vehicles::vehicle_names(&state.db).await?;
    let body = record_form(
        &format!("/maintenance/{id}"),
        &record_fields(&record),
        &names,
        "Save changes",
    );
    Ok(Html(page("Edit Maintenance", Section::Maintenance, Banner::None, &body)).into_response())
}

/// POST /maintenance/:id
///
/// Oil analysis results are not on this form and are kept as stored.
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(fields): Form<FormFields>,
) -> PageResult {
    let existing = maintenance::get_record(&state.db, id).await?;
    let result = match record_input(&fields) {
        Ok(mut input) => {
            keep_analysis(&existing, &mut input);
            maintenance::update_record(&state.db, id, &input).await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(record) => Ok(back_to_list(record.vehicle_id, "record_updated")),
        Err(err) => {
            rejected(&state, "Edit Maintenance", &format!("/maintenance/{id}"), &fields, err).await
        }
    }
}

fn keep_analysis(existing: &MaintenanceRecord, input: &mut NewMaintenanceRecord) {
    input.oil_analysis_date = existing.oil_analysis_date;
    input.next_oil_analysis_date = existing.next_oil_analysis_date;
    input.oil_analysis_cost = existing.oil_analysis_cost;
    input.iron_level = existing.iron_level;
    input.aluminum_level = existing.aluminum_level;
    input.copper_level = existing.copper_level;
    input.viscosity = existing.viscosity;
    input.tbn = existing.tbn;
    input.fuel_dilution = existing.fuel_dilution;
    input.coolant_contamination = existing.coolant_contamination;
    input.driving_conditions = existing.driving_conditions.clone();
    input.oil_consumption_notes = existing.oil_consumption_notes.clone();
    input.linked_oil_change_id = existing.linked_oil_change_id;
}

/// POST /maintenance/:id/delete
pub async fn delete_record(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let record = maintenance::get_record(&state.db, id).await?;
    maintenance::delete_record(&state.db, id).await?;
    Ok(back_to_list(record.vehicle_id, "record_deleted"))
}
