//! Oil change overview and oil analysis pages

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect},
    Form,
};
use vmt_common::db::models::{MaintenanceRecord, NewOilAnalysis};
use vmt_common::db::{maintenance, vehicles};
use vmt_common::html::escape_html;
use vmt_common::parse::{format_thousands, format_us_date};
use vmt_common::reminders::oil_change_status;

use super::layout::{
    date_cell, failed_form, form_failure, miles, money, page, state_badge, vehicle_filter,
    PageQuery, PageResult, Section,
};
use crate::forms::{required, yes_no, FormFields};
use crate::AppState;

/// GET /oil-changes?vehicle_id=
pub async fn oil_changes_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let filter = query.vehicle_filter();
    let names = vehicles::vehicle_names(&state.db).await?;
    let today = state.today();

    let mut body = vehicle_filter("/oil-changes", &names, filter);
    body.push_str(
        r#"<table><tr><th>Vehicle</th><th>Status</th><th class="num">Last change</th><th class="num">Current</th><th class="num">Miles until due</th><th class="num">Days until due</th><th></th></tr>"#,
    );
    for v in names.iter().filter(|v| filter.map_or(true, |id| id == v.id)) {
        let current = vehicles::current_mileage(&state.db, v.id).await?;
        let status = maintenance::latest_oil_change(&state.db, v.id)
            .await?
            .map(|last| oil_change_status(&last, current.unwrap_or(0), today, &state.config.reminders));
        let row = match status {
            Some(s) => format!(
                r#"<td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td>"#,
                state_badge(s.state),
                format_thousands(s.last_mileage),
                format_thousands(s.current_mileage),
                format_thousands(s.miles_until_due),
                s.days_until_due.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            ),
            None => format!(
                r#"<td><span class="muted">No oil change recorded</span></td><td></td><td class="num">{}</td><td></td><td></td>"#,
                miles(current)
            ),
        };
        body.push_str(&format!(
            r#"<tr><td>{}</td>{row}<td><a href="/oil-analysis/{}">Oil analysis</a></td></tr>"#,
            escape_html(&v.name),
            v.id
        ));
    }
    body.push_str("</table>");

    let changes = maintenance::oil_changes(&state.db, filter).await?;
    body.push_str("<h3>History</h3>");
    if changes.is_empty() {
        body.push_str(r#"<p class="muted">No oil changes recorded.</p>"#);
    } else {
        body.push_str(
            r#"<table><tr><th>Date</th><th>Vehicle</th><th class="num">Mileage</th><th>Oil</th><th>Filter</th><th class="num">Interval</th><th class="num">Cost</th></tr>"#,
        );
        for r in &changes {
            let vehicle = names
                .iter()
                .find(|v| v.id == r.vehicle_id)
                .map(|v| escape_html(&v.name))
                .unwrap_or_default();
            let oil = [r.oil_brand.as_deref(), r.oil_type.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let filter_text = [r.oil_filter_brand.as_deref(), r.oil_filter_part_number.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            body.push_str(&format!(
                r#"<tr><td>{}</td><td>{vehicle}</td><td class="num">{}</td><td>{}</td><td>{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
                date_cell(r.date, r.date_estimated),
                format_thousands(r.mileage),
                escape_html(&oil),
                escape_html(&filter_text),
                miles(r.oil_change_interval),
                money(r.cost),
            ));
        }
        body.push_str("</table>");
    }

    Ok(Html(page("Oil Changes", Section::OilChanges, query.banner(), &body)).into_response())
}

fn analysis_row(r: &MaintenanceRecord) -> String {
    let level = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let coolant = match r.coolant_contamination {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "-",
    };
    format!(
        r#"<tr><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td>{coolant}</td><td>{}</td><td class="num">{}</td></tr>"#,
        r.oil_analysis_date
            .map(|d| date_cell(d, false))
            .unwrap_or_default(),
        format_thousands(r.mileage),
        level(r.iron_level),
        level(r.aluminum_level),
        level(r.copper_level),
        level(r.viscosity),
        level(r.tbn),
        level(r.fuel_dilution),
        r.next_oil_analysis_date
            .map(|d| date_cell(d, false))
            .unwrap_or_else(|| "-".to_string()),
        money(r.oil_analysis_cost),
    )
}

fn analysis_form(vehicle_id: i64, changes: &[MaintenanceRecord], fields: &FormFields) -> String {
    let v = |key: &str| escape_html(fields.raw(key));
    let linked: String = std::iter::once(r#"<option value="">Not linked</option>"#.to_string())
        .chain(changes.iter().map(|c| {
            let sel = if fields.text("linked_oil_change_id") == Some(c.id.to_string().as_str()) {
                " selected"
            } else {
                ""
            };
            let date = format_us_date(c.date);
            format!(
                r#"<option value="{}"{sel}>{} at {} miles</option>"#,
                c.id,
                if date.is_empty() { "Unknown date".to_string() } else { date },
                format_thousands(c.mileage)
            )
        }))
        .collect();
    let coolant = fields.text("coolant_contamination");
    let coolant_option = |value: &str, label: &str| {
        let sel = if coolant == Some(value) { " selected" } else { "" };
        format!(r#"<option value="{value}"{sel}>{label}</option>"#)
    };

    format!(
        r#"<form method="post" action="/oil-analysis">
<input type="hidden" name="vehicle_id" value="{vehicle_id}">
<fieldset><legend>New analysis</legend>
    <div class="field"><label>Sample date</label><input name="analysis_date" value="{date}" size="12" required></div>
    <div class="field"><label>Oil change sampled</label><select name="linked_oil_change_id">{linked}</select></div>
    <div class="field"><label>Mileage (defaults to the linked change)</label><input name="mileage" value="{mileage}" size="10"></div>
    <div class="field"><label>Next analysis</label><input name="next_analysis_date" value="{next}" size="12"></div>
    <div class="field"><label>Lab cost</label><input name="cost" value="{cost}" size="8"></div>
</fieldset>
<fieldset><legend>Results</legend>
    <div class="field"><label>Iron (ppm)</label><input name="iron_level" value="{iron}" size="6"></div>
    <div class="field"><label>Aluminum (ppm)</label><input name="aluminum_level" value="{aluminum}" size="6"></div>
    <div class="field"><label>Copper (ppm)</label><input name="copper_level" value="{copper}" size="6"></div>
    <div class="field"><label>Viscosity (cSt)</label><input name="viscosity" value="{viscosity}" size="6"></div>
    <div class="field"><label>TBN</label><input name="tbn" value="{tbn}" size="6"></div>
    <div class="field"><label>Fuel dilution (%)</label><input name="fuel_dilution" value="{dilution}" size="6"></div>
    <div class="field"><label>Coolant contamination</label><select name="coolant_contamination">{unknown}{yes}{no}</select></div>
    <div class="field"><label>Driving conditions</label><input name="driving_conditions" value="{conditions}"></div>
    <div class="field"><label>Oil consumption notes</label><input name="oil_consumption_notes" value="{consumption}" size="40"></div>
</fieldset>
<button type="submit">Save analysis</button>
</form>"#,
        date = v("analysis_date"),
        mileage = v("mileage"),
        next = v("next_analysis_date"),
        cost = v("cost"),
        iron = v("iron_level"),
        aluminum = v("aluminum_level"),
        copper = v("copper_level"),
        viscosity = v("viscosity"),
        tbn = v("tbn"),
        dilution = v("fuel_dilution"),
        unknown = coolant_option("", "Not tested"),
        yes = coolant_option("yes", "Yes"),
        no = coolant_option("no", "No"),
        conditions = v("driving_conditions"),
        consumption = v("oil_consumption_notes"),
    )
}

async fn analysis_body(state: &AppState, vehicle_id: i64, fields: &FormFields) -> PageResult<(String, String)> {
    let vehicle = vehicles::get_vehicle(&state.db, vehicle_id).await?;
    let analyses = maintenance::oil_analyses(&state.db, vehicle_id).await?;
    let changes = maintenance::oil_changes(&state.db, Some(vehicle_id)).await?;

    let mut body = String::new();
    if analyses.is_empty() {
        body.push_str(r#"<p class="muted">No oil analyses recorded.</p>"#);
    } else {
        body.push_str(
            r#"<table><tr><th>Sampled</th><th class="num">Mileage</th><th class="num">Iron</th><th class="num">Aluminum</th><th class="num">Copper</th><th class="num">Viscosity</th><th class="num">TBN</th><th class="num">Fuel dilution</th><th>Coolant</th><th>Next</th><th class="num">Cost</th></tr>"#,
        );
        for r in &analyses {
            body.push_str(&analysis_row(r));
        }
        body.push_str("</table>");
    }
    body.push_str(&analysis_form(vehicle_id, &changes, fields));

    Ok((format!("Oil Analysis: {}", vehicle.name), body))
}

/// GET /oil-analysis/:vehicle_id
pub async fn oil_analysis_page(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let mut fields = FormFields::default();
    fields.set("analysis_date", state.today().to_string());
    let (title, body) = analysis_body(&state, vehicle_id, &fields).await?;
    Ok(Html(page(&title, Section::OilChanges, query.banner(), &body)).into_response())
}

/// Decode the oil analysis form
pub fn analysis_input(fields: &FormFields) -> vmt_common::Result<NewOilAnalysis> {
    Ok(NewOilAnalysis {
        vehicle_id: required(fields.int("vehicle_id", "Vehicle")?, "Vehicle")?,
        analysis_date: required(fields.date("analysis_date")?, "Sample date")?,
        mileage: fields.int("mileage", "Mileage")?,
        linked_oil_change_id: fields.int("linked_oil_change_id", "Linked oil change")?,
        next_analysis_date: fields.date("next_analysis_date")?,
        cost: fields.money("cost", "Lab cost")?,
        iron_level: fields.float("iron_level", "Iron")?,
        aluminum_level: fields.float("aluminum_level", "Aluminum")?,
        copper_level: fields.float("copper_level", "Copper")?,
        viscosity: fields.float("viscosity", "Viscosity")?,
        tbn: fields.float("tbn", "TBN")?,
        fuel_dilution: fields.float("fuel_dilution", "Fuel dilution")?,
        coolant_contamination: yes_no(fields.text("coolant_contamination")),
        driving_conditions: fields.owned("driving_conditions"),
        oil_consumption_notes: fields.owned("oil_consumption_notes"),
    })
}

/// POST /oil-analysis
pub async fn create_oil_analysis(
    State(state): State<AppState>,
    Form(fields): Form<FormFields>,
) -> PageResult {
    let vehicle_id = required(fields.int("vehicle_id", "Vehicle")?, "Vehicle")?;
    let result = match analysis_input(&fields) {
        Ok(input) => maintenance::create_oil_analysis(&state.db, &input).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(Redirect::to(&format!(
            "/oil-analysis/{vehicle_id}?notice=analysis_created"
        ))
        .into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let (title, body) = analysis_body(&state, vehicle_id, &fields).await?;
            Ok(failed_form(&title, Section::OilChanges, status, &message, &body))
        }
    }
}
