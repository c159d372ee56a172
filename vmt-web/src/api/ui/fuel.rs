//! Fuel log page

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use vmt_common::db::models::{NewFuelEntry, VehicleName, DRIVING_PATTERNS, FUEL_TYPES};
use vmt_common::db::{fuel, vehicles};
use vmt_common::html::escape_html;
use vmt_common::mpg::{self, MpgWindow};
use vmt_common::parse::format_thousands;

use super::layout::{
    attr, date_cell, failed_form, form_failure, money, page, vehicle_filter, vehicle_options,
    Banner, PageQuery, PageResult, Section,
};
use crate::forms::{blank_as_none, date_field, float_field, int_field, money_field, required};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FuelForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub mileage: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fuel_amount: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fuel_cost: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fuel_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub driving_pattern: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub notes: Option<String>,
}

impl FuelForm {
    fn to_input(&self) -> vmt_common::Result<NewFuelEntry> {
        Ok(NewFuelEntry {
            vehicle_id: required(int_field(self.vehicle_id.as_deref(), "Vehicle")?, "Vehicle")?,
            date: required(date_field(self.date.as_deref())?, "Date")?,
            time: self.time.clone(),
            mileage: required(int_field(self.mileage.as_deref(), "Mileage")?, "Mileage")?,
            fuel_amount: required(float_field(self.fuel_amount.as_deref(), "Gallons")?, "Gallons")?,
            fuel_cost: required(money_field(self.fuel_cost.as_deref(), "Total cost")?, "Total cost")?,
            fuel_type: self.fuel_type.clone(),
            driving_pattern: self.driving_pattern.clone(),
            notes: self.notes.clone(),
        })
    }
}

fn window_cell(window: Option<&MpgWindow>) -> String {
    match window {
        Some(w) => format!(
            r#"{:.1} <span class="muted">({} mi / {} fills)</span>"#,
            w.mpg,
            format_thousands(w.miles),
            w.fill_ups
        ),
        None => r#"<span class="muted">n/a</span>"#.to_string(),
    }
}

fn choice_options(choices: &[&str], selected: Option<&str>) -> String {
    std::iter::once(r#"<option value="">-</option>"#.to_string())
        .chain(choices.iter().map(|c| {
            let sel = if selected == Some(*c) { " selected" } else { "" };
            format!(r#"<option value="{c}"{sel}>{c}</option>"#)
        }))
        .collect()
}

fn fuel_form(form: &FuelForm, names: &[VehicleName]) -> String {
    let selected = form.vehicle_id.as_deref().and_then(|s| s.parse().ok());
    format!(
        r#"<form method="post" action="/fuel">
<fieldset><legend>Add fill-up</legend>
    <div class="field"><label>Vehicle</label><select name="vehicle_id" required>{vehicles}</select></div>
    <div class="field"><label>Date</label><input name="date" value="{date}" size="12" required></div>
    <div class="field"><label>Time (HH:MM)</label><input name="time" value="{time}" size="6"></div>
    <div class="field"><label>Odometer</label><input name="mileage" value="{mileage}" size="10" required></div>
    <div class="field"><label>Gallons</label><input name="fuel_amount" value="{amount}" size="8" required></div>
    <div class="field"><label>Total cost</label><input name="fuel_cost" value="{cost}" size="8" required></div>
    <div class="field"><label>Fuel type</label><select name="fuel_type">{fuel_types}</select></div>
    <div class="field"><label>Driving</label><select name="driving_pattern">{patterns}</select></div>
    <div class="field"><label>Notes</label><input name="notes" value="{notes}" size="30"></div>
</fieldset>
<button type="submit">Add fill-up</button>
</form>"#,
        vehicles = vehicle_options(names, selected, None),
        date = attr(form.date.as_deref()),
        time = attr(form.time.as_deref()),
        mileage = attr(form.mileage.as_deref()),
        amount = attr(form.fuel_amount.as_deref()),
        cost = attr(form.fuel_cost.as_deref()),
        fuel_types = choice_options(&FUEL_TYPES, form.fuel_type.as_deref()),
        patterns = choice_options(&DRIVING_PATTERNS, form.driving_pattern.as_deref()),
        notes = attr(form.notes.as_deref()),
    )
}

async fn render(
    state: &AppState,
    filter: Option<i64>,
    form: &FuelForm,
    banner: Banner<'_>,
    status: StatusCode,
) -> PageResult {
    let names = vehicles::vehicle_names(&state.db).await?;
    let options = state.config.reminders.mpg_options();

    let mut body = vehicle_filter("/fuel", &names, filter);
    body.push_str(
        r#"<table><tr><th>Vehicle</th><th>Lifetime MPG</th><th>Last fill</th><th>Recent fills</th><th class="num">Cost per mile</th><th class="num">Total spent</th></tr>"#,
    );
    for v in names.iter().filter(|v| filter.map_or(true, |id| id == v.id)) {
        let summary = mpg::calculate(&fuel::fill_ups(&state.db, v.id).await?, &options);
        if summary.entries_count == 0 {
            continue;
        }
        let gap_note = if summary.gaps_detected {
            format!(
                r#"<br><span class="muted">{} mileage gap(s) over {} miles; affected windows are not calculated</span>"#,
                summary.gaps.len(),
                format_thousands(options.gap_threshold)
            )
        } else {
            String::new()
        };
        body.push_str(&format!(
            r#"<tr><td>{}{gap_note}</td><td>{}</td><td>{}</td><td>{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
            escape_html(&v.name),
            window_cell(summary.lifetime.as_ref()),
            window_cell(summary.current.as_ref()),
            window_cell(summary.recent.as_ref()),
            summary
                .cost_per_mile
                .map(|c| format!("${c:.3}"))
                .unwrap_or_else(|| "-".to_string()),
            money(Some(summary.total_cost)),
        ));
    }
    body.push_str("</table>");

    body.push_str(&fuel_form(form, &names));

    let entries = fuel::list_entries(&state.db, filter).await?;
    body.push_str("<h3>Fill-ups</h3>");
    if entries.is_empty() {
        body.push_str(r#"<p class="muted">No fill-ups recorded.</p>"#);
    } else {
        body.push_str(&format!(
            r#"<p><a href="/api/export/fuel{}">Export CSV</a></p>"#,
            filter.map(|id| format!("?vehicle_id={id}")).unwrap_or_default()
        ));
        body.push_str(
            r#"<table><tr><th>Date</th><th>Vehicle</th><th class="num">Odometer</th><th class="num">Gallons</th><th class="num">Cost</th><th class="num">Per gallon</th><th>Type</th><th>Driving</th><th>Notes</th></tr>"#,
        );
        for e in &entries {
            let vehicle = names
                .iter()
                .find(|v| v.id == e.vehicle_id)
                .map(|v| escape_html(&v.name))
                .unwrap_or_default();
            body.push_str(&format!(
                r#"<tr><td>{} {}</td><td>{vehicle}</td><td class="num">{}</td><td class="num">{:.3}</td><td class="num">{}</td><td class="num">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                date_cell(e.date, false),
                e.time.as_deref().map(escape_html).unwrap_or_default(),
                format_thousands(e.mileage),
                e.fuel_amount,
                money(Some(e.fuel_cost)),
                money(e.price_per_gallon()),
                e.fuel_type.as_deref().map(escape_html).unwrap_or_default(),
                e.driving_pattern.as_deref().map(escape_html).unwrap_or_default(),
                e.notes.as_deref().map(escape_html).unwrap_or_default(),
            ));
        }
        body.push_str("</table>");
    }

    match banner {
        Banner::Error(message) => Ok(failed_form("Fuel", Section::Fuel, status, message, &body)),
        other => Ok(Html(page("Fuel", Section::Fuel, other, &body)).into_response()),
    }
}

/// GET /fuel?vehicle_id=
pub async fn fuel_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let filter = query.vehicle_filter();
    let form = FuelForm {
        vehicle_id: filter.map(|id| id.to_string()),
        date: Some(state.today().format("%m/%d/%Y").to_string()),
        ..Default::default()
    };
    render(&state, filter, &form, query.banner(), StatusCode::OK).await
}

/// POST /fuel
pub async fn create_fuel_entry(
    State(state): State<AppState>,
    Form(form): Form<FuelForm>,
) -> PageResult {
    let result = match form.to_input() {
        Ok(input) => fuel::create_entry(&state.db, &input).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(entry) => Ok(Redirect::to(&format!(
            "/fuel?vehicle_id={}&notice=fuel_created",
            entry.vehicle_id
        ))
        .into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let filter = form.vehicle_id.as_deref().and_then(|s| s.parse().ok());
            render(&state, filter, &form, Banner::Error(&message), status).await
        }
    }
}
