//! Planned maintenance page

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use vmt_common::db::models::{NewFutureMaintenance, VehicleName};
use vmt_common::db::{future, vehicles};
use vmt_common::html::escape_html;
use vmt_common::parse::format_thousands;
use vmt_common::reminders::{evaluate_future, TriggeredMaintenance};

use super::layout::{
    attr, checked, date_cell, failed_form, form_failure, money, page, state_badge,
    vehicle_filter, vehicle_options, Banner, PageQuery, PageResult, Section,
};
use crate::forms::{blank_as_none, checkbox, date_field, int_field, money_field, required};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FutureForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub maintenance_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target_mileage: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target_date: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub mileage_reminder: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_reminder: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub estimated_cost: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub parts_link: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "checkbox")]
    pub is_recurring: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub recurrence_interval_miles: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub recurrence_interval_months: Option<String>,
}

impl FutureForm {
    fn to_input(&self) -> vmt_common::Result<NewFutureMaintenance> {
        let defaults = NewFutureMaintenance::default();
        Ok(NewFutureMaintenance {
            vehicle_id: required(int_field(self.vehicle_id.as_deref(), "Vehicle")?, "Vehicle")?,
            maintenance_type: required(self.maintenance_type.clone(), "Maintenance type")?,
            target_mileage: int_field(self.target_mileage.as_deref(), "Target mileage")?,
            target_date: date_field(self.target_date.as_deref())?,
            mileage_reminder: int_field(self.mileage_reminder.as_deref(), "Mileage reminder")?
                .unwrap_or(defaults.mileage_reminder),
            date_reminder: int_field(self.date_reminder.as_deref(), "Date reminder")?
                .unwrap_or(defaults.date_reminder),
            estimated_cost: money_field(self.estimated_cost.as_deref(), "Estimated cost")?,
            parts_link: self.parts_link.clone(),
            notes: self.notes.clone(),
            is_recurring: self.is_recurring,
            recurrence_interval_miles: int_field(
                self.recurrence_interval_miles.as_deref(),
                "Recurrence miles",
            )?,
            recurrence_interval_months: int_field(
                self.recurrence_interval_months.as_deref(),
                "Recurrence months",
            )?,
        })
    }
}

fn item_row(t: &TriggeredMaintenance, names: &[VehicleName]) -> String {
    let item = &t.item;
    let vehicle = names
        .iter()
        .find(|v| v.id == item.vehicle_id)
        .map(|v| escape_html(&v.name))
        .unwrap_or_default();
    let remaining = [
        t.miles_remaining
            .map(|m| format!("{} mi", format_thousands(m))),
        t.days_remaining.map(|d| format!("{d} days")),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");
    let recurring = if item.is_recurring {
        let every = [
            item.recurrence_interval_miles
                .map(|m| format!("{} mi", format_thousands(m))),
            item.recurrence_interval_months.map(|m| format!("{m} months")),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" / ");
        format!(r#" <span class="muted">(every {every})</span>"#)
    } else {
        String::new()
    };
    let parts = item
        .parts_link
        .as_deref()
        .map(|link| format!(r#" <a href="{}">parts</a>"#, escape_html(link)))
        .unwrap_or_default();

    format!(
        r#"<tr><td>{vehicle}</td><td>{}{recurring}{parts}</td><td class="num">{}</td><td>{}</td><td>{remaining}</td><td>{}</td><td class="num">{}</td>
<td><form class="inline" method="post" action="/future-maintenance/{}/complete" data-confirm="Mark as completed?"><button class="small" type="submit">Done</button></form></td></tr>"#,
        escape_html(&item.maintenance_type),
        item.target_mileage
            .map(format_thousands)
            .unwrap_or_else(|| "-".to_string()),
        item.target_date
            .map(|d| date_cell(d, false))
            .unwrap_or_else(|| "-".to_string()),
        state_badge(t.state),
        money(item.estimated_cost),
        item.id,
    )
}

fn future_form(form: &FutureForm, names: &[VehicleName]) -> String {
    let selected = form.vehicle_id.as_deref().and_then(|s| s.parse().ok());
    format!(
        r#"<form method="post" action="/future-maintenance">
<fieldset><legend>Schedule maintenance</legend>
    <div class="field"><label>Vehicle</label><select name="vehicle_id" required>{vehicles}</select></div>
    <div class="field"><label>Type</label><input name="maintenance_type" value="{kind}" required></div>
    <div class="field"><label>Target mileage</label><input name="target_mileage" value="{target_mileage}" size="10"></div>
    <div class="field"><label>Target date</label><input name="target_date" value="{target_date}" size="12"></div>
    <div class="field"><label>Remind miles before</label><input name="mileage_reminder" value="{mileage_reminder}" size="6"></div>
    <div class="field"><label>Remind days before</label><input name="date_reminder" value="{date_reminder}" size="6"></div>
    <div class="field"><label>Estimated cost</label><input name="estimated_cost" value="{cost}" size="8"></div>
    <div class="field"><label>Parts link</label><input name="parts_link" value="{parts}" size="30"></div>
    <div class="field"><label>Notes</label><input name="notes" value="{notes}" size="30"></div>
    <div class="field"><label><input type="checkbox" name="is_recurring"{recurring}>Recurring</label></div>
    <div class="field"><label>Every (miles)</label><input name="recurrence_interval_miles" value="{every_miles}" size="8"></div>
    <div class="field"><label>Every (months)</label><input name="recurrence_interval_months" value="{every_months}" size="4"></div>
</fieldset>
<button type="submit">Schedule</button>
</form>"#,
        vehicles = vehicle_options(names, selected, None),
        kind = attr(form.maintenance_type.as_deref()),
        target_mileage = attr(form.target_mileage.as_deref()),
        target_date = attr(form.target_date.as_deref()),
        mileage_reminder = attr(form.mileage_reminder.as_deref()),
        date_reminder = attr(form.date_reminder.as_deref()),
        cost = attr(form.estimated_cost.as_deref()),
        parts = attr(form.parts_link.as_deref()),
        notes = attr(form.notes.as_deref()),
        recurring = checked(form.is_recurring),
        every_miles = attr(form.recurrence_interval_miles.as_deref()),
        every_months = attr(form.recurrence_interval_months.as_deref()),
    )
}

async fn render(
    state: &AppState,
    filter: Option<i64>,
    form: &FutureForm,
    banner: Banner<'_>,
    status: StatusCode,
) -> PageResult {
    let names = vehicles::vehicle_names(&state.db).await?;
    let today = state.today();

    let mut items = Vec::new();
    for item in future::list_active(&state.db).await? {
        if filter.is_some_and(|id| id != item.vehicle_id) {
            continue;
        }
        let mileage = vehicles::current_mileage(&state.db, item.vehicle_id).await?;
        items.push(evaluate_future(&item, mileage, today));
    }
    items.sort_by(|a, b| b.state.cmp(&a.state));

    let mut body = vehicle_filter("/future-maintenance", &names, filter);
    if items.is_empty() {
        body.push_str(r#"<p class="muted">Nothing scheduled.</p>"#);
    } else {
        body.push_str(
            r#"<table><tr><th>Vehicle</th><th>Service</th><th class="num">Target mileage</th><th>Target date</th><th>Remaining</th><th>Status</th><th class="num">Estimate</th><th></th></tr>"#,
        );
        for t in &items {
            body.push_str(&item_row(t, &names));
        }
        body.push_str("</table>");
    }
    body.push_str(&future_form(form, &names));

    match banner {
        Banner::Error(message) => Ok(failed_form(
            "Planned Maintenance",
            Section::Future,
            status,
            message,
            &body,
        )),
        other => Ok(Html(page("Planned Maintenance", Section::Future, other, &body)).into_response()),
    }
}

/// GET /future-maintenance?vehicle_id=
pub async fn future_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let filter = query.vehicle_filter();
    let defaults = NewFutureMaintenance::default();
    let form = FutureForm {
        vehicle_id: filter.map(|id| id.to_string()),
        mileage_reminder: Some(defaults.mileage_reminder.to_string()),
        date_reminder: Some(defaults.date_reminder.to_string()),
        ..Default::default()
    };
    render(&state, filter, &form, query.banner(), StatusCode::OK).await
}

/// POST /future-maintenance
pub async fn create_future(
    State(state): State<AppState>,
    Form(form): Form<FutureForm>,
) -> PageResult {
    let result = match form.to_input() {
        Ok(input) => future::create(&state.db, &input).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(item) => Ok(Redirect::to(&format!(
            "/future-maintenance?vehicle_id={}&notice=future_created",
            item.vehicle_id
        ))
        .into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let filter = form.vehicle_id.as_deref().and_then(|s| s.parse().ok());
            render(&state, filter, &form, Banner::Error(&message), status).await
        }
    }
}

/// POST /future-maintenance/:id/complete
pub async fn complete_future(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let completion = future::complete(&state.db, id, state.today()).await?;
    let notice = if completion.next.is_some() {
        "future_rescheduled"
    } else {
        "future_completed"
    };
    Ok(Redirect::to(&format!(
        "/future-maintenance?vehicle_id={}&notice={notice}",
        completion.completed.vehicle_id
    ))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_windows_default_when_blank() {
        let form = FutureForm {
            vehicle_id: Some("4".to_string()),
            maintenance_type: Some("Brake fluid".to_string()),
            target_mileage: Some("90,000".to_string()),
            ..Default::default()
        };
        let input = form.to_input().unwrap();
        assert_eq!(input.target_mileage, Some(90_000));
        assert_eq!(input.mileage_reminder, 100);
        assert_eq!(input.date_reminder, 30);
        assert!(!input.is_recurring);
    }

    #[test]
    fn type_is_required() {
        let form = FutureForm {
            vehicle_id: Some("4".to_string()),
            ..Default::default()
        };
        assert!(form.to_input().is_err());
    }
}
