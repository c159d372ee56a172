//! Vehicle list and vehicle form pages

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use vmt_common::db::models::{NewVehicle, Vehicle};
use vmt_common::db::{accounts, vehicles};
use vmt_common::html::escape_html;

use super::layout::{
    attr, failed_form, form_failure, miles, page, Banner, PageQuery, PageResult, Section,
};
use crate::forms::{blank_as_none, int_field, required};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VehicleForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub make: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub vin: Option<String>,
}

impl VehicleForm {
    fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            name: Some(vehicle.name.clone()),
            year: Some(vehicle.year.to_string()),
            make: Some(vehicle.make.clone()),
            model: Some(vehicle.model.clone()),
            vin: vehicle.vin.clone(),
        }
    }

    fn to_input(&self, account_id: Option<String>) -> vmt_common::Result<NewVehicle> {
        Ok(NewVehicle {
            name: self.name.clone(),
            year: required(int_field(self.year.as_deref(), "Year")?, "Year")?,
            make: required(self.make.clone(), "Make")?,
            model: required(self.model.clone(), "Model")?,
            vin: self.vin.clone(),
            account_id,
        })
    }
}

/// GET /vehicles
pub async fn vehicles_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let all = vehicles::list_vehicles(&state.db, None).await?;
    let mut body = String::from(r#"<p><a class="button" href="/vehicles/new">Add vehicle</a></p>"#);

    if all.is_empty() {
        body.push_str(r#"<p class="muted">No vehicles yet.</p>"#);
    } else {
        body.push_str(
            r#"<table><tr><th>Name</th><th>Year</th><th>Make</th><th>Model</th><th>VIN</th><th class="num">Mileage</th><th>Update mileage</th><th></th></tr>"#,
        );
        for v in &all {
            let current = vehicles::current_mileage(&state.db, v.id).await?;
            body.push_str(&format!(
                r#"<tr>
    <td><a href="/maintenance?vehicle_id={id}">{name}</a></td><td>{year}</td><td>{make}</td><td>{model}</td><td>{vin}</td>
    <td class="num">{mileage}</td>
    <td><form class="mileage-update inline" method="post" action="/vehicles/{id}/update-mileage">
        <input name="new_mileage" size="8" placeholder="Odometer"> <input name="date_str" size="10" placeholder="MM/DD/YYYY">
        <button class="small" type="submit">Save</button> <span class="mileage-status muted"></span>
    </form></td>
    <td><a href="/vehicles/{id}/edit">Edit</a>
        <form class="inline" method="post" action="/vehicles/{id}/delete" data-confirm="Delete this vehicle and all of its records?">
            <button class="small danger" type="submit">Delete</button>
        </form></td>
</tr>"#,
                id = v.id,
                name = escape_html(&v.name),
                year = v.year,
                make = escape_html(&v.make),
                model = escape_html(&v.model),
                vin = v.vin.as_deref().map(escape_html).unwrap_or_default(),
                mileage = miles(current),
            ));
        }
        body.push_str("</table>");
    }

    Ok(Html(page("Vehicles", Section::Vehicles, query.banner(), &body)).into_response())
}

fn vehicle_form(action: &str, form: &VehicleForm, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
<fieldset>
    <div class="field"><label>Year</label><input name="year" value="{year}" size="6" required></div>
    <div class="field"><label>Make</label><input name="make" value="{make}" required></div>
    <div class="field"><label>Model</label><input name="model" value="{model}" required></div>
    <div class="field"><label>Name (defaults to year make model)</label><input name="name" value="{name}"></div>
    <div class="field"><label>VIN</label><input name="vin" value="{vin}" size="20" maxlength="17"></div>
</fieldset>
<button type="submit">{submit}</button> <a href="/vehicles">Cancel</a>
</form>"#,
        year = attr(form.year.as_deref()),
        make = attr(form.make.as_deref()),
        model = attr(form.model.as_deref()),
        name = attr(form.name.as_deref()),
        vin = attr(form.vin.as_deref()),
    )
}

/// GET /vehicles/new
pub async fn new_vehicle_page() -> PageResult {
    let body = vehicle_form("/vehicles", &VehicleForm::default(), "Add vehicle");
    Ok(Html(page("Add Vehicle", Section::Vehicles, Banner::None, &body)).into_response())
}

/// POST /vehicles
pub async fn create_vehicle(
    State(state): State<AppState>,
    Form(form): Form<VehicleForm>,
) -> PageResult {
    let account = accounts::ensure_default_account(&state.db, state.owner()).await?;
    let result = match form.to_input(Some(account.id)) {
        Ok(input) => vehicles::create_vehicle(&state.db, &input).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(Redirect::to("/vehicles?notice=vehicle_created").into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let body = vehicle_form("/vehicles", &form, "Add vehicle");
            Ok(failed_form("Add Vehicle", Section::Vehicles, status, &message, &body))
        }
    }
}

/// GET /vehicles/:id/edit
pub async fn edit_vehicle_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> PageResult {
    let vehicle = vehicles::get_vehicle(&state.db, id).await?;
    let body = vehicle_form(
        &format!("/vehicles/{id}"),
        &VehicleForm::from_vehicle(&vehicle),
        "Save changes",
    );
    Ok(Html(page("Edit Vehicle", Section::Vehicles, Banner::None, &body)).into_response())
}

/// POST /vehicles/:id
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<VehicleForm>,
) -> PageResult {
    let existing = vehicles::get_vehicle(&state.db, id).await?;
    let result = match form.to_input(existing.account_id.clone()) {
        Ok(input) => vehicles::update_vehicle(&state.db, id, &input).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(Redirect::to("/vehicles?notice=vehicle_updated").into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let body = vehicle_form(&format!("/vehicles/{id}"), &form, "Save changes");
            Ok(failed_form("Edit Vehicle", Section::Vehicles, status, &message, &body))
        }
    }
}

/// POST /vehicles/:id/delete
pub async fn delete_vehicle(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    vehicles::delete_vehicle(&state.db, id).await?;
    Ok(Redirect::to("/vehicles?notice=vehicle_deleted").into_response())
}
