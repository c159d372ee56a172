//! Page shell, banners and small formatting helpers shared by every page

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::fmt::Display;
use vmt_common::db::models::VehicleName;
use vmt_common::html::escape_html;
use vmt_common::parse::{format_thousands, format_us_date};
use vmt_common::reminders::ReminderState;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dashboard,
    Vehicles,
    Maintenance,
    OilChanges,
    Fuel,
    Future,
    Import,
    Notifications,
}

const NAV: [(Section, &str, &str); 8] = [
    (Section::Dashboard, "/", "Dashboard"),
    (Section::Vehicles, "/vehicles", "Vehicles"),
    (Section::Maintenance, "/maintenance", "Maintenance"),
    (Section::OilChanges, "/oil-changes", "Oil Changes"),
    (Section::Fuel, "/fuel", "Fuel"),
    (Section::Future, "/future-maintenance", "Planned"),
    (Section::Import, "/import", "Import"),
    (Section::Notifications, "/notifications", "Notifications"),
];

/// Query string shared by list pages: optional vehicle filter plus the
/// notice key a redirect leaves behind
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub notice: Option<String>,
    pub vehicle_id: Option<String>,
}

impl PageQuery {
    /// Blank or unparsable filters read as "all vehicles"
    pub fn vehicle_filter(&self) -> Option<i64> {
        self.vehicle_id
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn banner(&self) -> Banner<'static> {
        Banner::notice(self.notice.as_deref())
    }
}

fn notice_message(key: &str) -> Option<&'static str> {
    let message = match key {
        "vehicle_created" => "Vehicle added successfully",
        "vehicle_updated" => "Vehicle updated successfully",
        "vehicle_deleted" => "Vehicle deleted",
        "record_created" => "Maintenance record added successfully",
        "record_updated" => "Maintenance record updated successfully",
        "record_deleted" => "Maintenance record deleted",
        "analysis_created" => "Oil analysis saved",
        "fuel_created" => "Fuel entry added successfully",
        "future_created" => "Maintenance item scheduled",
        "future_completed" => "Maintenance marked as completed",
        "future_rescheduled" => "Maintenance completed and next occurrence scheduled",
        "subscription_created" => "Subscribed to maintenance reminders",
        "subscription_paused" => "Reminder emails paused",
        "subscription_resumed" => "Reminder emails resumed",
        "subscription_deleted" => "Subscription removed",
        _ => return None,
    };
    Some(message)
}

/// Message box at the top of a page
#[derive(Debug, Clone, Copy)]
pub enum Banner<'a> {
    None,
    Notice(&'a str),
    Error(&'a str),
}

impl Banner<'static> {
    /// Unknown keys show nothing
    pub fn notice(key: Option<&str>) -> Self {
        key.and_then(notice_message)
            .map_or(Banner::None, Banner::Notice)
    }
}

impl Banner<'_> {
    fn render(&self) -> String {
        match self {
            Banner::None => String::new(),
            Banner::Notice(text) => {
                format!(r#"<div class="banner notice">{}</div>"#, escape_html(text))
            }
            Banner::Error(text) => {
                format!(r#"<div class="banner error">{}</div>"#, escape_html(text))
            }
        }
    }
}

/// Full HTML document around `body`
pub fn page(title: &str, section: Section, banner: Banner<'_>, body: &str) -> String {
    let nav: String = NAV
        .iter()
        .map(|(s, href, label)| {
            let class = if *s == section { r#" class="active""# } else { "" };
            format!(r#"<a href="{href}"{class}>{label}</a>"#)
        })
        .collect();

    let git_hash = env!("GIT_HASH");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Vehicle Maintenance Tracker</title>
    <link rel="stylesheet" href="/static/vmt.css">
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>Vehicle Maintenance Tracker</h1>
                <nav>{nav}</nav>
            </div>
            <div class="header-right">
                <div class="build-info-line">vmt-web v{version}</div>
                <div class="build-info-line">{hash} ({profile})</div>
            </div>
        </div>
    </header>
    <main class="content">
        <h2>{title}</h2>
        {banner}
        {body}
    </main>
    <footer>Built {timestamp}</footer>
    <script src="/static/vmt.js"></script>
</body>
</html>"#,
        title = escape_html(title),
        banner = banner.render(),
        version = env!("CARGO_PKG_VERSION"),
        hash = git_hash.get(..8).unwrap_or(git_hash),
        profile = env!("BUILD_PROFILE"),
        timestamp = env!("BUILD_TIMESTAMP"),
    )
}

/// `<option>` list of vehicles; `blank` adds a leading empty choice
pub fn vehicle_options(vehicles: &[VehicleName], selected: Option<i64>, blank: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(label) = blank {
        out.push_str(&format!(r#"<option value="">{}</option>"#, escape_html(label)));
    }
    for v in vehicles {
        let sel = if Some(v.id) == selected { " selected" } else { "" };
        out.push_str(&format!(
            r#"<option value="{}"{sel}>{}</option>"#,
            v.id,
            escape_html(&v.name)
        ));
    }
    out
}

/// Vehicle filter form that reloads `action` on change
pub fn vehicle_filter(action: &str, vehicles: &[VehicleName], selected: Option<i64>) -> String {
    format!(
        r#"<form method="get" action="{action}" class="filter">
    <label>Vehicle <select name="vehicle_id" onchange="this.form.submit()">{}</select></label>
    <noscript><button type="submit">Filter</button></noscript>
</form>"#,
        vehicle_options(vehicles, selected, Some("All vehicles"))
    )
}

pub fn miles(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), format_thousands)
}

pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let cents = (v * 100.0).round() as i64;
            let sign = if cents < 0 { "-" } else { "" };
            format!(
                "{sign}${}.{:02}",
                format_thousands(cents.abs() / 100),
                cents.abs() % 100
            )
        }
        None => "-".to_string(),
    }
}

/// `MM/DD/YYYY`, "Unknown" for the placeholder date, flagged when estimated
pub fn date_cell(date: chrono::NaiveDate, estimated: bool) -> String {
    let text = format_us_date(date);
    match (text.is_empty(), estimated) {
        (true, _) => r#"<span class="muted">Unknown</span>"#.to_string(),
        (false, true) => format!(r#"{text} <span class="muted">(est.)</span>"#),
        (false, false) => text,
    }
}

pub fn state_badge(state: ReminderState) -> String {
    let label = match state {
        ReminderState::Ok => "OK",
        ReminderState::Soon => "Due soon",
        ReminderState::Due => "Due",
    };
    format!(r#"<span class="badge {}">{label}</span>"#, state.as_str())
}

/// Escaped text for an input `value` attribute
pub fn attr<T: Display>(value: Option<T>) -> String {
    value.map(|v| escape_html(&v.to_string())).unwrap_or_default()
}

pub fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

/// Error rendered as an HTML page instead of the JSON error body
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<vmt_common::Error> for PageError {
    fn from(err: vmt_common::Error) -> Self {
        Self(ApiError::from(err))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Page failed");
        }
        let message = self.0.user_message();
        let body = page(
            "Something went wrong",
            Section::Dashboard,
            Banner::Error(&message),
            r#"<p><a href="/">Back to the dashboard</a></p>"#,
        );
        (status, Html(body)).into_response()
    }
}

pub type PageResult<T = Response> = Result<T, PageError>;

/// Split a failed form save into a message for the form, or a page error
///
/// Validation problems and conflicts are shown on the re-rendered form;
/// anything else becomes an error page.
pub fn form_failure(err: impl Into<ApiError>) -> Result<(StatusCode, String), PageError> {
    let err = err.into();
    let status = err.status();
    if status.is_client_error() {
        Ok((status, err.user_message()))
    } else {
        Err(PageError(err))
    }
}

/// Form page re-rendered after a rejected submission
pub fn failed_form(
    title: &str,
    section: Section,
    status: StatusCode,
    message: &str,
    body: &str,
) -> Response {
    (status, Html(page(title, section, Banner::Error(message), body))).into_response()
}
