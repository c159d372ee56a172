//! Dashboard page

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
};
use vmt_common::html::escape_html;
use vmt_common::parse::format_thousands;
use vmt_common::reminders::Urgency;

use super::layout::{date_cell, miles, money, page, state_badge, PageQuery, PageResult, Section};
use crate::services::dashboard::{self, RECENT_ACTIVITY_DAYS};
use crate::AppState;

/// GET /
pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let data = dashboard::gather(&state.db, state.today(), &state.config.reminders).await?;
    let mut body = String::new();

    body.push_str(&format!(
        r#"<div class="cards">
    <div class="card"><div class="muted">Vehicles</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Maintenance records</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Total spent</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Average per record</div><div class="value">{}</div></div>
    <div class="card"><div class="muted">Miles this year</div><div class="value">{}</div></div>
</div>"#,
        data.totals.total_vehicles,
        format_thousands(data.totals.total_records),
        money(Some(data.totals.total_cost)),
        money(Some(data.totals.average_cost_per_record)),
        format_thousands(data.miles_this_year),
    ));

    body.push_str("<h3>Notifications</h3>");
    if data.notifications.notifications.is_empty() {
        body.push_str(r#"<p class="muted">Nothing needs attention.</p>"#);
    } else {
        body.push_str("<ul>");
        for n in &data.notifications.notifications {
            let class = match n.urgency {
                Urgency::High => "high",
                Urgency::Medium => "medium",
                Urgency::Low => "low",
            };
            body.push_str(&format!(
                r#"<li class="{class}"><strong>{}</strong>: {} <span class="muted">({})</span></li>"#,
                escape_html(&n.title),
                escape_html(&n.message),
                escape_html(&n.vehicle_name),
            ));
        }
        body.push_str(r#"</ul><p><a href="/notifications">All notifications</a></p>"#);
    }

    if !data.vehicle_health.is_empty() {
        body.push_str(
            r#"<h3>Vehicles</h3><table><tr><th>Vehicle</th><th class="num">Mileage</th><th>Status</th><th class="num">Items needing attention</th></tr>"#,
        );
        for v in &data.vehicle_health {
            body.push_str(&format!(
                r#"<tr><td><a href="/maintenance?vehicle_id={}">{}</a></td><td class="num">{}</td><td>{}</td><td class="num">{}</td></tr>"#,
                v.vehicle_id,
                escape_html(&v.vehicle_name),
                miles(v.current_mileage),
                state_badge(v.state),
                v.triggered_count,
            ));
        }
        body.push_str("</table>");
    }

    body.push_str(&format!("<h3>Last {RECENT_ACTIVITY_DAYS} days</h3>"));
    if data.recent_activity.is_empty() {
        body.push_str(r#"<p class="muted">No maintenance recorded recently.</p>"#);
    } else {
        body.push_str(
            r#"<table><tr><th>Date</th><th>Vehicle</th><th class="num">Mileage</th><th>Description</th><th class="num">Cost</th></tr>"#,
        );
        for r in &data.recent_activity {
            body.push_str(&format!(
                r#"<tr><td>{}</td><td>{}</td><td class="num">{}</td><td>{}</td><td class="num">{}</td></tr>"#,
                date_cell(r.date, false),
                escape_html(&r.vehicle_name),
                format_thousands(r.mileage),
                escape_html(&r.description),
                money(r.cost),
            ));
        }
        body.push_str("</table>");
    }

    body.push_str(
        r#"<p><a class="button" href="/vehicles/new">Add vehicle</a> <a class="button" href="/maintenance/new">Add maintenance</a> <a class="button" href="/import">Import CSV</a></p>"#,
    );

    Ok(Html(page("Dashboard", Section::Dashboard, query.banner(), &body)).into_response())
}
