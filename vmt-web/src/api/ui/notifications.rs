//! Notifications and reminder email subscriptions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use vmt_common::db::models::NewEmailSubscription;
use vmt_common::db::{subscriptions, vehicles};
use vmt_common::html::escape_html;
use vmt_common::reminders::{self, Urgency};

use super::layout::{
    attr, date_cell, failed_form, form_failure, page, vehicle_options, Banner, PageQuery,
    PageResult, Section,
};
use crate::forms::{blank_as_none, int_field, required};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub reminder_frequency_days: Option<String>,
}

impl SubscriptionForm {
    fn to_input(&self) -> vmt_common::Result<NewEmailSubscription> {
        Ok(NewEmailSubscription {
            vehicle_id: required(int_field(self.vehicle_id.as_deref(), "Vehicle")?, "Vehicle")?,
            email_address: required(self.email_address.clone(), "Email address")?,
            reminder_frequency_days: int_field(
                self.reminder_frequency_days.as_deref(),
                "Reminder frequency",
            )?
            .unwrap_or(7),
        })
    }
}

async fn render(
    state: &AppState,
    form: &SubscriptionForm,
    banner: Banner<'_>,
    status: StatusCode,
) -> PageResult {
    let feed = reminders::notifications(&state.db, state.today(), &state.config.reminders).await?;
    let names = vehicles::vehicle_names(&state.db).await?;
    let subs = subscriptions::list(&state.db).await?;

    let mut body = String::new();
    if feed.notifications.is_empty() {
        body.push_str(r#"<p class="muted">All vehicles are up to date.</p>"#);
    } else {
        if feed.has_overdue {
            body.push_str(r#"<p class="high">Some maintenance is overdue.</p>"#);
        }
        body.push_str("<ul>");
        for n in &feed.notifications {
            let class = match n.urgency {
                Urgency::High => "high",
                Urgency::Medium => "medium",
                Urgency::Low => "low",
            };
            body.push_str(&format!(
                r#"<li class="{class}"><strong>{}</strong> ({}): {}</li>"#,
                escape_html(&n.title),
                escape_html(&n.vehicle_name),
                escape_html(&n.message),
            ));
        }
        body.push_str("</ul>");
    }

    body.push_str("<h3>Email reminders</h3>");
    if subs.is_empty() {
        body.push_str(r#"<p class="muted">No subscriptions.</p>"#);
    } else {
        body.push_str(
            r#"<table><tr><th>Vehicle</th><th>Email</th><th class="num">Every (days)</th><th>Last sent</th><th>Status</th><th></th></tr>"#,
        );
        for s in &subs {
            let vehicle = names
                .iter()
                .find(|v| v.id == s.vehicle_id)
                .map(|v| escape_html(&v.name))
                .unwrap_or_default();
            let (status_text, toggle_label) = if s.is_active {
                ("Active", "Pause")
            } else {
                ("Paused", "Resume")
            };
            body.push_str(&format!(
                r#"<tr><td>{vehicle}</td><td>{}</td><td class="num">{}</td><td>{}</td><td>{status_text}</td>
<td><form class="inline" method="post" action="/notifications/subscriptions/{id}/toggle"><button class="small" type="submit">{toggle_label}</button></form>
<form class="inline" method="post" action="/notifications/subscriptions/{id}/delete" data-confirm="Remove this subscription?"><button class="small danger" type="submit">Remove</button></form></td></tr>"#,
                escape_html(&s.email_address),
                s.reminder_frequency_days,
                s.last_email_sent
                    .map(|d| date_cell(d, false))
                    .unwrap_or_else(|| "Never".to_string()),
                id = s.id,
            ));
        }
        body.push_str("</table>");
    }

    let selected = form.vehicle_id.as_deref().and_then(|s| s.parse().ok());
    body.push_str(&format!(
        r#"<form method="post" action="/notifications/subscriptions">
<fieldset><legend>Subscribe</legend>
    <div class="field"><label>Vehicle</label><select name="vehicle_id" required>{}</select></div>
    <div class="field"><label>Email</label><input type="email" name="email_address" value="{}" required></div>
    <div class="field"><label>At most every (days)</label><input name="reminder_frequency_days" value="{}" size="4"></div>
</fieldset>
<button type="submit">Subscribe</button>
</form>"#,
        vehicle_options(&names, selected, None),
        attr(form.email_address.as_deref()),
        attr(form.reminder_frequency_days.as_deref().or(Some("7"))),
    ));

    match banner {
        Banner::Error(message) => Ok(failed_form(
            "Notifications",
            Section::Notifications,
            status,
            message,
            &body,
        )),
        other => Ok(Html(page("Notifications", Section::Notifications, other, &body)).into_response()),
    }
}

/// GET /notifications
pub async fn notifications_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let form = SubscriptionForm {
        vehicle_id: query.vehicle_filter().map(|id| id.to_string()),
        ..Default::default()
    };
    render(&state, &form, query.banner(), StatusCode::OK).await
}

/// POST /notifications/subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    Form(form): Form<SubscriptionForm>,
) -> PageResult {
    let result = match form.to_input() {
        Ok(input) => subscriptions::create(&state.db, &input).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(_) => Ok(Redirect::to("/notifications?notice=subscription_created").into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            render(&state, &form, Banner::Error(&message), status).await
        }
    }
}

/// POST /notifications/subscriptions/:id/toggle
pub async fn toggle_subscription(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let current = subscriptions::get(&state.db, id).await?;
    let updated = subscriptions::set_active(&state.db, id, !current.is_active).await?;
    let notice = if updated.is_active {
        "subscription_resumed"
    } else {
        "subscription_paused"
    };
    Ok(Redirect::to(&format!("/notifications?notice={notice}")).into_response())
}

/// POST /notifications/subscriptions/:id/delete
pub async fn delete_subscription(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    subscriptions::delete(&state.db, id).await?;
    Ok(Redirect::to("/notifications?notice=subscription_deleted").into_response())
}
