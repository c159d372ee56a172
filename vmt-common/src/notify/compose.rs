//! Reminder message bodies

use crate::config::MailConfig;
use crate::db::models::{EmailSubscription, Vehicle};
use crate::html::escape_html;
use crate::parse::format_thousands;
use crate::reminders::{ReminderState, TriggeredMaintenance, VehicleReminders};
use chrono::{DateTime, Utc};
use serde::Serialize;

const DEFAULT_SENDER: &str = "vehicle-tracker@localhost";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub from: Option<String>,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingEmail {
    /// Minimal RFC 822 message with an HTML body
    pub fn to_rfc822(&self, date: DateTime<Utc>) -> String {
        let from = self.from.as_deref().unwrap_or(DEFAULT_SENDER);
        format!(
            "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nDate: {date}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{body}\r\n",
            to = self.to,
            subject = self.subject,
            date = date.to_rfc2822(),
            body = self.html_body,
        )
    }
}

fn state_label(item: &TriggeredMaintenance) -> &'static str {
    if item.overdue {
        "Overdue"
    } else {
        match item.state {
            ReminderState::Due => "Due now",
            ReminderState::Soon => "Due soon",
            ReminderState::Ok => "Scheduled",
        }
    }
}

fn item_row(item: &TriggeredMaintenance) -> String {
    let planned = &item.item;
    let mileage = planned
        .target_mileage
        .map(|m| format!("{} mi", format_thousands(m)))
        .unwrap_or_default();
    let date = planned
        .target_date
        .map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_default();
    let cost = planned
        .estimated_cost
        .map(|c| format!("${c:.2}"))
        .unwrap_or_default();
    let mut details = planned
        .notes
        .as_deref()
        .map(escape_html)
        .unwrap_or_default();
    if let Some(link) = &planned.parts_link {
        let link = escape_html(link);
        details.push_str(&format!(r#" <a href="{link}">Parts</a>"#));
    }

    format!(
        "<tr><td>{}</td><td>{mileage}</td><td>{date}</td><td>{cost}</td><td>{}</td><td>{}</td></tr>",
        escape_html(&planned.maintenance_type),
        state_label(item),
        details.trim(),
    )
}

/// Reminder for one subscription: every active planned item of the vehicle
pub fn compose_reminder(
    vehicle: &Vehicle,
    reminders: &VehicleReminders,
    subscription: &EmailSubscription,
    mail: &MailConfig,
) -> OutgoingEmail {
    let name = escape_html(&vehicle.name);
    let mut body = format!(
        "<h2>Maintenance Reminder</h2>\n<p>Upcoming maintenance for <strong>{name}</strong> ({} {} {}).</p>\n",
        vehicle.year,
        escape_html(&vehicle.make),
        escape_html(&vehicle.model),
    );

    if let Some(mileage) = reminders.current_mileage {
        body.push_str(&format!(
            "<p>Current mileage: {}</p>\n",
            format_thousands(mileage)
        ));
    }

    if let Some(oil) = reminders.oil.as_ref().filter(|o| o.state != ReminderState::Ok) {
        let text = if oil.miles_until_due < 0 {
            format!("overdue by {} miles", format_thousands(-oil.miles_until_due))
        } else {
            format!("due in {} miles", format_thousands(oil.miles_until_due))
        };
        body.push_str(&format!("<p><strong>Oil change {text}.</strong></p>\n"));
    }

    body.push_str(
        "<table border=\"1\" cellpadding=\"4\" cellspacing=\"0\">\n<tr><th>Service</th><th>Target mileage</th><th>Target date</th><th>Estimated cost</th><th>Status</th><th>Notes</th></tr>\n",
    );
    for item in &reminders.maintenance {
        body.push_str(&item_row(item));
        body.push('\n');
    }
    body.push_str("</table>\n");

    let app_url = mail.app_url.trim_end_matches('/');
    body.push_str(&format!(
        "<p><a href=\"{}/future-maintenance?vehicle_id={}\">View in Vehicle Maintenance Tracker</a></p>\n",
        escape_html(app_url),
        vehicle.id
    ));
    body.push_str(&format!(
        "<p style=\"color:#666\">You receive this reminder at most every {} days.</p>\n",
        subscription.reminder_frequency_days
    ));

    OutgoingEmail {
        to: subscription.email_address.clone(),
        from: mail.sender.clone(),
        subject: format!("Maintenance Reminder: {}", vehicle.name),
        html_body: body,
    }
}

pub fn compose_test_email(to: &str, mail: &MailConfig) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        from: mail.sender.clone(),
        subject: "Test Email from Vehicle Maintenance Tracker".to_string(),
        html_body: format!(
            "<h2>Test Email</h2>\n<p>Reminder emails from {} will reach this address.</p>\n",
            escape_html(&mail.app_url)
        ),
    }
}
