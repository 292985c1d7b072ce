use serde::Serialize;

use crate::db::entities::incident;
use crate::db::enums::IncidentSeverity;

/// Lifecycle event emitted by the incident engine and consumed by the
/// notification dispatcher.
#[derive(Debug, Clone)]
pub struct IncidentEvent {
    pub kind: IncidentEventKind,
    pub incident: incident::Model,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IncidentEventKind {
    Created,
    Resolved,
    Reopened,
}

impl IncidentEventKind {
    pub fn is_resolved(&self) -> bool {
        matches!(self, IncidentEventKind::Resolved)
    }

    /// Headline word used in outbound messages. Everything that is not a
    /// resolution reads as an alert.
    pub fn action(&self) -> &'static str {
        if self.is_resolved() { "Resolved" } else { "Alert" }
    }

    pub fn emoji(&self) -> &'static str {
        if self.is_resolved() { "\u{2705}" } else { "\u{1f6a8}" }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentEventKind::Created => "created",
            IncidentEventKind::Resolved => "resolved",
            IncidentEventKind::Reopened => "reopened",
        }
    }
}

fn format_time(time: &chrono::DateTime<chrono::Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

// --- Slack ---

#[derive(Debug, Clone, Serialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackAttachment {
    pub color: String,
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackPayload {
    pub text: String,
    pub attachments: Vec<SlackAttachment>,
}

pub fn slack_message(kind: IncidentEventKind, application_name: &str, title: &str) -> String {
    format!(
        "{} *{}*: {} - {}",
        kind.emoji(),
        kind.action(),
        application_name,
        title
    )
}

pub fn slack_color(kind: IncidentEventKind, severity: IncidentSeverity) -> &'static str {
    if kind.is_resolved() {
        return "good";
    }
    match severity {
        IncidentSeverity::Critical => "danger",
        IncidentSeverity::High => "warning",
        IncidentSeverity::Low => "#439FE0",
    }
}

pub fn slack_payload(
    kind: IncidentEventKind,
    incident: &incident::Model,
    application_name: &str,
) -> SlackPayload {
    SlackPayload {
        text: slack_message(kind, application_name, &incident.title),
        attachments: vec![SlackAttachment {
            color: slack_color(kind, incident.severity).to_string(),
            fields: vec![
                SlackField {
                    title: "Application".to_string(),
                    value: application_name.to_string(),
                    short: true,
                },
                SlackField {
                    title: "Severity".to_string(),
                    value: incident.severity.to_string(),
                    short: true,
                },
                SlackField {
                    title: "Status".to_string(),
                    value: incident.status.to_string(),
                    short: true,
                },
                SlackField {
                    title: "Time".to_string(),
                    value: format_time(&incident.started_at),
                    short: true,
                },
            ],
        }],
    }
}

// --- Teams ---

#[derive(Debug, Clone, Serialize)]
pub struct TeamsFact {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamsSection {
    #[serde(rename = "activityTitle")]
    pub activity_title: String,
    pub facts: Vec<TeamsFact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamsPayload {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "themeColor")]
    pub theme_color: String,
    pub summary: String,
    pub sections: Vec<TeamsSection>,
}

pub fn teams_message(kind: IncidentEventKind, application_name: &str, title: &str) -> String {
    format!("{}: {} - {}", kind.action(), application_name, title)
}

pub fn teams_color(kind: IncidentEventKind, severity: IncidentSeverity) -> &'static str {
    if kind.is_resolved() {
        return "00FF00";
    }
    match severity {
        IncidentSeverity::Critical => "FF0000",
        IncidentSeverity::High => "FFA500",
        IncidentSeverity::Low => "0078D4",
    }
}

pub fn teams_payload(
    kind: IncidentEventKind,
    incident: &incident::Model,
    application_name: &str,
) -> TeamsPayload {
    let message = teams_message(kind, application_name, &incident.title);
    TeamsPayload {
        card_type: "MessageCard",
        context: "http://schema.org/extensions",
        theme_color: teams_color(kind, incident.severity).to_string(),
        summary: message.clone(),
        sections: vec![TeamsSection {
            activity_title: message,
            facts: vec![
                TeamsFact {
                    name: "Application".to_string(),
                    value: application_name.to_string(),
                },
                TeamsFact {
                    name: "Severity".to_string(),
                    value: incident.severity.to_string(),
                },
                TeamsFact {
                    name: "Status".to_string(),
                    value: incident.status.to_string(),
                },
                TeamsFact {
                    name: "Time".to_string(),
                    value: format_time(&incident.started_at),
                },
            ],
        }],
    }
}

// --- Discord ---

#[derive(Debug, Clone, Serialize)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<DiscordField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordPayload {
    pub content: String,
    pub embeds: Vec<DiscordEmbed>,
}

pub fn discord_message(kind: IncidentEventKind, application_name: &str, title: &str) -> String {
    format!(
        "{} **{}**: {} - {}",
        kind.emoji(),
        kind.action(),
        application_name,
        title
    )
}

pub fn discord_color(kind: IncidentEventKind, severity: IncidentSeverity) -> u32 {
    if kind.is_resolved() {
        return 0x00FF00;
    }
    match severity {
        IncidentSeverity::Critical => 0xFF0000,
        IncidentSeverity::High => 0xFFA500,
        IncidentSeverity::Low => 0x0099FF,
    }
}

pub fn discord_payload(
    kind: IncidentEventKind,
    incident: &incident::Model,
    application_name: &str,
) -> DiscordPayload {
    DiscordPayload {
        content: discord_message(kind, application_name, &incident.title),
        embeds: vec![DiscordEmbed {
            title: incident.title.clone(),
            description: incident.description.clone(),
            color: discord_color(kind, incident.severity),
            fields: vec![
                DiscordField {
                    name: "Application".to_string(),
                    value: application_name.to_string(),
                    inline: true,
                },
                DiscordField {
                    name: "Severity".to_string(),
                    value: incident.severity.to_string(),
                    inline: true,
                },
                DiscordField {
                    name: "Status".to_string(),
                    value: incident.status.to_string(),
                    inline: true,
                },
            ],
            timestamp: incident.started_at.to_rfc3339(),
        }],
    }
}

// --- Email ---

pub fn email_subject(kind: IncidentEventKind, application_name: &str, title: &str) -> String {
    format!("[{}] {} - {}", kind.action(), application_name, title)
}

pub fn email_body(
    kind: IncidentEventKind,
    incident: &incident::Model,
    application_name: &str,
) -> String {
    let status_line = if kind.is_resolved() {
        "has been resolved"
    } else {
        "is experiencing an issue"
    };
    format!(
        "Your application '{}' {}.\n\nIncident: {}\nDescription: {}\nSeverity: {}\nTime: {}",
        application_name,
        status_line,
        incident.title,
        incident.description,
        incident.severity,
        format_time(&incident.started_at)
    )
}
