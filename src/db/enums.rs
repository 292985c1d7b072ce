use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "incident_status_enum")]
pub enum IncidentStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "RESOLVED")]
    Resolved,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "OPEN",
            IncidentStatus::InProgress => "IN_PROGRESS",
            IncidentStatus::Resolved => "RESOLVED",
            IncidentStatus::Closed => "CLOSED",
        }
    }

    /// The set of statuses this status may legally transition to.
    pub fn allowed_transitions(&self) -> &'static [IncidentStatus] {
        match self {
            IncidentStatus::Open => &[IncidentStatus::InProgress, IncidentStatus::Closed],
            IncidentStatus::InProgress => &[IncidentStatus::Resolved, IncidentStatus::Closed],
            IncidentStatus::Resolved => &[IncidentStatus::Closed],
            IncidentStatus::Closed => &[],
        }
    }

    pub fn can_transition_to(&self, next: IncidentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// OPEN and IN_PROGRESS incidents count as ongoing.
    pub fn is_active(&self) -> bool {
        matches!(self, IncidentStatus::Open | IncidentStatus::InProgress)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Closed)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "incident_severity_enum")]
pub enum IncidentSeverity {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "LOW",
            IncidentSeverity::High => "HIGH",
            IncidentSeverity::Critical => "CRITICAL",
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            IncidentSeverity::Low => 1,
            IncidentSeverity::High => 2,
            IncidentSeverity::Critical => 3,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "#28a745",
            IncidentSeverity::High => "#ffc107",
            IncidentSeverity::Critical => "#dc3545",
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Slack,
    Teams,
    Discord,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Slack => "slack",
            NotificationChannel::Teams => "teams",
            NotificationChannel::Discord => "discord",
        }
    }

    pub fn defaults() -> Vec<NotificationChannel> {
        vec![NotificationChannel::Email]
    }

    /// Email is always part of the effective channel set, and duplicates
    /// are dropped while preserving first-seen order.
    pub fn normalize(channels: &[NotificationChannel]) -> Vec<NotificationChannel> {
        let mut normalized = vec![NotificationChannel::Email];
        for channel in channels {
            if !normalized.contains(channel) {
                normalized.push(*channel);
            }
        }
        normalized
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "subscribable_type_enum")]
pub enum SubscribableType {
    #[sea_orm(string_value = "application")]
    Application,
    #[sea_orm(string_value = "application_group")]
    ApplicationGroup,
}

/// Typed subscription target, paired with [`SubscribableType`] for storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubscriptionTarget {
    Application(i32),
    ApplicationGroup(i32),
}

impl SubscriptionTarget {
    pub fn kind(&self) -> SubscribableType {
        match self {
            SubscriptionTarget::Application(_) => SubscribableType::Application,
            SubscriptionTarget::ApplicationGroup(_) => SubscribableType::ApplicationGroup,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            SubscriptionTarget::Application(id) => *id,
            SubscriptionTarget::ApplicationGroup(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_strict() {
        use IncidentStatus::*;
        let all = [Open, InProgress, Resolved, Closed];
        for from in all {
            for to in all {
                let allowed = matches!(
                    (from, to),
                    (Open, InProgress)
                        | (Open, Closed)
                        | (InProgress, Resolved)
                        | (InProgress, Closed)
                        | (Resolved, Closed)
                );
                assert_eq!(
                    from.can_transition_to(to),
                    allowed,
                    "{from} -> {to} expected {allowed}"
                );
            }
        }
    }

    #[test]
    fn closed_is_terminal() {
        assert!(IncidentStatus::Closed.allowed_transitions().is_empty());
    }

    #[test]
    fn open_to_resolved_needs_in_progress() {
        assert!(!IncidentStatus::Open.can_transition_to(IncidentStatus::Resolved));
    }

    #[test]
    fn normalize_always_includes_email() {
        let channels = NotificationChannel::normalize(&[NotificationChannel::Slack]);
        assert_eq!(
            channels,
            vec![NotificationChannel::Email, NotificationChannel::Slack]
        );
    }

    #[test]
    fn normalize_drops_duplicates() {
        let channels = NotificationChannel::normalize(&[
            NotificationChannel::Discord,
            NotificationChannel::Email,
            NotificationChannel::Discord,
        ]);
        assert_eq!(
            channels,
            vec![NotificationChannel::Email, NotificationChannel::Discord]
        );
    }

    #[test]
    fn severity_levels_are_ordered() {
        assert!(IncidentSeverity::Critical.level() > IncidentSeverity::High.level());
        assert!(IncidentSeverity::High.level() > IncidentSeverity::Low.level());
    }

    #[test]
    fn status_display_uses_stored_values() {
        assert_eq!(IncidentStatus::InProgress.to_string(), "IN_PROGRESS");
    }
}
