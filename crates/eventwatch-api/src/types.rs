// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event data model for the account events API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire format of API timestamps (UTC, no zone suffix).
pub const API_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a timestamp the way the API expects it in filters and payloads.
pub fn format_api_datetime(at: &DateTime<Utc>) -> String {
    at.format(API_DATETIME_FORMAT).to_string()
}

/// Parse an API timestamp.
///
/// Accepts the zone-less API format and, as a fallback, RFC 3339.
pub fn parse_api_datetime(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, API_DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Serde adapter for API timestamps.
pub mod api_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_api_datetime(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_api_datetime(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    /// Same as the parent module, for nullable fields.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_str(&format_api_datetime(at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse_api_datetime(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

// ============================================================================
// Event kinds
// ============================================================================

macro_rules! event_actions {
    ($($variant:ident => $name:literal,)+) => {
        /// Kind of state change an event describes.
        ///
        /// Kinds the client does not know about deserialize into
        /// [`EventAction::Unknown`] instead of failing the whole page.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum EventAction {
            $($variant,)+
            /// An action string not known to this client.
            Unknown(String),
        }

        impl EventAction {
            /// Every known kind, in declaration order.
            pub const KNOWN: &'static [EventAction] = &[$(EventAction::$variant,)+];

            /// The wire name of this kind.
            pub fn as_str(&self) -> &str {
                match self {
                    $(EventAction::$variant => $name,)+
                    EventAction::Unknown(raw) => raw.as_str(),
                }
            }

            /// Parse a wire name, falling back to `Unknown`.
            pub fn parse(raw: &str) -> Self {
                match raw {
                    $($name => EventAction::$variant,)+
                    other => EventAction::Unknown(other.to_string()),
                }
            }
        }
    };
}

event_actions! {
    AccountUpdate => "account_update",
    AccountSettingsUpdate => "account_settings_update",
    BackupsCancel => "backups_cancel",
    BackupsEnable => "backups_enable",
    BackupsRestore => "backups_restore",
    CreditCardUpdated => "credit_card_updated",
    DatabaseCreate => "database_create",
    DatabaseDelete => "database_delete",
    DatabaseUpdate => "database_update",
    DiskCreate => "disk_create",
    DiskDelete => "disk_delete",
    DiskDuplicate => "disk_duplicate",
    DiskImagize => "disk_imagize",
    DiskResize => "disk_resize",
    DiskUpdate => "disk_update",
    DomainCreate => "domain_create",
    DomainDelete => "domain_delete",
    DomainImport => "domain_import",
    DomainRecordCreate => "domain_record_create",
    DomainRecordDelete => "domain_record_delete",
    DomainRecordUpdate => "domain_record_update",
    DomainUpdate => "domain_update",
    FirewallCreate => "firewall_create",
    FirewallDelete => "firewall_delete",
    FirewallDeviceAdd => "firewall_device_add",
    FirewallDeviceRemove => "firewall_device_remove",
    FirewallDisable => "firewall_disable",
    FirewallEnable => "firewall_enable",
    FirewallUpdate => "firewall_update",
    HostReboot => "host_reboot",
    ImageDelete => "image_delete",
    ImageUpdate => "image_update",
    ImageUpload => "image_upload",
    LassieReboot => "lassie_reboot",
    LinodeAddip => "linode_addip",
    LinodeBoot => "linode_boot",
    LinodeClone => "linode_clone",
    LinodeConfigCreate => "linode_config_create",
    LinodeConfigDelete => "linode_config_delete",
    LinodeConfigUpdate => "linode_config_update",
    LinodeCreate => "linode_create",
    LinodeDelete => "linode_delete",
    LinodeDeleteip => "linode_deleteip",
    LinodeMigrate => "linode_migrate",
    LinodeMigrateDatacenter => "linode_migrate_datacenter",
    LinodeMigrateDatacenterCreate => "linode_migrate_datacenter_create",
    LinodeMutate => "linode_mutate",
    LinodeMutateCreate => "linode_mutate_create",
    LinodeReboot => "linode_reboot",
    LinodeRebuild => "linode_rebuild",
    LinodeResize => "linode_resize",
    LinodeResizeCreate => "linode_resize_create",
    LinodeShutdown => "linode_shutdown",
    LinodeSnapshot => "linode_snapshot",
    LinodeUpdate => "linode_update",
    LishBoot => "lish_boot",
    LkeClusterCreate => "lke_cluster_create",
    LkeClusterDelete => "lke_cluster_delete",
    LkeNodeCreate => "lke_node_create",
    LongviewclientCreate => "longviewclient_create",
    LongviewclientDelete => "longviewclient_delete",
    NodebalancerConfigCreate => "nodebalancer_config_create",
    NodebalancerConfigDelete => "nodebalancer_config_delete",
    NodebalancerConfigUpdate => "nodebalancer_config_update",
    NodebalancerCreate => "nodebalancer_create",
    NodebalancerDelete => "nodebalancer_delete",
    NodebalancerUpdate => "nodebalancer_update",
    OauthClientCreate => "oauth_client_create",
    OauthClientDelete => "oauth_client_delete",
    PasswordReset => "password_reset",
    PaymentSubmitted => "payment_submitted",
    ProfileUpdate => "profile_update",
    StackscriptCreate => "stackscript_create",
    StackscriptDelete => "stackscript_delete",
    StackscriptPublicize => "stackscript_publicize",
    StackscriptRevise => "stackscript_revise",
    StackscriptUpdate => "stackscript_update",
    TagCreate => "tag_create",
    TagDelete => "tag_delete",
    TfaDisabled => "tfa_disabled",
    TfaEnabled => "tfa_enabled",
    TicketAttachmentUpload => "ticket_attachment_upload",
    TicketCreate => "ticket_create",
    TicketUpdate => "ticket_update",
    TokenCreate => "token_create",
    TokenDelete => "token_delete",
    UserCreate => "user_create",
    UserDelete => "user_delete",
    UserSshKeyAdd => "user_ssh_key_add",
    UserSshKeyDelete => "user_ssh_key_delete",
    UserUpdate => "user_update",
    VolumeAttach => "volume_attach",
    VolumeClone => "volume_clone",
    VolumeCreate => "volume_create",
    VolumeDelete => "volume_delete",
    VolumeDetach => "volume_detach",
    VolumeMigrate => "volume_migrate",
    VolumeResize => "volume_resize",
    VolumeUpdate => "volume_update",
}

impl EventAction {
    /// Whether this kind was not recognised.
    pub fn is_unknown(&self) -> bool {
        matches!(self, EventAction::Unknown(_))
    }

    /// Actions where a Linode shows up as the *secondary* entity.
    fn targets_linode_as_secondary(&self) -> bool {
        matches!(
            self,
            EventAction::LinodeClone
                | EventAction::VolumeAttach
                | EventAction::VolumeDetach
                | EventAction::FirewallDeviceAdd
                | EventAction::FirewallDeviceRemove
        )
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventAction::parse(s))
    }
}

impl Serialize for EventAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EventAction::parse(&raw))
    }
}

// ============================================================================
// Event status
// ============================================================================

/// Lifecycle status of the action behind an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Scheduled,
    Started,
    Finished,
    Failed,
    /// One-shot events with no progress (most account/profile actions).
    Notification,
    /// Any status string not known to this client.
    Unknown,
}

impl EventStatus {
    /// The wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Started => "started",
            EventStatus::Finished => "finished",
            EventStatus::Failed => "failed",
            EventStatus::Notification => "notification",
            EventStatus::Unknown => "unknown",
        }
    }

    /// Whether the action has reached an end state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventStatus::Finished | EventStatus::Failed | EventStatus::Notification
        )
    }
}

impl From<&str> for EventStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "scheduled" => EventStatus::Scheduled,
            "started" => EventStatus::Started,
            "finished" => EventStatus::Finished,
            "failed" => EventStatus::Failed,
            "notification" => EventStatus::Notification,
            _ => EventStatus::Unknown,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EventStatus::from(raw.as_str()))
    }
}

// ============================================================================
// Entities and events
// ============================================================================

/// Reference to the resource an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub url: String,
}

impl Entity {
    /// Create an entity reference.
    pub fn new(id: u64, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            label: None,
            entity_type: entity_type.into(),
            url: String::new(),
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the API url.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// A single state change on a cloud resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub action: EventAction,
    #[serde(with = "api_datetime")]
    pub created: DateTime<Utc>,
    #[serde(
        default,
        with = "api_datetime::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entity: Option<Entity>,
    #[serde(default)]
    pub secondary_entity: Option<Entity>,
    pub status: EventStatus,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub percent_complete: Option<u8>,
    #[serde(default)]
    pub time_remaining: Option<String>,
    #[serde(default)]
    pub rate: Option<String>,
    /// Seconds; events recorded before the field existed report 0.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Event {
    /// Create an unseen, unread event with no entity.
    pub fn new(id: u64, action: EventAction, status: EventStatus, created: DateTime<Utc>) -> Self {
        Self {
            id,
            action,
            created,
            updated: None,
            entity: None,
            secondary_entity: None,
            status,
            seen: false,
            read: false,
            percent_complete: None,
            time_remaining: None,
            rate: None,
            duration: None,
            username: None,
            message: None,
        }
    }

    /// Set the primary entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Set the secondary entity.
    pub fn with_secondary_entity(mut self, entity: Entity) -> Self {
        self.secondary_entity = Some(entity);
        self
    }

    /// Set the progress percentage.
    pub fn with_percent_complete(mut self, percent: u8) -> Self {
        self.percent_complete = Some(percent);
        self
    }

    /// Set the seen flag.
    pub fn with_seen(mut self, seen: bool) -> Self {
        self.seen = seen;
        self
    }

    /// Timestamp used for "most recently updated" comparisons.
    pub fn last_change(&self) -> DateTime<Utc> {
        self.updated.unwrap_or(self.created)
    }

    /// An event is in progress while it reports a completion below 100%.
    pub fn is_in_progress(&self) -> bool {
        matches!(self.percent_complete, Some(p) if p < 100)
    }

    /// Whether the event reports 100% completion.
    pub fn is_completed(&self) -> bool {
        self.percent_complete == Some(100)
    }

    /// Label of the primary entity, if any.
    pub fn entity_label(&self) -> Option<&str> {
        self.entity.as_ref().and_then(|e| e.label.as_deref())
    }

    /// Label of the secondary entity, if any.
    pub fn secondary_entity_label(&self) -> Option<&str> {
        self.secondary_entity
            .as_ref()
            .and_then(|e| e.label.as_deref())
    }

    /// Whether `entity_id` is this event's primary entity.
    pub fn is_primary_entity(&self, entity_id: u64) -> bool {
        self.entity.as_ref().is_some_and(|e| e.id == entity_id)
    }

    /// Whether `entity_id` is this event's secondary entity.
    pub fn is_secondary_entity(&self, entity_id: u64) -> bool {
        self.secondary_entity
            .as_ref()
            .is_some_and(|e| e.id == entity_id)
    }

    /// Whether the event concerns the Linode with the given id.
    ///
    /// True for the primary entity, or for the secondary entity when the
    /// action is one that targets a Linode secondarily (clone, attach, ...).
    pub fn is_relevant_to_linode(&self, linode_id: u64) -> bool {
        self.is_primary_entity(linode_id)
            || (self.action.targets_linode_as_secondary() && self.is_secondary_entity(linode_id))
    }
}

/// Number of events not yet displayed to the user.
pub fn count_unseen(events: &[Event]) -> usize {
    events.iter().filter(|e| !e.seen).count()
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events on this page, in the order the API returned them.
    pub data: Vec<Event>,
    /// 1-based page number.
    pub page: u32,
    /// Total number of pages for this filter.
    pub pages: u32,
    /// Total number of results for this filter.
    pub results: u32,
}

impl EventPage {
    /// An empty first page.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            page: 1,
            pages: 1,
            results: 0,
        }
    }

    /// Whether later pages exist.
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_action_round_trips_known_names() {
        for action in EventAction::KNOWN {
            assert_eq!(&EventAction::parse(action.as_str()), action);
        }
    }

    #[test]
    fn test_action_unknown_fallback() {
        let action = EventAction::parse("quantum_entangle");
        assert_eq!(action, EventAction::Unknown("quantum_entangle".to_string()));
        assert!(action.is_unknown());
        assert_eq!(action.as_str(), "quantum_entangle");
    }

    #[test]
    fn test_parse_api_datetime() {
        let parsed = parse_api_datetime("2018-12-03T22:34:09").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2018, 12, 3, 22, 34, 9).unwrap());
        assert_eq!(format_api_datetime(&parsed), "2018-12-03T22:34:09");
    }

    #[test]
    fn test_parse_api_datetime_rfc3339_fallback() {
        let parsed = parse_api_datetime("2018-12-03T22:34:09+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2018, 12, 3, 20, 34, 9).unwrap());
        assert!(parse_api_datetime("yesterday").is_none());
    }

    #[test]
    fn test_in_progress_and_completed() {
        let at = Utc.with_ymd_and_hms(2018, 12, 3, 0, 0, 0).unwrap();
        let base = Event::new(1, EventAction::LinodeBoot, EventStatus::Started, at);
        assert!(!base.is_in_progress());
        assert!(base.clone().with_percent_complete(60).is_in_progress());
        assert!(!base.clone().with_percent_complete(100).is_in_progress());
        assert!(base.with_percent_complete(100).is_completed());
    }
}
