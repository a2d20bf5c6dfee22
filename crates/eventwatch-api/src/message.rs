// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Human-readable messages for events.

use crate::types::{Event, EventAction, EventStatus};

fn label(e: &Event) -> &str {
    e.entity_label().unwrap_or("(unknown)")
}

/// `"{text} {secondary label}"`, or `fallback` when there is no secondary label.
fn secondary_or<'a>(e: &'a Event, text: &str, fallback: &'a str) -> String {
    match e.secondary_entity_label() {
        Some(l) => format!("{} {}", text, l),
        None => fallback.to_string(),
    }
}

/// Build the notification text for an event.
///
/// Returns `None` for `(action, status)` pairs that are intentionally silent
/// (for example the `scheduled` phase of most Linode actions).
pub fn event_message(e: &Event) -> Option<String> {
    use EventAction as A;
    use EventStatus as S;

    let l = label(e);
    let msg = match (&e.action, e.status) {
        (A::AccountUpdate | A::AccountSettingsUpdate, _) => {
            "Your account settings have been updated.".to_string()
        }
        (A::CreditCardUpdated, _) => "Credit card information has been updated.".to_string(),
        (A::PaymentSubmitted, _) => "A payment was successfully submitted.".to_string(),
        (A::PasswordReset, _) => "Your password has been reset.".to_string(),
        (A::ProfileUpdate, _) => "Your profile has been updated.".to_string(),
        (A::TfaEnabled, _) => "Two-factor authentication has been enabled.".to_string(),
        (A::TfaDisabled, _) => "Two-factor authentication has been disabled.".to_string(),

        (A::BackupsEnable, _) => format!("Backups have been enabled for {}.", l),
        (A::BackupsCancel, _) => format!("Backups have been canceled for {}.", l),
        (A::BackupsRestore, S::Scheduled) => format!("Backup restoration scheduled for {}", l),
        (A::BackupsRestore, S::Started) => format!("Backup restoration started for {}", l),
        (A::BackupsRestore, S::Failed) => format!("Backup restoration failed for {}.", l),
        (A::BackupsRestore, _) => format!("Backup restoration completed for {}.", l),

        (A::DatabaseCreate, S::Scheduled | S::Notification) => {
            format!("Database {} is scheduled for creation.", l)
        }
        (A::DatabaseCreate, S::Started) => format!("Database {} is being created.", l),
        (A::DatabaseCreate, S::Failed) => format!("Database {} could not be created.", l),
        (A::DatabaseCreate, _) => format!("Database {} has been created.", l),
        (A::DatabaseDelete, _) => format!("Database {} has been deleted.", l),
        (A::DatabaseUpdate, _) => format!("Database {} has been updated.", l),

        (A::DiskCreate, S::Scheduled | S::Started) => format!(
            "{} is being added to Linode {}.",
            secondary_or(e, "Disk", "A disk"),
            l
        ),
        (A::DiskCreate, S::Failed) => format!(
            "{} could not be added to Linode {}.",
            secondary_or(e, "Disk", "A disk"),
            l
        ),
        (A::DiskCreate, _) => format!(
            "{} has been added to Linode {}.",
            secondary_or(e, "Disk", "A disk"),
            l
        ),
        (A::DiskDelete, S::Failed) => format!(
            "{} could not be deleted on Linode {}.",
            secondary_or(e, "Disk", "A disk"),
            l
        ),
        (A::DiskDelete, S::Scheduled | S::Started) => format!(
            "{} on Linode {} is being deleted.",
            secondary_or(e, "Disk", "A disk"),
            l
        ),
        (A::DiskDelete, _) => format!(
            "{} on Linode {} has been deleted.",
            secondary_or(e, "Disk", "A disk"),
            l
        ),
        (A::DiskDuplicate, S::Failed) => format!("Disk on Linode {} could not be duplicated.", l),
        (A::DiskDuplicate, S::Scheduled | S::Started) => {
            format!("Disk on Linode {} is being duplicated.", l)
        }
        (A::DiskDuplicate, _) => format!("Disk on Linode {} has been duplicated.", l),
        (A::DiskImagize, S::Failed) => format!(
            "There was a problem creating Image {}.",
            e.secondary_entity_label().unwrap_or(l)
        ),
        (A::DiskImagize, S::Scheduled | S::Started) => format!(
            "Image {} is being created.",
            e.secondary_entity_label().unwrap_or(l)
        ),
        (A::DiskImagize, _) => format!(
            "Image {} has been created.",
            e.secondary_entity_label().unwrap_or(l)
        ),
        (A::DiskResize, S::Failed) => format!("A disk on Linode {} could not be resized.", l),
        (A::DiskResize, S::Scheduled | S::Started) => {
            format!("A disk on Linode {} is being resized.", l)
        }
        (A::DiskResize, _) => format!("A disk on Linode {} has been resized.", l),
        (A::DiskUpdate, _) => format!("Disk {} has been updated.", e.secondary_entity_label().unwrap_or(l)),

        (A::DomainCreate, _) => format!("Domain {} has been created.", l),
        (A::DomainDelete, _) => format!("Domain {} has been deleted.", l),
        (A::DomainImport, _) => format!("Domain {} has been imported.", l),
        (A::DomainUpdate, _) => format!("Domain {} has been updated.", l),
        (A::DomainRecordCreate, _) => format!(
            "{} has been added to {}.",
            secondary_or(e, "Record", "A record"),
            l
        ),
        (A::DomainRecordUpdate, _) => format!(
            "{} has been updated for {}.",
            secondary_or(e, "Record", "A record"),
            l
        ),
        (A::DomainRecordDelete, _) => format!(
            "{} has been removed from {}.",
            secondary_or(e, "Record", "A record"),
            l
        ),

        (A::FirewallCreate, _) => format!("Firewall {} has been created.", l),
        (A::FirewallDelete, _) => format!("Firewall {} has been deleted.", l),
        (A::FirewallEnable, _) => format!("Firewall {} has been enabled.", l),
        (A::FirewallDisable, _) => format!("Firewall {} has been disabled.", l),
        (A::FirewallUpdate, _) => format!("Firewall {} has been updated.", l),
        (A::FirewallDeviceAdd, _) => format!(
            "{} has been added to Firewall {}.",
            secondary_or(e, "", "A device").trim_start(),
            l
        ),
        (A::FirewallDeviceRemove, _) => format!(
            "{} has been removed from Firewall {}.",
            secondary_or(e, "", "A device").trim_start(),
            l
        ),

        (A::HostReboot, S::Scheduled) => return None,
        (A::HostReboot, S::Failed) => format!("Linode {} could not be booted (host initiated).", l),
        (A::HostReboot, S::Started) => format!("Linode {} is being booted (host initiated).", l),
        (A::HostReboot, _) => format!("Linode {} has been booted (host initiated).", l),
        (A::LassieReboot, S::Scheduled) => {
            format!("Linode {} is scheduled to be rebooted by the Lassie watchdog service.", l)
        }
        (A::LassieReboot, S::Failed) => {
            format!("Linode {} could not be rebooted by the Lassie watchdog service.", l)
        }
        (A::LassieReboot, S::Started) => {
            format!("Linode {} is being rebooted by the Lassie watchdog service.", l)
        }
        (A::LassieReboot, _) => {
            format!("Linode {} has been rebooted by the Lassie watchdog service.", l)
        }

        (A::ImageDelete, _) => format!("Image {} has been deleted.", l),
        (A::ImageUpdate, _) => format!("Image {} has been updated.", l),
        (A::ImageUpload, S::Failed) => format!("There was a problem uploading image {}.", l),
        (A::ImageUpload, S::Scheduled | S::Started) => format!("Image {} is being uploaded.", l),
        (A::ImageUpload, _) => format!("Image {} has been uploaded.", l),

        (A::LinodeAddip, _) => format!("An IP address has been added to Linode {}.", l),
        (A::LinodeDeleteip, _) => format!("An IP address has been deleted from Linode {}.", l),
        (A::LinodeBoot | A::LishBoot, S::Scheduled) => format!("Linode {} is scheduled to boot.", l),
        (A::LinodeBoot | A::LishBoot, S::Started) => format!("Linode {} is booting.", l),
        (A::LinodeBoot | A::LishBoot, S::Failed) => format!("Linode {} could not be booted.", l),
        (A::LinodeBoot | A::LishBoot, _) => format!("Linode {} has been booted.", l),
        (A::LinodeClone, S::Scheduled) => format!(
            "Linode {} is scheduled to be cloned{}.",
            l,
            secondary_or(e, " to", "")
        ),
        (A::LinodeClone, S::Started) => format!(
            "Linode {} is being cloned{}.",
            l,
            secondary_or(e, " to", "")
        ),
        (A::LinodeClone, S::Failed) => format!("Linode {} could not be cloned.", l),
        (A::LinodeClone, _) => format!(
            "Linode {} has been cloned{}.",
            l,
            secondary_or(e, " to", "")
        ),
        (A::LinodeConfigCreate, _) => format!(
            "{} has been created on Linode {}.",
            secondary_or(e, "Config", "A config"),
            l
        ),
        (A::LinodeConfigDelete, _) => format!(
            "{} has been deleted on Linode {}.",
            secondary_or(e, "Config", "A config"),
            l
        ),
        (A::LinodeConfigUpdate, _) => format!(
            "{} has been updated on Linode {}.",
            secondary_or(e, "Config", "A config"),
            l
        ),
        (A::LinodeCreate, S::Scheduled) => format!("Linode {} is scheduled for creation.", l),
        (A::LinodeCreate, S::Started) => format!("Linode {} is being created.", l),
        (A::LinodeCreate, S::Failed) => format!("Linode {} could not be created.", l),
        (A::LinodeCreate, _) => format!("Linode {} has been created.", l),
        (A::LinodeDelete, S::Scheduled) => format!("Linode {} is scheduled for deletion.", l),
        (A::LinodeDelete, S::Started) => format!("Linode {} is being deleted.", l),
        (A::LinodeDelete, S::Failed) => format!("Linode {} could not be deleted.", l),
        (A::LinodeDelete, _) => format!("Linode {} has been deleted.", l),
        (A::LinodeMigrate | A::LinodeMigrateDatacenter, S::Scheduled) => {
            format!("Linode {} is scheduled for migration.", l)
        }
        (A::LinodeMigrate | A::LinodeMigrateDatacenter, S::Started) => {
            format!("Linode {} is being migrated.", l)
        }
        (A::LinodeMigrate | A::LinodeMigrateDatacenter, S::Failed) => {
            format!("Migration failed for Linode {}.", l)
        }
        (A::LinodeMigrate | A::LinodeMigrateDatacenter, _) => {
            format!("Linode {} has been migrated.", l)
        }
        (A::LinodeMigrateDatacenterCreate, _) => {
            format!("Migration for Linode {} has been initiated.", l)
        }
        (A::LinodeMutate, S::Scheduled) => format!("Linode {} is scheduled for an upgrade.", l),
        (A::LinodeMutate, S::Started) => format!("Linode {} is being upgraded.", l),
        (A::LinodeMutate, S::Failed) => format!("Linode {} could not be upgraded.", l),
        (A::LinodeMutate, _) => format!("Linode {} has been upgraded.", l),
        (A::LinodeMutateCreate, _) => format!("Upgrade for Linode {} has been initiated.", l),
        (A::LinodeReboot, S::Scheduled) => format!("Linode {} is scheduled for a reboot.", l),
        (A::LinodeReboot, S::Started) => format!("Linode {} is rebooting.", l),
        (A::LinodeReboot, S::Failed) => format!("Linode {} could not be rebooted.", l),
        (A::LinodeReboot, _) => format!("Linode {} has been rebooted.", l),
        (A::LinodeRebuild, S::Scheduled) => format!("Linode {} is scheduled for rebuild.", l),
        (A::LinodeRebuild, S::Started) => format!("Linode {} is rebuilding.", l),
        (A::LinodeRebuild, S::Failed) => format!("Linode {} could not be rebuilt.", l),
        (A::LinodeRebuild, _) => format!("Linode {} has been rebuilt.", l),
        (A::LinodeResize, S::Scheduled) => format!("Linode {} is scheduled for resizing.", l),
        (A::LinodeResize, S::Started) => format!("Linode {} is resizing.", l),
        (A::LinodeResize, S::Failed) => format!("Linode {} could not be resized.", l),
        (A::LinodeResize, _) => format!("Linode {} has been resized.", l),
        (A::LinodeResizeCreate, _) => format!("Resize for Linode {} has been initiated.", l),
        (A::LinodeShutdown, S::Scheduled) => format!("Linode {} is scheduled for shutdown.", l),
        (A::LinodeShutdown, S::Started) => format!("Linode {} is shutting down.", l),
        (A::LinodeShutdown, S::Failed) => format!("Linode {} could not be shut down.", l),
        (A::LinodeShutdown, _) => format!("Linode {} has been shut down.", l),
        (A::LinodeSnapshot, S::Scheduled) => format!("Linode {} has been scheduled for backup.", l),
        (A::LinodeSnapshot, S::Started) => format!("A snapshot is being taken for Linode {}.", l),
        (A::LinodeSnapshot, S::Failed) => format!("Snapshot backup failed on Linode {}.", l),
        (A::LinodeSnapshot, _) => format!("A snapshot backup has been created for {}.", l),
        (A::LinodeUpdate, _) => format!("Linode {} has been updated.", l),

        (A::LkeClusterCreate, _) => format!("Kubernetes Cluster {} has been created.", l),
        (A::LkeClusterDelete, _) => format!("Kubernetes Cluster {} has been deleted.", l),
        (A::LkeNodeCreate, S::Failed) => {
            format!("A node could not be created for Kubernetes Cluster {}.", l)
        }
        (A::LkeNodeCreate, _) => format!("A node has been created for Kubernetes Cluster {}.", l),

        (A::LongviewclientCreate, _) => format!("Longview Client {} has been created.", l),
        (A::LongviewclientDelete, _) => format!("Longview Client {} has been deleted.", l),

        (A::NodebalancerCreate, _) => format!("NodeBalancer {} has been created.", l),
        (A::NodebalancerDelete, _) => format!("NodeBalancer {} has been deleted.", l),
        (A::NodebalancerUpdate, _) => format!("NodeBalancer {} has been updated.", l),
        (A::NodebalancerConfigCreate, _) => {
            format!("A config on NodeBalancer {} has been created.", l)
        }
        (A::NodebalancerConfigDelete, _) => {
            format!("A config on NodeBalancer {} has been deleted.", l)
        }
        (A::NodebalancerConfigUpdate, _) => {
            format!("A config on NodeBalancer {} has been updated.", l)
        }

        (A::OauthClientCreate, _) => format!("OAuth App {} has been created.", l),
        (A::OauthClientDelete, _) => format!("OAuth App {} has been deleted.", l),

        (A::StackscriptCreate, _) => format!("StackScript {} has been created.", l),
        (A::StackscriptDelete, _) => format!("StackScript {} has been deleted.", l),
        (A::StackscriptPublicize, _) => format!("StackScript {} has been made public.", l),
        (A::StackscriptRevise, _) => format!("StackScript {} has been revised.", l),
        (A::StackscriptUpdate, _) => format!("StackScript {} has been updated.", l),

        (A::TagCreate, _) => format!("Tag {} has been created.", l),
        (A::TagDelete, _) => format!("Tag {} has been deleted.", l),

        (A::TicketAttachmentUpload, _) => {
            format!("A file has been attached to support ticket {}.", l)
        }
        (A::TicketCreate, _) => format!("New support ticket \"{}\" created.", l),
        (A::TicketUpdate, _) => format!("Support ticket \"{}\" has been updated.", l),

        (A::TokenCreate, _) => format!("Token {} has been created.", l),
        (A::TokenDelete, _) => format!("Token {} has been revoked.", l),

        (A::UserCreate, _) => format!("User {} has been created.", l),
        (A::UserDelete, _) => format!("User {} has been deleted.", l),
        (A::UserUpdate, _) => format!("User {} has been updated.", l),
        (A::UserSshKeyAdd, _) => format!("An SSH key ({}) has been added to your profile.", l),
        (A::UserSshKeyDelete, _) => {
            format!("An SSH key ({}) has been removed from your profile.", l)
        }

        (A::VolumeAttach, S::Failed) => format!(
            "Volume {} could not be attached{}.",
            l,
            secondary_or(e, " to", "")
        ),
        (A::VolumeAttach, S::Scheduled | S::Started) => format!(
            "Volume {} is being attached{}.",
            l,
            secondary_or(e, " to", "")
        ),
        (A::VolumeAttach, _) => format!(
            "Volume {} has been attached{}.",
            l,
            secondary_or(e, " to", "")
        ),
        (A::VolumeClone, _) => format!("Volume {} has been cloned.", l),
        (A::VolumeCreate, S::Scheduled) => format!("Volume {} is scheduled for creation.", l),
        (A::VolumeCreate, S::Started) => format!("Volume {} is being created.", l),
        (A::VolumeCreate, S::Failed) => format!("Creation of volume {} failed.", l),
        (A::VolumeCreate, _) => format!("Volume {} has been created.", l),
        (A::VolumeDelete, S::Scheduled | S::Started) => return None,
        (A::VolumeDelete, S::Failed) => format!("Volume {} could not be deleted.", l),
        (A::VolumeDelete, _) => format!("Volume {} has been deleted.", l),
        (A::VolumeDetach, S::Failed) => format!("Volume {} could not be detached.", l),
        (A::VolumeDetach, S::Scheduled | S::Started) => format!("Volume {} is being detached.", l),
        (A::VolumeDetach, _) => format!(
            "Volume {} has been detached{}.",
            l,
            secondary_or(e, " from", "")
        ),
        (A::VolumeMigrate, S::Started) => format!("Volume {} is being upgraded to NVMe.", l),
        (A::VolumeMigrate, S::Failed) => format!("Volume {} failed to upgrade to NVMe.", l),
        (A::VolumeMigrate, _) => format!("Volume {} has been upgraded to NVMe.", l),
        (A::VolumeResize, S::Failed) => format!("Volume {} could not be resized.", l),
        (A::VolumeResize, _) => format!("Volume {} has been resized.", l),
        (A::VolumeUpdate, _) => format!("Volume {} has been updated.", l),

        (A::Unknown(_), _) => generic_message(e),
    };

    Some(msg)
}

/// Fallback text for actions without a dedicated message.
pub fn generic_message(e: &Event) -> String {
    let action = e.action.as_str().replace('_', " ");
    match e.entity_label() {
        Some(label) => format!("{}: {} ({}).", label, action, e.status),
        None => format!("{} ({}).", action, e.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entity;
    use chrono::{TimeZone, Utc};

    fn event(action: EventAction, status: EventStatus) -> Event {
        let at = Utc.with_ymd_and_hms(2018, 12, 3, 22, 34, 9).unwrap();
        Event::new(1, action, status, at)
            .with_entity(Entity::new(11241778, "linode").with_label("node-server"))
    }

    #[test]
    fn test_linode_reboot_messages() {
        assert_eq!(
            event_message(&event(EventAction::LinodeReboot, EventStatus::Started)).unwrap(),
            "Linode node-server is rebooting."
        );
        assert_eq!(
            event_message(&event(EventAction::LinodeReboot, EventStatus::Finished)).unwrap(),
            "Linode node-server has been rebooted."
        );
    }

    #[test]
    fn test_secondary_entity_label_used() {
        let e = event(EventAction::DiskCreate, EventStatus::Finished)
            .with_secondary_entity(Entity::new(5, "disk").with_label("Ubuntu Disk"));
        assert_eq!(
            event_message(&e).unwrap(),
            "Disk Ubuntu Disk has been added to Linode node-server."
        );

        let without = event(EventAction::DiskCreate, EventStatus::Finished);
        assert_eq!(
            event_message(&without).unwrap(),
            "A disk has been added to Linode node-server."
        );
    }

    #[test]
    fn test_clone_target_appended() {
        let e = event(EventAction::LinodeClone, EventStatus::Finished)
            .with_secondary_entity(Entity::new(9, "linode").with_label("copy"));
        assert_eq!(
            event_message(&e).unwrap(),
            "Linode node-server has been cloned to copy."
        );
    }

    #[test]
    fn test_silent_phases() {
        assert!(event_message(&event(EventAction::HostReboot, EventStatus::Scheduled)).is_none());
        assert!(event_message(&event(EventAction::VolumeDelete, EventStatus::Started)).is_none());
    }

    #[test]
    fn test_unknown_action_falls_back() {
        let e = event(
            EventAction::Unknown("placement_group_assign".to_string()),
            EventStatus::Notification,
        );
        assert_eq!(
            event_message(&e).unwrap(),
            "node-server: placement group assign (notification)."
        );
    }

    #[test]
    fn test_every_known_action_has_a_message_when_finished() {
        for action in EventAction::KNOWN {
            let e = event(action.clone(), EventStatus::Finished);
            assert!(event_message(&e).is_some(), "no message for {}", action);
        }
    }
}
