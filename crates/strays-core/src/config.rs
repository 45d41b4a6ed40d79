//! Configuration types for the Strays update engine
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StraysConfig {
    /// Entity store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Notification log configuration
    #[serde(default)]
    pub notifications: NotificationLogConfig,

    /// Coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl StraysConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.notifications.validate()?;
        self.coordinator.validate()?;
        Ok(())
    }
}

/// Entity store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// One JSON file per entity type inside `dir`
    File {
        /// Data directory
        dir: PathBuf,
    },
}

impl StoreConfig {
    /// Validate store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Memory => Ok(()),
            StoreConfig::File { dir } => {
                if dir.as_os_str().is_empty() {
                    return Err(crate::Error::config("File store requires a data directory"));
                }
                if dir.exists() && !dir.is_dir() {
                    return Err(crate::Error::config(format!(
                        "Data directory {} is not a directory",
                        dir.display()
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
        }
    }
}

/// Notification log configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationLogConfig {
    /// Keep notifications in memory
    #[default]
    Memory,

    /// Append notifications to a JSON-lines file
    File {
        /// Path to the log file
        path: PathBuf,
    },
}

impl NotificationLogConfig {
    /// Validate notification log configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotificationLogConfig::Memory => Ok(()),
            NotificationLogConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Notification log requires a file path"));
                }
                if path.is_dir() {
                    return Err(crate::Error::config(format!(
                        "Notification log {} is a directory",
                        path.display()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// What happens when a notification cannot be recorded after a save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryGuarantee {
    /// Log and report the failure; the update stands
    #[default]
    BestEffort,

    /// Restore the previous entity state and fail the call
    Required,
}

impl std::str::FromStr for DeliveryGuarantee {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "required" => Ok(Self::Required),
            other => Err(crate::Error::config(format!(
                "Unknown delivery guarantee '{}'. Valid values: best_effort, required",
                other
            ))),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Notification delivery guarantee
    #[serde(default)]
    pub delivery: DeliveryGuarantee,

    /// Capacity of the coordinator event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl CoordinatorConfig {
    pub fn with_delivery(mut self, delivery: DeliveryGuarantee) -> Self {
        self.delivery = delivery;
        self
    }

    /// Validate coordinator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "event_channel_capacity must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryGuarantee::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}
