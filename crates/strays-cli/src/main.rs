// # strays-update - apply one partial update
//
// The strays-update binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Wiring stores, notification log and identity into a coordinator
// 3. Applying one update (or deactivation) and printing the result
//
// It is a thin integration layer; every decision is made by strays-core.
//
// ## Usage
//
// ```bash
// strays-update <animal|user> <id> '<json object>'
// strays-update <animal|user> <id> --deactivate
// ```
//
// ## Configuration
//
// - `STRAYS_REQUESTER_ID`: Numeric id of the acting user (unset = anonymous)
// - `STRAYS_STORE_TYPE`: Entity store (file)
// - `STRAYS_DATA_DIR`: Directory holding `animals.json` / `users.json` (file store)
// - `STRAYS_NOTIFICATION_LOG`: JSON-lines file for notifications (unset = discarded on exit)
// - `STRAYS_DELIVERY`: Notification delivery guarantee (best_effort, required)
// - `STRAYS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export STRAYS_REQUESTER_ID=1
// export STRAYS_STORE_TYPE=file
// export STRAYS_DATA_DIR=/var/lib/strays
// export STRAYS_NOTIFICATION_LOG=/var/lib/strays/notifications.jsonl
//
// strays-update animal 12 '{"condition": "INJURED", "name": "Rex"}'
// ```

use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use strays_core::config::{
    CoordinatorConfig, DeliveryGuarantee, NotificationLogConfig, StoreConfig, StraysConfig,
};
use strays_core::model::{Animal, Entity, EntityId, EntityKind, RequesterId, UserProfile};
use strays_core::store::{FileEntityStore, FileNotificationLog, MemoryNotificationLog};
use strays_core::traits::{FixedIdentity, NotificationGateway, PersistenceGateway};
use strays_core::{RuleRegistry, UpdateCoordinator, UpdateRequest};

/// Exit codes for different outcomes
///
/// - 0: Update applied
/// - 1: Configuration or usage error
/// - 2: Internal error (storage, notifications)
/// - 3: Update rejected (not found, forbidden, nothing applicable)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StraysExitCode {
    Success = 0,
    ConfigError = 1,
    InternalError = 2,
    Rejected = 3,
}

impl From<StraysExitCode> for ExitCode {
    fn from(code: StraysExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&strays_core::Error> for StraysExitCode {
    fn from(err: &strays_core::Error) -> Self {
        use strays_core::Error;
        match err {
            Error::Unauthenticated
            | Error::NotFound(_)
            | Error::InvalidUpdate
            | Error::Forbidden(_)
            | Error::InvalidInput(_)
            | Error::Json(_) => StraysExitCode::Rejected,
            Error::Config(_) | Error::UnknownEntityType(_) => StraysExitCode::ConfigError,
            _ => StraysExitCode::InternalError,
        }
    }
}

/// Application configuration
struct Config {
    requester_id: Option<u64>,
    store_type: String,
    data_dir: Option<String>,
    notification_log: Option<String>,
    delivery: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let requester_id = match env::var("STRAYS_REQUESTER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!(
                    "STRAYS_REQUESTER_ID must be a non-negative integer. Got: '{}'",
                    raw
                )
            })?),
            _ => None,
        };

        Ok(Self {
            requester_id,
            store_type: env::var("STRAYS_STORE_TYPE").unwrap_or_else(|_| "file".to_string()),
            data_dir: env::var("STRAYS_DATA_DIR").ok(),
            notification_log: env::var("STRAYS_NOTIFICATION_LOG").ok(),
            delivery: env::var("STRAYS_DELIVERY").unwrap_or_else(|_| "best_effort".to_string()),
            log_level: env::var("STRAYS_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.store_type.as_str() {
            "file" => match self.data_dir.as_deref() {
                None | Some("") => anyhow::bail!(
                    "STRAYS_DATA_DIR is required when STRAYS_STORE_TYPE=file. \
                    Set it via: export STRAYS_DATA_DIR=/var/lib/strays"
                ),
                Some(_) => {}
            },
            "memory" => anyhow::bail!(
                "STRAYS_STORE_TYPE=memory would start every run with no records. \
                Use STRAYS_STORE_TYPE=file with STRAYS_DATA_DIR"
            ),
            other => anyhow::bail!(
                "STRAYS_STORE_TYPE '{}' is not supported. \
                Supported types: file",
                other
            ),
        }

        if let Some(path) = &self.notification_log
            && path.is_empty()
        {
            anyhow::bail!(
                "STRAYS_NOTIFICATION_LOG cannot be empty. \
                Unset it to run without a notification log."
            );
        }

        self.delivery
            .parse::<DeliveryGuarantee>()
            .map_err(|e| anyhow::anyhow!("STRAYS_DELIVERY: {}", e))?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "STRAYS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the core configuration
    fn to_core(&self) -> Result<StraysConfig> {
        let Some(dir) = self.data_dir.as_deref() else {
            anyhow::bail!("STRAYS_DATA_DIR is required");
        };
        let store = StoreConfig::File {
            dir: PathBuf::from(dir),
        };
        let notifications = match &self.notification_log {
            Some(path) => NotificationLogConfig::File {
                path: PathBuf::from(path),
            },
            None => NotificationLogConfig::Memory,
        };
        let delivery = self.delivery.parse::<DeliveryGuarantee>()?;

        let config = StraysConfig {
            store,
            notifications,
            coordinator: CoordinatorConfig::default().with_delivery(delivery),
        };
        config.validate()?;
        Ok(config)
    }

    fn identity(&self) -> FixedIdentity {
        match self.requester_id {
            Some(id) => FixedIdentity::new(RequesterId(id)),
            None => FixedIdentity::anonymous(),
        }
    }
}

/// What the invocation asks for
#[derive(Debug)]
enum Command {
    Update {
        kind: EntityKind,
        id: EntityId,
        request: UpdateRequest,
    },
    Deactivate {
        kind: EntityKind,
        id: EntityId,
    },
}

impl Command {
    /// Parse `<animal|user> <id> <json|--deactivate>`
    fn parse(args: &[String]) -> Result<Self> {
        let [kind, id, payload] = args else {
            anyhow::bail!(
                "Usage: strays-update <animal|user> <id> '<json object>'\n       \
                strays-update <animal|user> <id> --deactivate"
            );
        };

        let kind: EntityKind = kind.parse()?;
        let id = EntityId(
            id.parse::<u64>()
                .map_err(|_| anyhow::anyhow!("Entity id must be a non-negative integer. Got: '{}'", id))?,
        );

        if payload == "--deactivate" {
            return Ok(Command::Deactivate { kind, id });
        }

        Ok(Command::Update {
            kind,
            id,
            request: UpdateRequest::from_json(payload)?,
        })
    }

    fn kind(&self) -> EntityKind {
        match self {
            Command::Update { kind, .. } | Command::Deactivate { kind, .. } => *kind,
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return StraysExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return StraysExitCode::ConfigError.into();
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return StraysExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Logs go to stderr; stdout carries the updated entity
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return StraysExitCode::ConfigError.into();
    }

    let core_config = match config.to_core() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            return StraysExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return StraysExitCode::InternalError.into();
        }
    };

    let identity = config.identity();
    let code = rt.block_on(async {
        let result = match command.kind() {
            EntityKind::Animal => run::<Animal>(&core_config, &identity, command).await,
            EntityKind::User => run::<UserProfile>(&core_config, &identity, command).await,
        };
        match result {
            Ok(()) => StraysExitCode::Success,
            Err(e) => {
                eprintln!("{} ({}): {}", e.code(), e.status(), e);
                StraysExitCode::from(&e)
            }
        }
    });

    code.into()
}

/// Data file name for each entity type
fn data_file(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Animal => "animals.json",
        EntityKind::User => "users.json",
    }
}

/// Open the entity file for `E`; a one-shot run only has a use for a file store
async fn open_store<E: Entity>(
    config: &StoreConfig,
) -> strays_core::Result<Box<dyn PersistenceGateway<E>>> {
    let StoreConfig::File { dir } = config else {
        return Err(strays_core::Error::config(format!(
            "strays-update needs a file store, got '{}'",
            config.type_name()
        )));
    };
    let path = dir.join(data_file(E::KIND));
    debug!("Opening entity store {}", path.display());
    Ok(Box::new(FileEntityStore::<E>::new(path).await?))
}

async fn open_notifications(
    config: &NotificationLogConfig,
) -> strays_core::Result<Box<dyn NotificationGateway>> {
    match config {
        NotificationLogConfig::Memory => {
            info!("No notification log configured; notifications are discarded on exit");
            Ok(Box::new(MemoryNotificationLog::new()))
        }
        NotificationLogConfig::File { path } => {
            Ok(Box::new(FileNotificationLog::new(path).await?))
        }
    }
}

/// Execute one command against entity type `E`
async fn run<E: Entity>(
    config: &StraysConfig,
    identity: &FixedIdentity,
    command: Command,
) -> strays_core::Result<()> {
    let registry = Arc::new(RuleRegistry::standard()?);
    let store = open_store::<E>(&config.store).await?;
    let notifications = open_notifications(&config.notifications).await?;

    let (coordinator, mut events) =
        UpdateCoordinator::<E>::new(registry, store, notifications, config.coordinator.clone())?;

    let result = match command {
        Command::Update { id, request, .. } => coordinator
            .apply_update_as(identity, id, &request)
            .await
            .and_then(|entity| {
                println!("{}", serde_json::to_string_pretty(&entity)?);
                Ok(())
            }),
        Command::Deactivate { id, .. } => coordinator.deactivate_as(identity, id).await,
    };

    while let Ok(event) = events.try_recv() {
        debug!("Coordinator event: {:?}", event);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn config(store_type: &str, data_dir: Option<&str>) -> Config {
        Config {
            requester_id: Some(1),
            store_type: store_type.to_string(),
            data_dir: data_dir.map(str::to_string),
            notification_log: None,
            delivery: "best_effort".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_parse_update_command() {
        let command = Command::parse(&args(&["animal", "12", r#"{"name": "Rex"}"#])).unwrap();
        match command {
            Command::Update { kind, id, request } => {
                assert_eq!(kind, EntityKind::Animal);
                assert_eq!(id, EntityId(12));
                assert!(request.contains("name"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_deactivate_command() {
        let command = Command::parse(&args(&["user", "3", "--deactivate"])).unwrap();
        assert!(matches!(
            command,
            Command::Deactivate {
                kind: EntityKind::User,
                id: EntityId(3)
            }
        ));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse(&args(&["animal", "12"])).is_err());
        assert!(Command::parse(&args(&["hamster", "12", "{}"])).is_err());
        assert!(Command::parse(&args(&["animal", "-1", "{}"])).is_err());
        assert!(Command::parse(&args(&["animal", "12", "[1, 2]"])).is_err());
    }

    #[test]
    fn test_file_store_requires_data_dir() {
        assert!(config("file", None).validate().is_err());
        assert!(config("file", Some("/var/lib/strays")).validate().is_ok());
        assert!(config("redis", None).validate().is_err());
    }

    #[test]
    fn test_memory_store_rejected() {
        let err = config("memory", Some("/var/lib/strays")).validate().unwrap_err();
        assert!(err.to_string().contains("STRAYS_STORE_TYPE=file"));
    }

    #[tokio::test]
    async fn test_open_store_refuses_memory() {
        let result = open_store::<Animal>(&StoreConfig::Memory).await;
        assert!(matches!(result, Err(strays_core::Error::Config(_))));
    }

    #[test]
    fn test_to_core_config() {
        let mut cfg = config("file", Some("/var/lib/strays"));
        cfg.delivery = "required".to_string();
        cfg.notification_log = Some("/var/lib/strays/notifications.jsonl".to_string());

        let core = cfg.to_core().unwrap();
        assert_eq!(
            core.store,
            StoreConfig::File {
                dir: PathBuf::from("/var/lib/strays")
            }
        );
        assert_eq!(core.coordinator.delivery, DeliveryGuarantee::Required);
        assert_eq!(data_file(EntityKind::User), "users.json");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            StraysExitCode::from(&strays_core::Error::InvalidUpdate),
            StraysExitCode::Rejected
        );
        assert_eq!(
            StraysExitCode::from(&strays_core::Error::internal("x")),
            StraysExitCode::InternalError
        );
        assert_eq!(
            StraysExitCode::from(&strays_core::Error::config("x")),
            StraysExitCode::ConfigError
        );
    }
}
