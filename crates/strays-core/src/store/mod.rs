// # Reference Collaborators
//
// Gateway implementations for persistence and notifications. The engine only
// depends on the traits; these back the binary and the tests.

pub mod file;
pub mod memory;
pub mod notification_log;

pub use file::FileEntityStore;
pub use memory::MemoryEntityStore;
pub use notification_log::{FileNotificationLog, MemoryNotificationLog};
