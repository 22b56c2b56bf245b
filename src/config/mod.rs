//! Layered configuration.
//!
//! Consolidates configuration from four tiers with field-by-field YAML merging:
//! 1. **Defaults** - built in
//! 2. **User** - `~/.taskpoet.yaml`
//! 3. **Project** - `$CWD/taskpoet.yaml`
//! 4. **Environment** - the variables below
//!
//! ## Merge Strategy
//! Objects merge key by key, lists and scalars from a higher tier replace the
//! lower one, and `null` leaves the lower value in place.
//!
//! ## Environment Variables
//! - `TASKPOET_CONFIG_PATH` - Explicit config file (replaces the user and project tiers)
//! - `TASKPOET_DB_PATH` - Database path
//! - `TASKPOET_NAMESPACE` - Namespace
//! - `TASKPOET_DEFAULT_DUE` - Default due expression for new tasks

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier, PROJECT_CONFIG_FILE, USER_CONFIG_FILE};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
