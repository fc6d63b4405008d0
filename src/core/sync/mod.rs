mod engine;
mod plan;
mod report;

pub use engine::{ModSyncEngine, SyncPhase};
pub use plan::{
    list_local_mods, read_installed_index, write_installed_index, LocalModFile, PlannedMod,
    SyncPlan, MOD_FILE_EXTENSION,
};
pub use report::{ModFailure, SyncReport};
