//! Dialog and message lifecycle: normalization, cascading edits, persistence.

pub mod manager;
pub mod normalize;
pub mod ops;
pub mod store;

pub use manager::{DialogDeletion, DialogManager};
pub use normalize::{dialog_from_value, normalize, normalize_dialog, normalize_message};
pub use ops::{delete_message, is_scenario_launch, truncate_from_message, SCENARIO_LAUNCH_PREFIX};
pub use store::{DialogStore, FileDialogStore, MemoryDialogStore};
