// Module declarations
mod reconcile;
mod state;
mod status;
mod transfer;
mod unsync;

// Re-export public types and functions
pub use reconcile::{reconcile, ForceMode, Reconciler};
pub use state::EntryState;
pub use status::{entry_states, EntryStatus};
pub use transfer::{export, import};
pub use unsync::{unsync, unsync_sections};
