pub mod operation_preview;
pub mod transaction;
pub mod trash_entry;
