pub mod common;
pub mod completions;
pub mod due;
pub mod lists;
pub mod reminders;
pub mod status;
pub mod sync;
