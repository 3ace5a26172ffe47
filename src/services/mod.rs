pub mod push;
pub mod records;
pub mod reminders;
