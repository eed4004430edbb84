pub mod notification;
pub mod reminder;
