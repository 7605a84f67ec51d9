pub mod activity;
pub mod notification;
pub mod preferences;
