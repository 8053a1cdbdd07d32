pub mod event_log;
pub mod notify;
pub mod session;
pub mod status_file;
pub mod wait;
