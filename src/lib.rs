// Timer core, persistence and the cache gateway; the terminal front end lives in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod controller;
pub mod gateway;
pub mod notification;
pub mod persistence;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod store;
pub mod timer;
