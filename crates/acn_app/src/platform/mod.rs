pub mod app;
pub mod effects;
pub mod input;
pub mod layout;
pub mod logging;
pub mod persistence;
pub mod session;
pub mod surface;
