// Library surface for the binary, headless tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod highscore;
pub mod logging;
pub mod runtime;
pub mod sound;
pub mod store;
pub mod theme;
pub mod ui;
