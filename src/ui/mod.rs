//! egui/eframe user interface
//!
//! The app drives the controller once per frame and renders it; components
//! turn user input into controller `Action`s.

mod app;
pub mod components;
mod theme;

pub use app::VoxChatApp;
pub use theme::Theme;
