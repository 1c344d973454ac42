//! UI components
//!
//! Components are presentational: they read state passed in by the app and
//! return the `Action` the user triggered, if any.

pub mod error_banner;
pub mod header;
pub mod input_bar;
pub mod level_meter;
pub mod live_overlay;
pub mod message_list;
pub mod settings_modal;
pub mod training_overlay;

pub use error_banner::ErrorBanner;
pub use header::Header;
pub use input_bar::InputBar;
pub use level_meter::LevelMeter;
pub use live_overlay::LiveOverlay;
pub use message_list::{shows_typing_indicator, MessageList};
pub use settings_modal::SettingsModal;
pub use training_overlay::TrainingOverlay;
