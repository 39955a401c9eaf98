pub mod browser;
pub mod config;
pub mod session;

pub use browser::{BrowserTrait, ClickOptions};
pub use config::Config;
pub use session::SessionTrait;
