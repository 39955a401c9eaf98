pub mod capture;
#[cfg(feature = "chrome")]
pub mod chrome;
pub mod navigation;
pub mod ref_table;
pub mod resolver;
pub mod session;

pub use capture::{take_snapshot, CapturedSnapshot};
#[cfg(feature = "chrome")]
pub use chrome::{ChromeBrowser, ChromeElement};
pub use navigation::{NavigationManager, NavigationResult};
pub use ref_table::{bind_refs, RefTable};
pub use resolver::resolve_element;
pub use session::{BrowserSession, SharedSession};
