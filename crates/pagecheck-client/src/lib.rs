#[cfg(feature = "browser")]
pub mod chromium_driver;
pub mod http_driver;
pub mod readiness;

#[cfg(feature = "browser")]
pub use chromium_driver::ChromiumBrowser;
pub use http_driver::{HttpBrowser, HttpContext};
pub use readiness::wait_until_ready;
