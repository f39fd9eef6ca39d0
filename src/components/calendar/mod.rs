mod diff;
mod fetch;
mod filter;
pub mod models;
pub mod parse;

pub use diff::diff;
pub use fetch::IcalFeedClient;
pub use filter::EventFilter;
pub use models::{CalendarEvent, Feed};
