mod client;
mod products;
mod schedule;

pub use client::{EdgeFetcher, build_facts};
pub use products::{ProductRelease, parse_products};
pub use schedule::{ScheduleEntry, parse_schedule};
