mod client;
mod releases;

pub use client::{FirefoxFetcher, build_facts};
pub use releases::{
    ESR_WINDOW_DAYS, UpcomingRelease, active_esr_majors, parse_releases, parse_schedule_date,
};
