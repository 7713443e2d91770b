pub mod coverage;
pub mod schedule;
pub mod staff;

pub use coverage::CoverageService;
pub use schedule::ScheduleService;
pub use staff::StaffService;
