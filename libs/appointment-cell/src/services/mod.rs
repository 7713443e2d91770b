pub mod booking;
pub mod conflict;

pub use booking::AppointmentService;
pub use conflict::ConflictDetectionService;
