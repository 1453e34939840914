pub mod booking;
pub mod buckets;
pub mod lifecycle;
pub mod reschedule;

pub use booking::AppointmentBookingService;
pub use buckets::classify_appointments;
pub use lifecycle::AppointmentLifecycleService;
pub use reschedule::{RescheduleOutcome, RescheduleService};
