pub mod records;
pub mod schedule;

pub use records::HealthRecordService;
