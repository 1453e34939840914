pub mod facility;

pub use facility::FacilityService;
