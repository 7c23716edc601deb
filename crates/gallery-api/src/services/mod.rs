pub mod ingestion;
pub mod media_lifecycle;

pub use ingestion::IngestionService;
pub use media_lifecycle::MediaLifecycleService;
