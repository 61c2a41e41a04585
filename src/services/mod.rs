pub mod embedding;
pub mod inventory;
pub mod preference;
pub mod providers;
pub mod ranker;
pub mod recommendations;
pub mod vector_codec;

pub use embedding::{EmbeddingJob, EmbeddingPipeline, EmbeddingQueue, EmbeddingWorkerHandle, RetryPolicy};
pub use inventory::Inventory;
pub use preference::{PreferenceDictionaries, PreferenceExtractor};
pub use recommendations::Recommender;
