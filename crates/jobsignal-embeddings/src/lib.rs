pub mod cache;
pub mod openai;
pub mod profile_text;
pub mod projector;
pub mod provider;

pub use cache::CachingEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
pub use projector::PreferenceProjector;
pub use provider::EmbeddingProvider;
