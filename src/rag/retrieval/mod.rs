// Hybrid retrieval: backend contracts, fusion, engine and fan-out
pub mod engine;
pub mod fanout;
pub mod fusion;
pub mod search;

pub use engine::{Retrieval, RetrievalEngine, RetrievalStats, SearchParams};
pub use fanout::{FanOutConfig, FanOutRetriever};
pub use fusion::{fuse, min_max_normalize, select_diverse, DEFAULT_ALPHA};
pub use search::{DocumentCatalog, EmbeddingProvider, LexicalSearch, VectorSearch};
