//! Client half of the pipeline: a local cache plus a loader that walks an
//! ordered chain of review providers until one answers.

pub mod cache;
pub mod loader;
pub mod providers;
pub mod storage;

pub use cache::{ClientCache, CACHE_KEY};
pub use loader::{AutoRefreshJob, ReviewLoader, RetryPolicy, AUTO_REFRESH_PERIOD};
pub use providers::{
    first_success, FallbackProvider, ProviderError, RemoteApiProvider, Retry, ReviewProvider,
    StaticFileProvider,
};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
