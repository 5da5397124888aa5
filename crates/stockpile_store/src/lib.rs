pub mod blob;
pub mod keyvalue;
pub mod models;
pub mod object;
pub mod operations;

pub use blob::{BlobError, BlobStore};
pub use keyvalue::RedisBlobs;
pub use models::{StorageKey, StoreReceipt, WriteKind};
pub use object::ObjectStoreBlobs;
pub use operations::{MergeError, StoreError, merge, store};
