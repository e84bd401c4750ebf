pub mod admin;
pub mod classifier;
pub mod config;
pub mod error;
pub mod groups;
pub mod middleware;
pub mod priority;
pub mod redis;
pub mod store;

pub use classifier::{Classifier, Environ, QuotaContext, SupportsQuotaClass, LIMIT_CLASS_KEY};
pub use config::Config;
pub use error::{LimitsError, LimitsResult};
pub use groups::{resolve, GroupEntry};
pub use priority::GroupPriorities;
pub use store::{group_key, ClassStore, MemoryStore};
