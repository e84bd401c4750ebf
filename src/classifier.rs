//! Rate-limit class resolution for a single request.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::error::LimitsResult;
use crate::groups;
use crate::priority::GroupPriorities;
use crate::store::{group_key, ClassStore};

/// Request environment key receiving the resolved rate-limit class.
pub const LIMIT_CLASS_KEY: &str = "turnstile.nova.limitclass";

/// Request-scoped key/value environment shared with the surrounding pipeline.
pub type Environ = HashMap<String, String>;

/// A quota context able to carry a per-request quota class.
pub trait SupportsQuotaClass {
    fn set_quota_class(&mut self, class: &str);
}

/// Per-request quota context supplied by the caller.
///
/// Only contexts that return `Some` from [`QuotaContext::as_quota_class`]
/// receive the resolved class; for the rest the feature is inactive.
pub trait QuotaContext {
    fn as_quota_class(&mut self) -> Option<&mut dyn SupportsQuotaClass> {
        None
    }
}

/// Resolves rate-limit classes from group headers against a class store.
pub struct Classifier {
    store: Arc<dyn ClassStore>,
    group_priorities: String,
    priorities: OnceLock<GroupPriorities>,
}

impl Classifier {
    /// `group_priorities` is the `rs_limits.groups` configuration value.
    pub fn new(store: Arc<dyn ClassStore>, group_priorities: impl Into<String>) -> Self {
        Self {
            store,
            group_priorities: group_priorities.into(),
            priorities: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ClassStore> {
        &self.store
    }

    fn priorities(&self) -> &GroupPriorities {
        self.priorities
            .get_or_init(|| GroupPriorities::new(&self.group_priorities))
    }

    /// Groups from `header` in the order they should be looked up.
    pub fn resolve_order(&self, header: &str) -> Vec<String> {
        groups::resolve_with(header, || self.priorities())
    }

    /// Look up each group in order and return the first class found.
    ///
    /// Stops querying the store at the first non-empty mapping.
    pub async fn lookup_class(&self, groups: &[String]) -> LimitsResult<Option<String>> {
        for group in groups {
            let key = group_key(group);
            debug!(key = %key, "Looking up rate-limit class");

            if let Some(class) = self.store.get(&key).await? {
                if !class.is_empty() {
                    info!(group = %group, class = %class, "Resolved rate-limit class");
                    return Ok(Some(class));
                }
            }
        }

        Ok(None)
    }

    /// Resolve the class for a group header.
    ///
    /// An absent or empty header resolves to `None` without touching the store.
    pub async fn classify(&self, header: Option<&str>) -> LimitsResult<Option<String>> {
        let Some(header) = header.filter(|h| !h.is_empty()) else {
            return Ok(None);
        };

        let order = self.resolve_order(header);
        self.lookup_class(&order).await
    }

    /// Classify a request and record the result.
    ///
    /// On success the class is written to `environ` under [`LIMIT_CLASS_KEY`]
    /// and, if the quota context supports it, to the context's quota class.
    /// When no group maps to a class nothing is changed.
    pub async fn preprocess(
        &self,
        header: Option<&str>,
        environ: &mut Environ,
        quota: Option<&mut dyn QuotaContext>,
    ) -> LimitsResult<Option<String>> {
        let class = self.classify(header).await?;
        if let Some(ref class) = class {
            apply_class(class, environ, quota);
        }
        Ok(class)
    }
}

/// Record a resolved class in the request environment and quota context.
pub fn apply_class(class: &str, environ: &mut Environ, quota: Option<&mut dyn QuotaContext>) {
    environ.insert(LIMIT_CLASS_KEY.to_string(), class.to_string());

    match quota.and_then(|ctx| ctx.as_quota_class()) {
        Some(ctx) => ctx.set_quota_class(class),
        None => debug!("Quota context does not support quota classes"),
    }
}
