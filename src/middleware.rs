use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::classifier::{apply_class, Classifier, Environ, QuotaContext, SupportsQuotaClass};
use crate::error::LimitsError;

/// Header carrying the requester's groups.
pub const GROUPS_HEADER: &str = "x-pp-groups";

/// Rate-limit class resolved for a request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitClass(pub String);

/// Compute request context, inserted into request extensions by an upstream layer.
///
/// Only contexts built with [`NovaContext::with_quota_class`] accept a quota class.
#[derive(Debug, Clone, Default)]
pub struct NovaContext {
    quota_class: Option<Option<String>>,
}

impl NovaContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota_class() -> Self {
        Self {
            quota_class: Some(None),
        }
    }

    pub fn supports_quota_class(&self) -> bool {
        self.quota_class.is_some()
    }

    pub fn quota_class(&self) -> Option<&str> {
        self.quota_class.as_ref().and_then(|class| class.as_deref())
    }
}

impl SupportsQuotaClass for NovaContext {
    fn set_quota_class(&mut self, class: &str) {
        self.quota_class = Some(Some(class.to_string()));
    }
}

impl QuotaContext for NovaContext {
    fn as_quota_class(&mut self) -> Option<&mut dyn SupportsQuotaClass> {
        if self.supports_quota_class() {
            Some(self)
        } else {
            None
        }
    }
}

/// Resolve the rate-limit class from the groups header.
///
/// A resolved class is inserted as a [`LimitClass`] extension and recorded in
/// the request's [`Environ`] extension (created if missing). Requests without
/// the header pass through untouched so a later layer can apply its own default.
pub async fn limit_class_middleware(
    State(classifier): State<Arc<Classifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, LimitsError> {
    let header = request.headers().get(GROUPS_HEADER).map(|value| {
        value.to_str().map(str::to_owned).unwrap_or_else(|_| {
            debug!(
                target: "rs_limits::middleware",
                "Groups header is not visible ASCII, decoding lossily"
            );
            String::from_utf8_lossy(value.as_bytes()).into_owned()
        })
    });

    let class = classifier.classify(header.as_deref()).await?;

    if let Some(class) = class {
        let mut environ = request
            .extensions_mut()
            .remove::<Environ>()
            .unwrap_or_default();
        let quota = request
            .extensions_mut()
            .get_mut::<NovaContext>()
            .map(|ctx| ctx as &mut dyn QuotaContext);
        apply_class(&class, &mut environ, quota);

        debug!(
            target: "rs_limits::middleware",
            method = %request.method(),
            uri = %request.uri(),
            class = %class,
            "Request classified"
        );
        request.extensions_mut().insert(environ);
        request.extensions_mut().insert(LimitClass(class));
    }

    Ok(next.run(request).await)
}
