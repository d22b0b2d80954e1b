use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use cafs_types::Context;

use crate::path_map::PathMap;

/// Error returned by a [`Transform`].
///
/// Displays exactly the message it was built with; writers surface it to
/// their callers unchanged so callers can match on it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping its message verbatim.
    pub fn from_source(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Rewrites a file's content once the keys it depends on are known.
///
/// `paths` holds the keys resolved so far. Under the default writer
/// configuration it contains exactly the hook's declared dependencies.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(
        &self,
        ctx: &Context,
        content: Vec<u8>,
        paths: &PathMap,
    ) -> Result<Vec<u8>, TransformError>;
}

/// [`Transform`] backed by a synchronous closure.
pub struct FnTransform<F>(F);

pub fn transform_fn<F>(f: F) -> FnTransform<F>
where
    F: Fn(Vec<u8>, &PathMap) -> Result<Vec<u8>, TransformError> + Send + Sync,
{
    FnTransform(f)
}

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(Vec<u8>, &PathMap) -> Result<Vec<u8>, TransformError> + Send + Sync,
{
    async fn transform(
        &self,
        _ctx: &Context,
        content: Vec<u8>,
        paths: &PathMap,
    ) -> Result<Vec<u8>, TransformError> {
        (self.0)(content, paths)
    }
}

/// A content transform attached to a regular file, with the paths it needs.
#[derive(Clone)]
pub struct Hook {
    transform: Arc<dyn Transform>,
    dependencies: BTreeSet<String>,
}

impl Hook {
    pub fn new<I, S>(transform: impl Transform + 'static, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_arc(Arc::new(transform), dependencies)
    }

    /// Share one transform between several hooks.
    pub fn from_arc<I, S>(transform: Arc<dyn Transform>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transform,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn transform(&self) -> &dyn Transform {
        self.transform.as_ref()
    }

    pub async fn apply(
        &self,
        ctx: &Context,
        content: Vec<u8>,
        paths: &PathMap,
    ) -> Result<Vec<u8>, TransformError> {
        self.transform.transform(ctx, content, paths).await
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
