//! Image transformer that never produces an image, so callers keep the source frame

use async_trait::async_trait;
use tracing::debug;

use crate::error::PipelineResult;
use crate::ports::ImageTransformPort;

#[derive(Debug, Default)]
pub struct PassthroughImageTransformer;

impl PassthroughImageTransformer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageTransformPort for PassthroughImageTransformer {
    async fn transform(&self, source: &[u8], directive: &str) -> PipelineResult<Option<Vec<u8>>> {
        debug!(
            "No image service configured; keeping {} source bytes (directive: {:?})",
            source.len(),
            directive
        );
        Ok(None)
    }
}
