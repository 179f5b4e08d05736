//! Content generator backed by a prepared JSON document
//!
//! Reads `sections.json` from the job root:
//!
//! ```json
//! { "kind": "tutorial", "sections": [ { "heading": "...", "body": "...", "timestamp": 12.5 } ] }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::model::{ArticleKind, JobId, Section};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::{ContentGeneratorPort, SectionRequest};
use crate::utils::path::StorageLayout;

#[derive(Debug, Deserialize)]
struct SectionsDocument {
    kind: ArticleKind,
    sections: Vec<Section>,
}

pub struct SectionsFileGenerator {
    layout: StorageLayout,
}

impl SectionsFileGenerator {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    async fn load(&self, job_id: &JobId) -> PipelineResult<SectionsDocument> {
        let path: PathBuf = self.layout.sections_path(job_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::not_found(format!(
                    "sections document {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::parse(format!("Malformed sections document {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl ContentGeneratorPort for SectionsFileGenerator {
    async fn classify(&self, job_id: &JobId, _transcript: &str) -> PipelineResult<ArticleKind> {
        Ok(self.load(job_id).await?.kind)
    }

    async fn generate_sections(&self, request: &SectionRequest<'_>) -> PipelineResult<Vec<Section>> {
        let mut sections = self.load(request.job_id).await?.sections;
        if sections.is_empty() {
            return Err(PipelineError::parse("Sections document contains no sections"));
        }
        if sections.len() > request.section_count {
            debug!(
                "Keeping first {} of {} prepared sections",
                request.section_count,
                sections.len()
            );
            sections.truncate(request.section_count);
        }
        Ok(sections)
    }
}
