//! Final article document

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::model::ArticleKind;

pub mod writer;

pub use writer::ArticleWriter;

/// Everything needed to render the article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub kind: ArticleKind,
    pub sections: Vec<ArticleSection>,
}

/// One rendered section with the image chosen for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSection {
    pub heading: String,
    pub body: String,
    /// Image path relative to the article file
    pub image: Option<PathBuf>,
    /// Nominal offset of the source frame in seconds
    pub frame_offset: Option<f64>,
}
