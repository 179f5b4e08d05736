//! Markdown article writer

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PipelineResult;
use crate::output::Article;
use crate::utils::time::TimeParser;

/// Renders an [`Article`] as Markdown
pub struct ArticleWriter {
    time: TimeParser,
}

impl Default for ArticleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleWriter {
    pub fn new() -> Self {
        Self {
            time: TimeParser::new(),
        }
    }

    pub fn render(&self, article: &Article) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", article.title.trim());
        let _ = writeln!(out, "*{}*\n", capitalize(article.kind.as_str()));

        for section in &article.sections {
            let _ = writeln!(out, "## {}\n", section.heading.trim());
            if let Some(image) = &section.image {
                let path = image.to_string_lossy().replace('\\', "/");
                let _ = writeln!(out, "![{}]({})", section.heading.trim(), path);
                if let Some(offset) = section.frame_offset {
                    let _ = writeln!(out, "*Frame at {}*", self.time.format_time(offset));
                }
                out.push('\n');
            }
            let body = section.body.trim();
            if !body.is_empty() {
                let _ = writeln!(out, "{}\n", body);
            }
        }

        out
    }

    /// Write the article through a temporary file and an atomic rename
    pub async fn write(&self, path: &Path, article: &Article) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = temp_path_for(path);
        tokio::fs::write(&temp_path, self.render(article)).await?;
        tokio::fs::rename(&temp_path, path).await?;
        info!(
            "Article with {} section(s) written to {}",
            article.sections.len(),
            path.display()
        );
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
