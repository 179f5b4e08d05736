// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod json_store;
pub mod memory_store;
pub mod passthrough_image;
pub mod probe_ffprobe;
pub mod sections_file;
pub mod toml_config;
pub mod whisper_cli;

// Re-export adapters
pub use exec_ffmpeg::FFmpegAdapter;
pub use json_store::JsonJobStore;
pub use memory_store::MemoryJobStore;
pub use passthrough_image::PassthroughImageTransformer;
pub use probe_ffprobe::FFprobeAdapter;
pub use sections_file::SectionsFileGenerator;
pub use toml_config::{PipelineConfig, TomlConfigAdapter};
pub use whisper_cli::WhisperCliAdapter;
