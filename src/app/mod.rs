// Application layer - Use case interactors

pub mod container;
pub mod job_interactor;
pub mod pipeline_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use job_interactor::JobInteractor;
pub use pipeline_interactor::{
    EventKind, EventSender, PipelineEvent, PipelineInteractor, PipelinePorts, PipelineSettings,
};
