pub mod config;
pub mod notification;
pub mod phase;
pub mod project;
pub mod resource;
pub mod review;
pub mod submission;

pub use config::{
    EmailOptions, EmailScheme, EngineConfig, InsertedPhaseConfig, LoggingConfig, NotificationConfig,
};
pub use notification::{FieldBag, FieldValue, PhaseOperation};
pub use phase::{Dependency, DependencyKind, Phase, PhaseStatus, PhaseType};
pub use project::{Project, ProjectLink, ProjectStatus};
pub use resource::{Resource, ResourceRole};
pub use review::{Comment, CommentType, Item, Review, Verdict};
pub use submission::{
    ScreeningResult, ScreeningStatus, Submission, SubmissionStatus, SubmissionType, Upload,
    UploadStatus, UploadType,
};
