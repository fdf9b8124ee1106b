pub mod essay;
pub mod feedback;
pub mod image;
pub mod loaders;
pub mod message;
pub mod rubric;

pub use essay::Essay;
pub use feedback::{FeedbackResult, MarkerCounts};
pub use image::{stage_images, EncodedImage, ImageAsset, MediaType, StagedImages, MAX_IMAGES};
pub use loaders::{load_rubric, load_rubric_or_embedded};
pub use message::{ChatMessage, ContentPart, MessageContent, MessageSequence, Role};
pub use rubric::{Criterion, PromptTemplates, RubricSpec, StatusMarkers};
