pub mod agent;
pub mod clients;
pub mod config;
pub mod error;
pub mod lesson;
pub mod llm;
pub mod prompts;
pub mod segment;
pub mod toolkit;
pub mod tools;

pub use agent::{LessonAgent, LessonRequest, MAX_ITERATIONS};
pub use error::{LessonError, ServiceError, ToolError};
pub use lesson::{Lesson, LessonReport, LessonStatus, LessonStep};
pub use llm::LessonModel;
