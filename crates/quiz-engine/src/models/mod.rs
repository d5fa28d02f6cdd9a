//! 测验引擎领域模型

mod enums;
mod grading;
mod progression;
mod quiz_set;
mod score;
mod shuffled_quiz_set;
mod submission;

pub use enums::*;
pub use grading::*;
pub use progression::*;
pub use quiz_set::*;
pub use score::*;
pub use shuffled_quiz_set::*;
pub use submission::*;
