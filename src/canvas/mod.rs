pub mod client;
pub mod encode;
pub mod feedback;
pub mod input;
pub mod layer;
pub mod messages;
pub mod model;
pub mod render;
pub mod session;
pub mod settings;
pub mod sizer;
pub mod stroke;
pub mod submit;
pub mod template;
pub mod viewport;

pub use session::{InputResult, LessonCanvas};
pub use settings::CanvasConfig;
