#![forbid(unsafe_code)]

pub mod capture;
pub mod config;
pub mod detect;
pub mod foundation;
pub mod fx;
pub mod render;
pub mod source;

pub use config::AppConfig;
pub use foundation::core::{Canvas, FrameRgba, Rgba8};
pub use foundation::error::{BoothError, BoothResult};
pub use render::effects::Effect;
pub use render::stage::{Controls, FrameSource, RenderStage, StageStatus};
