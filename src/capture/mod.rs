pub mod photo;
pub mod recording;
