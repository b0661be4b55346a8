pub mod camera;
pub mod synthetic;
