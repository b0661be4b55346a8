pub mod effects;
pub mod raster;
pub mod stage;
