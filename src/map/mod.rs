pub mod geometry;
pub mod heightfield;
pub mod projection;
pub mod raster;
pub mod scene;
pub mod spatial;
pub mod viewport;
