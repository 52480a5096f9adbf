pub mod app;
pub mod canvas;
pub mod color;
pub mod data;
pub mod grid;
pub mod map;
pub mod session;
pub mod ui;
