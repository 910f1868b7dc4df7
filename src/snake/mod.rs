pub mod backend;
pub mod display;
pub mod error;
pub mod example;
pub mod figure;
pub mod grayscale;
pub mod isocontour;
pub mod morphsnakes;
pub mod visualizer;
