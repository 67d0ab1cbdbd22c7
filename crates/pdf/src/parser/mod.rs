pub mod backend;
pub mod cmap;
pub mod lines;
pub mod spans;
