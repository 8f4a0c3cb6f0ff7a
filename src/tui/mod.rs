pub mod input;
pub mod screen;
pub mod vdp;
pub mod view;
