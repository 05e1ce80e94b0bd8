pub mod geo;
pub mod reso;
