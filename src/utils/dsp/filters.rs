//! Resonator filter implementations.

pub mod allpole;
pub mod biquad;
