//! Common, shared DSP tools for the formant filters.

pub mod filters;
