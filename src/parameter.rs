//! Glottal source parameter descriptors, parameter records and automation lanes.

mod float;
pub use float::FloatParameter;

mod set;
pub use set::{SourceParameters, MAX_SOURCE_PARAMETERS};

mod automation;
pub use automation::{AutomationLane, ParameterAutomation};
