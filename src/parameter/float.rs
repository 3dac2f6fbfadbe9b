use std::ops::RangeInclusive;

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor, as exposed to UIs and configuration surfaces.
///
/// Descriptors are plain constants: each glottal source model declares its own set of them.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
    ) -> Self {
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// The unique id of the parameter.
    pub fn id(&self) -> FourCC {
        self.id
    }

    /// The name of the parameter, as used in presets and by the control API.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter's unit. May be empty.
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// Minimum value of the parameter.
    pub fn min_value(&self) -> f32 {
        *self.range.start()
    }

    /// Maximum value of the parameter.
    pub fn max_value(&self) -> f32 {
        *self.range.end()
    }

    /// The parameter's default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Clamp the given plain value to the parameter's range.
    pub fn clamp_value(&self, value: f32) -> f32 {
        value.clamp(*self.range.start(), *self.range.end())
    }
}

// -------------------------------------------------------------------------------------------------
