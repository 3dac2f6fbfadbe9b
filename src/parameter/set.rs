use four_cc::FourCC;

use super::FloatParameter;

// -------------------------------------------------------------------------------------------------

/// Maximum number of parameters a glottal source model may declare, including `frequency`.
pub const MAX_SOURCE_PARAMETERS: usize = 4;

// -------------------------------------------------------------------------------------------------

/// A fixed size, id keyed record of plain parameter values.
///
/// Records are `Copy` and never allocate, so they can be passed into the real-time thread
/// by value. Values are looked up by their descriptor's [`FourCC`] id. Missing values fall back
/// to the descriptor's default value when reading them via [`Self::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParameters {
    values: [(FourCC, f32); MAX_SOURCE_PARAMETERS],
    len: usize,
}

impl SourceParameters {
    /// Create an empty parameter record.
    pub const fn new() -> Self {
        Self {
            values: [(FourCC(*b"    "), 0.0); MAX_SOURCE_PARAMETERS],
            len: 0,
        }
    }

    /// Create a record which holds default values for all given parameter descriptors.
    pub fn from_descriptors(descriptors: &[FloatParameter]) -> Self {
        debug_assert!(
            descriptors.len() <= MAX_SOURCE_PARAMETERS,
            "Too many parameter descriptors"
        );
        let mut parameters = Self::new();
        for descriptor in descriptors.iter().take(MAX_SOURCE_PARAMETERS) {
            parameters.values[parameters.len] = (descriptor.id(), descriptor.default_value());
            parameters.len += 1;
        }
        parameters
    }

    /// Number of values in the record.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the record holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over all id, value pairs in the record.
    pub fn iter(&self) -> impl Iterator<Item = (FourCC, f32)> + '_ {
        self.values[..self.len].iter().copied()
    }

    /// Access the raw value with the given id, if present.
    #[inline]
    pub fn value(&self, id: FourCC) -> Option<f32> {
        self.values[..self.len]
            .iter()
            .find(|(value_id, _)| *value_id == id)
            .map(|(_, value)| *value)
    }

    /// Access the value for the given descriptor, falling back to the descriptor's default.
    #[inline]
    pub fn get(&self, descriptor: &FloatParameter) -> f32 {
        self.value(descriptor.id())
            .unwrap_or_else(|| descriptor.default_value())
    }

    /// Set the value with the given id. Adds the value when it's not yet present.
    /// Returns false when the record is full and the value could not be added.
    pub fn set(&mut self, id: FourCC, value: f32) -> bool {
        if let Some(entry) = self.values[..self.len]
            .iter_mut()
            .find(|(value_id, _)| *value_id == id)
        {
            entry.1 = value;
            true
        } else if self.len < MAX_SOURCE_PARAMETERS {
            self.values[self.len] = (id, value);
            self.len += 1;
            true
        } else {
            false
        }
    }
}

impl Default for SourceParameters {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
