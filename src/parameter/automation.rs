use four_cc::FourCC;

use super::SourceParameters;

// -------------------------------------------------------------------------------------------------

/// Automation values for a single source parameter within one audio block.
///
/// A lane which holds exactly as many values as the processed block has samples is read per
/// sample. Any other non-empty lane applies its first value to the whole block. Empty lanes are
/// ignored.
#[derive(Debug, Clone, Copy)]
pub struct AutomationLane<'a> {
    id: FourCC,
    values: &'a [f32],
}

impl<'a> AutomationLane<'a> {
    /// Create a new lane for the parameter with the given id.
    pub fn new(id: FourCC, values: &'a [f32]) -> Self {
        Self { id, values }
    }

    /// The automated parameter's id.
    pub fn id(&self) -> FourCC {
        self.id
    }

    /// Value at the given sample index in a block of `block_len` samples.
    #[inline]
    pub fn value_at(&self, index: usize, block_len: usize) -> Option<f32> {
        if self.values.len() > 1 && self.values.len() == block_len {
            self.values.get(index).copied()
        } else {
            self.values.first().copied()
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Host supplied parameter automation for one block of glottal source samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterAutomation<'a> {
    lanes: &'a [AutomationLane<'a>],
}

impl<'a> ParameterAutomation<'a> {
    /// No automation: the oscillator's pending parameter values are used as they are.
    pub const NONE: ParameterAutomation<'static> = ParameterAutomation { lanes: &[] };

    /// Create automation from the given lanes.
    pub fn new(lanes: &'a [AutomationLane<'a>]) -> Self {
        Self { lanes }
    }

    /// True when there are no lanes to apply.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Overwrite values in `parameters` with the automation values at the given sample index.
    /// Values of parameters which are not present in the record are not added.
    pub fn apply(&self, parameters: &mut SourceParameters, index: usize, block_len: usize) {
        for lane in self.lanes {
            if parameters.value(lane.id).is_some() {
                if let Some(value) = lane.value_at(index, block_len) {
                    parameters.set(lane.id, value);
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::FloatParameter;

    const FREQ: FloatParameter =
        FloatParameter::new(FourCC(*b"freq"), "frequency", 70.0..=600.0, 100.0);

    #[test]
    fn per_sample_and_scalar_lanes() {
        let per_sample = [100.0, 200.0, 300.0, 400.0];
        let lane = AutomationLane::new(FREQ.id(), &per_sample);
        assert_eq!(lane.value_at(2, 4), Some(300.0));
        // not block sized: first value applies to the whole block
        assert_eq!(lane.value_at(2, 8), Some(100.0));

        let scalar = [250.0];
        let lane = AutomationLane::new(FREQ.id(), &scalar);
        assert_eq!(lane.value_at(3, 4), Some(250.0));

        let lane = AutomationLane::new(FREQ.id(), &[]);
        assert_eq!(lane.value_at(0, 4), None);
    }

    #[test]
    fn apply_to_record() {
        let values = [110.0, 120.0];
        let unknown = [1.0, 2.0];
        let lanes = [
            AutomationLane::new(FREQ.id(), &values),
            AutomationLane::new(FourCC(*b"none"), &unknown),
        ];
        let automation = ParameterAutomation::new(&lanes);
        let mut parameters = SourceParameters::from_descriptors(&[FREQ]);
        automation.apply(&mut parameters, 1, 2);
        assert_eq!(parameters.get(&FREQ), 120.0);
        assert_eq!(parameters.len(), 1);
        assert!(ParameterAutomation::NONE.is_empty());
    }
}
