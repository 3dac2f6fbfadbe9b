//! Formant descriptions and the filters which impose them on a glottal source.

use crate::{utils::db_to_linear, Error};

// -------------------------------------------------------------------------------------------------

pub mod bank;
pub mod poles;

// -------------------------------------------------------------------------------------------------

/// Maximum number of formants in a [`FormantSet`].
pub const MAX_FORMANTS: usize = 8;

// -------------------------------------------------------------------------------------------------

/// A single vocal tract resonance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formant {
    /// Center frequency in Hz.
    pub frequency: f32,
    /// Bandwidth in Hz.
    pub bandwidth: f32,
    /// Gain in decibels.
    pub gain_db: f32,
}

impl Formant {
    pub const fn new(frequency: f32, bandwidth: f32, gain_db: f32) -> Self {
        Self {
            frequency,
            bandwidth,
            gain_db,
        }
    }

    /// Quality of the resonance: frequency / bandwidth.
    pub fn q(&self) -> f32 {
        self.frequency / self.bandwidth
    }

    /// Linear gain factor. Exactly 1.0 for 0 dB.
    pub fn gain(&self) -> f32 {
        db_to_linear(self.gain_db)
    }

    /// Check that all values are usable as filter parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.frequency > 0.0 && self.frequency.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "Formant frequency must be > 0, but is {}",
                self.frequency
            )));
        }
        if !(self.bandwidth > 0.0 && self.bandwidth.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "Formant bandwidth must be > 0, but is {}",
                self.bandwidth
            )));
        }
        if !self.gain_db.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Formant gain must be finite, but is {}",
                self.gain_db
            )));
        }
        Ok(())
    }
}

impl Default for Formant {
    fn default() -> Self {
        Self::new(500.0, 50.0, 0.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// An ordered, fixed capacity set of validated formants.
///
/// Sets are `Copy`, so they can be moved into the real-time thread without allocating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantSet {
    formants: [Formant; MAX_FORMANTS],
    len: usize,
}

impl FormantSet {
    /// Create a new set from the given formants. The set must not be empty.
    pub fn new(formants: &[Formant]) -> Result<Self, Error> {
        if formants.is_empty() || formants.len() > MAX_FORMANTS {
            return Err(Error::InvalidParameter(format!(
                "Invalid number of formants: must be in range 1..={MAX_FORMANTS}, but is {}",
                formants.len()
            )));
        }
        for formant in formants {
            formant.validate()?;
        }
        let mut set = Self {
            formants: [Formant::default(); MAX_FORMANTS],
            len: formants.len(),
        };
        set.formants[..formants.len()].copy_from_slice(formants);
        Ok(set)
    }

    /// Create a new set from separate frequency, bandwidth and gain arrays of equal length.
    pub fn from_arrays(frequencies: &[f32], bandwidths: &[f32], gains: &[f32]) -> Result<Self, Error> {
        if frequencies.len() != bandwidths.len() || frequencies.len() != gains.len() {
            return Err(Error::InvalidParameter(format!(
                "Formant arrays must have equal length, but have {}, {} and {} entries",
                frequencies.len(),
                bandwidths.len(),
                gains.len()
            )));
        }
        if frequencies.len() > MAX_FORMANTS {
            return Err(Error::InvalidParameter(format!(
                "Too many formants: max is {MAX_FORMANTS}, but got {}",
                frequencies.len()
            )));
        }
        let mut formants = [Formant::default(); MAX_FORMANTS];
        for (index, formant) in formants.iter_mut().take(frequencies.len()).enumerate() {
            *formant = Formant::new(frequencies[index], bandwidths[index], gains[index]);
        }
        Self::new(&formants[..frequencies.len()])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Formant] {
        &self.formants[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Formant> {
        self.as_slice().iter()
    }

    pub fn get(&self, index: usize) -> Result<&Formant, Error> {
        self.as_slice()
            .get(index)
            .ok_or(Error::FormantNotFound(index))
    }

    /// Replace a single formant. Other formants are left untouched.
    pub fn set(&mut self, index: usize, formant: Formant) -> Result<(), Error> {
        if index >= self.len {
            return Err(Error::FormantNotFound(index));
        }
        formant.validate()?;
        self.formants[index] = formant;
        Ok(())
    }

    pub fn set_frequency(&mut self, index: usize, frequency: f32) -> Result<(), Error> {
        let formant = Formant {
            frequency,
            ..*self.get(index)?
        };
        self.set(index, formant)
    }

    pub fn set_bandwidth(&mut self, index: usize, bandwidth: f32) -> Result<(), Error> {
        let formant = Formant {
            bandwidth,
            ..*self.get(index)?
        };
        self.set(index, formant)
    }

    pub fn set_gain_db(&mut self, index: usize, gain_db: f32) -> Result<(), Error> {
        let formant = Formant {
            gain_db,
            ..*self.get(index)?
        };
        self.set(index, formant)
    }
}

impl Default for FormantSet {
    /// A neutral, schwa like vowel.
    fn default() -> Self {
        let mut formants = [Formant::default(); MAX_FORMANTS];
        formants[..3].copy_from_slice(&[
            Formant::new(500.0, 60.0, 0.0),
            Formant::new(1500.0, 90.0, -6.0),
            Formant::new(2500.0, 120.0, -12.0),
        ]);
        Self { formants, len: 3 }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_and_q() {
        let formant = Formant::new(500.0, 50.0, 0.0);
        assert_eq!(formant.gain(), 1.0);
        assert_eq!(formant.q(), 10.0);
        let formant = Formant::new(500.0, 50.0, -20.0);
        assert!((formant.gain() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn validation() {
        assert!(Formant::new(500.0, 0.0, 0.0).validate().is_err());
        assert!(Formant::new(-1.0, 50.0, 0.0).validate().is_err());
        assert!(Formant::new(500.0, 50.0, f32::NAN).validate().is_err());
        assert!(FormantSet::new(&[]).is_err());
        assert!(FormantSet::new(&[Formant::default(); MAX_FORMANTS + 1]).is_err());
        assert!(FormantSet::from_arrays(&[500.0, 1500.0], &[50.0], &[0.0, 0.0]).is_err());
    }

    #[test]
    fn single_formant_updates() -> Result<(), Error> {
        let mut set =
            FormantSet::from_arrays(&[350.0, 2000.0], &[60.0, 100.0], &[0.0, -20.0])?;
        set.set_frequency(1, 2100.0)?;
        set.set_bandwidth(1, 110.0)?;
        set.set_gain_db(1, -10.0)?;
        assert_eq!(*set.get(0)?, Formant::new(350.0, 60.0, 0.0));
        assert_eq!(*set.get(1)?, Formant::new(2100.0, 110.0, -10.0));
        assert_eq!(set.set_gain_db(2, 0.0), Err(Error::FormantNotFound(2)));
        assert!(set.set_bandwidth(0, -5.0).is_err());
        assert_eq!(set.get(0)?.bandwidth, 60.0);
        Ok(())
    }
}
