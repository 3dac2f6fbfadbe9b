//! Sample buffer helpers.

// -------------------------------------------------------------------------------------------------

/// Fill the given buffer with silence.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

/// Multiply all samples in the given buffer with a constant gain factor.
#[inline]
pub fn scale_buffer(buffer: &mut [f32], gain: f32) {
    if gain == 0.0 {
        clear_buffer(buffer);
    } else if gain != 1.0 {
        for sample in buffer.iter_mut() {
            *sample *= gain;
        }
    }
}

/// Replace NaN and infinite samples with silence. Returns the number of replaced samples.
#[inline]
pub fn flush_non_finite(buffer: &mut [f32]) -> usize {
    let mut flushed = 0;
    for sample in buffer.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
            flushed += 1;
        }
    }
    flushed
}

/// Root mean square level of the given buffer.
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum = buffer
        .iter()
        .fold(0.0f64, |sum, sample| sum + (*sample as f64) * (*sample as f64));
    (sum / buffer.len() as f64).sqrt() as f32
}

// -------------------------------------------------------------------------------------------------
