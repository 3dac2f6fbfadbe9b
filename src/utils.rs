//! Common, shared DSP and buffer tools.

pub mod buffer;
pub mod dsp;
pub mod smoothed;

// -------------------------------------------------------------------------------------------------

const MINUS_INF_IN_DB: f32 = -200.0f32;

const DB_TO_LIN_FACTOR: f32 = std::f32::consts::LN_10 / 20.0f32;

// -------------------------------------------------------------------------------------------------

/// Convert decibels to a linear gain factor. Exactly 0 dB results in exactly 1.0, values at or
/// below -200 dB are treated as silence.
pub fn db_to_linear(db: f32) -> f32 {
    if db == 0.0 {
        1.0
    } else if db > MINUS_INF_IN_DB {
        (db * DB_TO_LIN_FACTOR).exp()
    } else {
        0.0
    }
}

// -------------------------------------------------------------------------------------------------
