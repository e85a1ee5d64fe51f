// Attenuator control codes have quarter-dB resolution and cannot go negative.
// Eighth-dB ties round to the even code.

/// Converts a power level and the known insertion loss of the path into the
/// integer code expected by the attenuator.
pub fn attenuation_code(power_db: f64, insertion_loss_db: f64) -> u32 {
    let adjusted = power_db - insertion_loss_db;
    if adjusted >= 0.0 {
        (adjusted * 4.0).round_ties_even() as u32
    } else {
        0
    }
}
