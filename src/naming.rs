use chrono::NaiveDateTime;

/// Source of the wall-clock time stamped into artifact names.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Builds the artifact name for one sweep point.
///
/// The time stamp has one-second resolution, so two points named within the
/// same second with identical parameters get the same name.
pub fn make_name(
    timestamp: NaiveDateTime,
    interface_id: &str,
    system_id: &str,
    ku_freq_hz: u64,
    l_band_freq_hz: u64,
    phi: f64,
    theta: f64,
) -> String {
    format!(
        "{}_{}_{}_Ku_Freq_{}GHz_L_Freq_{}GHz_Phi_{}_Theta_{}",
        timestamp.format("%Y-%m-%d_%H-%M-%S"),
        interface_id,
        system_id,
        ghz_token(ku_freq_hz),
        ghz_token(l_band_freq_hz),
        token(&phi.to_string()),
        token(&theta.to_string()),
    )
}

// frequencies always carry a decimal part, e.g. 12 GHz -> "12_0"
fn ghz_token(freq_hz: u64) -> String {
    token(&format!("{:?}", freq_hz as f64 / 1e9))
}

fn token(decimal: &str) -> String {
    decimal.replace('.', "_")
}
