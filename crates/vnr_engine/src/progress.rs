//! Parser for the engine's `-progress pipe:1` key=value stream.
//!
//! ffmpeg flushes a block of `key=value` lines terminated by a `progress=`
//! line. `out_time_us` carries the output timestamp in microseconds
//! (`out_time_ms` is the same microsecond value under a misleading name, so
//! it is accepted as a fallback for older builds).

/// Accumulated state of one progress stream.
#[derive(Debug, Default, Clone)]
pub struct ProgressState {
    /// Output timestamp of the most recent block, in seconds.
    pub out_time_secs: f64,
    /// Whether a `progress=end` marker has been seen.
    pub ended: bool,
}

impl ProgressState {
    /// Feed one `key=value` pair.
    ///
    /// Returns `true` when the pair completed a block (`progress=` line),
    /// which is the moment to report.
    pub fn update(&mut self, key: &str, value: &str) -> bool {
        match key {
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<i64>() {
                    if us >= 0 {
                        self.out_time_secs = us as f64 / 1_000_000.0;
                    }
                }
                false
            }
            "out_time" => {
                if let Some(secs) = parse_timestamp(value.trim()) {
                    self.out_time_secs = secs;
                }
                false
            }
            "progress" => {
                if value.trim() == "end" {
                    self.ended = true;
                }
                true
            }
            _ => false,
        }
    }

    /// Fraction of the given duration covered so far.
    ///
    /// Unclamped; the session clamps on its side. `None` when the duration
    /// is unknown or zero.
    pub fn fraction(&self, duration_secs: Option<f64>) -> Option<f64> {
        if self.ended {
            return Some(1.0);
        }
        match duration_secs {
            Some(d) if d > 0.0 => Some(self.out_time_secs / d),
            _ => None,
        }
    }
}

/// Parse an `HH:MM:SS.micros` timestamp into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
