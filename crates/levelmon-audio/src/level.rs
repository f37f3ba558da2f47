use std::sync::Arc;

use parking_lot::RwLock;

/// Root-mean-square amplitude of one decoded chunk, pooled across all
/// channels. Callers only invoke this with at least one sample.
pub fn rms(samples: &[f64]) -> f64 {
    let sum_squares: f64 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelSnapshot {
    /// Latest published RMS amplitude. Nominally [0, 1] for normalized
    /// formats, not hard-clamped.
    pub level: f64,
    /// Monotonic count of backend-reported input overruns.
    pub overflows: u64,
}

/// Shared publication cell for one monitor's level. One writer context (the
/// stream's own callbacks), any number of readers. The snapshot is read and
/// written whole, so readers see either the previous or the next value,
/// never a mix.
#[derive(Debug, Clone, Default)]
pub struct LevelCell {
    inner: Arc<RwLock<LevelSnapshot>>,
}

impl LevelCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the published level. The most recently aggregated chunk
    /// wins; chunks are never merged.
    pub fn publish(&self, level: f64) {
        self.inner.write().level = level;
    }

    /// Count one overflow event; returns the new total.
    pub fn record_overflow(&self) -> u64 {
        let mut snapshot = self.inner.write();
        snapshot.overflows += 1;
        snapshot.overflows
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        *self.inner.read()
    }

    pub fn level(&self) -> f64 {
        self.inner.read().level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn rms_of_constant_chunk_is_its_magnitude() {
        let samples = vec![0.5; 128];
        assert!((rms(&samples) - 0.5).abs() < 1e-12);
        let negative = vec![-0.5; 128];
        assert!((rms(&negative) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rms_of_alternating_signs_is_the_magnitude() {
        let samples: Vec<f64> = (0..1000).map(|i| if i % 2 == 0 { 0.7 } else { -0.7 }).collect();
        assert!((rms(&samples) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn rms_of_full_scale_square_wave_is_one() {
        let samples: Vec<f64> = (0..4410).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&samples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn publish_overwrites_and_overflow_accumulates() {
        let cell = LevelCell::new();
        assert_eq!(cell.snapshot(), LevelSnapshot::default());
        cell.publish(0.25);
        cell.publish(0.75);
        assert_eq!(cell.level(), 0.75);
        assert_eq!(cell.record_overflow(), 1);
        assert_eq!(cell.record_overflow(), 2);
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.level, 0.75);
        assert_eq!(snapshot.overflows, 2);
    }

    #[test]
    fn concurrent_readers_never_observe_torn_snapshots() {
        let cell = LevelCell::new();
        let writer_cell = cell.clone();
        let writer = thread::spawn(move || {
            for i in 0..20_000 {
                writer_cell.publish(if i % 2 == 0 { 0.25 } else { 0.75 });
            }
        });
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    for _ in 0..20_000 {
                        let level = cell.snapshot().level;
                        assert!(
                            level == 0.0 || level == 0.25 || level == 0.75,
                            "torn or stray level {}",
                            level
                        );
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
