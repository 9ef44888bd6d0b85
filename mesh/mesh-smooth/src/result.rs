//! Smoothing result types.

/// Summary of a smoothing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothOutput {
    /// Number of iterations performed.
    pub iterations: u32,

    /// Number of vertices whose position changed at least once.
    pub moved_vertices: usize,

    /// Number of live vertices that were not allowed to move.
    pub fixed_vertices: usize,

    /// Vertex updates snapped back onto the original surface, over all iterations.
    pub reprojected: usize,

    /// Vertex updates the reprojection index could not place, over all iterations.
    pub reprojection_skipped: usize,

    /// Largest single-iteration displacement of any vertex.
    pub max_displacement: f64,
}

impl SmoothOutput {
    /// Check if any vertex moved.
    #[must_use]
    pub const fn was_smoothed(&self) -> bool {
        self.moved_vertices > 0
    }

    /// Fraction of attempted reprojections that succeeded.
    ///
    /// Returns 1.0 when no reprojection was attempted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reprojection_rate(&self) -> f64 {
        let attempted = self.reprojected + self.reprojection_skipped;
        if attempted == 0 {
            1.0
        } else {
            self.reprojected as f64 / attempted as f64
        }
    }
}

impl std::fmt::Display for SmoothOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Smooth: {} iterations, {} moved, {} fixed, max displacement {:.4}",
            self.iterations, self.moved_vertices, self.fixed_vertices, self.max_displacement
        )?;
        if self.reprojected + self.reprojection_skipped > 0 {
            write!(
                f,
                ", {} reprojected ({} skipped)",
                self.reprojected, self.reprojection_skipped
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reprojection_rate() {
        let output = SmoothOutput {
            reprojected: 3,
            reprojection_skipped: 1,
            ..SmoothOutput::default()
        };
        assert!((output.reprojection_rate() - 0.75).abs() < 1e-12);
        assert!((SmoothOutput::default().reprojection_rate() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_was_smoothed() {
        assert!(!SmoothOutput::default().was_smoothed());
        let output = SmoothOutput {
            moved_vertices: 2,
            ..SmoothOutput::default()
        };
        assert!(output.was_smoothed());
    }

    #[test]
    fn test_display() {
        let output = SmoothOutput {
            iterations: 5,
            moved_vertices: 12,
            fixed_vertices: 4,
            reprojected: 60,
            reprojection_skipped: 0,
            max_displacement: 0.25,
        };
        let display = format!("{output}");
        assert!(display.contains("5 iterations"));
        assert!(display.contains("0.2500"));
        assert!(display.contains("60 reprojected"));

        let plain = format!("{}", SmoothOutput::default());
        assert!(!plain.contains("reprojected"));
    }
}
