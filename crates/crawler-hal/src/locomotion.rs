//! `Locomotion` trait for the crawler's leg controller.
//!
//! Gait execution and step sequencing belong to the driver.  The control
//! stack only asks for a named action or an explicit step vector at a given
//! speed.

use crawler_types::{CrawlerError, StepVector};

/// The crawler's leg controller.
pub trait Locomotion: Send {
    /// Perform the named gait action (e.g. `"forward"`, `"turn left"`)
    /// `repeat` times at `speed_percent` (0-100).
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::HardwareFault`] if the action is unknown to the
    /// driver or the servos cannot execute it.
    fn perform_gait(
        &mut self,
        action: &str,
        repeat: u32,
        speed_percent: u8,
    ) -> Result<(), CrawlerError>;

    /// Move all four legs to the positions in `step` at `speed_percent`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::HardwareFault`] if the positions cannot be
    /// reached.
    fn perform_step(&mut self, step: &StepVector, speed_percent: u8) -> Result<(), CrawlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal leg controller used only for tests.
    #[derive(Default)]
    struct MockLegs {
        gaits: Vec<(String, u32, u8)>,
        last_step: Option<(StepVector, u8)>,
    }

    impl Locomotion for MockLegs {
        fn perform_gait(
            &mut self,
            action: &str,
            repeat: u32,
            speed_percent: u8,
        ) -> Result<(), CrawlerError> {
            if action.is_empty() {
                return Err(CrawlerError::hardware("legs", "empty action"));
            }
            self.gaits.push((action.to_string(), repeat, speed_percent));
            Ok(())
        }

        fn perform_step(
            &mut self,
            step: &StepVector,
            speed_percent: u8,
        ) -> Result<(), CrawlerError> {
            self.last_step = Some((*step, speed_percent));
            Ok(())
        }
    }

    #[test]
    fn mock_legs_record_gaits_and_steps() {
        let mut legs = MockLegs::default();
        legs.perform_gait("turn left", 2, 60).unwrap();
        assert_eq!(legs.gaits, vec![("turn left".to_string(), 2, 60)]);

        let step = StepVector([[1, 2, 3], [4, 5, 6], [7, 8, 9], [10, 11, 12]]);
        legs.perform_step(&step, 80).unwrap();
        assert_eq!(legs.last_step, Some((step, 80)));

        assert!(matches!(
            legs.perform_gait("", 1, 80),
            Err(CrawlerError::HardwareFault { .. })
        ));
    }
}
