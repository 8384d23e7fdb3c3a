//! Frame pacing state.
//!
//! [`FramePacer`] tracks which in-flight slot is current and which slot last
//! rendered into each swapchain image. The driver uses the per-image record
//! to wait for the submission still targeting an image before reusing it,
//! which matters when the swapchain hands out images out of round-robin
//! order.

use glint_rhi::sync::MAX_FRAMES_IN_FLIGHT;

/// Round-robin slot counter plus per-image slot bookkeeping.
///
/// Pure state; all GPU waits happen in the frame driver.
pub struct FramePacer {
    /// Current in-flight slot (0 to MAX_FRAMES_IN_FLIGHT - 1).
    current_slot: usize,
    /// For each swapchain image, the slot that last submitted work for it.
    image_last_slot: Vec<Option<usize>>,
}

impl FramePacer {
    /// Creates a pacer for a swapchain with `image_count` images.
    pub fn new(image_count: usize) -> Self {
        Self {
            current_slot: 0,
            image_last_slot: vec![None; image_count],
        }
    }

    /// Returns the current in-flight slot.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Advances to the next slot.
    ///
    /// Called once per frame iteration, including iterations that only
    /// rebuilt the swapchain, so a stream of rebuilds still cycles slots.
    pub fn advance(&mut self) {
        self.current_slot = (self.current_slot + 1) % MAX_FRAMES_IN_FLIGHT;
    }

    /// Records that the current slot is submitting work for `image_index`.
    pub fn record_image_use(&mut self, image_index: usize) {
        if let Some(entry) = self.image_last_slot.get_mut(image_index) {
            *entry = Some(self.current_slot);
        }
    }

    /// Returns the slot that last used `image_index`, if any.
    ///
    /// The driver waits on that slot's fence before rendering into the image
    /// again. A return of the current slot needs no extra wait; its fence
    /// was already waited this iteration.
    #[inline]
    pub fn last_slot_for_image(&self, image_index: usize) -> Option<usize> {
        self.image_last_slot.get(image_index).copied().flatten()
    }

    /// Clears the per-image records for a new swapchain.
    ///
    /// The old swapchain's images are gone, so stale slot records must not
    /// trigger waits against the new image set.
    pub fn reset_images(&mut self, image_count: usize) {
        self.image_last_slot.clear();
        self.image_last_slot.resize(image_count, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_cycle_round_robin() {
        let mut pacer = FramePacer::new(3);
        assert_eq!(pacer.current_slot(), 0);

        for i in 1..=(2 * MAX_FRAMES_IN_FLIGHT) {
            pacer.advance();
            assert_eq!(pacer.current_slot(), i % MAX_FRAMES_IN_FLIGHT);
        }
    }

    #[test]
    fn test_image_use_is_recorded_per_image() {
        let mut pacer = FramePacer::new(3);

        pacer.record_image_use(0);
        pacer.advance();
        pacer.record_image_use(1);

        assert_eq!(pacer.last_slot_for_image(0), Some(0));
        assert_eq!(pacer.last_slot_for_image(1), Some(1));
        assert_eq!(pacer.last_slot_for_image(2), None);
    }

    #[test]
    fn test_image_record_overwritten_on_reuse() {
        let mut pacer = FramePacer::new(2);

        pacer.record_image_use(0);
        pacer.advance();
        // Same image handed out again on the next iteration
        pacer.record_image_use(0);

        assert_eq!(pacer.last_slot_for_image(0), Some(1));
    }

    #[test]
    fn test_reset_images_clears_stale_records() {
        let mut pacer = FramePacer::new(2);
        pacer.record_image_use(0);
        pacer.advance();

        pacer.reset_images(3);

        // Slot position survives the rebuild, image records do not
        assert_eq!(pacer.current_slot(), 1);
        assert_eq!(pacer.last_slot_for_image(0), None);
        assert_eq!(pacer.last_slot_for_image(2), None);
    }

    #[test]
    fn test_first_slot_revisited_after_full_cycle() {
        let mut pacer = FramePacer::new(3);
        let mut visits = [0usize; MAX_FRAMES_IN_FLIGHT];

        // One more frame than there are slots: the wrap-around frame lands
        // back on slot 0, whose fence the driver then waits a second time.
        for image in 0..=MAX_FRAMES_IN_FLIGHT {
            let slot = pacer.current_slot();
            visits[slot] += 1;
            pacer.record_image_use(image % 3);
            pacer.advance();
        }

        assert_eq!(visits[0], 2);
        for &count in &visits[1..] {
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn test_rebuild_only_iteration_advances_without_record() {
        let mut pacer = FramePacer::new(2);

        // Normal frame on slot 0.
        pacer.record_image_use(0);
        pacer.advance();

        // Acquire comes back out of date: the driver rebuilds and advances
        // without submitting, so no image record is written.
        pacer.reset_images(2);
        pacer.advance();

        assert_eq!(pacer.current_slot(), 2 % MAX_FRAMES_IN_FLIGHT);
        assert_eq!(pacer.last_slot_for_image(0), None);
        assert_eq!(pacer.last_slot_for_image(1), None);

        // The next iteration proceeds as a normal frame.
        pacer.record_image_use(1);
        let slot = pacer.current_slot();
        assert_eq!(pacer.last_slot_for_image(1), Some(slot));
    }

    #[test]
    fn test_out_of_range_image_index_is_ignored() {
        let mut pacer = FramePacer::new(1);
        pacer.record_image_use(5);
        assert_eq!(pacer.last_slot_for_image(5), None);
    }
}
