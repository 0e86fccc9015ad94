/// Debounced "multiple faces" flag
///
/// Raised after `raise_after` consecutive multi-face samples, cleared after
/// `clear_after` consecutive single/no-face samples.
#[derive(Debug, Clone)]
pub struct PresenceHysteresis {
    raise_after: u32,
    clear_after: u32,
    multi_streak: u32,
    clear_streak: u32,
    warning: bool,
}

impl PresenceHysteresis {
    pub fn new(raise_after: u32, clear_after: u32) -> Self {
        Self {
            raise_after: raise_after.max(1),
            clear_after: clear_after.max(1),
            multi_streak: 0,
            clear_streak: 0,
            warning: false,
        }
    }

    /// Feed one sample; returns the new flag value when it flips
    pub fn observe(&mut self, face_count: usize) -> Option<bool> {
        if face_count > 1 {
            self.multi_streak = self.multi_streak.saturating_add(1);
            self.clear_streak = 0;

            if !self.warning && self.multi_streak >= self.raise_after {
                self.warning = true;
                return Some(true);
            }
        } else {
            self.clear_streak = self.clear_streak.saturating_add(1);
            self.multi_streak = 0;

            if self.warning && self.clear_streak >= self.clear_after {
                self.warning = false;
                return Some(false);
            }
        }

        None
    }

    pub fn warning(&self) -> bool {
        self.warning
    }
}
