// src/exam/countdown.rs

/// Whole-second countdown for one attempt. Never pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Removes one second. Returns `true` only on the tick that reaches zero;
    /// ticks after expiry are ignored.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    /// "m:ss"
    pub fn display(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_exactly_once() {
        let mut countdown = Countdown::new(3);
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn test_full_exam_length() {
        let mut countdown = Countdown::new(480);
        assert_eq!(countdown.display(), "8:00");
        let expirations = (0..600).filter(|_| countdown.tick()).count();
        assert_eq!(expirations, 1);
        assert_eq!(countdown.display(), "0:00");
    }
}
