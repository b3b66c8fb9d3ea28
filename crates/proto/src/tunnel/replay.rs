//! Anti-replay sliding window
//!
//! Each inbound SA tracks the highest authenticated sequence number seen and
//! a bitmap over the `W` numbers at or below it. A sequence number is
//! accepted at most once; anything that has slid out of the window is
//! rejected outright.
//!
//! The check is split in two phases so the codec can order operations
//! correctly: [`ReplayWindow::check`] is a pure read that runs before
//! decryption, and [`ReplayWindow::commit`] advances state only after the
//! integrity tag has verified. A forged sequence number therefore never
//! moves the window.

use crate::tunnel::{Error, Result};

/// Minimum accepted window size
pub const MIN_WINDOW_SIZE: u32 = 32;

/// Maximum supported window size (one u64 bitmap)
pub const MAX_WINDOW_SIZE: u32 = 64;

/// Default anti-replay window size
pub const DEFAULT_WINDOW_SIZE: u32 = 64;

/// Sliding-window replay detector for one inbound SA
///
/// Bit `i` of the bitmap tracks sequence number `highest_seq - i`, so bit 0
/// is the highest number accepted so far.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    highest_seq: u32,
    bitmap: u64,
    window_size: u32,
}

impl ReplayWindow {
    /// Create a new replay window
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` if `window_size` lies outside
    /// [`MIN_WINDOW_SIZE`]`..=`[`MAX_WINDOW_SIZE`].
    pub fn new(window_size: u32) -> Result<Self> {
        if !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&window_size) {
            return Err(Error::InvalidParameter(format!(
                "replay window size must be in {}..={}, got {}",
                MIN_WINDOW_SIZE, MAX_WINDOW_SIZE, window_size
            )));
        }

        Ok(ReplayWindow {
            highest_seq: 0,
            bitmap: 0,
            window_size,
        })
    }

    /// Highest sequence number accepted so far (0 if none)
    pub fn highest_seq(&self) -> u32 {
        self.highest_seq
    }

    /// Window size this detector was created with
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Check whether `seq` would be accepted, without mutating state
    ///
    /// # Errors
    ///
    /// Fails with `ReplayDetected` if `seq` is zero, already marked, or has
    /// fallen below the window.
    pub fn check(&self, seq: u32) -> Result<()> {
        // Sequence numbers start at 1; zero is never valid on the wire.
        if seq == 0 {
            return Err(Error::ReplayDetected(seq));
        }

        if seq > self.highest_seq {
            return Ok(());
        }

        let offset = self.highest_seq - seq;
        if offset >= self.window_size {
            return Err(Error::ReplayDetected(seq));
        }
        if self.bitmap & (1u64 << offset) != 0 {
            return Err(Error::ReplayDetected(seq));
        }
        Ok(())
    }

    /// Mark `seq` as received, sliding the window forward if needed
    ///
    /// Call only after [`check`](Self::check) passed and the envelope
    /// authenticated.
    pub fn commit(&mut self, seq: u32) {
        if seq > self.highest_seq {
            let shift = seq - self.highest_seq;
            if shift >= 64 {
                self.bitmap = 0;
            } else {
                self.bitmap <<= shift;
            }
            self.bitmap |= 1;
            self.highest_seq = seq;
        } else {
            let offset = self.highest_seq - seq;
            if offset < 64 {
                self.bitmap |= 1u64 << offset;
            }
        }
    }

    /// Check and, if acceptable, mark in one step
    ///
    /// # Errors
    ///
    /// Same failures as [`check`](Self::check).
    pub fn check_and_update(&mut self, seq: u32) -> Result<()> {
        self.check(seq)?;
        self.commit(seq);
        Ok(())
    }
}

impl Default for ReplayWindow {
    fn default() -> Self {
        ReplayWindow {
            highest_seq: 0,
            bitmap: 0,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}
