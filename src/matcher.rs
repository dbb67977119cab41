// Bitmask streaming matcher.
//
// Consumes one byte at a time per pattern variant and reports whether the
// pattern completed ending at that byte. On mismatch *or* on a completed
// match, the cursor resets to 0 and replays the pattern's own
// already-consumed prefix bytes through the state machine — a
// self-referential, KMP-like "longest border of the pattern under its own
// mask" restart. This is deliberately *not* a from-scratch restart at the
// current byte: immediately-overlapping repeats of a pattern can be
// missed. This mirrors `ptn_match`/`ptn_match_backtrack` in birch.c
// exactly and is preserved intentionally rather than corrected to a
// from-scratch restart.

use crate::pattern::PatternVariant;

impl PatternVariant {
    /// Reset the matcher cursor. Called once per file, per variant.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Feed one byte through the matcher. Returns `true` exactly when the
    /// pattern completes ending at this byte.
    pub fn step(&mut self, c: u8) -> bool {
        if (c & self.mask[self.cursor]) == self.bytes[self.cursor] {
            self.cursor += 1;
            if self.cursor == self.size_bytes {
                self.backtrack();
                return true;
            }
            false
        } else if self.cursor != 0 {
            self.backtrack();
            self.step(c)
        } else {
            false
        }
    }

    /// Reset to cursor 0, then replay `bytes[1..count]` through `step`,
    /// mirroring `ptn_match_backtrack`'s self-replay.
    fn backtrack(&mut self) {
        let count = self.cursor;
        self.cursor = 0;
        for i in 1..count {
            let b = self.bytes[i];
            self.step(b);
        }
    }
}
