//! Weighted palette selection

use crate::block::{BlockPalette, BlockSpec};
use rand::Rng;

/// Choose one entry from a palette
///
/// Draws `r` uniformly from `[0, total_weight)` and returns the first entry
/// whose cumulative weight exceeds `r`. When every weight is zero the draw
/// degrades to a uniform choice. An empty slice yields `None`.
pub fn choose<'a, R: Rng + ?Sized>(entries: &'a [BlockSpec], rng: &mut R) -> Option<&'a BlockSpec> {
    match entries {
        [] => {
            tracing::warn!("palette selection called with an empty palette");
            None
        }
        [only] => Some(only),
        _ => {
            let total: f64 = entries.iter().map(|e| e.weight.max(0.0)).sum();
            if total <= 0.0 || !total.is_finite() {
                tracing::debug!("palette weights sum to zero, choosing uniformly");
                return entries.get(rng.gen_range(0..entries.len()));
            }

            let r = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            for entry in entries {
                cumulative += entry.weight.max(0.0);
                if r < cumulative {
                    return Some(entry);
                }
            }

            // Float rounding left r at the top edge
            entries.iter().rev().find(|e| e.weight > 0.0)
        }
    }
}

impl BlockPalette {
    /// Choose one entry (see [`choose`])
    #[inline]
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&BlockSpec> {
        choose(self.entries(), rng)
    }
}
