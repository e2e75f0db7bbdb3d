//! Random selection: the plain range draw and the tier-weighted draw.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::blocks::SongRange;
use crate::core::pool::CandidateTrack;

/// How many tracks this run asks for, drawn uniformly from the range.
pub fn draw_count<R: Rng>(range: SongRange, rng: &mut R) -> usize {
  rng.gen_range(range.min..=range.max) as usize
}

/// Shuffle, then keep the first `count` elements. Output order is the
/// post-shuffle order; short inputs come back whole.
pub fn range_random<T, R: Rng>(mut items: Vec<T>, range: SongRange, rng: &mut R) -> Vec<T> {
  let count = draw_count(range, rng);
  items.shuffle(rng);
  items.truncate(count);
  items
}

/// Tier-weighted pick over the candidate pool.
///
/// Every candidate gets a score of `weight * 30 + popularity * 0.7 +
/// random(0, 20)` and the pool is sorted best first. The sorted list is
/// cut 40/30/30 into low, mid, and high tiers; the output takes 30% of
/// its size from the low tier, 40% from the mid tier, and the rest from
/// the high tier, shuffling each tier before taking. When small tiers
/// leave the takes short, the gap is filled from whatever was not taken,
/// so the output size is always `min(n, pool size)`.
pub fn tier_weighted<R: Rng>(
  candidates: Vec<CandidateTrack>,
  range: SongRange,
  rng: &mut R,
) -> Vec<String> {
  let mut scored: Vec<(f64, CandidateTrack)> = candidates
    .into_iter()
    .map(|track| {
      let score =
        track.weight * 30.0 + f64::from(track.popularity) * 0.7 + rng.gen_range(0.0..20.0);
      (score, track)
    })
    .collect();
  scored.sort_by(|a, b| b.0.total_cmp(&a.0));
  let sorted: Vec<CandidateTrack> = scored.into_iter().map(|(_, track)| track).collect();

  let total = sorted.len();
  let n = draw_count(range, rng).min(total);

  let mid_start = (total as f64 * 0.4).floor() as usize;
  let high_start = (total as f64 * 0.7).floor() as usize;
  let low_take = (n as f64 * 0.3).floor() as usize;
  let mid_take = (n as f64 * 0.4).floor() as usize;
  let high_take = n - low_take - mid_take;

  let mut picked: Vec<CandidateTrack> = Vec::with_capacity(n);
  let mut passed_over: Vec<CandidateTrack> = Vec::new();

  let tiers = [
    (sorted[..mid_start].to_vec(), low_take),
    (sorted[mid_start..high_start].to_vec(), mid_take),
    (sorted[high_start..].to_vec(), high_take),
  ];
  for (mut tier, take) in tiers {
    tier.shuffle(rng);
    let take = take.min(tier.len());
    passed_over.extend(tier.split_off(take));
    picked.extend(tier);
  }

  // Tier floors can come up short of n when a tier is smaller than its
  // take; top the pick back up from the leftovers.
  if picked.len() < n {
    passed_over.shuffle(rng);
    let fill = (n - picked.len()).min(passed_over.len());
    picked.extend(passed_over.drain(..fill));
  }

  picked.shuffle(rng);
  picked.into_iter().map(|track| track.uri).collect()
}
