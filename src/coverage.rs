//! Greedy maximum-coverage selection over per-candidate visible-cell sets,
//! honoring the preferred segment size (§4.6).

use crate::viewshed::cellset::{BitSet, CellSet};
use crate::viewshed::CandidateViewshed;

/// One candidate chosen by the greedy selector, with the novel cells it
/// alone contributes (disjoint from every earlier selection by
/// construction).
pub struct Selection {
    pub viewshed_index: usize,
    pub new_cells: CellSet,
}

/// Runs greedy maximum coverage over `candidates`' visible-cell sets.
/// `total_cells` sizes the `covered` accumulator bitset (the raster's
/// `rows * cols`). `preferred_cells` is the preferred segment size `P`
/// converted to a cell count. Stops once the best remaining gain falls
/// below `min_useful_cells`.
pub fn select(
    candidates: &[CandidateViewshed],
    total_cells: usize,
    preferred_cells: f64,
    min_useful_cells: f64,
) -> Vec<Selection> {
    let mut covered = BitSet::new(total_cells);
    let mut taken = vec![false; candidates.len()];
    let mut result = Vec::new();

    loop {
        let mut best: Option<(usize, usize, f64)> = None; // (index, gain, score)

        for (i, cand) in candidates.iter().enumerate() {
            if taken[i] {
                continue;
            }
            let gain = covered.difference_size(&cand.visible);
            if gain == 0 {
                continue;
            }
            let score = gain as f64 * penalty(gain as f64, preferred_cells);

            let is_better = match best {
                None => true,
                Some((best_i, best_gain, best_score)) => {
                    if score != best_score {
                        score > best_score
                    } else if gain != best_gain {
                        gain > best_gain
                    } else {
                        let priority_cmp = candidates[i]
                            .candidate
                            .access_mode
                            .priority()
                            .cmp(&candidates[best_i].candidate.access_mode.priority());
                        match priority_cmp {
                            std::cmp::Ordering::Greater => true,
                            std::cmp::Ordering::Less => false,
                            std::cmp::Ordering::Equal => i < best_i,
                        }
                    }
                }
            };

            if is_better {
                best = Some((i, gain, score));
            }
        }

        let Some((idx, gain, _score)) = best else {
            break;
        };

        if (gain as f64) < min_useful_cells {
            break;
        }

        let mut new_cells = CellSet::sparse();
        for cell in candidates[idx].visible.iter() {
            if !covered.contains(cell) {
                new_cells.insert(cell);
            }
        }

        covered.union_into(&candidates[idx].visible);
        taken[idx] = true;
        result.push(Selection {
            viewshed_index: idx,
            new_cells,
        });
    }

    result
}

/// `penalty(g, P) = 1` if `g <= P`, else `P/g`: prefers segments at or
/// below the preferred size without forbidding a larger one that still
/// contributes more novel coverage.
fn penalty(gain: f64, preferred_cells: f64) -> f64 {
    if preferred_cells <= 0.0 || gain <= preferred_cells {
        1.0
    } else {
        preferred_cells / gain
    }
}

/// The default `min_useful_cells` threshold: `0.02 * P`, floored at 1.
pub fn default_min_useful_cells(preferred_cells: f64) -> f64 {
    (0.02 * preferred_cells).max(1.0)
}
