//! Top-left first-fit backtracking engine (spec §4.2).
//!
//! Pieces are tried in descending-width order at the lexicographically first
//! empty cell. The rotation variant adds a symmetry-breaking scheme: each
//! non-square piece gets a rotated "partner" entry, the first placement is
//! forced to be non-rotated, and placing one of a pair forbids the other
//! for the rest of that branch.

use crate::error::PackError;
use crate::geometry::PieceSet;
use crate::grid::OccupancyGrid;

/// One entry on the undo stack: an anchor plus which engine-local piece (a
/// 1-based index into the extent table) was placed there.
struct Placement {
    top: usize,
    left: usize,
    k: usize,
}

/// Scans row-major from `(0, 0)` for the first empty cell.
fn first_empty_cell(grid: &OccupancyGrid) -> Option<(usize, usize)> {
    for r in 0..grid.height() {
        for c in 0..grid.width() {
            if grid.get(r, c) == 0 {
                return Some((r, c));
            }
        }
    }
    None
}

/// Spec §4.2: a placement's interior is empty iff its border is, given the
/// top-left heuristic's invariant that nothing extends into unexplored
/// territory without its own border crossing into it first.
fn perimeter_is_empty(grid: &OccupancyGrid, top: usize, left: usize, h: usize, w: usize) -> bool {
    let bottom = top + h - 1;
    let right = left + w - 1;
    for c in left..=right {
        if grid.get(top, c) != 0 || grid.get(bottom, c) != 0 {
            return false;
        }
    }
    for r in top..=bottom {
        if grid.get(r, left) != 0 || grid.get(r, right) != 0 {
            return false;
        }
    }
    true
}

/// The core search shared by both variants. `extents[k - 1]` is the `(h, w)`
/// of engine-local piece `k`; `partner(k)` gives the index to forbid/restore
/// when `k` is placed/undone (`None` for squares and the no-rotation mode);
/// `max_first`/`max_rest` bound the candidate scan depending on whether this
/// is the very first placement.
fn search(
    h: u32,
    w: u32,
    extents: &[(u32, u32)],
    target_count: usize,
    max_first: usize,
    max_rest: usize,
    partner: impl Fn(usize) -> Option<usize>,
) -> Result<Option<Vec<Placement>>, PackError> {
    let n = extents.len();
    let mut used = vec![0i64; n + 1];
    let mut grid = OccupancyGrid::new(h as usize, w as usize);
    let mut stack: Vec<Placement> = Vec::new();
    let mut count = 0usize;
    let mut k_start = 1usize;

    loop {
        if count == target_count {
            return Ok(Some(stack));
        }

        let (top, left) = first_empty_cell(&grid).ok_or_else(|| {
            PackError::InternalInvariantViolation(format!(
                "no empty cell left with count ({count}) < target ({target_count})"
            ))
        })?;

        let max_k = if count == 0 { max_first } else { max_rest };
        let mut placed = false;

        for k in k_start..=max_k {
            if used[k] != 0 {
                continue;
            }
            let (eh, ew) = extents[k - 1];
            if !grid.rect_in_bounds(top, left, eh as usize, ew as usize) {
                continue;
            }
            if !perimeter_is_empty(&grid, top, left, eh as usize, ew as usize) {
                continue;
            }

            grid.paint_rect(top, left, eh as usize, ew as usize, k);
            count += 1;
            used[k] = count as i64;
            if let Some(p) = partner(k) {
                used[p] = -1;
            }
            stack.push(Placement { top, left, k });
            k_start = 1;
            placed = true;
            break;
        }

        if !placed {
            match stack.pop() {
                None => return Ok(None),
                Some(Placement { top, left, k }) => {
                    let (eh, ew) = extents[k - 1];
                    grid.clear_rect(top, left, eh as usize, ew as usize);
                    used[k] = 0;
                    if let Some(p) = partner(k) {
                        used[p] = 0;
                    }
                    count -= 1;
                    k_start = k + 1;
                }
            }
        }
    }
}

/// Paints the undo-stack placements with their raw engine-local indices `k`;
/// callers translate to the façade's input-order numbering via
/// [`OccupancyGrid::remap`].
fn paint_result(h: u32, w: u32, placements: &[Placement], extents: &[(u32, u32)]) -> OccupancyGrid {
    let mut grid = OccupancyGrid::new(h as usize, w as usize);
    for p in placements {
        let (eh, ew) = extents[p.k - 1];
        grid.paint_rect(p.top, p.left, eh as usize, ew as usize, p.k);
    }
    grid
}

/// Runs the no-rotation backtracking search.
fn solve_no_rotation(h: u32, w: u32, pieces: &PieceSet) -> Result<Option<OccupancyGrid>, PackError> {
    let (sorted, perm) = pieces.sorted_by_descending_width();
    let extents: Vec<(u32, u32)> = sorted.iter().map(|p| (p.h, p.w)).collect();
    let target = sorted.len();
    let Some(placements) = search(h, w, &extents, target, target, target, |_| None)? else {
        return Ok(None);
    };
    let grid = paint_result(h, w, &placements, &extents).remap(|k| perm[k - 1] + 1);
    Ok(Some(grid))
}

/// Runs the rotation-symmetry-breaking backtracking search (spec §4.2,
/// "Rotation variant").
fn solve_with_rotation(h: u32, w: u32, pieces: &PieceSet) -> Result<Option<OccupancyGrid>, PackError> {
    let (sorted, perm) = pieces.sorted_by_descending_width();

    let mut non_square_idxs = Vec::new();
    let mut square_idxs = Vec::new();
    for (i, p) in sorted.iter().enumerate() {
        if p.is_square() {
            square_idxs.push(i);
        } else {
            non_square_idxs.push(i);
        }
    }

    let r = non_square_idxs.len();
    let q = square_idxs.len();
    let n = 2 * r + q;

    let mut p_origin = Vec::with_capacity(n);
    let mut extents = Vec::with_capacity(n);
    for &i in &non_square_idxs {
        p_origin.push(i);
        extents.push((sorted[i].h, sorted[i].w));
    }
    for &i in &square_idxs {
        p_origin.push(i);
        extents.push((sorted[i].h, sorted[i].w));
    }
    for &i in non_square_idxs.iter().rev() {
        p_origin.push(i);
        extents.push((sorted[i].w, sorted[i].h));
    }

    let partner = move |k: usize| -> Option<usize> {
        if k <= r || k > n - r {
            Some(n - k + 1)
        } else {
            None
        }
    };

    let target = r + q;
    let max_first = n - r;
    let Some(placements) = search(h, w, &extents, target, max_first, n, partner)? else {
        return Ok(None);
    };
    let grid = paint_result(h, w, &placements, &extents).remap(|k| perm[p_origin[k - 1]] + 1);
    Ok(Some(grid))
}

/// Entry point used by the façade.
pub fn solve(
    h: u32,
    w: u32,
    pieces: &PieceSet,
    allow_rotation: bool,
) -> Result<Option<OccupancyGrid>, PackError> {
    if allow_rotation {
        solve_with_rotation(h, w, pieces)
    } else {
        solve_no_rotation(h, w, pieces)
    }
}
