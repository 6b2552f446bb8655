//! Dancing Links / Algorithm X engine (spec §4.3).
//!
//! Builds one column per grid cell (`H·W` of them) and one column per piece
//! (`S` of them), one row per `(piece, orientation, anchor)` candidate, and
//! hands the whole thing to the borrowed [`crate::dlx::dlx::Matrix`]. The
//! MRV column choice and the abort-on-first-solution wiring already live on
//! that matrix (see [`crate::dlx::dlx::Matrix::solve_one`]); this module's
//! only job is the geometry-to-columns reduction and reading the witness
//! back into a grid.

use crate::dlx::dlx::Matrix;
use crate::geometry::PieceSet;
use crate::grid::OccupancyGrid;

/// What a DLX row corresponds to, for translating a witness back to a grid.
///
/// Mirrors the spec's `lookup[row] = (i, r-1, c-1, w', h')`: piece index,
/// 0-based top/left anchor, and the oriented extents actually placed.
struct RowMeta {
    piece: usize,
    top: usize,
    left: usize,
    width: u32,
    height: u32,
}

/// `cellIndex(x, y) = x + (y - 1) * W`, both 1-based.
#[inline]
fn cell_col(x: u32, y: u32, w: u32) -> usize {
    (x + (y - 1) * w) as usize
}

/// `pieceCol(i) = H * W + i`, `i` 1-based.
#[inline]
fn piece_col(i: usize, h: u32, w: u32) -> usize {
    (h as usize) * (w as usize) + i
}

/// Builds the exact-cover matrix and its row lookup table for the given box
/// and piece list (input order, not sorted), with both orientations per
/// piece when `allow_rotation` is set and the piece is not square.
fn build(h: u32, w: u32, pieces: &PieceSet, allow_rotation: bool) -> (Matrix, Vec<RowMeta>) {
    let col_cnt = (h as usize) * (w as usize) + pieces.len();
    let mut matrix = Matrix::new(col_cnt);
    let mut lookup = Vec::new();

    for (idx, piece) in pieces.as_slice().iter().enumerate() {
        let piece_number = idx + 1; // 1-based, per cellIndex/pieceCol convention
        let mut orientations = vec![(piece.h, piece.w)];
        if allow_rotation && !piece.is_square() {
            orientations.push((piece.w, piece.h));
        }

        for (oh, ow) in orientations {
            if oh > h || ow > w {
                continue;
            }
            for r in 1..=(h - oh + 1) {
                for c in 1..=(w - ow + 1) {
                    let mut row = Vec::with_capacity((oh * ow) as usize + 1);
                    for y in r..=(r + oh - 1) {
                        for x in c..=(c + ow - 1) {
                            row.push(cell_col(x, y, w));
                        }
                    }
                    row.push(piece_col(piece_number, h, w));
                    matrix.add_row(&row);
                    lookup.push(RowMeta {
                        piece: idx,
                        top: (r - 1) as usize,
                        left: (c - 1) as usize,
                        width: ow,
                        height: oh,
                    });
                }
            }
        }
    }

    (matrix, lookup)
}

/// Runs the dancing-links search and returns a witness grid, if one exists.
///
/// The grid uses 1-based engine-local indices equal to the pieces' input
/// positions (`pieces` is not sorted for this engine, unlike backtracking).
pub fn solve(h: u32, w: u32, pieces: &PieceSet, allow_rotation: bool) -> Option<OccupancyGrid> {
    let (mut matrix, lookup) = build(h, w, pieces, allow_rotation);
    let rows = matrix.solve_one()?;

    let mut grid = OccupancyGrid::new(h as usize, w as usize);
    for row in rows {
        let meta = &lookup[row - 1];
        grid.paint_rect(meta.top, meta.left, meta.height as usize, meta.width as usize, meta.piece + 1);
    }
    Some(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Piece;

    #[test]
    fn solves_a_simple_two_piece_rectangle() {
        let pieces = PieceSet::new(vec![Piece::new(2, 2), Piece::new(2, 2)]);
        let grid = solve(2, 4, &pieces, false).expect("2x4 split into two 2x2 squares is feasible");
        assert_eq!(grid.count(1), 4);
        assert_eq!(grid.count(2), 4);
    }

    #[test]
    fn returns_none_when_infeasible() {
        let pieces = PieceSet::new(vec![Piece::new(1, 1), Piece::new(1, 1), Piece::new(1, 1)]);
        assert!(solve(2, 2, &pieces, false).is_none());
    }

    #[test]
    fn uses_rotation_when_a_piece_only_fits_rotated() {
        let pieces = PieceSet::new(vec![Piece::new(1, 3)]);
        assert!(solve(3, 1, &pieces, false).is_none());
        let grid = solve(3, 1, &pieces, true).expect("the rotated piece tiles a 3x1 column");
        assert_eq!(grid.count(1), 3);
    }

    #[test]
    fn spec_scenario_dancing_links_no_rotation() {
        let pieces = PieceSet::new(vec![
            Piece::new(4, 3),
            Piece::new(1, 7),
            Piece::new(3, 7),
            Piece::new(6, 2),
            Piece::new(6, 5),
            Piece::new(6, 3),
        ]);
        assert!(solve(10, 10, &pieces, false).is_some());
    }

    #[test]
    fn spec_scenario_dancing_links_with_rotation() {
        let pieces = PieceSet::new(vec![
            Piece::new(4, 3),
            Piece::new(7, 1),
            Piece::new(7, 3),
            Piece::new(6, 2),
            Piece::new(5, 6),
            Piece::new(6, 3),
        ]);
        assert!(solve(10, 10, &pieces, true).is_some());
    }
}
