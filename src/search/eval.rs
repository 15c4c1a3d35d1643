//! Static position evaluation.
//!
//! The search only depends on the `Evaluator` trait below: a pluggable
//! scorer that returns a centipawn score from the side-to-move's
//! perspective plus a "this looks drawn" flag. Swapping in a fancier
//! model — piece-square tables, mobility, king safety, whatever a tuner
//! eventually produces — is a matter of handing the search a different
//! `Evaluator`; `alpha_beta`/`quiescence` never need to change.
//!
//! `MaterialEvaluator` below is the only implementation shipped here: a
//! deliberately simple, untuned material counter. It exists so the search
//! has something to call, not as a finished playing strength.

use crate::board::{Board, Color, Piece};
use crate::moves::magic::MagicTables;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// A pluggable position scorer.
///
/// `evaluate` returns `(score, drawn_endgame)` from `board.side_to_move`'s
/// perspective. `alpha`/`beta` are advisory — an implementation may use
/// them to skip expensive terms once the result obviously falls outside
/// the window, but must not return something outside what an unbounded
/// evaluation would have produced.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, board: &Board, tables: &MagicTables, alpha: i32, beta: i32) -> (i32, bool);
}

/// Centipawn piece values. Not tuned against anything; a real `Evaluator`
/// is meant to replace both this struct and `MaterialEvaluator` wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub pawn: i32,
    pub knight: i32,
    pub bishop: i32,
    pub rook: i32,
    pub queen: i32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            pawn: 100,
            knight: 320,
            bishop: 330,
            rook: 500,
            queen: 900,
        }
    }
}

impl Weights {
    fn value(&self, piece: Piece) -> i32 {
        match piece {
            Piece::Pawn => self.pawn,
            Piece::Knight => self.knight,
            Piece::Bishop => self.bishop,
            Piece::Rook => self.rook,
            Piece::Queen => self.queen,
            Piece::King => 0,
        }
    }
}

const MATERIAL_PIECES: [Piece; 5] = [
    Piece::Pawn,
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
];

/// White-minus-black material balance, ignoring side to move.
fn material_balance(board: &Board, weights: &Weights) -> i32 {
    let mut score = 0;
    for piece in MATERIAL_PIECES {
        let value = weights.value(piece);
        let white = board.pieces(piece, Color::White).count_ones() as i32;
        let black = board.pieces(piece, Color::Black).count_ones() as i32;
        score += value * (white - black);
    }
    score
}

/// True once neither side has enough material left to force mate: bare
/// kings, or king plus a single minor piece per side.
fn is_insufficient_material(board: &Board) -> bool {
    let has_major_or_pawn = [Piece::Pawn, Piece::Rook, Piece::Queen]
        .iter()
        .any(|&p| board.pieces(p, Color::White) | board.pieces(p, Color::Black) != 0);
    if has_major_or_pawn {
        return false;
    }

    let minors = board.pieces(Piece::Knight, Color::White).count_ones()
        + board.pieces(Piece::Bishop, Color::White).count_ones()
        + board.pieces(Piece::Knight, Color::Black).count_ones()
        + board.pieces(Piece::Bishop, Color::Black).count_ones();

    minors <= 1
}

/// Material-only `Evaluator`. Reports a drawn endgame once
/// [`is_insufficient_material`] holds for both sides.
#[derive(Debug, Clone, Default)]
pub struct MaterialEvaluator {
    weights: Weights,
}

impl MaterialEvaluator {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    /// Loads weights from a JSON object, e.g. `{"pawn":100,"knight":320,
    /// "bishop":330,"rook":500,"queen":900}` — the "configured out-of-band"
    /// path for an `Evaluator`'s tunable parameters.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, board: &Board, _tables: &MagicTables, _alpha: i32, _beta: i32) -> (i32, bool) {
        if is_insufficient_material(board) {
            return (0, true);
        }

        let color_multiplier = if board.side_to_move == Color::White { 1 } else { -1 };
        (material_balance(board, &self.weights) * color_multiplier, false)
    }
}

static DEFAULT_EVALUATOR: OnceCell<MaterialEvaluator> = OnceCell::new();

fn default_evaluator() -> &'static MaterialEvaluator {
    DEFAULT_EVALUATOR.get_or_init(MaterialEvaluator::default)
}

/// Evaluates `board` through the process-wide default `Evaluator`. This is
/// what `alpha_beta`/`quiescence` call; it does not itself know or care
/// which `Evaluator` implementation is behind it.
pub fn static_eval(board: &Board, tables: &MagicTables, alpha: i32, beta: i32) -> i32 {
    default_evaluator().evaluate(board, tables, alpha, beta).0
}

/// White-minus-black material balance with the default weights, independent
/// of side to move. Used by diagnostics and the `eval` debug command.
pub fn eval_material(board: &Board) -> i32 {
    material_balance(board, &Weights::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::magic::loader::load_magic_tables;
    use std::str::FromStr;

    #[test]
    fn material_is_symmetric_under_color_swap() {
        let white_up = Board::from_str("rnbqkbnr/1ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .unwrap();
        let black_up = Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/1PPPPPPP/RNBQKBNR b KQkq - 0 1")
            .unwrap();

        assert_eq!(eval_material(&white_up), -eval_material(&black_up));
    }

    #[test]
    fn static_eval_flips_sign_with_side_to_move() {
        let tables = load_magic_tables();
        let board = Board::from_str("rnbqkbnr/1ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .unwrap();
        let mut flipped = board.clone();
        flipped.side_to_move = Color::Black;

        let white_to_move = static_eval(&board, &tables, -32000, 32000);
        let black_to_move = static_eval(&flipped, &tables, -32000, 32000);
        assert_eq!(white_to_move, -black_to_move);
    }

    #[test]
    fn lone_kings_are_a_drawn_endgame() {
        let tables = load_magic_tables();
        let board = Board::from_str("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let evaluator = MaterialEvaluator::default();
        assert_eq!(evaluator.evaluate(&board, &tables, -32000, 32000), (0, true));
    }

    #[test]
    fn king_and_minor_each_is_still_drawn() {
        let tables = load_magic_tables();
        let board = Board::from_str("4kb2/8/8/8/8/8/8/4KN2 w - - 0 1").unwrap();
        let evaluator = MaterialEvaluator::default();
        assert_eq!(evaluator.evaluate(&board, &tables, -32000, 32000).1, true);
    }

    #[test]
    fn a_single_extra_pawn_breaks_the_draw_flag() {
        let tables = load_magic_tables();
        let board = Board::from_str("4k3/8/8/8/8/8/P7/4K3 w - - 0 1").unwrap();
        let evaluator = MaterialEvaluator::default();
        assert_eq!(evaluator.evaluate(&board, &tables, -32000, 32000).1, false);
    }

    #[test]
    fn custom_weights_from_json_are_honored() {
        let evaluator =
            MaterialEvaluator::from_json(r#"{"pawn":1,"knight":1,"bishop":1,"rook":1,"queen":1}"#)
                .expect("valid weights JSON");
        let tables = load_magic_tables();
        let board = Board::from_str("7k/8/8/8/8/8/8/RNBQK3 w - - 0 1").unwrap();
        // 1 rook + 1 knight + 1 bishop + 1 queen, each worth 1, White to move.
        assert_eq!(evaluator.evaluate(&board, &tables, -32000, 32000).0, 4);
    }
}
