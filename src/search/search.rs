use crate::board::Board;
use crate::moves::execute::{generate_legal, make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::eval::static_eval;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::strength::Strength;
use crate::search::time::{ClockInfo, TimeManager};
use crate::search::tt::{ScorePrecision, TTMove, TranspositionTable};
use arrayvec::ArrayVec;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1000; // 30000 - buffer for mate distance
const MAX_Q_SEARCH_DEPTH: usize = 100;
const DRAW_SCORE: i32 = 0;

// --- Tuning Constants ---

// Reverse Futility Pruning (RFP)
const RFP_DEPTH_LIMIT: i32 = 9;
const RFP_MARGIN_BASE: i32 = 80;
const RFP_MARGIN_MULT: i32 = 90;

// Futility Pruning (FP)
const FP_DEPTH_LIMIT: i32 = 7;
const FP_MARGIN_BASE: i32 = 100;
const FP_MARGIN_MULT: i32 = 100;
const FP_HISTORY_THRESHOLD: i32 = 512;

// Late Move Pruning (LMP)
const LMP_DEPTH_LIMIT: i32 = 14;
const LMP_BASE_MOVES: i32 = 3;
const LMP_MOVE_MULTIPLIER: i32 = 6;

// Late Move Reduction (LMR)
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: i32 = 4;

// Internal Iterative Deepening (IID)
const IID_REDUCTION: i32 = 2;

// Singular extensions
const SINGULAR_MIN_DEPTH: i32 = 7;
const SINGULAR_TT_DEPTH_SLACK: i32 = 3;
const SINGULAR_MARGIN_PER_DEPTH: i32 = 2;

/// Fixed and clock-derived inputs to a single `go` command.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub max_depth: i32,
    pub movetime: Option<Duration>,
    pub clock: Option<ClockInfo>,
    pub infinite: bool,
    pub max_nodes: Option<u64>,
    /// Flipped by a UCI `stop` command arriving on another thread.
    pub stop_flag: Arc<AtomicBool>,
    /// Set when `UCI_LimitStrength` is enabled, throttling search speed and
    /// occasionally substituting a weaker root move.
    pub strength: Option<Strength>,
}

impl SearchLimits {
    fn time_manager(&self, material_count: u32) -> TimeManager {
        let tm = if self.infinite {
            TimeManager::unbounded()
        } else if self.movetime.is_some() {
            TimeManager::fixed(self.movetime)
        } else if let Some(clock) = self.clock {
            TimeManager::from_clock(clock, material_count)
        } else {
            TimeManager::unbounded()
        };
        tm.with_stop_flag(self.stop_flag.clone())
    }
}

/// What a completed (or interrupted) search produced.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub score: i32,
    pub best_move: Option<Move>,
    pub depth_reached: i32,
    pub nodes: u64,
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // SAFETY BRAKE: Prevent Q-search explosions
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        return beta;
    }
    if stand_pat >= alpha {
        alpha = stand_pat;
    }

    // Use MovePicker in captures-only mode for quiescence
    let empty_killers = [None, None];
    let empty_history = [[0i32; 64]; 64];
    let mut picker = MovePicker::new(None, empty_killers, true);

    while let Some(mv) = picker.next(board, tables, &empty_history) {
        *nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return stand_pat;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        // Delta pruning: skip standard captures that can't possibly raise alpha.
        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // SEE pruning for captures the picker's good/bad split didn't already filter
        // (promotions and en passant bypass SEE classification there).
        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
    excluded: Option<Move>,
) -> (i32, Option<Move>) {
    if *nodes & 63 == 0 {
        time.check_time();
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;

    if ply > 0 && board.is_repetition() {
        return (DRAW_SCORE, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let hash = board.zobrist;
    let mut hash_move = None;
    let mut tt_entry: Option<(u8, i32, ScorePrecision)> = None;

    if let Some(probe) = tt.probe(hash, ply as i32) {
        if let Some(tm) = probe.best_move.and_then(|tm| tm.to_move(board)) {
            hash_move = Some(tm);
        }
        tt_entry = Some((probe.to_horizon, probe.score, probe.precision));

        if probe.to_horizon >= depth as u8 {
            let tt_score = probe.score;

            if ply > 0 {
                match probe.precision {
                    ScorePrecision::Exact => return (tt_score, hash_move),
                    ScorePrecision::LowerBound if tt_score >= beta => return (tt_score, hash_move),
                    ScorePrecision::UpperBound if tt_score <= alpha => return (tt_score, hash_move),
                    _ => {}
                }
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // Check extension: resolves forced sequences and avoids the horizon effect.
    let extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    let static_eval_val = if !in_check_now {
        static_eval(board, tables, alpha, beta)
    } else {
        0
    };

    // Reverse futility pruning
    if depth < RFP_DEPTH_LIMIT && !in_check_now && ply > 0 {
        let margin = RFP_MARGIN_BASE + RFP_MARGIN_MULT * depth;
        if static_eval_val - margin >= beta {
            return (beta, None);
        }
    }

    // Null move pruning
    if depth >= 4
        && !in_check_now
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    {
        let r = if depth > 6 { 3 } else { 2 };

        let undo = make_null_move(board);

        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
            None,
        );
        let score = -val;
        undo_null_move(board, undo);

        if score >= beta && !time.stop_signal {
            if score >= MATE_THRESHOLD {
                // Don't trust null move mates, search normally
            } else {
                return (beta, None);
            }
        }
    }

    // Internal iterative deepening: no hash move and an open (PV) window at
    // real depth means ordering has nothing to start from. A shallow search
    // just to populate the cache is cheaper than searching this node unordered.
    if hash_move.is_none() && beta - alpha > 1 && depth > IID_REDUCTION {
        let (_, iid_move) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - IID_REDUCTION,
            ply,
            alpha,
            beta,
            nodes,
            time,
            None,
        );
        hash_move = iid_move;
    }

    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply], false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;
    let mut quiets_tried: ArrayVec<Move, 256> = ArrayVec::new();

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        if Some(mv) == excluded {
            continue;
        }

        if !mv.is_capture() {
            quiets_tried.push(mv);
        }

        // Futility pruning
        if depth < FP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && move_count > 0
        {
            let margin = FP_MARGIN_BASE + FP_MARGIN_MULT * depth;
            let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];

            if history < FP_HISTORY_THRESHOLD && static_eval_val + margin <= alpha {
                continue;
            }
        }

        // Late move pruning
        if depth < LMP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && alpha == original_alpha
        {
            let lmp_threshold = LMP_BASE_MOVES + LMP_MOVE_MULTIPLIER * depth;
            if move_count > lmp_threshold as usize {
                break;
            }
        }

        // Singular extension: the hash move is the only reason to search
        // this deep if every sibling, searched just beneath its cached
        // score, fails to come close. Verified with a same-depth,
        // same-ply, zero-window search that excludes this move.
        let mut move_extension = extension;
        if move_count == 0
            && depth >= SINGULAR_MIN_DEPTH
            && hash_move == Some(mv)
            && let Some((tt_depth, tt_score, ScorePrecision::LowerBound)) = tt_entry
            && tt_depth as i32 >= depth - SINGULAR_TT_DEPTH_SLACK
        {
            let singular_beta = tt_score - SINGULAR_MARGIN_PER_DEPTH * depth;
            let (singular_score, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                (depth - 1) / 2,
                ply,
                singular_beta - 1,
                singular_beta,
                nodes,
                time,
                Some(mv),
            );
            if singular_score < singular_beta {
                move_extension += 1;
            }
        }

        let undo = make_move_basic(board, mv);
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + move_extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
                None,
            );
            score = -val;
        } else {
            // Late move reduction
            let mut r = 0;
            if depth > LMR_MIN_DEPTH
                && move_count > LMR_MIN_MOVES as usize
                && !mv.is_capture()
                && !mv.is_promotion()
                && !in_check_now
            {
                r = 1 + (depth / 8) + (move_count as i32 / 20);

                let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];
                if history > FP_HISTORY_THRESHOLD {
                    r -= 1;
                }

                if beta - alpha > 1 {
                    r -= 1;
                }

                if r < 0 {
                    r = 0;
                }
                if r > depth - 2 {
                    r = depth - 2;
                }
            }

            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 - r,
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
                None,
            );
            score = -val;

            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                    None,
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + move_extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                    None,
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                tt.save(
                    hash,
                    Some(tt_move_of(mv)),
                    beta,
                    depth as u8,
                    ScorePrecision::LowerBound,
                    ply as i32,
                );

                if !mv.is_capture() {
                    ctx.update_killer(ply, mv);
                    ctx.update_history(mv, depth, &quiets_tried);
                }

                return (beta, Some(mv));
            }
        }
    }

    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let precision = if best_score >= beta {
        ScorePrecision::LowerBound
    } else if best_score > original_alpha {
        ScorePrecision::Exact
    } else {
        ScorePrecision::UpperBound
    };

    tt.save(
        hash,
        best_move.map(tt_move_of),
        best_score,
        depth as u8,
        precision,
        ply as i32,
    );

    (best_score, best_move)
}

fn tt_move_of(mv: Move) -> TTMove {
    TTMove {
        from: mv.from,
        to: mv.to,
        promotion: mv.promotion,
    }
}

/// Iterative-deepening driver: repeatedly calls `alpha_beta` at increasing
/// depth with aspiration windows, stopping on the time manager's signal or a
/// found mate, and reusing `tt`/`ctx` across the whole call so callers can
/// keep them alive between `go` commands (see `Engine`).
pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    limits: SearchLimits,
    tt: &mut TranspositionTable,
    ctx: &mut SearchContext,
) -> SearchReport {
    let material_count = board.occupied().count_ones();
    let mut time = limits.time_manager(material_count);

    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0u64;
    let mut last_iter_duration = Duration::from_millis(0);
    let mut depth_reached = 0;

    for depth in 1..=limits.max_depth.max(1) {
        if depth > 1 && time.should_stop_before_depth() {
            break;
        }

        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;

            if total_elapsed + predicted_next > limit {
                break;
            }
        }

        let iter_start = time.elapsed();

        for row in ctx.history.iter_mut() {
            for entry in row.iter_mut() {
                *entry /= 8;
            }
        }

        let mut alpha = -INF;
        let mut beta = INF;
        let window = 50;

        if depth > 4 {
            alpha = last_completed_best_score - window;
            beta = last_completed_best_score + window;
        }

        let mut score;
        let mut mv;

        loop {
            let result = alpha_beta(
                board, tables, ctx, tt, depth, 0, alpha, beta, &mut nodes, &mut time, None,
            );

            score = result.0;
            mv = result.1;

            if time.stop_signal {
                break;
            }

            if score <= alpha {
                alpha = -INF;
                continue;
            }

            if score >= beta {
                beta = INF;
                continue;
            }

            break;
        }

        last_iter_duration = time.elapsed().saturating_sub(iter_start);

        if time.stop_signal {
            break;
        }

        time.extend_soft_on_score_drop(last_completed_best_score, score);

        last_completed_best_score = score;
        last_completed_best_move = mv;
        depth_reached = depth;

        if let Some(valid_mv) = last_completed_best_move {
            let score_str = if last_completed_best_score.abs() >= MATE_THRESHOLD {
                let moves = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
                if last_completed_best_score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", last_completed_best_score)
            };

            let elapsed_ms = time.elapsed().as_millis().max(1);
            let nps = (nodes as u128 * 1000) / elapsed_ms;

            println!(
                "info depth {} score {} nodes {} nps {} time {} hashfull {} pv {}",
                depth,
                score_str,
                nodes,
                nps,
                elapsed_ms,
                tt.hashfull(),
                valid_mv.to_uci()
            );
        }

        if let Some(strength) = limits.strength {
            let budget = strength.nodes_per_second();
            if budget > 0 {
                let target = Duration::from_secs_f64(nodes as f64 / budget as f64);
                let actual = time.elapsed();
                if target > actual {
                    std::thread::sleep(target - actual);
                }
            }
        }

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    let mut report = SearchReport {
        score: last_completed_best_score,
        best_move: last_completed_best_move,
        depth_reached,
        nodes,
    };

    if let Some(strength) = limits.strength
        && let Some((weaker_move, weaker_score)) =
            limited_strength_move(board, tables, tt, ctx, &mut time, &report, strength)
    {
        report.best_move = Some(weaker_move);
        report.score = weaker_score;
    }

    report
}

/// Re-scores every legal root move with a shallow search and asks `strength`
/// to pick one, possibly a weaker alternative to the engine's true best move.
/// Returns `None` when there is nothing to substitute (no best move, or only
/// one legal reply).
fn limited_strength_move(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    ctx: &mut SearchContext,
    time: &mut TimeManager,
    report: &SearchReport,
    strength: Strength,
) -> Option<(Move, i32)> {
    let best_move = report.best_move?;

    let mut legal_moves = Vec::new();
    let mut scratch = Vec::new();
    generate_legal(board, tables, &mut legal_moves, &mut scratch);
    if legal_moves.len() <= 1 {
        return None;
    }

    let probe_depth = report.depth_reached.clamp(1, 4);
    let mut nodes = 0u64;
    let mut scored: Vec<(Move, i32)> = Vec::with_capacity(legal_moves.len());
    for mv in legal_moves {
        let score = if mv == best_move {
            report.score
        } else {
            let undo = make_move_basic(board, mv);
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                probe_depth - 1,
                1,
                -INF,
                INF,
                &mut nodes,
                time,
                None,
            );
            undo_move_basic(board, undo);
            -val
        };
        scored.push((mv, score));
    }
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mv = strength.choose_move(&scored)?;
    let score = scored
        .iter()
        .find(|(m, _)| *m == mv)
        .map(|(_, s)| *s)
        .unwrap_or(report.score);
    Some((mv, score))
}
