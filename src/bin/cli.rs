//! UCI front end.
//!
//! One main thread reads stdin and mutates its own copy of the board between
//! searches; one long-lived worker thread owns the persistent `Engine` (its
//! transposition table and history/killer tables) and runs `go`. A `go` is
//! dispatched to the worker over a channel; `stop` flips an atomic flag the
//! worker's time manager polls every few thousand nodes. A `go` that arrives
//! while a previous one is still running is gated: the main thread issues an
//! implicit `stop` and waits for the worker to go idle first.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use madchess::board::{Board, Color, Piece};
use madchess::moves::execute::generate_legal;
use madchess::moves::magic::loader::load_magic_tables;
use madchess::moves::magic::MagicTables;
use madchess::moves::types::Move;
use madchess::search::engine::Engine;
use madchess::search::search::SearchLimits;
use madchess::search::strength::Strength;
use madchess::search::time::ClockInfo;

const DEFAULT_MAX_DEPTH: i32 = 64;

enum WorkerMsg {
    Go(Box<Board>, SearchLimits),
    NewGame,
    ResizeHash(usize),
    Quit,
}

fn run_worker(tables: Arc<MagicTables>, rx: mpsc::Receiver<WorkerMsg>, done_tx: mpsc::Sender<()>) {
    let mut engine = Engine::default();
    while let Ok(msg) = rx.recv() {
        match msg {
            WorkerMsg::Go(mut board, limits) => {
                let report = engine.go(&mut board, &tables, limits);
                match report.best_move {
                    Some(mv) => println!("bestmove {}", mv.to_uci()),
                    None => println!("bestmove 0000"),
                }
                let _ = done_tx.send(());
            }
            WorkerMsg::NewGame => {
                engine.new_game();
                let _ = done_tx.send(());
            }
            WorkerMsg::ResizeHash(mb) => {
                engine.resize_hash(mb);
                let _ = done_tx.send(());
            }
            WorkerMsg::Quit => {
                let _ = done_tx.send(());
                break;
            }
        }
    }
}

struct Uci {
    board: Board,
    tables: Arc<MagicTables>,
    tx: mpsc::Sender<WorkerMsg>,
    done_rx: mpsc::Receiver<()>,
    worker: Option<thread::JoinHandle<()>>,
    current_stop: Option<Arc<AtomicBool>>,
    busy: bool,
    hash_mb: usize,
    limit_strength: bool,
    elo: u16,
    go_count: u64,
}

impl Uci {
    fn new(tables: Arc<MagicTables>) -> Self {
        let (tx, rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let worker_tables = tables.clone();
        let worker = thread::spawn(move || run_worker(worker_tables, rx, done_tx));
        Self {
            board: Board::new(),
            tables,
            tx,
            done_rx,
            worker: Some(worker),
            current_stop: None,
            busy: false,
            hash_mb: 512,
            limit_strength: false,
            elo: 1350,
            go_count: 0,
        }
    }

    /// Gates on the worker going idle: used before anything that touches
    /// shared engine state (`ucinewgame`, hash resize) or before replacing
    /// an in-flight `go`.
    fn stop_and_wait(&mut self) {
        if !self.busy {
            return;
        }
        if let Some(flag) = &self.current_stop {
            flag.store(true, Ordering::Relaxed);
        }
        let _ = self.done_rx.recv();
        self.busy = false;
    }

    fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l.trim().to_string(),
                Err(_) => break,
            };
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "uci" => {
                    println!("id name MadChess");
                    println!("id author the MadChess team");
                    println!("option name Hash type spin default 512 min 1 max 8192");
                    println!("option name ClearHash type button");
                    println!("option name UCI_LimitStrength type check default false");
                    println!("option name UCI_Elo type spin default 1350 min 600 max 2400");
                    println!("uciok");
                }
                "isready" => println!("readyok"),
                "ucinewgame" => {
                    self.stop_and_wait();
                    self.board = Board::new();
                    let _ = self.tx.send(WorkerMsg::NewGame);
                    let _ = self.done_rx.recv();
                }
                "setoption" => self.handle_setoption(&parts),
                "position" => {
                    if let Some(new_board) = handle_position(&parts, &self.tables) {
                        self.board = new_board;
                    }
                }
                "go" => self.handle_go(&parts),
                "stop" => self.stop_and_wait(),
                "fen" => println!("{}", self.board.to_fen()),
                "d" | "display" => println!("{}", self.board),
                "test" | "bench" => run_epd_tests("../bench_arena/bk.epd", &self.tables),
                "quit" => {
                    self.stop_and_wait();
                    let _ = self.tx.send(WorkerMsg::Quit);
                    let _ = self.done_rx.recv();
                    break;
                }
                _ => {}
            }
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    fn handle_setoption(&mut self, parts: &[&str]) {
        let name_idx = match parts.iter().position(|&p| p == "name") {
            Some(i) => i + 1,
            None => return,
        };
        let value_idx = parts.iter().position(|&p| p == "value");
        let name_end = value_idx.unwrap_or(parts.len());
        if name_idx >= name_end {
            return;
        }
        let name = parts[name_idx..name_end].join(" ");

        match name.as_str() {
            "Hash" => {
                if let Some(vi) = value_idx
                    && let Some(mb) = parts.get(vi + 1).and_then(|s| s.parse::<usize>().ok())
                {
                    self.stop_and_wait();
                    self.hash_mb = mb;
                    let _ = self.tx.send(WorkerMsg::ResizeHash(mb));
                    let _ = self.done_rx.recv();
                }
            }
            "ClearHash" => {
                self.stop_and_wait();
                let mb = self.hash_mb;
                let _ = self.tx.send(WorkerMsg::ResizeHash(mb));
                let _ = self.done_rx.recv();
            }
            "UCI_LimitStrength" => {
                if let Some(vi) = value_idx {
                    self.limit_strength = parts.get(vi + 1) == Some(&"true");
                }
            }
            "UCI_Elo" => {
                if let Some(vi) = value_idx
                    && let Some(elo) = parts.get(vi + 1).and_then(|s| s.parse::<u16>().ok())
                {
                    self.elo = elo;
                }
            }
            _ => {}
        }
    }

    fn handle_go(&mut self, parts: &[&str]) {
        self.stop_and_wait();

        let mut limits = SearchLimits {
            max_depth: DEFAULT_MAX_DEPTH,
            ..Default::default()
        };

        let mut wtime: Option<u64> = None;
        let mut btime: Option<u64> = None;
        let mut winc: u64 = 0;
        let mut binc: u64 = 0;
        let mut movestogo: Option<u32> = None;

        let mut i = 1;
        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    if let Some(v) = parts.get(i + 1).and_then(|s| s.parse().ok()) {
                        limits.max_depth = v;
                    }
                    i += 2;
                }
                "movetime" => {
                    if let Some(v) = parts.get(i + 1).and_then(|s| s.parse().ok()) {
                        limits.movetime = Some(Duration::from_millis(v));
                    }
                    i += 2;
                }
                "nodes" => {
                    if let Some(v) = parts.get(i + 1).and_then(|s| s.parse().ok()) {
                        limits.max_nodes = Some(v);
                    }
                    i += 2;
                }
                "wtime" => {
                    wtime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "btime" => {
                    btime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "winc" => {
                    winc = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 2;
                }
                "binc" => {
                    binc = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 2;
                }
                "movestogo" => {
                    movestogo = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "infinite" => {
                    limits.infinite = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        if limits.movetime.is_none() && !limits.infinite {
            let (my_time, my_inc) = if self.board.side_to_move == Color::White {
                (wtime, winc)
            } else {
                (btime, binc)
            };
            if let Some(ms) = my_time {
                limits.clock = Some(ClockInfo {
                    time_remaining: Duration::from_millis(ms),
                    increment: Duration::from_millis(my_inc),
                    moves_to_time_control: movestogo,
                });
            }
        }

        if self.limit_strength {
            self.go_count += 1;
            limits.strength = Some(Strength::new(self.elo, self.go_count));
        }

        let stop_flag = Arc::new(AtomicBool::new(false));
        limits.stop_flag = stop_flag.clone();
        self.current_stop = Some(stop_flag);

        let _ = self.tx.send(WorkerMsg::Go(Box::new(self.board.clone()), limits));
        self.busy = true;
    }
}

fn main() {
    let magic_tables = Arc::new(load_magic_tables());
    let mut uci = Uci::new(magic_tables);
    uci.run();
}

fn handle_position(parts: &[&str], tables: &MagicTables) -> Option<Board> {
    let mut board = if parts.len() > 1 && parts[1] == "startpos" {
        Board::new()
    } else if parts.len() > 1 && parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &part) in parts.iter().enumerate().skip(fen_start) {
            if part == "moves" {
                fen_end = i;
                break;
            }
        }
        let fen_string = parts[fen_start..fen_end].join(" ");
        Board::from_str(&fen_string).ok()?
    } else {
        Board::new()
    };

    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for move_str in &parts[moves_idx + 1..] {
            if let Some(mv) = parse_uci_move(&board, move_str, tables) {
                madchess::moves::execute::make_move_basic(&mut board, mv);
            } else {
                eprintln!("Invalid move: {}", move_str);
                return None;
            }
        }
    }

    Some(board)
}

fn parse_uci_move(board: &Board, move_str: &str, tables: &MagicTables) -> Option<Move> {
    if move_str.len() < 4 {
        return None;
    }
    let chars: Vec<char> = move_str.chars().collect();

    let from_file = (chars[0] as u8).wrapping_sub(b'a');
    let from_rank = (chars[1] as u8).wrapping_sub(b'1');
    let to_file = (chars[2] as u8).wrapping_sub(b'a');
    let to_rank = (chars[3] as u8).wrapping_sub(b'1');
    if from_file > 7 || from_rank > 7 || to_file > 7 || to_rank > 7 {
        return None;
    }

    let from_square = (from_rank * 8 + from_file) as usize;
    let to_square = (to_rank * 8 + to_file) as usize;

    let promo_piece = if move_str.len() >= 5 {
        match chars[4] {
            'q' => Some(Piece::Queen),
            'r' => Some(Piece::Rook),
            'b' => Some(Piece::Bishop),
            'n' => Some(Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    let mut board_copy = board.clone();
    generate_legal(&mut board_copy, tables, &mut moves, &mut scratch);

    for mv in moves {
        if (mv.from.index() as usize) == from_square && (mv.to.index() as usize) == to_square {
            if promo_piece.is_some() {
                if mv.promotion == promo_piece {
                    return Some(mv);
                }
            } else if mv.promotion.is_none() {
                return Some(mv);
            }
        }
    }
    None
}

// --- EPD Test Runner ---
fn run_epd_tests(path: &str, tables: &MagicTables) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => match File::open(format!("bench_arena/{}", path.split('/').last().unwrap())) {
            Ok(f) => f,
            Err(_) => {
                println!("Error: Could not find EPD file at '{}' or local.", path);
                return;
            }
        },
    };

    println!("Running Tactical Tests from {} (1s per position)...", path);
    println!("----------------------------------------------------");

    let reader = BufReader::new(file);
    let mut solved = 0;
    let mut total = 0;

    for (line_idx, line_res) in reader.lines().enumerate() {
        let line = line_res.unwrap_or_default();
        if line.trim().is_empty() {
            continue;
        }

        if let Some(bm_idx) = line.find(" bm ") {
            let fen = &line[..bm_idx].trim();
            let rest = &line[bm_idx + 4..];
            let move_end = rest.find(';').unwrap_or(rest.len());
            let san_move = rest[..move_end].trim();

            let mut board = match Board::from_str(fen) {
                Ok(b) => b,
                Err(_) => {
                    println!("Error parsing FEN on line {}", line_idx + 1);
                    continue;
                }
            };

            let expected_uci = san_to_uci(&mut board, san_move, tables);

            let limits = SearchLimits {
                max_depth: DEFAULT_MAX_DEPTH,
                movetime: Some(Duration::from_millis(1000)),
                ..Default::default()
            };
            let mut engine = Engine::default();
            let report = engine.go(&mut board, tables, limits);

            let result_str = match report.best_move {
                Some(m) => m.to_uci(),
                None => "none".to_string(),
            };

            let passed = if let Some(ref exp) = expected_uci {
                *exp == result_str
            } else {
                false
            };

            if passed {
                solved += 1;
            }
            total += 1;

            println!("Test #{}: {}", total, if passed { "PASS" } else { "FAIL" });
            if !passed {
                println!(
                    "   Expected: {} | Got: {}",
                    expected_uci.unwrap_or(san_move.to_string()),
                    result_str
                );
            }
        }
    }

    println!("----------------------------------------------------");
    println!("Result: {}/{} Solved", solved, total);
}

// --- Helper: Convert SAN to UCI ---
fn san_to_uci(board: &mut Board, san: &str, tables: &MagicTables) -> Option<String> {
    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);

    let clean_san = san.replace("+", "").replace("#", "").replace("x", "");

    if clean_san == "O-O" {
        return moves
            .iter()
            .find(|m| {
                let from = m.from.index() as i8;
                let to = m.to.index() as i8;
                (to - from).abs() == 2 && to > from
            })
            .map(|m| m.to_uci());
    }
    if clean_san == "O-O-O" {
        return moves
            .iter()
            .find(|m| {
                let from = m.from.index() as i8;
                let to = m.to.index() as i8;
                (to - from).abs() == 2 && to < from
            })
            .map(|m| m.to_uci());
    }

    if clean_san.len() < 2 {
        return None;
    }
    let target_str = &clean_san[clean_san.len() - 2..];

    let file = (target_str.chars().nth(0)? as u8).wrapping_sub(b'a');
    let rank = (target_str.chars().nth(1)? as u8).wrapping_sub(b'1');
    if file > 7 || rank > 7 {
        return None;
    }
    let target_sq = (rank * 8 + file) as usize;

    let first_char = clean_san.chars().next()?;
    let piece_type = match first_char {
        'N' => Piece::Knight,
        'B' => Piece::Bishop,
        'R' => Piece::Rook,
        'Q' => Piece::Queen,
        'K' => Piece::King,
        _ => Piece::Pawn,
    };

    let disambig_char = if piece_type == Piece::Pawn {
        if clean_san.len() > 2 && first_char.is_lowercase() {
            Some(first_char)
        } else {
            None
        }
    } else {
        let content = &clean_san[1..clean_san.len() - 2];
        if !content.is_empty() {
            content.chars().next()
        } else {
            None
        }
    };

    let candidates: Vec<&Move> = moves
        .iter()
        .filter(|m| {
            if (m.to.index() as usize) != target_sq {
                return false;
            }
            if let Some((_, p)) = board.piece_at(m.from) {
                if p != piece_type {
                    return false;
                }
            } else {
                return false;
            }
            if let Some(d) = disambig_char {
                let from_sq = m.from.index();
                let from_file = from_sq % 8;
                let from_rank = from_sq / 8;
                if d >= 'a' && d <= 'h' {
                    if from_file != (d as u8 - b'a') {
                        return false;
                    }
                } else if d >= '1' && d <= '8' && from_rank != (d as u8 - b'1') {
                    return false;
                }
            }
            true
        })
        .collect();

    candidates.first().map(|m| m.to_uci())
}
