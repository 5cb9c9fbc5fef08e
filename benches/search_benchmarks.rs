//! Benchmarks for move generation, evaluation, and search throughput.

use std::sync::atomic::AtomicBool;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mailfist::eval::evaluate;
use mailfist::movegen::{self, GenMode};
use mailfist::moves::MoveList;
use mailfist::position::Position;
use mailfist::search::{Limits, SearchTables};
use mailfist::tt::TranspositionTable;
use mailfist::Searcher;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let mut startpos = Position::new();
    group.bench_function("startpos", |b| {
        b.iter(|| {
            let mut moves = MoveList::new();
            movegen::generate(&mut startpos, GenMode::All, &mut moves);
            black_box(moves.len())
        })
    });

    let mut kiwipete = Position::from_fen(KIWIPETE).unwrap();
    group.bench_function("kiwipete", |b| {
        b.iter(|| {
            let mut moves = MoveList::new();
            movegen::generate(&mut kiwipete, GenMode::All, &mut moves);
            black_box(moves.len())
        })
    });

    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");

    let positions = [
        ("startpos", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
        ("middlegame", "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4"),
        ("endgame", "8/5k2/8/8/8/8/5K2/4R3 w - - 0 1"),
    ];

    for (name, fen) in positions {
        let pos = Position::from_fen(fen).unwrap();
        group.bench_with_input(BenchmarkId::new("position", name), &pos, |b, pos| {
            b.iter(|| black_box(evaluate(pos)))
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let stop = AtomicBool::new(false);

    for depth in [3, 4, 5] {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut pos = Position::new();
                let mut tables = SearchTables::new(TranspositionTable::new(16));
                let limits = Limits { max_depth: depth, move_time_ms: None };
                let mut searcher = Searcher::new(&mut pos, &mut tables, limits, &stop);
                black_box(searcher.run(|_| {}))
            })
        });
    }

    for depth in [3, 4] {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut pos = Position::from_fen(KIWIPETE).unwrap();
                let mut tables = SearchTables::new(TranspositionTable::new(16));
                let limits = Limits { max_depth: depth, move_time_ms: None };
                let mut searcher = Searcher::new(&mut pos, &mut tables, limits, &stop);
                black_box(searcher.run(|_| {}))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_movegen, bench_eval, bench_search);
criterion_main!(benches);
