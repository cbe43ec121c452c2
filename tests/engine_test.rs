//! Integration tests: the engine session and actor against a scripted
//! in-memory UCI engine.

mod common;

use chess_artist::engine::{EngineFamily, SearchLimit};
use chess_artist::ArtistError;
use chess_core::score::RawScore;
use common::{first_legal_move, FakeEngine};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|l| l.to_string()).collect()
}

#[tokio::test]
async fn test_search_reports_best_move_score_and_depth() {
    let engine = FakeEngine::first_legal("Stockfish 16", 35).handle().await;
    assert_eq!(engine.identity().family, EngineFamily::Stockfish);

    let reply = engine
        .search(START, SearchLimit::by_time(100), false)
        .await
        .unwrap();
    let expected = first_legal_move(START);
    assert_eq!(reply.best_move, expected);
    assert_eq!(reply.score, RawScore::Centipawns(35));
    assert_eq!(reply.depth, 2);
    assert_eq!(reply.pv, vec![expected]);
    assert!(reply.samples.is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn test_sampled_search_keeps_every_pv_update() {
    let engine = FakeEngine::first_legal("Fake", 0)
        .with_go(|_| {
            lines(&[
                "info depth 1 score cp 10 pv d2d4",
                "info depth 2 score cp 30 pv e2e4 e7e5",
                "info depth 3 score cp 80 lowerbound pv e2e4",
                "bestmove e2e4 ponder e7e5",
            ])
        })
        .handle()
        .await;

    let reply = engine
        .search(START, SearchLimit::by_depth(3), true)
        .await
        .unwrap();
    assert_eq!(reply.samples.len(), 2);
    assert_eq!(reply.samples[0].first_move, "d2d4");
    assert_eq!(reply.samples[1].first_move, "e2e4");
    assert_eq!(reply.score, RawScore::Centipawns(30));
    assert_eq!(reply.pv, vec!["e2e4", "e7e5"]);
}

#[tokio::test]
async fn test_pv_that_disagrees_with_bestmove_is_replaced() {
    let engine = FakeEngine::first_legal("Fake", 0)
        .with_go(|_| lines(&["info depth 5 score cp 10 pv d2d4 d7d5", "bestmove e2e4"]))
        .handle()
        .await;

    let reply = engine
        .search(START, SearchLimit::by_time(100), false)
        .await
        .unwrap();
    assert_eq!(reply.best_move, "e2e4");
    assert_eq!(reply.pv, vec!["e2e4"]);
}

#[tokio::test]
async fn test_mate_score_is_kept_raw() {
    let engine = FakeEngine::first_legal("Fake", 0)
        .with_go(|_| lines(&["info depth 9 score mate 3 pv e2e4", "bestmove e2e4"]))
        .handle()
        .await;

    let reply = engine
        .search(START, SearchLimit::by_time(100), false)
        .await
        .unwrap();
    assert_eq!(reply.score, RawScore::Mate(3));
    assert_eq!(reply.score.to_centipawns(), 31995);
}

#[tokio::test]
async fn test_static_eval_reads_table_and_total() {
    let engine = FakeEngine::first_legal("Stockfish 16", 0)
        .with_eval(|_| {
            lines(&[
                "       Term |    White    |    Black    |    Total",
                "     Passed |  3.01  3.87 |  0.08  0.39 |  2.92  3.48",
                "   Mobility |  0.40  0.60 |  0.10  0.20 |  0.30  0.40",
                "Final evaluation       +1.25 (white side)",
            ])
        })
        .handle()
        .await;

    let eval = engine.static_eval(START).await.unwrap();
    assert_eq!(eval.total, Some(1.25));
    assert_eq!(eval.terms.len(), 2);
    assert_eq!(eval.term("passed").map(|t| t.eg), Some(3.48));
}

#[tokio::test]
async fn test_static_eval_in_check_has_no_total() {
    let engine = FakeEngine::first_legal("Stockfish 16", 0)
        .with_eval(|_| lines(&["Final evaluation: none (in check)"]))
        .handle()
        .await;

    let eval = engine.static_eval(START).await.unwrap();
    assert_eq!(eval.total, None);
}

#[tokio::test]
async fn test_missing_score_keeps_a_responsive_engine() {
    let engine = FakeEngine::first_legal("Fake", 0)
        .with_go(|_| lines(&["bestmove e2e4"]))
        .handle()
        .await;

    let err = engine
        .search(START, SearchLimit::by_time(100), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ArtistError::EngineProtocol(_)));

    // the engine still answers isready, so the session is kept
    assert!(engine.new_game().await.is_ok());
}

#[tokio::test]
async fn test_engine_that_exits_is_discarded() {
    let engine = FakeEngine::first_legal("Fake", 0)
        .with_go(|_| lines(&["info depth 1 score cp 5 pv e2e4", "#exit"]))
        .handle()
        .await;

    let err = engine
        .search(START, SearchLimit::by_time(100), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ArtistError::EngineProtocol(_)));

    // without a spec the dead process is not replaced
    let err = engine.new_game().await.unwrap_err();
    assert!(matches!(err, ArtistError::EngineGone));
}

#[tokio::test]
async fn test_zero_limits_are_rejected_before_searching() {
    let engine = FakeEngine::first_legal("Fake", 0).handle().await;
    let err = engine
        .search(START, SearchLimit::time_and_depth(0, 0), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ArtistError::Config(_)));

    // the session is still usable
    assert!(engine.search(START, SearchLimit::by_depth(1), false).await.is_ok());
}
