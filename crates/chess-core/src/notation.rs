//! FEN, SAN and UCI conversions on top of shakmaty.

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};

use crate::error::CoreError;

pub fn parse_fen(fen: &str, mode: CastlingMode) -> Result<Chess, CoreError> {
    let parsed: Fen = fen.parse().map_err(|e| CoreError::InvalidFen {
        fen: fen.to_string(),
        reason: format!("{e}"),
    })?;
    parsed
        .into_position::<Chess>(mode)
        .map_err(|e| CoreError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })
}

pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Piece placement, side, castling and en passant fields only.
pub fn epd_of(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// The position after passing the turn, en passant rights dropped. Fails
/// when the side to move is in check, since passing would leave its king
/// capturable.
pub fn null_move(pos: &Chess) -> Result<Chess, CoreError> {
    pos.clone().swap_turn().map_err(|e| CoreError::InvalidFen {
        fen: fen_of(pos),
        reason: format!("cannot pass the turn: {e}"),
    })
}

/// SAN of `mv` in `pos` with the `+` / `#` suffix.
pub fn san_with_suffix(pos: &Chess, mv: &Move) -> String {
    SanPlus::from_move(pos.clone(), *mv).to_string()
}

pub fn uci_to_move(pos: &Chess, uci: &str) -> Result<Move, CoreError> {
    let illegal = || CoreError::IllegalMove {
        mv: uci.to_string(),
        fen: fen_of(pos),
    };
    let parsed: UciMove = uci.parse().map_err(|_| illegal())?;
    parsed.to_move(pos).map_err(|_| illegal())
}

pub fn uci_to_san(pos: &Chess, uci: &str) -> Result<String, CoreError> {
    let mv = uci_to_move(pos, uci)?;
    Ok(san_with_suffix(pos, &mv))
}

pub fn san_to_move(pos: &Chess, san: &str) -> Result<Move, CoreError> {
    let illegal = || CoreError::IllegalMove {
        mv: san.to_string(),
        fen: fen_of(pos),
    };
    let parsed: San = san.parse().map_err(|_| illegal())?;
    parsed.to_move(pos).map_err(|_| illegal())
}

pub fn to_uci(mv: &Move, mode: CastlingMode) -> String {
    mv.to_uci(mode).to_string()
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

pub fn serialize_color<S: serde::Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(color_name(*color))
}

/// Render a UCI move list as numbered SAN, e.g. `12... Nc6 13. d4 exd4`.
pub fn uci_line_to_san(pos: &Chess, line: &[String]) -> Result<String, CoreError> {
    let mut pos = pos.clone();
    let mut out = String::new();

    for (i, uci) in line.iter().enumerate() {
        let mv = uci_to_move(&pos, uci)?;
        let number = pos.fullmoves().get();
        if !out.is_empty() {
            out.push(' ');
        }
        match pos.turn() {
            Color::White => out.push_str(&format!("{number}. ")),
            Color::Black if i == 0 => out.push_str(&format!("{number}... ")),
            Color::Black => {}
        }
        out.push_str(&san_with_suffix(&pos, &mv));
        pos.play_unchecked(mv);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn start() -> Chess {
        parse_fen(START, CastlingMode::Standard).unwrap()
    }

    #[test]
    fn test_fen_round_trip() {
        assert_eq!(fen_of(&start()), START);
        assert!(parse_fen("not a fen", CastlingMode::Standard).is_err());
    }

    #[test]
    fn test_null_move_passes_the_turn() {
        let after_e4 = parse_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            CastlingMode::Standard,
        )
        .unwrap();
        let passed = null_move(&after_e4).unwrap();
        assert_eq!(passed.turn(), Color::White);
        assert_eq!(
            epd_of(&fen_of(&passed)),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -"
        );
        assert_eq!(passed.board(), after_e4.board());
    }

    #[test]
    fn test_null_move_in_check_is_rejected() {
        let mated = parse_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            CastlingMode::Standard,
        )
        .unwrap();
        assert!(matches!(null_move(&mated), Err(CoreError::InvalidFen { .. })));
    }

    #[test]
    fn test_bad_side_field_is_rejected() {
        assert!(parse_fen("8/8/8/8/8/8/8/K6k x - - 0 1", CastlingMode::Standard).is_err());
    }

    #[test]
    fn test_uci_to_san_with_suffix() {
        let pos = parse_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2",
            CastlingMode::Standard,
        )
        .unwrap();
        assert_eq!(uci_to_san(&pos, "d8h4").unwrap(), "Qh4#");
        assert_eq!(uci_to_san(&start(), "g1f3").unwrap(), "Nf3");
        assert!(uci_to_san(&start(), "e2e5").is_err());
    }

    #[test]
    fn test_numbered_line_from_white() {
        let line: Vec<String> = ["e2e4", "e7e5", "g1f3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(uci_line_to_san(&start(), &line).unwrap(), "1. e4 e5 2. Nf3");
    }

    #[test]
    fn test_numbered_line_from_black() {
        let pos = parse_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            CastlingMode::Standard,
        )
        .unwrap();
        let line: Vec<String> = ["c7c5", "g1f3", "d7d6"].iter().map(|s| s.to_string()).collect();
        assert_eq!(uci_line_to_san(&pos, &line).unwrap(), "1... c5 2. Nf3 d6");
    }

    #[test]
    fn test_epd_of() {
        assert_eq!(
            epd_of(START),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }
}
