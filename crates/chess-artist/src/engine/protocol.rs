//! Tokenizer for engine output lines.
//!
//! Every line the engine prints is turned into one [`EngineEvent`]. Lines we
//! do not understand become [`EngineEvent::Other`] and are ignored by the
//! session.

use chess_core::score::RawScore;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    IdName(String),
    OptionName(String),
    UciOk,
    ReadyOk,
    Info(InfoLine),
    BestMove(String),
    /// One row of the `eval` table, white POV.
    EvalTerm(EvalTerm),
    /// The final/total evaluation in pawns, white POV. `None` when the engine
    /// declines to evaluate (e.g. side to move in check).
    EvalTotal(Option<f64>),
    Other,
}

/// The fields of an `info` line we care about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<RawScore>,
    /// `lowerbound` or `upperbound` was attached to the score.
    pub bound: bool,
    pub pv: Vec<String>,
}

impl InfoLine {
    /// Belongs to the first (or only) principal variation.
    pub fn is_primary(&self) -> bool {
        self.multipv.map_or(true, |n| n <= 1)
    }

    /// An exact score for the main line, usable as the search result.
    pub fn is_exact_primary(&self) -> bool {
        self.is_primary() && !self.bound
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalTerm {
    pub name: String,
    pub mg: f64,
    pub eg: f64,
}

pub fn parse_line(line: &str) -> EngineEvent {
    let line = line.trim();
    let mut tokens = line.split_whitespace();

    match tokens.next() {
        Some("uciok") => EngineEvent::UciOk,
        Some("readyok") => EngineEvent::ReadyOk,
        Some("bestmove") => match tokens.next() {
            Some(mv) => EngineEvent::BestMove(mv.to_string()),
            None => EngineEvent::Other,
        },
        Some("info") => EngineEvent::Info(parse_info(tokens.collect::<Vec<_>>().as_slice())),
        Some("id") if tokens.next() == Some("name") => {
            EngineEvent::IdName(tokens.collect::<Vec<_>>().join(" "))
        }
        Some("option") if tokens.next() == Some("name") => {
            let name: Vec<&str> = tokens.take_while(|t| *t != "type").collect();
            EngineEvent::OptionName(name.join(" "))
        }
        _ => parse_eval_line(line),
    }
}

fn parse_info(tokens: &[&str]) -> InfoLine {
    let mut info = InfoLine::default();
    let num = |i: usize| tokens.get(i).and_then(|t| t.parse::<i32>().ok());

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                info.depth = num(i + 1).and_then(|d| u32::try_from(d).ok());
                i += 2;
            }
            "multipv" => {
                info.multipv = num(i + 1).and_then(|d| u32::try_from(d).ok());
                i += 2;
            }
            "score" => {
                info.score = match (tokens.get(i + 1), num(i + 2)) {
                    (Some(&"cp"), Some(v)) => Some(RawScore::Centipawns(v)),
                    (Some(&"mate"), Some(v)) => Some(RawScore::Mate(v)),
                    _ => None,
                };
                i += 3;
            }
            "lowerbound" | "upperbound" => {
                info.bound = true;
                i += 1;
            }
            "pv" => {
                info.pv = tokens[i + 1..]
                    .iter()
                    .take_while(|t| **t != "string" && !t.starts_with("bmc"))
                    .map(|t| t.to_string())
                    .collect();
                break;
            }
            "string" => break,
            _ => i += 1,
        }
    }

    info
}

fn parse_eval_line(line: &str) -> EngineEvent {
    let lower = line.to_lowercase();
    if lower.contains("final evaluation") || lower.contains("total evaluation") {
        let head = line.split('(').next().unwrap_or_default();
        let value = head.split_whitespace().nth(2).and_then(|v| v.parse::<f64>().ok());
        return EngineEvent::EvalTotal(value);
    }

    // Name | white mg eg | black mg eg | total mg eg
    let columns: Vec<&str> = line.split('|').map(str::trim).collect();
    if columns.len() < 4 || columns[0].is_empty() {
        return EngineEvent::Other;
    }
    let total: Vec<f64> = match columns[columns.len() - 1]
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(values) => values,
        Err(_) => return EngineEvent::Other,
    };
    match total.as_slice() {
        [mg, eg] => EngineEvent::EvalTerm(EvalTerm {
            name: columns[0].to_string(),
            mg: *mg,
            eg: *eg,
        }),
        _ => EngineEvent::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_lines() {
        assert_eq!(parse_line("uciok"), EngineEvent::UciOk);
        assert_eq!(parse_line("readyok\n"), EngineEvent::ReadyOk);
        assert_eq!(
            parse_line("id name Stockfish 16.1"),
            EngineEvent::IdName("Stockfish 16.1".into())
        );
        assert_eq!(parse_line("id author the Stockfish developers"), EngineEvent::Other);
        assert_eq!(
            parse_line("option name UCI_Chess960 type check default false"),
            EngineEvent::OptionName("UCI_Chess960".into())
        );
        assert_eq!(
            parse_line("option name Clear Hash type button"),
            EngineEvent::OptionName("Clear Hash".into())
        );
    }

    #[test]
    fn test_info_with_cp_and_pv() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 nps 1000 pv e2e4 e7e5 g1f3";
        let EngineEvent::Info(info) = parse_line(line) else {
            panic!("expected info");
        };
        assert_eq!(info.depth, Some(20));
        assert_eq!(info.multipv, Some(1));
        assert_eq!(info.score, Some(RawScore::Centipawns(35)));
        assert!(!info.bound);
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
        assert!(info.is_exact_primary());
    }

    #[test]
    fn test_info_mate_bound_and_multipv() {
        let EngineEvent::Info(info) =
            parse_line("info depth 12 multipv 2 score mate -3 upperbound nodes 5 pv a7a6")
        else {
            panic!("expected info");
        };
        assert_eq!(info.score, Some(RawScore::Mate(-3)));
        assert!(info.bound);
        assert!(!info.is_primary());
    }

    #[test]
    fn test_info_with_wdl_and_string() {
        let EngineEvent::Info(info) =
            parse_line("info depth 5 score cp -12 wdl 100 800 100 pv d2d4 bmc 0.5")
        else {
            panic!("expected info");
        };
        assert_eq!(info.score, Some(RawScore::Centipawns(-12)));
        assert_eq!(info.pv, vec!["d2d4"]);

        let EngineEvent::Info(info) = parse_line("info string NNUE evaluation using nn.nnue") else {
            panic!("expected info");
        };
        assert_eq!(info, InfoLine::default());
    }

    #[test]
    fn test_bestmove() {
        assert_eq!(
            parse_line("bestmove e2e4 ponder e7e5"),
            EngineEvent::BestMove("e2e4".into())
        );
        assert_eq!(parse_line("bestmove"), EngineEvent::Other);
    }

    #[test]
    fn test_eval_term_rows() {
        assert_eq!(
            parse_line("     Passed |  3.01  3.87 |  0.08  0.39 |  2.92  3.48"),
            EngineEvent::EvalTerm(EvalTerm {
                name: "Passed".into(),
                mg: 2.92,
                eg: 3.48
            })
        );
        assert_eq!(
            parse_line("King safety |  ----  ---- |  ----  ---- | -1.20  0.10"),
            EngineEvent::EvalTerm(EvalTerm {
                name: "King safety".into(),
                mg: -1.2,
                eg: 0.1
            })
        );
        assert_eq!(parse_line("       Term |    White    |    Black    |    Total"), EngineEvent::Other);
        assert_eq!(parse_line("| r | n | b | q | k | b | n | r |"), EngineEvent::Other);
    }

    #[test]
    fn test_eval_total_lines() {
        assert_eq!(
            parse_line("Final evaluation       +0.18 (white side) [with scaled NNUE, ...]"),
            EngineEvent::EvalTotal(Some(0.18))
        );
        assert_eq!(
            parse_line("Total evaluation: -0.52 (white side)"),
            EngineEvent::EvalTotal(Some(-0.52))
        );
        assert_eq!(
            parse_line("Final evaluation: none (in check)"),
            EngineEvent::EvalTotal(None)
        );
    }
}
