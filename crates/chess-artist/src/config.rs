//! Command line options and the validated run configuration.

use std::env;
use std::path::{Path, PathBuf};

use chess_core::game_data::GameData;
use clap::{Parser, ValueEnum};
use shakmaty::Color;

use crate::engine::{EngineOptions, EngineSpec};
use crate::error::ArtistError;

/// Engine path used when `--enginefile` is not given.
pub const ENGINE_ENV: &str = "CHESS_ARTIST_ENGINE";

pub const LOG_FILE: &str = "chess_artist_log.txt";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "chess-artist",
    version,
    about = "Annotate PGN games, annotate EPD positions or test engines with EPD suites"
)]
pub struct CliArgs {
    /// Input .pgn or .epd file
    #[arg(short, long)]
    pub infile: PathBuf,

    /// Output file, appended to
    #[arg(short, long)]
    pub outfile: PathBuf,

    /// UCI engine binary (falls back to CHESS_ARTIST_ENGINE)
    #[arg(short, long)]
    pub enginefile: Option<PathBuf>,

    /// Name for the Annotator tag instead of the engine's id name
    #[arg(long)]
    pub enginename: Option<String>,

    /// Engine options, e.g. "Hash value 128, Threads value 1"
    #[arg(short = 'n', long)]
    pub engineoptions: Option<String>,

    /// Polyglot opening book
    #[arg(long)]
    pub bookfile: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub eval: EvalType,

    /// Analysis time per position in ms
    #[arg(long, default_value_t = 1000)]
    pub movetime: u64,

    /// Analysis depth, 0 for none
    #[arg(long, default_value_t = 0)]
    pub depth: u32,

    /// First move number to analyze
    #[arg(long, default_value_t = 8)]
    pub movestart: u32,

    /// Last move number to analyze
    #[arg(long, default_value_t = 1000)]
    pub moveend: u32,

    /// Write a debug log to chess_artist_log.txt
    #[arg(long)]
    pub log: bool,

    #[arg(long, value_enum)]
    pub job: Job,

    /// Only analyze moves of this color
    #[arg(long, value_enum)]
    pub color: Option<Side>,

    /// Only analyze games of this player, skipping the opponent's moves
    #[arg(long, conflicts_with = "player_and_opp")]
    pub player: Option<String>,

    /// Only analyze games of this player, including the opponent's moves
    #[arg(long)]
    pub player_and_opp: Option<String>,

    /// Only games the player lost, or all decisive games without --player
    #[arg(long)]
    pub loss: bool,

    /// Only games the player drew, or all drawn games without --player
    #[arg(long)]
    pub draw: bool,

    /// Do not look for alternatives when the game move scores at or below this (pawns)
    #[arg(long, default_value_t = -3.0, allow_hyphen_values = true)]
    pub min_score_stop_analysis: f64,

    /// Do not look for alternatives when the game move scores at or above this (pawns)
    #[arg(long, default_value_t = 3.0, allow_hyphen_values = true)]
    pub max_score_stop_analysis: f64,

    /// Mark puzzles from non-960 games as playable in chess960
    #[arg(long)]
    pub game960: bool,

    /// Also write one JSON annotation record per analyzed move to this file
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// Output of --job createpuzzle
    #[arg(long, default_value = "puzzle.epd")]
    pub puzzle_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EvalType {
    Static,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Job {
    Analyze,
    Test,
    #[value(name = "createpuzzle")]
    CreatePuzzle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pgn,
    Epd,
}

impl InputKind {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "pgn" => Some(InputKind::Pgn),
            "epd" => Some(InputKind::Epd),
            _ => None,
        }
    }
}

/// Which side's counts go into the summary comment before the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryScope {
    Both,
    Only(Color),
    Neither,
}

/// Game and move selection from `--player`, `--player-and-opp`,
/// `--color`, `--loss` and `--draw`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    pub player: Option<String>,
    /// The player's opponent is analyzed too.
    pub with_opponent: bool,
    pub color: Option<Color>,
    pub loss: bool,
    pub draw: bool,
}

impl GameFilter {
    /// Color the selected player has in `game`, if a player was selected
    /// and takes part.
    pub fn player_color(&self, game: &GameData) -> Option<Color> {
        let name = self.player.as_deref()?;
        if game.white() == name {
            Some(Color::White)
        } else if game.black() == name {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn accepts(&self, game: &GameData) -> bool {
        let result = game.result();

        if self.player.is_none() {
            return match (self.loss, self.draw) {
                (false, true) => result == "1/2-1/2",
                (true, false) => result != "1/2-1/2" && result != "*",
                _ => true,
            };
        }

        let Some(color) = self.player_color(game) else {
            return false;
        };
        if self.color.is_some_and(|c| c != color) {
            return false;
        }

        let (won, lost) = match color {
            Color::White => ("1-0", "0-1"),
            Color::Black => ("0-1", "1-0"),
        };
        match (self.loss, self.draw) {
            (true, false) => result == lost,
            (false, true) => result == "1/2-1/2",
            (true, true) => result != won,
            (false, false) => true,
        }
    }

    /// Whether the move of `mover` gets engine analysis. Filtered moves are
    /// still written, without comments.
    pub fn analyzes_move(&self, game: &GameData, mover: Color) -> bool {
        let player_color = self.player_color(game);

        if !self.with_opponent && player_color.is_some_and(|c| c != mover) {
            return false;
        }

        match self.color {
            None => true,
            Some(color) if self.with_opponent => player_color == Some(color),
            Some(color) => color == mover,
        }
    }

    pub fn summary_scope(&self, game: &GameData) -> SummaryScope {
        let player_color = self.player_color(game);

        if self.with_opponent {
            return match (self.color, player_color) {
                (None, _) => SummaryScope::Both,
                (Some(c), Some(p)) if c == p => SummaryScope::Both,
                _ => SummaryScope::Neither,
            };
        }

        match (self.color, self.player.as_ref(), player_color) {
            (None, None, _) => SummaryScope::Both,
            (Some(c), Some(_), Some(p)) if c == p => SummaryScope::Only(c),
            (Some(_), Some(_), _) => SummaryScope::Neither,
            (Some(c), None, _) => SummaryScope::Only(c),
            (None, Some(_), Some(p)) => SummaryScope::Only(p),
            (None, Some(_), None) => SummaryScope::Neither,
        }
    }
}

/// Everything a job needs, checked before any engine is started.
#[derive(Debug, Clone)]
pub struct ArtistConfig {
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub input: InputKind,
    pub job: Job,
    pub engine: EngineSpec,
    pub bookfile: Option<PathBuf>,
    pub eval: EvalType,
    pub movetime_ms: u64,
    pub depth: u32,
    pub move_start: u32,
    pub move_end: u32,
    pub filter: GameFilter,
    /// Mover POV pawns; outside (min, max) no alternative is searched.
    pub min_score_stop: f64,
    pub max_score_stop: f64,
    pub game960: bool,
    pub records: Option<PathBuf>,
    pub puzzle_file: PathBuf,
}

impl ArtistConfig {
    pub fn from_args(args: CliArgs) -> Result<Self, ArtistError> {
        let engine_path = match args.enginefile {
            Some(path) => path,
            None => env::var(ENGINE_ENV).map(PathBuf::from).map_err(|_| {
                ArtistError::Config(format!("no --enginefile given and {ENGINE_ENV} not set"))
            })?,
        };

        let options: EngineOptions = match args.engineoptions.as_deref() {
            Some(s) => s.parse()?,
            None => EngineOptions::default(),
        };
        options.validate()?;

        let (player, with_opponent) = match (args.player, args.player_and_opp) {
            (Some(p), None) => (Some(p), false),
            (None, Some(p)) => (Some(p), true),
            (None, None) => (None, false),
            (Some(_), Some(_)) => {
                return Err(ArtistError::Config(
                    "--player and --player-and-opp cannot be combined".into(),
                ))
            }
        };

        let input = check_paths(&args.infile, &args.outfile, &engine_path)?;
        match (args.job, input) {
            (Job::Test, InputKind::Pgn) => {
                return Err(ArtistError::Config("--job test needs an .epd input".into()))
            }
            (Job::CreatePuzzle, InputKind::Epd) => {
                return Err(ArtistError::Config(
                    "--job createpuzzle needs a .pgn input".into(),
                ))
            }
            _ => {}
        }
        if let Some(book) = &args.bookfile {
            if !book.is_file() {
                return Err(ArtistError::Config(format!(
                    "book file {} does not exist",
                    book.display()
                )));
            }
        }
        if args.min_score_stop_analysis >= args.max_score_stop_analysis {
            return Err(ArtistError::Config(
                "--min-score-stop-analysis must be below --max-score-stop-analysis".into(),
            ));
        }

        let mut engine = EngineSpec::new(engine_path);
        engine.name = args.enginename;
        engine.options = options;

        Ok(Self {
            infile: args.infile,
            outfile: args.outfile,
            input,
            job: args.job,
            engine,
            bookfile: args.bookfile,
            eval: args.eval,
            movetime_ms: args.movetime,
            depth: args.depth,
            move_start: args.movestart,
            move_end: args.moveend,
            filter: GameFilter {
                player,
                with_opponent,
                color: args.color.map(Color::from),
                loss: args.loss,
                draw: args.draw,
            },
            min_score_stop: args.min_score_stop_analysis,
            max_score_stop: args.max_score_stop_analysis,
            game960: args.game960,
            records: args.records,
            puzzle_file: args.puzzle_file,
        })
    }
}

fn check_paths(infile: &Path, outfile: &Path, engine: &Path) -> Result<InputKind, ArtistError> {
    if !infile.is_file() {
        return Err(ArtistError::Config(format!(
            "input file {} does not exist",
            infile.display()
        )));
    }
    if !engine.is_file() {
        return Err(ArtistError::Config(format!(
            "engine {} does not exist",
            engine.display()
        )));
    }
    if same_file(infile, outfile) {
        return Err(ArtistError::Config(format!(
            "input and output are the same file: {}",
            infile.display()
        )));
    }
    InputKind::of(infile).ok_or_else(|| {
        ArtistError::Config(format!(
            "input {} is neither .pgn nor .epd",
            infile.display()
        ))
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(white: &str, black: &str, result: &str) -> GameData {
        GameData {
            tags: vec![
                ("White".into(), white.into()),
                ("Black".into(), black.into()),
                ("Result".into(), result.into()),
            ],
            moves: Vec::new(),
        }
    }

    fn player(name: &str) -> GameFilter {
        GameFilter {
            player: Some(name.into()),
            ..GameFilter::default()
        }
    }

    #[test]
    fn test_result_filters_without_player() {
        let draws = GameFilter {
            draw: true,
            ..GameFilter::default()
        };
        assert!(draws.accepts(&game("A", "B", "1/2-1/2")));
        assert!(!draws.accepts(&game("A", "B", "1-0")));

        let decisive = GameFilter {
            loss: true,
            ..GameFilter::default()
        };
        assert!(decisive.accepts(&game("A", "B", "0-1")));
        assert!(!decisive.accepts(&game("A", "B", "1/2-1/2")));
        assert!(!decisive.accepts(&game("A", "B", "*")));
    }

    #[test]
    fn test_player_filters() {
        let f = player("Carlsen");
        assert!(f.accepts(&game("Carlsen", "B", "1-0")));
        assert!(!f.accepts(&game("A", "B", "1-0")));

        let lost = GameFilter { loss: true, ..player("Carlsen") };
        assert!(lost.accepts(&game("Carlsen", "B", "0-1")));
        assert!(lost.accepts(&game("A", "Carlsen", "1-0")));
        assert!(!lost.accepts(&game("Carlsen", "B", "1-0")));

        let not_won = GameFilter { loss: true, draw: true, ..player("Carlsen") };
        assert!(not_won.accepts(&game("Carlsen", "B", "1/2-1/2")));
        assert!(!not_won.accepts(&game("A", "Carlsen", "0-1")));

        let as_white = GameFilter { color: Some(Color::White), ..player("Carlsen") };
        assert!(!as_white.accepts(&game("A", "Carlsen", "1-0")));
    }

    #[test]
    fn test_move_selection() {
        let g = game("Carlsen", "B", "1-0");
        let f = player("Carlsen");
        assert!(f.analyzes_move(&g, Color::White));
        assert!(!f.analyzes_move(&g, Color::Black));

        let both = GameFilter { with_opponent: true, ..player("Carlsen") };
        assert!(both.analyzes_move(&g, Color::Black));

        let black_only = GameFilter {
            color: Some(Color::Black),
            ..GameFilter::default()
        };
        assert!(black_only.analyzes_move(&g, Color::Black));
        assert!(!black_only.analyzes_move(&g, Color::White));
    }

    #[test]
    fn test_summary_scope() {
        let g = game("A", "Carlsen", "1-0");
        assert_eq!(GameFilter::default().summary_scope(&g), SummaryScope::Both);
        assert_eq!(player("Carlsen").summary_scope(&g), SummaryScope::Only(Color::Black));
        let white = GameFilter {
            color: Some(Color::White),
            ..GameFilter::default()
        };
        assert_eq!(white.summary_scope(&g), SummaryScope::Only(Color::White));
        let both = GameFilter { with_opponent: true, ..player("Carlsen") };
        assert_eq!(both.summary_scope(&g), SummaryScope::Both);
    }

    #[test]
    fn test_args_parse() {
        let args = CliArgs::try_parse_from([
            "chess-artist",
            "--infile",
            "games.pgn",
            "--outfile",
            "out.pgn",
            "--eval",
            "search",
            "--job",
            "createpuzzle",
            "--min-score-stop-analysis",
            "-2.5",
        ])
        .unwrap();
        assert_eq!(args.job, Job::CreatePuzzle);
        assert_eq!(args.movetime, 1000);
        assert_eq!(args.movestart, 8);
        assert_eq!(args.min_score_stop_analysis, -2.5);
        assert_eq!(args.puzzle_file, PathBuf::from("puzzle.epd"));

        let clash = CliArgs::try_parse_from([
            "chess-artist", "-i", "a.pgn", "-o", "b.pgn", "--eval", "static", "--job",
            "analyze", "--player", "A", "--player-and-opp", "B",
        ]);
        assert!(clash.is_err());
    }

    #[test]
    fn test_missing_input_is_config_error() {
        let args = CliArgs::try_parse_from([
            "chess-artist",
            "-i",
            "/nonexistent/games.pgn",
            "-o",
            "out.pgn",
            "-e",
            "/nonexistent/engine",
            "--eval",
            "search",
            "--job",
            "analyze",
        ])
        .unwrap();
        assert!(matches!(ArtistConfig::from_args(args), Err(ArtistError::Config(_))));
    }

    #[test]
    fn test_bad_engine_option_rejected_first() {
        let args = CliArgs::try_parse_from([
            "chess-artist", "-i", "a.pgn", "-o", "b.pgn", "-e", "sf", "--eval", "search",
            "--job", "analyze", "-n", "Hash value 0",
        ])
        .unwrap();
        assert!(matches!(ArtistConfig::from_args(args), Err(ArtistError::InvalidOption(_))));
    }

    #[test]
    fn test_extension_kinds() {
        assert_eq!(InputKind::of(Path::new("x.PGN")), Some(InputKind::Pgn));
        assert_eq!(InputKind::of(Path::new("x.epd")), Some(InputKind::Epd));
        assert_eq!(InputKind::of(Path::new("x.txt")), None);
    }
}
