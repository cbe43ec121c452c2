//! Streaming PGN reader built on pgn-reader. Only the mainline is kept.

use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};

use crate::error::CoreError;
use crate::game_data::GameData;

#[derive(Default)]
struct GameCollector;

impl Visitor for GameCollector {
    type Tags = Vec<(String, String)>;
    type Movetext = GameData;
    type Output = GameData;

    fn begin_tags(&mut self) -> ControlFlow<GameData, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(&mut self, tags: &mut Self::Tags, name: &[u8], value: RawTag<'_>) -> ControlFlow<GameData> {
        tags.push((
            String::from_utf8_lossy(name).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<GameData, GameData> {
        ControlFlow::Continue(GameData {
            tags,
            moves: Vec::new(),
        })
    }

    fn san(&mut self, game: &mut GameData, san_plus: SanPlus) -> ControlFlow<GameData> {
        game.moves.push(san_plus.san.to_string());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _game: &mut GameData) -> ControlFlow<GameData, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, game: GameData) -> GameData {
        game
    }
}

/// Iterator over the games of a PGN source.
pub struct PgnGames<R: Read> {
    reader: Reader<R>,
    visitor: GameCollector,
}

impl PgnGames<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> PgnGames<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::new(source),
            visitor: GameCollector,
        }
    }
}

impl<R: Read> Iterator for PgnGames<R> {
    type Item = Result<GameData, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_game(&mut self.visitor) {
            Ok(Some(game)) => Some(Ok(game)),
            Ok(None) => None,
            Err(e) => Some(Err(CoreError::Pgn(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Casual"]
[White "Alice"]
[Black "Bob"]
[Result "0-1"]

1. f3 e5 2. g4 {blunder} (2. e4) Qh4# 0-1

[Event "Casual"]
[White "Bob"]
[Black "Alice"]
[Result "1/2-1/2"]

1. e4 e5 2. Nf3 Nc6 1/2-1/2
"#;

    #[test]
    fn test_reads_all_games_mainline_only() {
        let games: Vec<GameData> = PgnGames::new(TWO_GAMES.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(games.len(), 2);

        assert_eq!(games[0].white(), "Alice");
        assert_eq!(games[0].moves, vec!["f3", "e5", "g4", "Qh4"]);

        assert_eq!(games[1].result(), "1/2-1/2");
        assert_eq!(games[1].moves.len(), 4);
    }

    #[test]
    fn test_tags_keep_file_order() {
        let game = PgnGames::new(TWO_GAMES.as_bytes()).next().unwrap().unwrap();
        let names: Vec<&str> = game.tags.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["Event", "White", "Black", "Result"]);
    }
}
