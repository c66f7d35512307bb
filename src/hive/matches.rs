//! Saving and loading matches.
//!
//! A match is written as a sequence of values: a `-1` sentinel, the format
//! version, the move limit, the actions, one score per board and, from
//! version 1 on, one label distribution per action. The oldest files have no
//! sentinel or version and start straight with a positive move limit.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::{Action, Board};

/// Actions and scores only.
pub const VERSION_ACTIONS_SCORES: i64 = 0;
/// Actions, scores and per-action label distributions.
pub const VERSION_ACTIONS_SCORES_LABELS: i64 = 1;

const VERSION_SENTINEL: i64 = -1;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("match stream I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode match field: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode match field: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unknown match file version {0}")]
    UnknownVersion(i64),
    #[error("invalid max moves {0}")]
    InvalidMaxMoves(i64),
    #[error("match has {actions} actions but {scores} scores, wanted one score per board")]
    ScoresLength { actions: usize, scores: usize },
    #[error("match has {actions} actions but {labels} action labels")]
    LabelsLength { actions: usize, labels: usize },
    #[error("match has no boards")]
    NoBoards,
}

/// Writes the fields of a match one at a time, in order.
pub trait Encoder {
    fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), MatchError>;
}

/// Reads back what an `Encoder` wrote, field by field.
pub trait Decoder {
    fn decode<T: DeserializeOwned>(&mut self) -> Result<T, MatchError>;
}

/// Encodes each field as one JSON value per line.
pub struct JsonEncoder<W: Write> {
    writer: W,
}

impl<W: Write> JsonEncoder<W> {
    pub fn new(writer: W) -> Self {
        JsonEncoder { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Encoder for JsonEncoder<W> {
    fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), MatchError> {
        serde_json::to_writer(&mut self.writer, value).map_err(MatchError::Encode)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

pub struct JsonDecoder<R: Read> {
    de: serde_json::Deserializer<serde_json::de::IoRead<R>>,
}

impl<R: Read> JsonDecoder<R> {
    pub fn new(reader: R) -> Self {
        JsonDecoder {
            de: serde_json::Deserializer::from_reader(reader),
        }
    }
}

impl<R: Read> Decoder for JsonDecoder<R> {
    fn decode<T: DeserializeOwned>(&mut self) -> Result<T, MatchError> {
        T::deserialize(&mut self.de).map_err(|err| {
            if err.is_io() {
                MatchError::Io(err.into())
            } else {
                MatchError::Decode(err)
            }
        })
    }
}

/// Writes a match. Without labels the file is written as version 0.
pub fn encode_match<E: Encoder>(
    enc: &mut E,
    max_moves: usize,
    actions: &[Action],
    scores: &[f32],
    actions_labels: Option<&[Vec<f32>]>,
) -> Result<(), MatchError> {
    if scores.len() != actions.len() + 1 {
        return Err(MatchError::ScoresLength {
            actions: actions.len(),
            scores: scores.len(),
        });
    }
    if let Some(labels) = actions_labels {
        if labels.len() != actions.len() {
            return Err(MatchError::LabelsLength {
                actions: actions.len(),
                labels: labels.len(),
            });
        }
    }

    let version = if actions_labels.is_some() {
        VERSION_ACTIONS_SCORES_LABELS
    } else {
        VERSION_ACTIONS_SCORES
    };
    enc.encode(&VERSION_SENTINEL)?;
    enc.encode(&version)?;
    enc.encode(&(max_moves as i64))?;
    enc.encode(actions)?;
    enc.encode(scores)?;
    if let Some(labels) = actions_labels {
        enc.encode(labels)?;
    }
    Ok(())
}

/// A match as read from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMatch {
    pub max_moves: usize,
    pub actions: Vec<Action>,
    pub scores: Vec<f32>,
    pub actions_labels: Option<Vec<Vec<f32>>>,
}

impl LoadedMatch {
    /// Empty board the match started from.
    pub fn initial_board(&self) -> Board {
        Board::with_max_moves(self.max_moves)
    }
}

pub fn load_match<D: Decoder>(dec: &mut D) -> Result<LoadedMatch, MatchError> {
    let first: i64 = dec.decode()?;
    let (version, max_moves) = if first > 0 {
        (VERSION_ACTIONS_SCORES, first)
    } else {
        let version: i64 = dec.decode()?;
        // the layout of what follows depends on the version
        if version != VERSION_ACTIONS_SCORES && version != VERSION_ACTIONS_SCORES_LABELS {
            return Err(MatchError::UnknownVersion(version));
        }
        debug!("loading match file version {}", version);
        (version, dec.decode()?)
    };
    if max_moves <= 0 {
        return Err(MatchError::InvalidMaxMoves(max_moves));
    }

    let actions: Vec<Action> = dec.decode()?;
    let scores: Vec<f32> = dec.decode()?;
    if scores.len() != actions.len() + 1 {
        return Err(MatchError::ScoresLength {
            actions: actions.len(),
            scores: scores.len(),
        });
    }
    let actions_labels = if version == VERSION_ACTIONS_SCORES_LABELS {
        let labels: Vec<Vec<f32>> = dec.decode()?;
        if labels.len() != actions.len() {
            return Err(MatchError::LabelsLength {
                actions: actions.len(),
                labels: labels.len(),
            });
        }
        Some(labels)
    } else {
        None
    };

    debug!(
        max_moves,
        "loaded match with {} actions, {} scores",
        actions.len(),
        scores.len()
    );
    Ok(LoadedMatch {
        max_moves: max_moves as usize,
        actions,
        scores,
        actions_labels,
    })
}

/// A played match: every board from the initial one to the final one.
#[derive(Debug, Clone)]
pub struct Match {
    pub boards: Vec<Board>,
    pub actions: Vec<Action>,
    pub scores: Vec<f32>,
    pub actions_labels: Vec<Vec<f32>>,
}

impl Match {
    /// Replays a loaded match. Matches saved without labels get one-hot labels
    /// of the action taken.
    ///
    /// Panics if an action is not legal on the board it was played on.
    pub fn replay(loaded: LoadedMatch) -> Self {
        let mut boards = Vec::with_capacity(loaded.actions.len() + 1);
        let mut board = loaded.initial_board();
        for action in &loaded.actions {
            let idx = board.find_action_deep(action);
            let next = board.act(board.actions()[idx]);
            boards.push(board);
            board = next;
        }
        boards.push(board);

        let mut m = Match {
            boards,
            actions: loaded.actions,
            scores: loaded.scores,
            actions_labels: loaded.actions_labels.unwrap_or_default(),
        };
        if m.actions_labels.is_empty() && !m.actions.is_empty() {
            m.fill_action_labels_with_taken();
        }
        m
    }

    /// Panics on a match without boards; `replay` always yields at least one.
    pub fn final_board(&self) -> &Board {
        &self.boards[self.boards.len() - 1]
    }

    /// Labels each move with the one-hot encoding of the action played.
    pub fn fill_action_labels_with_taken(&mut self) {
        self.actions_labels = self
            .actions
            .iter()
            .zip(&self.boards)
            .map(|(action, board)| {
                let mut labels = vec![0.0; board.num_actions()];
                labels[board.find_action_deep(action)] = 1.0;
                labels
            })
            .collect();
    }

    pub fn encode<E: Encoder>(&self, enc: &mut E) -> Result<(), MatchError> {
        let initial = self.boards.first().ok_or(MatchError::NoBoards)?;
        encode_match(
            enc,
            initial.max_moves(),
            &self.actions,
            &self.scores,
            Some(self.actions_labels.as_slice()),
        )
    }
}
