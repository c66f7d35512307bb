pub mod features;
pub mod hive;

pub use hive::{Action, Board, PieceType, Player, Pos};
