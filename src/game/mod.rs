pub mod avatar;
pub mod domain;
pub mod question;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use avatar::{AvatarPicker, ThreadRngAvatarPicker};
pub use domain::{GameSession, Player};
pub use question::{AnswerEntry, DisplayClass, Question};
pub use types::{Avatar, GameError, PlayerIdentity, SessionId};
