//! View models handed to the client-side renderer.
//!
//! Every view is derived from an immutable session snapshot plus the identity
//! of the player it is rendered for, so two subscribers of the same event may
//! receive different contexts (their own guess, "you" marker).

use serde::{Deserialize, Serialize};

use crate::game::{AnswerEntry, Avatar, GameSession, PlayerIdentity, SessionId};
use crate::session::SessionEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", content = "context", rename_all = "snake_case")]
pub enum View {
    Question(QuestionView),
    Roster(RosterView),
    AnswerPanel(AnswerPanelView),
    RevealedAnswers(RevealView),
    Finished(FinishedView),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub session_id: SessionId,
    pub question: String,
    pub answers: Vec<AnswerEntry>,
    pub remaining_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub nickname: String,
    pub avatar: Avatar,
    pub has_guessed: bool,
    pub is_you: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterView {
    pub players: Vec<RosterEntry>,
    pub all_guessed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPanelView {
    pub answers: Vec<AnswerEntry>,
    pub your_guess: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealedAnswer {
    pub answer: AnswerEntry,
    pub correct: bool,
    pub chosen_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealView {
    pub question: String,
    pub correct_answer: String,
    pub answers: Vec<RevealedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedView {
    pub session_id: SessionId,
    pub players: Vec<RosterEntry>,
}

/// Views a subscriber re-renders for an event.
pub fn views_for_event(event: &SessionEvent, viewer: &PlayerIdentity) -> Vec<View> {
    let session = event.snapshot();
    match event {
        SessionEvent::PlayerJoined(_) | SessionEvent::PlayerLeft(_) => vec![roster(session, viewer)],
        SessionEvent::GuessSet(_) | SessionEvent::GuessUnset(_) => {
            vec![roster(session, viewer), answer_panel(session, viewer)]
        }
        SessionEvent::AnswersRevealed(_) => vec![revealed_answers(session, viewer)],
        SessionEvent::NextQuestion(_) => vec![question(session, viewer), roster(session, viewer)],
        SessionEvent::QuestionsExhausted(_) => vec![finished(session, viewer)],
    }
}

fn viewer_guess<'a>(session: &'a GameSession, viewer: &PlayerIdentity) -> Option<&'a str> {
    session.get_player(viewer).and_then(|p| p.current_guess.as_deref())
}

pub fn question(session: &GameSession, viewer: &PlayerIdentity) -> View {
    let current = session.get_current_question();
    View::Question(QuestionView {
        session_id: session.get_id(),
        question: current.text.clone(),
        answers: current.answers_for(viewer_guess(session, viewer)),
        remaining_questions: session.get_question_pool().len(),
    })
}

fn roster_entries(session: &GameSession, viewer: &PlayerIdentity) -> Vec<RosterEntry> {
    session
        .get_players()
        .iter()
        .map(|p| RosterEntry {
            nickname: p.nickname.clone(),
            avatar: p.avatar.clone(),
            has_guessed: p.current_guess.is_some(),
            is_you: &p.session_id == viewer,
        })
        .collect()
}

pub fn roster(session: &GameSession, viewer: &PlayerIdentity) -> View {
    View::Roster(RosterView {
        players: roster_entries(session, viewer),
        all_guessed: session.all_guessed(),
    })
}

pub fn answer_panel(session: &GameSession, viewer: &PlayerIdentity) -> View {
    let guess = viewer_guess(session, viewer);
    View::AnswerPanel(AnswerPanelView {
        answers: session.get_current_question().answers_for(guess),
        your_guess: guess.map(str::to_string),
    })
}

pub fn revealed_answers(session: &GameSession, viewer: &PlayerIdentity) -> View {
    let current = session.get_current_question();
    let answers = current
        .answers_for(viewer_guess(session, viewer))
        .into_iter()
        .map(|answer| {
            let chosen_by = session
                .get_players()
                .iter()
                .filter(|p| p.current_guess.as_deref() == Some(answer.text.as_str()))
                .map(|p| p.nickname.clone())
                .collect();
            RevealedAnswer {
                correct: current.is_correct(&answer.text),
                answer,
                chosen_by,
            }
        })
        .collect();

    View::RevealedAnswers(RevealView {
        question: current.text.clone(),
        correct_answer: current.correct_answer.clone(),
        answers,
    })
}

pub fn finished(session: &GameSession, viewer: &PlayerIdentity) -> View {
    View::Finished(FinishedView {
        session_id: session.get_id(),
        players: roster_entries(session, viewer),
    })
}
