use super::avatar::avatar;
use super::*;

pub(crate) struct FixedAvatar;

impl AvatarPicker for FixedAvatar {
    fn pick(&self) -> Avatar {
        avatar("Quokka")
    }
}

pub(crate) fn question(n: usize) -> Question {
    Question::new(
        format!("Question number {n}?"),
        format!("right-{n}"),
        vec![format!("wrong-a-{n}"), format!("wrong-b-{n}"), format!("wrong-c-{n}")],
    )
}

fn setup_session(pool: usize) -> GameSession {
    GameSession::from_batch((0..=pool).map(question).collect()).unwrap()
}

fn alice() -> PlayerIdentity {
    PlayerIdentity::new("alice")
}

fn bob() -> PlayerIdentity {
    PlayerIdentity::new("bob")
}

#[test]
fn test_from_batch_splits_current_and_pool() {
    let session = setup_session(3);
    assert_eq!(session.get_current_question().text, "Question number 0?");
    assert_eq!(session.get_question_pool().len(), 3);
    assert!(session.get_players().is_empty());
    assert!(!session.all_guessed());
}

#[test]
fn test_from_empty_batch_is_none() {
    assert!(GameSession::from_batch(Vec::new()).is_none());
}

#[test]
fn test_join_is_idempotent_and_keeps_guess() {
    let mut session = setup_session(1);
    assert!(session.join(alice(), &FixedAvatar));
    session.set_guess(&alice(), "right-0").unwrap();

    assert!(!session.join(alice(), &FixedAvatar));
    assert_eq!(session.get_players().len(), 1);
    assert_eq!(session.get_player(&alice()).unwrap().current_guess.as_deref(), Some("right-0"));
    assert_eq!(session.get_player(&alice()).unwrap().nickname, "Quokka");
}

#[test]
fn test_leave_removes_only_that_player() {
    let mut session = setup_session(1);
    session.join(alice(), &FixedAvatar);
    session.join(bob(), &FixedAvatar);

    assert!(session.leave(&alice()));
    assert!(!session.leave(&alice()));
    assert_eq!(session.get_players().len(), 1);
    assert!(session.has_player(&bob()));
}

#[test]
fn test_all_guessed_flips_when_new_player_joins() {
    let mut session = setup_session(1);
    session.join(alice(), &FixedAvatar);
    session.set_guess(&alice(), "wrong-a-0").unwrap();
    assert!(session.all_guessed());

    session.join(bob(), &FixedAvatar);
    assert!(!session.all_guessed());
}

#[test]
fn test_set_guess_accepts_answer_id() {
    let mut session = setup_session(1);
    session.join(alice(), &FixedAvatar);
    let id = super::question::answer_id("wrong-b-0");

    assert!(session.set_guess(&alice(), &id).unwrap());
    assert_eq!(session.get_player(&alice()).unwrap().current_guess.as_deref(), Some("wrong-b-0"));
}

#[test]
fn test_set_guess_rejects_unknown_answer_and_player() {
    let mut session = setup_session(1);
    session.join(alice(), &FixedAvatar);
    let before = session.clone();

    assert_eq!(
        session.set_guess(&alice(), "not an answer"),
        Err(GameError::UnknownAnswer("not an answer".to_string()))
    );
    assert_eq!(session.set_guess(&bob(), "right-0"), Err(GameError::PlayerNotInSession(bob())));
    assert_eq!(session.unset_guess(&bob()), Err(GameError::PlayerNotInSession(bob())));
    assert_eq!(session, before);
}

#[test]
fn test_unset_guess_clears() {
    let mut session = setup_session(1);
    session.join(alice(), &FixedAvatar);
    session.set_guess(&alice(), "right-0").unwrap();

    assert!(session.unset_guess(&alice()).unwrap());
    assert!(!session.unset_guess(&alice()).unwrap());
    assert!(session.get_player(&alice()).unwrap().current_guess.is_none());
}

#[test]
fn test_advance_moves_one_question_and_clears_guesses() {
    let mut session = setup_session(2);
    session.join(alice(), &FixedAvatar);
    session.join(bob(), &FixedAvatar);
    session.set_guess(&alice(), "right-0").unwrap();
    session.set_guess(&bob(), "wrong-a-0").unwrap();

    session.advance().unwrap();

    assert_eq!(session.get_current_question().text, "Question number 1?");
    assert_eq!(session.get_question_pool().len(), 1);
    assert!(session.get_players().iter().all(|p| p.current_guess.is_none()));
}

#[test]
fn test_advance_on_empty_pool_fails_without_mutation() {
    let mut session = setup_session(0);
    session.join(alice(), &FixedAvatar);
    session.set_guess(&alice(), "right-0").unwrap();
    let before = session.clone();

    assert_eq!(session.advance(), Err(GameError::NoMoreQuestions));
    assert_eq!(session, before);
}

#[test]
fn test_session_json_roundtrip_preserves_state() {
    let mut session = setup_session(2);
    session.join(alice(), &FixedAvatar);
    session.set_guess(&alice(), "right-0").unwrap();

    let json = serde_json::to_vec(&session).unwrap();
    let restored: GameSession = serde_json::from_slice(&json).unwrap();
    assert_eq!(restored, session);
}
