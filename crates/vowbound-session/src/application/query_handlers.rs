//! Query handlers for the Game Sessions context.

use serde::Serialize;
use uuid::Uuid;
use vowbound_core::error::DomainError;
use vowbound_core::repository::EventRepository;
use vowbound_rules::domain::resolution::DiceRoll;

use crate::application::command_handlers;
use crate::domain::aggregates::GameSession;
use crate::domain::combat::CombatState;

/// Read-only view of a game session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// The session identifier.
    pub session_id: Uuid,
    pub name: String,
    pub master_id: Uuid,
    pub characters: Vec<Uuid>,
    pub combat: CombatState,
    /// Number of rolls made so far.
    pub roll_count: usize,
    /// Current version (event count).
    pub version: i64,
}

impl From<GameSession> for SessionView {
    fn from(session: GameSession) -> Self {
        Self {
            session_id: session.id,
            name: session.name,
            master_id: session.master_id,
            characters: session.characters,
            combat: session.combat,
            roll_count: session.rolls.len(),
            version: session.version,
        }
    }
}

async fn load_existing(
    session_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<GameSession, DomainError> {
    let stored_events = repo.load_events(session_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(session_id));
    }
    command_handlers::reconstitute(session_id, &stored_events)
}

/// Retrieves a session by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Collaborator` if loading or deserialization fails.
pub async fn get_session_by_id(
    session_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<SessionView, DomainError> {
    load_existing(session_id, repo).await.map(SessionView::from)
}

/// Retrieves up to `limit` of the session's latest rolls, most recent first.
///
/// # Errors
///
/// Same as [`get_session_by_id`].
pub async fn get_recent_rolls(
    session_id: Uuid,
    limit: usize,
    repo: &dyn EventRepository,
) -> Result<Vec<DiceRoll>, DomainError> {
    let session = load_existing(session_id, repo).await?;
    Ok(session.recent_rolls(limit))
}

#[cfg(test)]
mod tests {
    use vowbound_core::repository::StoredEvent;
    use vowbound_rules::domain::dice::DieType;
    use vowbound_rules::domain::resolution::{DiceResolver, RollActor, RollRequest};
    use vowbound_test_support::{EmptyEventRepository, RecordingEventRepository, SequenceRng, fixed_clock};

    use super::*;
    use crate::application::command_handlers::{handle_create_session, handle_roll_dice};
    use crate::domain::commands::{CreateSession, RollDice};

    async fn session_with_rolls(session_id: Uuid, faces: &[u32]) -> Vec<StoredEvent> {
        let mut history = handle_create_session(
            &CreateSession {
                correlation_id: Uuid::new_v4(),
                session_id,
                name: "Culling Game".to_owned(),
                master_id: Uuid::new_v4(),
            },
            &fixed_clock(),
            &RecordingEventRepository::new(),
        )
        .await
        .unwrap();
        let mut rng = SequenceRng::new(faces.to_vec());
        for _ in faces {
            let outcome = handle_roll_dice(
                &RollDice {
                    correlation_id: Uuid::new_v4(),
                    session_id,
                    actor: RollActor {
                        id: Uuid::new_v4(),
                        name: "Hakari".to_owned(),
                        character_id: None,
                    },
                    request: RollRequest::plain(DieType::D12),
                },
                &DiceResolver::new(),
                &fixed_clock(),
                &mut rng,
                &RecordingEventRepository::with_history(session_id, history.clone()),
            )
            .await
            .unwrap();
            history.extend(outcome.session_events);
        }
        history
    }

    #[tokio::test]
    async fn test_get_session_by_id_returns_view() {
        let session_id = Uuid::new_v4();
        let repo = RecordingEventRepository::with_history(session_id, session_with_rolls(session_id, &[3, 9]).await);

        let view = get_session_by_id(session_id, &repo).await.unwrap();

        assert_eq!(view.name, "Culling Game");
        assert_eq!(view.roll_count, 2);
        assert_eq!(view.version, 3);
        assert!(!view.combat.active);
    }

    #[tokio::test]
    async fn test_get_recent_rolls_returns_latest_first() {
        let session_id = Uuid::new_v4();
        let repo = RecordingEventRepository::with_history(
            session_id,
            session_with_rolls(session_id, &[1, 2, 3, 4, 5, 6, 7]).await,
        );

        let rolls = get_recent_rolls(session_id, 5, &repo).await.unwrap();

        let faces: Vec<u32> = rolls.iter().map(|r| r.raw_result).collect();
        assert_eq!(faces, vec![7, 6, 5, 4, 3]);
    }

    #[tokio::test]
    async fn test_get_session_by_id_returns_not_found_for_empty_stream() {
        let id = Uuid::new_v4();

        let result = get_session_by_id(id, &EmptyEventRepository).await;

        match result {
            Err(DomainError::AggregateNotFound(found)) => assert_eq!(found, id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }
}
