//! The game controller: a single owner for every loaded aggregate.
//!
//! Mutations are synchronous. Each one runs the aggregate's domain method,
//! applies the resulting events locally, notifies observers and queues the
//! events for the sync worker. Remote events from a change-stream
//! subscription go through the same `apply`, skipping events this
//! controller has already applied. A remote event out of sequence with the
//! local copy replaces that copy with the store's stream.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use vowbound_character::application::command_handlers as character_handlers;
use vowbound_character::domain::abilities::{MagicSchool, PersonalityCategory, PersonalityTrait};
use vowbound_character::domain::aggregates::Character;
use vowbound_character::domain::commands::CreateCharacter;
use vowbound_character::domain::events::CharacterEvent;
use vowbound_character::domain::spells::Spell;
use vowbound_character::domain::states::CharacterState;
use vowbound_character::domain::vows::BindingVow;
use vowbound_core::actor::Actor;
use vowbound_core::aggregate::AggregateRoot;
use vowbound_core::clock::Clock;
use vowbound_core::error::DomainError;
use vowbound_core::repository::StoredEvent;
use vowbound_core::rng::DeterministicRng;
use vowbound_core::stream::{StreamFilter, Subscription};
use vowbound_rules::domain::attributes::Attributes;
use vowbound_rules::domain::resolution::{DiceResolver, DiceRoll, RollActor, RollRequest};
use vowbound_rules::domain::resources::ResourceKind;
use vowbound_session::application::command_handlers as session_handlers;
use vowbound_session::domain::aggregates::GameSession;
use vowbound_session::domain::combat::Combatant;
use vowbound_session::domain::events::{SessionEvent, SessionEventKind};

use crate::config::EngineConfig;
use crate::observer::{Change, Observer, ObserverId, Observers, Origin};
use crate::store::EventStore;
use crate::sync::{SyncBatch, SyncWorker};

/// Input for a new character. The acting user becomes the owner.
#[derive(Debug, Clone, Default)]
pub struct NewCharacter {
    pub name: String,
    pub background: String,
    pub attributes: Attributes,
    /// Innate ability catalogue key.
    pub innate_ability: Option<String>,
    pub magic_school: Option<MagicSchool>,
    pub personality: Vec<PersonalityTrait>,
}

/// The session the acting user is playing in, and the character they play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionBinding {
    session_id: Uuid,
    character_id: Option<Uuid>,
}

/// Owns loaded characters and sessions and keeps them in sync with the store.
pub struct GameController {
    store: Arc<dyn EventStore>,
    sync: SyncWorker,
    clock: Arc<dyn Clock>,
    rng: Box<dyn DeterministicRng>,
    resolver: DiceResolver,
    recent_rolls: usize,
    characters: HashMap<Uuid, Character>,
    sessions: HashMap<Uuid, GameSession>,
    /// Ids of every event reflected in local state.
    applied: HashSet<Uuid>,
    observers: Observers,
    actor: Option<Actor>,
    binding: Option<SessionBinding>,
}

fn lookup<A>(aggregates: &mut HashMap<Uuid, A>, id: Uuid) -> Result<&mut A, DomainError> {
    aggregates
        .get_mut(&id)
        .ok_or(DomainError::AggregateNotFound(id))
}

/// Where a remote event falls relative to the local copy of its aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// The aggregate is not loaded and this is not its creation event.
    Unknown,
    /// The event directly follows the local version.
    Next,
    /// The event repeats or skips a local version; holds the local version.
    Diverged(i64),
}

impl Placement {
    fn of(sequence_number: i64, local_version: Option<i64>) -> Self {
        match local_version {
            None if sequence_number == 1 => Self::Next,
            None => Self::Unknown,
            Some(local) if sequence_number == local + 1 => Self::Next,
            Some(local) => Self::Diverged(local),
        }
    }
}

/// Applies pending events locally and packages them for the sync worker.
fn stage<A: AggregateRoot>(aggregate: &mut A) -> SyncBatch {
    let expected_version = aggregate.version();
    let events = aggregate
        .commit_locally()
        .iter()
        .map(StoredEvent::from_domain_event)
        .collect();
    SyncBatch {
        aggregate_id: aggregate.aggregate_id(),
        expected_version,
        events,
    }
}

impl GameController {
    /// Creates a controller and spawns its sync worker on the current tokio
    /// runtime.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            sync: SyncWorker::spawn(Arc::clone(&store)),
            store,
            clock,
            rng,
            resolver: DiceResolver::new(),
            recent_rolls: config.recent_rolls,
            characters: HashMap::new(),
            sessions: HashMap::new(),
            applied: HashSet::new(),
            observers: Observers::default(),
            actor: None,
            binding: None,
        }
    }

    /// Replaces the resolver, e.g. to register modifier contributors.
    #[must_use]
    pub fn with_resolver(mut self, resolver: DiceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn register_observer(&mut self, observer: impl Observer + 'static) -> ObserverId {
        self.observers.register(Box::new(observer))
    }

    /// Returns `true` if the observer was registered.
    pub fn unregister_observer(&mut self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    /// Sets the acting user.
    pub fn sign_in(&mut self, actor: Actor) {
        info!(user_id = %actor.user_id, role = ?actor.role, "actor signed in");
        self.actor = Some(actor);
    }

    /// Clears the acting user and any session binding.
    pub fn sign_out(&mut self) {
        self.actor = None;
        self.binding = None;
    }

    #[must_use]
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    #[must_use]
    pub fn character(&self, character_id: Uuid) -> Option<&Character> {
        self.characters.get(&character_id)
    }

    #[must_use]
    pub fn session(&self, session_id: Uuid) -> Option<&GameSession> {
        self.sessions.get(&session_id)
    }

    /// The bound session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<&GameSession> {
        self.binding
            .and_then(|binding| self.sessions.get(&binding.session_id))
    }

    fn acting(&self) -> Result<&Actor, DomainError> {
        self.actor
            .as_ref()
            .ok_or_else(|| DomainError::InvalidState("no acting user is signed in".into()))
    }

    fn publish(&mut self, batch: SyncBatch, change: Change) {
        if batch.events.is_empty() {
            return;
        }
        self.applied
            .extend(batch.events.iter().map(|event| event.event_id));
        self.sync.enqueue(batch);
        self.observers.notify(&change);
    }

    // ---- loading -------------------------------------------------------

    /// Fetches a character's stream and keeps it loaded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` for an empty stream, or the
    /// store's error.
    pub async fn load_character(&mut self, character_id: Uuid) -> Result<&Character, DomainError> {
        let history = self.store.load_events(character_id).await?;
        if history.is_empty() {
            return Err(DomainError::AggregateNotFound(character_id));
        }
        let character = character_handlers::reconstitute(character_id, &history)?;
        self.applied.extend(history.iter().map(|event| event.event_id));
        self.characters.insert(character_id, character);
        lookup(&mut self.characters, character_id).map(|character| &*character)
    }

    /// Fetches a session's stream and keeps it loaded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` for an empty stream, or the
    /// store's error.
    pub async fn load_session(&mut self, session_id: Uuid) -> Result<&GameSession, DomainError> {
        let history = self.store.load_events(session_id).await?;
        if history.is_empty() {
            return Err(DomainError::AggregateNotFound(session_id));
        }
        let session = session_handlers::reconstitute(session_id, &history)?;
        self.applied.extend(history.iter().map(|event| event.event_id));
        self.sessions.insert(session_id, session);
        lookup(&mut self.sessions, session_id).map(|session| &*session)
    }

    // ---- characters ----------------------------------------------------

    /// Creates a character owned by the acting user.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in, or
    /// `DomainError::Validation` for invalid creation input.
    pub fn create_character(&mut self, draft: NewCharacter) -> Result<Uuid, DomainError> {
        let owner_id = self.acting()?.user_id;
        let command = CreateCharacter {
            correlation_id: Uuid::new_v4(),
            character_id: Uuid::new_v4(),
            owner_id,
            name: draft.name,
            background: draft.background,
            attributes: draft.attributes,
            innate_ability: draft.innate_ability,
            magic_school: draft.magic_school,
            personality: draft.personality,
        };
        let mut character = Character::new(command.character_id);
        character.create(&command, self.clock.as_ref())?;
        let batch = stage(&mut character);
        self.characters.insert(command.character_id, character);
        self.publish(
            batch,
            Change::Character {
                character_id: command.character_id,
                origin: Origin::Local,
            },
        );
        Ok(command.character_id)
    }

    /// Sets a resource pool's current value, clamped into `[0, max]`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character is not loaded.
    pub fn set_resource(
        &mut self,
        character_id: Uuid,
        resource: ResourceKind,
        value: i32,
    ) -> Result<(), DomainError> {
        let character = lookup(&mut self.characters, character_id)?;
        character.set_resource(resource, value, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    /// Sets a personality trait; intensity 0 removes it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character is not
    /// loaded, or `DomainError::Validation` for an intensity above 3.
    pub fn set_personality_trait(
        &mut self,
        character_id: Uuid,
        category: PersonalityCategory,
        intensity: u8,
    ) -> Result<(), DomainError> {
        let character = lookup(&mut self.characters, character_id)?;
        character.set_personality_trait(category, intensity, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    /// Binds a vow to a character on behalf of the acting user. Returns the
    /// vow id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in,
    /// `DomainError::Forbidden` unless the acting user is the game master or
    /// the owner, or `DomainError::Validation` for an invalid vow.
    pub fn bind_vow(&mut self, character_id: Uuid, vow: BindingVow) -> Result<Uuid, DomainError> {
        let actor = self.acting()?.clone();
        let vow_id = vow.id;
        let character = lookup(&mut self.characters, character_id)?;
        character.bind_vow(vow, &actor, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(vow_id)
    }

    /// Flips a vow on or off. Returns the vow's new state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in,
    /// `DomainError::Forbidden` unless the acting user owns the character, or
    /// `DomainError::Validation` for an unknown vow.
    pub fn toggle_vow(&mut self, character_id: Uuid, vow_id: Uuid) -> Result<bool, DomainError> {
        let actor = self.acting()?.clone();
        let character = lookup(&mut self.characters, character_id)?;
        character.toggle_vow(vow_id, &actor, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        let active = character
            .vows()
            .iter()
            .find(|vow| vow.id == vow_id)
            .is_some_and(|vow| vow.active);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(active)
    }

    /// Teaches a character a spell on behalf of the acting user. Returns the
    /// spell id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in,
    /// `DomainError::Forbidden` unless the acting user is the game master or
    /// the owner, or `DomainError::Validation` for an invalid spell.
    pub fn learn_spell(&mut self, character_id: Uuid, spell: Spell) -> Result<Uuid, DomainError> {
        let actor = self.acting()?.clone();
        let spell_id = spell.id;
        let character = lookup(&mut self.characters, character_id)?;
        character.learn_spell(spell, &actor, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(spell_id)
    }

    /// # Errors
    ///
    /// Same as [`Self::learn_spell`], with `DomainError::Validation` for an
    /// unknown spell.
    pub fn forget_spell(&mut self, character_id: Uuid, spell_id: Uuid) -> Result<(), DomainError> {
        let actor = self.acting()?.clone();
        let character = lookup(&mut self.characters, character_id)?;
        character.forget_spell(spell_id, &actor, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    /// Places a state on a character on behalf of the acting user. Returns
    /// the state id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in,
    /// `DomainError::Forbidden` unless the acting user is the game master or
    /// the owner, or `DomainError::Validation` for an invalid state.
    pub fn apply_state(
        &mut self,
        character_id: Uuid,
        state: CharacterState,
    ) -> Result<Uuid, DomainError> {
        let actor = self.acting()?.clone();
        let state_id = state.id;
        let character = lookup(&mut self.characters, character_id)?;
        character.apply_state(state, &actor, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(state_id)
    }

    /// # Errors
    ///
    /// Same as [`Self::apply_state`], with `DomainError::Validation` for an
    /// unknown state.
    pub fn clear_state(&mut self, character_id: Uuid, state_id: Uuid) -> Result<(), DomainError> {
        let actor = self.acting()?.clone();
        let character = lookup(&mut self.characters, character_id)?;
        character.clear_state(state_id, &actor, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(character);
        self.publish(
            batch,
            Change::Character {
                character_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    // ---- sessions ------------------------------------------------------

    /// Opens a session run by the acting user.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in,
    /// `DomainError::Forbidden` unless the acting user is a game master, or
    /// `DomainError::Validation` for a blank name.
    pub fn create_session(&mut self, name: &str) -> Result<Uuid, DomainError> {
        let actor = self.acting()?;
        if !actor.is_master() {
            return Err(DomainError::Forbidden(
                "only a game master may open a session".into(),
            ));
        }
        let master_id = actor.user_id;
        let session_id = Uuid::new_v4();
        let mut session = GameSession::new(session_id);
        session.create(name, master_id, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(&mut session);
        self.sessions.insert(session_id, session);
        self.publish(
            batch,
            Change::Session {
                session_id,
                origin: Origin::Local,
            },
        );
        Ok(session_id)
    }

    /// Enrols a loaded character in a session. Enrolling twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the session or the
    /// character is not loaded.
    pub fn enroll_character(&mut self, session_id: Uuid, character_id: Uuid) -> Result<(), DomainError> {
        if !self.characters.contains_key(&character_id) {
            return Err(DomainError::AggregateNotFound(character_id));
        }
        let session = lookup(&mut self.sessions, session_id)?;
        session.enroll_character(character_id, Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(session);
        self.publish(
            batch,
            Change::Session {
                session_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    /// Binds the acting user to a session, optionally playing a character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in or when
    /// the session or character is not loaded.
    pub fn join_session(&mut self, session_id: Uuid, character_id: Option<Uuid>) -> Result<(), DomainError> {
        self.acting()?;
        if !self.sessions.get(&session_id).is_some_and(GameSession::is_created) {
            return Err(DomainError::InvalidState(format!(
                "session {session_id} is not loaded"
            )));
        }
        if let Some(character_id) = character_id.filter(|id| !self.characters.contains_key(id)) {
            return Err(DomainError::InvalidState(format!(
                "character {character_id} is not loaded"
            )));
        }
        self.binding = Some(SessionBinding {
            session_id,
            character_id,
        });
        Ok(())
    }

    /// Leaves the bound session.
    pub fn leave_session(&mut self) {
        self.binding = None;
    }

    /// Starts combat with an explicit roster.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EmptyRoster` for an empty roster,
    /// `DomainError::InvalidState` if combat is already running, or
    /// `DomainError::AggregateNotFound` if the session is not loaded.
    pub fn start_combat(&mut self, session_id: Uuid, roster: &[Combatant]) -> Result<(), DomainError> {
        let session = lookup(&mut self.sessions, session_id)?;
        session.start_combat(roster, self.rng.as_mut(), Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(session);
        self.publish(
            batch,
            Change::Session {
                session_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    /// Starts combat with every enrolled character, using their current
    /// dexterity.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if an enrolled character is not
    /// loaded, plus the errors of [`Self::start_combat`].
    pub fn start_combat_with_enrolled(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(DomainError::AggregateNotFound(session_id))?;
        let roster = session
            .characters()
            .iter()
            .map(|character_id| {
                self.characters
                    .get(character_id)
                    .map(|character| Combatant {
                        id: character.id,
                        name: character.name().to_owned(),
                        dexterity: character.attributes().dexterity,
                        is_player: true,
                        character_id: Some(character.id),
                    })
                    .ok_or_else(|| {
                        DomainError::InvalidState(format!(
                            "enrolled character {character_id} is not loaded"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.start_combat(session_id, &roster)
    }

    /// Passes the turn to the next participant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CombatNotActive` when no combat is running, or
    /// `DomainError::AggregateNotFound` if the session is not loaded.
    pub fn advance_turn(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        let session = lookup(&mut self.sessions, session_id)?;
        session.advance_turn(Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(session);
        self.publish(
            batch,
            Change::Session {
                session_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    /// Ends combat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CombatNotActive` when no combat is running, or
    /// `DomainError::AggregateNotFound` if the session is not loaded.
    pub fn end_combat(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        let session = lookup(&mut self.sessions, session_id)?;
        session.end_combat(Uuid::new_v4(), self.clock.as_ref())?;
        let batch = stage(session);
        self.publish(
            batch,
            Change::Session {
                session_id,
                origin: Origin::Local,
            },
        );
        Ok(())
    }

    // ---- dice ----------------------------------------------------------

    /// Rolls in the bound session as the acting user. A Black Flash
    /// restores the bound character's pools.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when nobody is signed in or no
    /// session is bound.
    pub fn roll(&mut self, request: RollRequest) -> Result<DiceRoll, DomainError> {
        let actor = self.acting()?;
        let binding = self
            .binding
            .ok_or_else(|| DomainError::InvalidState("no session is bound".into()))?;
        let roll_actor = RollActor {
            id: actor.user_id,
            name: actor.name.clone(),
            character_id: binding.character_id,
        };
        let correlation_id = Uuid::new_v4();

        let session = self
            .sessions
            .get_mut(&binding.session_id)
            .ok_or_else(|| DomainError::InvalidState("bound session is not loaded".into()))?;
        let roll = session.roll_dice(
            &request,
            &roll_actor,
            &self.resolver,
            self.rng.as_mut(),
            correlation_id,
            self.clock.as_ref(),
        )?;
        let batch = stage(session);
        self.publish(
            batch,
            Change::Roll {
                session_id: binding.session_id,
                roll: roll.clone(),
                origin: Origin::Local,
            },
        );

        if let (true, Some(character_id)) = (roll.black_flash, roll.character_id) {
            match self.characters.get_mut(&character_id) {
                Some(character) => {
                    character.restore_from_black_flash(roll.id, correlation_id, self.clock.as_ref())?;
                    let batch = stage(character);
                    self.publish(
                        batch,
                        Change::Character {
                            character_id,
                            origin: Origin::Local,
                        },
                    );
                }
                None => warn!(%character_id, "black flash for a character that is not loaded"),
            }
        }
        Ok(roll)
    }

    /// The bound session's latest rolls, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` when no session is bound.
    pub fn recent_rolls(&self) -> Result<Vec<DiceRoll>, DomainError> {
        self.current_session()
            .map(|session| session.recent_rolls(self.recent_rolls))
            .ok_or_else(|| DomainError::InvalidState("no session is bound".into()))
    }

    // ---- change stream -------------------------------------------------

    /// Opens a change-stream subscription on the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn subscribe(&self, filter: StreamFilter) -> Result<Subscription, DomainError> {
        self.store.subscribe(filter).await
    }

    /// Applies a change-stream event. Returns `false` for events already
    /// applied, of an unknown type, or for aggregates that are not loaded
    /// (other than their creation event).
    ///
    /// An event that does not directly follow the local version means the
    /// local copy diverged from the store, e.g. after losing a write race.
    /// The aggregate is then reloaded from the store instead.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Collaborator` if the payload cannot be decoded,
    /// or the store's error when a reload fails.
    pub async fn apply_remote(&mut self, stored: &StoredEvent) -> Result<bool, DomainError> {
        if self.applied.contains(&stored.event_id) {
            debug!(event_id = %stored.event_id, "skipping already-applied event");
            return Ok(false);
        }
        let id = stored.aggregate_id;

        let change = if stored.event_type.starts_with("character.") {
            let event = CharacterEvent::try_from(stored)?;
            let local_version = self.characters.get(&id).map(AggregateRoot::version);
            match Placement::of(stored.sequence_number, local_version) {
                Placement::Unknown => return Ok(false),
                Placement::Next => self
                    .characters
                    .entry(id)
                    .or_insert_with(|| Character::new(id))
                    .apply(&event),
                Placement::Diverged(local) => {
                    warn!(
                        character_id = %id,
                        local_version = local,
                        sequence_number = stored.sequence_number,
                        "character diverged from the store; reloading"
                    );
                    self.load_character(id).await?;
                }
            }
            Change::Character {
                character_id: id,
                origin: Origin::Remote,
            }
        } else if stored.event_type.starts_with("session.") {
            let event = SessionEvent::try_from(stored)?;
            let local_version = self.sessions.get(&id).map(AggregateRoot::version);
            match Placement::of(stored.sequence_number, local_version) {
                Placement::Unknown => return Ok(false),
                Placement::Next => self
                    .sessions
                    .entry(id)
                    .or_insert_with(|| GameSession::new(id))
                    .apply(&event),
                Placement::Diverged(local) => {
                    warn!(
                        session_id = %id,
                        local_version = local,
                        sequence_number = stored.sequence_number,
                        "session diverged from the store; reloading"
                    );
                    self.load_session(id).await?;
                }
            }
            match event.kind {
                SessionEventKind::DiceRolled(payload) => Change::Roll {
                    session_id: id,
                    roll: payload.roll,
                    origin: Origin::Remote,
                },
                _ => Change::Session {
                    session_id: id,
                    origin: Origin::Remote,
                },
            }
        } else {
            debug!(event_type = %stored.event_type, "ignoring unknown event type");
            return Ok(false);
        };

        self.applied.insert(stored.event_id);
        self.observers.notify(&change);
        Ok(true)
    }

    /// Applies every event already delivered to `subscription`. Returns how
    /// many changed local state. Events that fail to apply are logged and
    /// skipped.
    pub async fn drain_remote(&mut self, subscription: &mut Subscription) -> usize {
        let mut applied = 0;
        for stored in subscription.drain() {
            match self.apply_remote(&stored).await {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(event_id = %stored.event_id, error = %e, "failed to apply remote event");
                }
            }
        }
        applied
    }

    /// Waits until every queued write has been attempted.
    pub async fn flush(&self) {
        self.sync.flush().await;
    }

    /// Drains pending writes and stops the sync worker.
    pub async fn shutdown(self) {
        self.sync.shutdown().await;
    }
}
