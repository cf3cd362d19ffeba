//! Aggregate roots for the Characters context.

use tracing::info;
use uuid::Uuid;
use vowbound_core::actor::Actor;
use vowbound_core::aggregate::AggregateRoot;
use vowbound_core::clock::Clock;
use vowbound_core::error::DomainError;
use vowbound_core::event::EventMetadata;
use vowbound_rules::domain::attributes::Attributes;
use vowbound_rules::domain::point_buy;
use vowbound_rules::domain::resources::{ResourceKind, ResourcePools};

use super::abilities::{
    self, InnateAbility, MagicProficiency, PersonalityCategory, PersonalityTrait,
};
use super::commands::CreateCharacter;
use super::events::{
    BLACK_FLASH_RESTORED, BlackFlashRestored, CHARACTER_CREATED, CharacterCreated,
    CharacterEvent, CharacterEventKind, PERSONALITY_TRAIT_SET, PersonalityTraitSet, RESOURCE_SET,
    ResourceSet, SPELL_FORGOTTEN, SPELL_LEARNED, STATE_APPLIED, STATE_CLEARED, SpellForgotten,
    SpellLearned, StateApplied, StateCleared, VOW_BOUND, VOW_TOGGLED, VowBound, VowToggled,
};
use super::spells::Spell;
use super::states::CharacterState;
use super::vows::BindingVow;

/// The aggregate root for a character.
///
/// Domain methods validate against applied state only; events still
/// pending in `uncommitted_events` are not visible to them.
#[derive(Debug)]
pub struct Character {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) created: bool,
    pub(crate) owner_id: Uuid,
    pub(crate) name: String,
    pub(crate) level: u32,
    pub(crate) background: String,
    pub(crate) attributes: Attributes,
    pub(crate) resources: ResourcePools,
    pub(crate) innate_ability: Option<InnateAbility>,
    pub(crate) magic_proficiency: Option<MagicProficiency>,
    pub(crate) personality: Vec<PersonalityTrait>,
    pub(crate) vows: Vec<BindingVow>,
    pub(crate) spells: Vec<Spell>,
    pub(crate) states: Vec<CharacterState>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<CharacterEvent>,
}

impl Character {
    /// Creates an empty, not-yet-created character.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        let attributes = Attributes::default();
        Self {
            id,
            version: 0,
            created: false,
            owner_id: Uuid::nil(),
            name: String::new(),
            level: 1,
            background: String::new(),
            attributes,
            resources: ResourcePools::derived_from(&attributes),
            innate_ability: None,
            magic_proficiency: None,
            personality: Vec::new(),
            vows: Vec::new(),
            spells: Vec::new(),
            states: Vec::new(),
            uncommitted_events: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    #[must_use]
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn resources(&self) -> &ResourcePools {
        &self.resources
    }

    #[must_use]
    pub fn vows(&self) -> &[BindingVow] {
        &self.vows
    }

    #[must_use]
    pub fn personality(&self) -> &[PersonalityTrait] {
        &self.personality
    }

    #[must_use]
    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    /// Active buffs, debuffs and conditions.
    #[must_use]
    pub fn states(&self) -> &[CharacterState] {
        &self.states
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(
        &mut self,
        event_type: &str,
        kind: CharacterEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let metadata = EventMetadata::caused_by_command(
            event_type,
            self.id,
            self.next_sequence_number(),
            correlation_id,
            clock,
        );
        self.uncommitted_events.push(CharacterEvent { metadata, kind });
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if self.created {
            Ok(())
        } else {
            Err(DomainError::AggregateNotFound(self.id))
        }
    }

    fn ensure_master_or_owner(&self, actor: &Actor, action: &str) -> Result<(), DomainError> {
        if actor.is_master() || actor.owns(self.owner_id) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "only the game master or the owning player may {action}"
            )))
        }
    }

    /// Creates the character, producing a `CharacterCreated` event with full
    /// pools derived from the attributes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the character already exists,
    /// and `DomainError::Validation` for a blank name, an attribute set that
    /// breaks the point-buy rules, an unknown innate ability or a trait
    /// intensity above 3.
    pub fn create(&mut self, command: &CreateCharacter, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.created {
            return Err(DomainError::InvalidState(format!(
                "character {} already exists",
                self.id
            )));
        }
        if command.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "character name must not be empty".into(),
            ));
        }
        point_buy::validate(&command.attributes)
            .map_err(|e| DomainError::Validation(e.to_string()))?;

        let innate_ability = command
            .innate_ability
            .as_deref()
            .map(InnateAbility::from_catalogue)
            .transpose()?;

        let mut personality = Vec::new();
        for entry in &command.personality {
            abilities::validate_intensity(entry.intensity)?;
            abilities::set_trait(&mut personality, entry.category, entry.intensity);
        }

        self.record(
            CHARACTER_CREATED,
            CharacterEventKind::CharacterCreated(CharacterCreated {
                character_id: self.id,
                owner_id: command.owner_id,
                name: command.name.trim().to_owned(),
                background: command.background.clone(),
                attributes: command.attributes,
                resources: ResourcePools::derived_from(&command.attributes),
                innate_ability,
                magic_proficiency: command.magic_school.map(MagicProficiency::novice),
                personality,
            }),
            command.correlation_id,
            clock,
        );
        Ok(())
    }

    /// Sets a pool's current value, clamped into `[0, max]`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created.
    pub fn set_resource(
        &mut self,
        resource: ResourceKind,
        value: i32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        let current = self.resources.get(resource).set_current(value).current();
        self.record(
            RESOURCE_SET,
            CharacterEventKind::ResourceSet(ResourceSet {
                character_id: self.id,
                resource,
                current,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Refills pe, ether and vigor by half their maximum each. Every call
    /// restores again; restorations are not deduplicated by roll.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created.
    pub fn restore_from_black_flash(
        &mut self,
        roll_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        let restored = self.resources.after_black_flash();
        info!(
            character_id = %self.id,
            %roll_id,
            pe = restored.pe.current(),
            ether = restored.ether.current(),
            vigor = restored.vigor.current(),
            "black flash restoration"
        );
        self.record(
            BLACK_FLASH_RESTORED,
            CharacterEventKind::BlackFlashRestored(BlackFlashRestored {
                character_id: self.id,
                roll_id,
                pe: restored.pe.current(),
                ether: restored.ether.current(),
                vigor: restored.vigor.current(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Sets a personality trait; intensity 0 removes it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, or `DomainError::Validation` for an intensity above 3.
    pub fn set_personality_trait(
        &mut self,
        category: PersonalityCategory,
        intensity: u8,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        abilities::validate_intensity(intensity)?;
        self.record(
            PERSONALITY_TRAIT_SET,
            CharacterEventKind::PersonalityTraitSet(PersonalityTraitSet {
                character_id: self.id,
                category,
                intensity,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Attaches a binding vow.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, `DomainError::Forbidden` unless `actor` is the game master or
    /// the owning player, and `DomainError::Validation` for an invalid vow or
    /// a vow id already bound.
    pub fn bind_vow(
        &mut self,
        vow: BindingVow,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_master_or_owner(actor, "bind a vow")?;
        vow.validate()?;
        if self.vows.iter().any(|v| v.id == vow.id) {
            return Err(DomainError::Validation(format!(
                "vow {} is already bound",
                vow.id
            )));
        }
        self.record(
            VOW_BOUND,
            CharacterEventKind::VowBound(VowBound {
                character_id: self.id,
                vow,
                bound_by: actor.user_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Flips a vow between active and inactive.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, `DomainError::Forbidden` unless `actor` owns the character,
    /// and `DomainError::Validation` for an unknown vow.
    pub fn toggle_vow(
        &mut self,
        vow_id: Uuid,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        if !actor.owns(self.owner_id) {
            return Err(DomainError::Forbidden(
                "only the owning player may toggle a vow".into(),
            ));
        }
        let active = self
            .vows
            .iter()
            .find(|v| v.id == vow_id)
            .map(|v| !v.active)
            .ok_or_else(|| DomainError::Validation(format!("unknown vow: {vow_id}")))?;
        self.record(
            VOW_TOGGLED,
            CharacterEventKind::VowToggled(VowToggled {
                character_id: self.id,
                vow_id,
                active,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Adds a spell to the repertoire.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, `DomainError::Forbidden` unless `actor` is the game master or
    /// the owning player, and `DomainError::Validation` for an invalid spell
    /// or a spell id already learned.
    pub fn learn_spell(
        &mut self,
        spell: Spell,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_master_or_owner(actor, "teach a spell")?;
        spell.validate()?;
        if self.spells.iter().any(|s| s.id == spell.id) {
            return Err(DomainError::Validation(format!(
                "spell {} is already learned",
                spell.id
            )));
        }
        self.record(
            SPELL_LEARNED,
            CharacterEventKind::SpellLearned(SpellLearned {
                character_id: self.id,
                spell,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Removes a spell from the repertoire.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, `DomainError::Forbidden` unless `actor` is the game master or
    /// the owning player, and `DomainError::Validation` for an unknown spell.
    pub fn forget_spell(
        &mut self,
        spell_id: Uuid,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_master_or_owner(actor, "remove a spell")?;
        if !self.spells.iter().any(|s| s.id == spell_id) {
            return Err(DomainError::Validation(format!("unknown spell: {spell_id}")));
        }
        self.record(
            SPELL_FORGOTTEN,
            CharacterEventKind::SpellForgotten(SpellForgotten {
                character_id: self.id,
                spell_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Places a buff, debuff or condition on the character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, `DomainError::Forbidden` unless `actor` is the game master or
    /// the owning player, and `DomainError::Validation` for an invalid state
    /// or a state id already active.
    pub fn apply_state(
        &mut self,
        state: CharacterState,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_master_or_owner(actor, "apply a state")?;
        state.validate()?;
        if self.states.iter().any(|s| s.id == state.id) {
            return Err(DomainError::Validation(format!(
                "state {} is already active",
                state.id
            )));
        }
        self.record(
            STATE_APPLIED,
            CharacterEventKind::StateApplied(StateApplied {
                character_id: self.id,
                state,
                applied_by: actor.user_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Removes an active state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the character was never
    /// created, `DomainError::Forbidden` unless `actor` is the game master or
    /// the owning player, and `DomainError::Validation` for an unknown state.
    pub fn clear_state(
        &mut self,
        state_id: Uuid,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_master_or_owner(actor, "clear a state")?;
        if !self.states.iter().any(|s| s.id == state_id) {
            return Err(DomainError::Validation(format!("unknown state: {state_id}")));
        }
        self.record(
            STATE_CLEARED,
            CharacterEventKind::StateCleared(StateCleared {
                character_id: self.id,
                state_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl AggregateRoot for Character {
    type Event = CharacterEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            CharacterEventKind::CharacterCreated(payload) => {
                self.created = true;
                self.owner_id = payload.owner_id;
                self.name.clone_from(&payload.name);
                self.level = 1;
                self.background.clone_from(&payload.background);
                self.attributes = payload.attributes;
                self.resources = payload.resources;
                self.innate_ability.clone_from(&payload.innate_ability);
                self.magic_proficiency = payload.magic_proficiency;
                self.personality.clone_from(&payload.personality);
            }
            CharacterEventKind::ResourceSet(payload) => {
                self.resources = self.resources.set_current(payload.resource, payload.current);
            }
            CharacterEventKind::BlackFlashRestored(payload) => {
                self.resources = self
                    .resources
                    .set_current(ResourceKind::Pe, payload.pe)
                    .set_current(ResourceKind::Ether, payload.ether)
                    .set_current(ResourceKind::Vigor, payload.vigor);
            }
            CharacterEventKind::PersonalityTraitSet(payload) => {
                abilities::set_trait(&mut self.personality, payload.category, payload.intensity);
            }
            CharacterEventKind::VowBound(payload) => {
                self.vows.push(payload.vow.clone());
            }
            CharacterEventKind::VowToggled(payload) => {
                if let Some(vow) = self.vows.iter_mut().find(|v| v.id == payload.vow_id) {
                    vow.active = payload.active;
                }
            }
            CharacterEventKind::SpellLearned(payload) => {
                self.spells.push(payload.spell.clone());
            }
            CharacterEventKind::SpellForgotten(payload) => {
                self.spells.retain(|s| s.id != payload.spell_id);
            }
            CharacterEventKind::StateApplied(payload) => {
                self.states.push(payload.state.clone());
            }
            CharacterEventKind::StateCleared(payload) => {
                self.states.retain(|s| s.id != payload.state_id);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
