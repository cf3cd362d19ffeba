//! Dice roll resolution and the Black Flash rule.
//!
//! A roll draws one face, adds the effective modifier and, when a
//! difficulty class is given, decides success. A Black Flash is a natural 20
//! on a d20 that beats the difficulty class by at least
//! [`BLACK_FLASH_MARGIN`]; it is what refills a character's pe, ether and
//! vigor pools.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use vowbound_core::clock::Clock;
use vowbound_core::rng::DeterministicRng;

use super::attributes::Attribute;
use super::dice::DieType;
use super::modifiers::{ModifierContributor, RollContext};

/// How far past the difficulty class a natural 20 must land.
pub const BLACK_FLASH_MARGIN: i32 = 5;

/// Who is rolling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollActor {
    pub id: Uuid,
    pub name: String,
    /// The character bound to the actor, if any. Black Flash restoration
    /// targets this character.
    pub character_id: Option<Uuid>,
}

/// What to roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollRequest {
    pub die: DieType,
    pub modifier: i32,
    pub attribute: Option<Attribute>,
    pub difficulty_class: Option<i32>,
}

impl RollRequest {
    /// An unopposed roll with no modifier.
    #[must_use]
    pub fn plain(die: DieType) -> Self {
        Self {
            die,
            modifier: 0,
            attribute: None,
            difficulty_class: None,
        }
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = modifier;
        self
    }

    #[must_use]
    pub fn against(mut self, difficulty_class: i32) -> Self {
        self.difficulty_class = Some(difficulty_class);
        self
    }

    /// Records which attribute the modifier came from.
    #[must_use]
    pub fn using(mut self, attribute: Attribute) -> Self {
        self.attribute = Some(attribute);
        self
    }
}

/// An immutable roll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub character_id: Option<Uuid>,
    pub die: DieType,
    pub raw_result: u32,
    /// Effective modifier: the requested modifier plus every contributor.
    pub modifier: i32,
    pub total: i32,
    pub attribute: Option<Attribute>,
    pub difficulty_class: Option<i32>,
    /// `None` for unopposed rolls.
    pub success: Option<bool>,
    pub black_flash: bool,
    pub timestamp: DateTime<Utc>,
}

/// The Black Flash condition.
#[must_use]
pub fn is_black_flash(
    die: DieType,
    raw_result: u32,
    total: i32,
    difficulty_class: Option<i32>,
) -> bool {
    die == DieType::D20
        && raw_result == DieType::D20.sides()
        && difficulty_class
            .is_some_and(|dc| total >= dc.saturating_add(BLACK_FLASH_MARGIN))
}

/// Resolves roll requests, consulting registered modifier contributors.
#[derive(Debug, Clone, Default)]
pub struct DiceResolver {
    contributors: Vec<Arc<dyn ModifierContributor>>,
}

impl DiceResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a contributor consulted on every subsequent roll.
    pub fn register(&mut self, contributor: Arc<dyn ModifierContributor>) {
        self.contributors.push(contributor);
    }

    #[must_use]
    pub fn with_contributor(mut self, contributor: Arc<dyn ModifierContributor>) -> Self {
        self.register(contributor);
        self
    }

    #[must_use]
    pub fn contributors(&self) -> &[Arc<dyn ModifierContributor>] {
        &self.contributors
    }

    /// The base modifier plus every contributor's bonus.
    #[must_use]
    pub fn effective_modifier(&self, request: &RollRequest, actor: &RollActor) -> i32 {
        let context = RollContext {
            actor_id: actor.id,
            character_id: actor.character_id,
            die: request.die,
            attribute: request.attribute,
            difficulty_class: request.difficulty_class,
        };
        self.contributors
            .iter()
            .fold(request.modifier, |acc, contributor| {
                let bonus = contributor.contribute(&context);
                if bonus != 0 {
                    debug!(contributor = contributor.label(), bonus, "modifier contributed");
                }
                acc.saturating_add(bonus)
            })
    }

    /// Rolls `request.die` once and builds the roll record.
    ///
    /// The RNG is drawn from exactly once.
    #[allow(clippy::cast_possible_wrap)]
    pub fn resolve(
        &self,
        request: &RollRequest,
        actor: &RollActor,
        rng: &mut dyn DeterministicRng,
        clock: &dyn Clock,
    ) -> DiceRoll {
        let modifier = self.effective_modifier(request, actor);
        let raw_result = request.die.roll(rng);
        let total = (raw_result as i32).saturating_add(modifier);
        let success = request.difficulty_class.map(|dc| total >= dc);
        let black_flash = is_black_flash(request.die, raw_result, total, request.difficulty_class);

        debug!(
            actor = %actor.name,
            die = %request.die,
            raw_result,
            modifier,
            total,
            ?success,
            black_flash,
            "roll resolved"
        );

        DiceRoll {
            id: Uuid::new_v4(),
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            character_id: actor.character_id,
            die: request.die,
            raw_result,
            modifier,
            total,
            attribute: request.attribute,
            difficulty_class: request.difficulty_class,
            success,
            black_flash,
            timestamp: clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use vowbound_test_support::{MockRng, SequenceRng, fixed_clock};

    use super::*;
    use crate::domain::modifiers::FlatModifier;

    fn actor() -> RollActor {
        RollActor {
            id: Uuid::new_v4(),
            name: "Itadori".to_owned(),
            character_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_natural_twenty_plus_five_against_dc_twenty_is_a_black_flash() {
        let request = RollRequest::plain(DieType::D20).with_modifier(5).against(20);
        let mut rng = SequenceRng::new(vec![20]);

        let roll = DiceResolver::new().resolve(&request, &actor(), &mut rng, &fixed_clock());

        assert_eq!(roll.raw_result, 20);
        assert_eq!(roll.total, 25);
        assert_eq!(roll.success, Some(true));
        assert!(roll.black_flash);
        assert_eq!(roll.timestamp, fixed_clock().0);
    }

    #[test]
    fn test_black_flash_requires_the_margin_on_a_natural_twenty() {
        for modifier in -10..=15 {
            for dc in 0..=35 {
                let expected = 20 + modifier >= dc + BLACK_FLASH_MARGIN;
                assert_eq!(
                    is_black_flash(DieType::D20, 20, 20 + modifier, Some(dc)),
                    expected,
                    "modifier {modifier}, dc {dc}"
                );
            }
        }
    }

    #[test]
    fn test_natural_twenty_just_short_of_margin_succeeds_without_black_flash() {
        let request = RollRequest::plain(DieType::D20).with_modifier(4).against(20);
        let mut rng = SequenceRng::new(vec![20]);

        let roll = DiceResolver::new().resolve(&request, &actor(), &mut rng, &fixed_clock());

        assert_eq!(roll.total, 24);
        assert_eq!(roll.success, Some(true));
        assert!(!roll.black_flash);
    }

    #[test]
    fn test_unopposed_roll_has_no_success_and_no_black_flash() {
        let request = RollRequest::plain(DieType::D20).with_modifier(30);
        let mut rng = SequenceRng::new(vec![20]);

        let roll = DiceResolver::new().resolve(&request, &actor(), &mut rng, &fixed_clock());

        assert_eq!(roll.success, None);
        assert!(!roll.black_flash);
    }

    #[test]
    fn test_black_flash_only_on_d20() {
        assert!(!is_black_flash(DieType::D100, 20, 40, Some(10)));
        assert!(!is_black_flash(DieType::D20, 19, 40, Some(10)));
    }

    #[test]
    fn test_failure_against_difficulty_class() {
        let request = RollRequest::plain(DieType::D20).with_modifier(2).against(15);

        let roll = DiceResolver::new().resolve(&request, &actor(), &mut MockRng, &fixed_clock());

        assert_eq!(roll.raw_result, 1);
        assert_eq!(roll.total, 3);
        assert_eq!(roll.success, Some(false));
    }

    #[test]
    fn test_resolve_draws_exactly_once() {
        let mut rng = SequenceRng::new(vec![4, 99]);

        DiceResolver::new().resolve(
            &RollRequest::plain(DieType::D6),
            &actor(),
            &mut rng,
            &fixed_clock(),
        );

        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn test_contributors_are_added_to_the_modifier() {
        let resolver = DiceResolver::new()
            .with_contributor(Arc::new(FlatModifier::new("blessing", 2)))
            .with_contributor(Arc::new(
                FlatModifier::new("focus", 3).for_attribute(Attribute::Magic),
            ));
        let request = RollRequest::plain(DieType::D20)
            .with_modifier(1)
            .using(Attribute::Magic)
            .against(10);
        let mut rng = SequenceRng::new(vec![10]);

        let roll = resolver.resolve(&request, &actor(), &mut rng, &fixed_clock());

        assert_eq!(roll.modifier, 6);
        assert_eq!(roll.total, 16);
        assert_eq!(roll.attribute, Some(Attribute::Magic));
    }

    #[test]
    fn test_contributor_can_push_a_natural_twenty_into_black_flash() {
        let resolver =
            DiceResolver::new().with_contributor(Arc::new(FlatModifier::new("vow pact", 1)));
        let request = RollRequest::plain(DieType::D20).with_modifier(4).against(20);
        let mut rng = SequenceRng::new(vec![20]);

        let roll = resolver.resolve(&request, &actor(), &mut rng, &fixed_clock());

        assert!(roll.black_flash);
    }

    #[test]
    fn test_roll_records_actor_identity() {
        let who = actor();

        let roll = DiceResolver::new().resolve(
            &RollRequest::plain(DieType::D8),
            &who,
            &mut MockRng,
            &fixed_clock(),
        );

        assert_eq!(roll.actor_id, who.id);
        assert_eq!(roll.actor_name, "Itadori");
        assert_eq!(roll.character_id, who.character_id);
        assert_eq!(roll.die, DieType::D8);
    }
}
