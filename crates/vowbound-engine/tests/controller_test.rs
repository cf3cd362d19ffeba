mod common;

use std::sync::Arc;

use uuid::Uuid;
use vowbound_character::domain::abilities::MagicSchool;
use vowbound_character::domain::spells::Spell;
use vowbound_character::domain::states::{CharacterState, StateKind};
use vowbound_character::domain::vows::{BindingVow, VowEffect, VowEffectKind, VowKind};
use vowbound_core::actor::Actor;
use vowbound_core::aggregate::AggregateRoot;
use vowbound_core::error::DomainError;
use vowbound_core::repository::EventRepository;
use vowbound_core::stream::StreamFilter;
use vowbound_engine::config::EngineConfig;
use vowbound_engine::controller::{GameController, NewCharacter};
use vowbound_engine::observer::{Change, Origin};
use vowbound_rules::domain::attributes::{Attribute, Attributes};
use vowbound_rules::domain::dice::DieType;
use vowbound_rules::domain::resolution::RollRequest;
use vowbound_rules::domain::resources::ResourceKind;
use vowbound_test_support::{SequenceRng, fixed_clock};

use common::{ChangeLog, UnwritableStore, controller, controller_with_rng, memory_store};

fn hero(name: &str, dexterity: i32) -> NewCharacter {
    NewCharacter {
        name: name.to_owned(),
        attributes: Attributes::default().with(Attribute::Dexterity, dexterity),
        ..NewCharacter::default()
    }
}

/// A master-run session with one character played by `player`.
fn table(engine: &mut GameController, player: &Actor) -> (Uuid, Uuid) {
    engine.sign_in(Actor::master(Uuid::new_v4(), "GM"));
    let session_id = engine.create_session("Shibuya Incident").unwrap();
    engine.sign_in(player.clone());
    let character_id = engine.create_character(hero("Itadori", 14)).unwrap();
    engine.enroll_character(session_id, character_id).unwrap();
    engine.join_session(session_id, Some(character_id)).unwrap();
    (session_id, character_id)
}

#[tokio::test]
async fn test_black_flash_roll_restores_the_bound_character() {
    let store = memory_store();
    let mut engine = controller_with_rng(store.clone(), SequenceRng::new(vec![20]));
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, character_id) = table(&mut engine, &player);
    engine
        .set_resource(character_id, ResourceKind::Pe, 10)
        .unwrap();

    let roll = engine
        .roll(RollRequest::plain(DieType::D20).with_modifier(5).against(20))
        .unwrap();

    assert_eq!(roll.raw_result, 20);
    assert_eq!(roll.total, 25);
    assert_eq!(roll.success, Some(true));
    assert!(roll.black_flash);
    assert_eq!(roll.actor_id, player.user_id);
    assert_eq!(roll.character_id, Some(character_id));
    let resources = engine.character(character_id).unwrap().resources();
    assert_eq!(resources.pe.current(), 40);
    assert_eq!(resources.ether.current(), 40);
    assert_eq!(resources.vigor.current(), 45);
    assert_eq!(resources.health.current(), 120);

    engine.flush().await;
    let stored = store.load_events(character_id).await.unwrap();
    assert_eq!(stored.last().unwrap().event_type, "character.black_flash_restored");
    assert_eq!(
        store.load_events(session_id).await.unwrap().len(),
        3,
        "created, enrolled, rolled"
    );
}

#[tokio::test]
async fn test_ordinary_roll_does_not_restore() {
    let mut engine = controller_with_rng(memory_store(), SequenceRng::new(vec![19]));
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (_, character_id) = table(&mut engine, &player);
    engine
        .set_resource(character_id, ResourceKind::Ether, 0)
        .unwrap();

    let roll = engine
        .roll(RollRequest::plain(DieType::D20).with_modifier(10).against(20))
        .unwrap();

    assert!(!roll.black_flash);
    assert_eq!(roll.success, Some(true));
    assert_eq!(
        engine
            .character(character_id)
            .unwrap()
            .resources()
            .ether
            .current(),
        0
    );
}

#[tokio::test]
async fn test_combat_from_enrolled_characters() {
    let mut engine = controller_with_rng(memory_store(), SequenceRng::new(vec![10, 10, 10]));
    engine.sign_in(Actor::master(Uuid::new_v4(), "GM"));
    let session_id = engine.create_session("Night Parade").unwrap();
    engine.sign_in(Actor::player(Uuid::new_v4(), "Party"));
    for (name, dexterity) in [("Nobara", 8), ("Yuji", 14), ("Megumi", 10)] {
        let id = engine.create_character(hero(name, dexterity)).unwrap();
        engine.enroll_character(session_id, id).unwrap();
    }

    engine.start_combat_with_enrolled(session_id).unwrap();

    let combat = engine.session(session_id).unwrap().combat().clone();
    let order: Vec<(&str, i32)> = combat
        .participants
        .iter()
        .map(|p| (p.name.as_str(), p.initiative))
        .collect();
    assert_eq!(order, vec![("Yuji", 24), ("Megumi", 20), ("Nobara", 18)]);
    assert_eq!(combat.current().unwrap().name, "Yuji");
    assert_eq!(combat.round, 1);

    for _ in 0..3 {
        engine.advance_turn(session_id).unwrap();
    }
    let combat = engine.session(session_id).unwrap().combat();
    assert_eq!(combat.current_turn_index, 0);
    assert_eq!(combat.round, 2);

    engine.end_combat(session_id).unwrap();
    let combat = engine.session(session_id).unwrap().combat();
    assert!(!combat.active);
    assert!(combat.participants.is_empty());
    assert_eq!(combat.round, 1);
    assert!(matches!(
        engine.advance_turn(session_id),
        Err(DomainError::CombatNotActive)
    ));
    assert!(matches!(
        engine.end_combat(session_id),
        Err(DomainError::CombatNotActive)
    ));
}

#[tokio::test]
async fn test_start_combat_twice_is_invalid_state() {
    let mut engine = controller(memory_store());
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, _) = table(&mut engine, &player);
    engine.start_combat_with_enrolled(session_id).unwrap();

    let result = engine.start_combat_with_enrolled(session_id);

    assert!(matches!(result, Err(DomainError::InvalidState(_))));
}

#[tokio::test]
async fn test_recent_rolls_honour_configured_limit() {
    let mut engine = GameController::new(
        memory_store(),
        Arc::new(fixed_clock()),
        Box::new(SequenceRng::new(vec![1, 2, 3, 4])),
        &EngineConfig {
            recent_rolls: 3,
            ..EngineConfig::default()
        },
    );
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    table(&mut engine, &player);
    for _ in 0..4 {
        engine.roll(RollRequest::plain(DieType::D6)).unwrap();
    }

    let recent: Vec<u32> = engine
        .recent_rolls()
        .unwrap()
        .iter()
        .map(|roll| roll.raw_result)
        .collect();

    assert_eq!(recent, vec![4, 3, 2]);
    assert_eq!(engine.current_session().unwrap().rolls().len(), 4);
}

#[tokio::test]
async fn test_vow_binding_and_toggling_permissions() {
    let mut engine = controller(memory_store());
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (_, character_id) = table(&mut engine, &player);
    let vow = BindingVow::new(
        "Heavenly Restriction",
        VowKind::Permanent,
        VowEffect::new(VowEffectKind::AttributeModifier, 2.0).targeting("strength"),
    );

    engine.sign_in(Actor::player(Uuid::new_v4(), "Stranger"));
    assert!(matches!(
        engine.bind_vow(character_id, vow.clone()),
        Err(DomainError::Forbidden(_))
    ));

    engine.sign_in(Actor::master(Uuid::new_v4(), "GM"));
    let vow_id = engine.bind_vow(character_id, vow).unwrap();
    assert!(matches!(
        engine.toggle_vow(character_id, vow_id),
        Err(DomainError::Forbidden(_))
    ));

    engine.sign_in(player);
    assert!(engine.toggle_vow(character_id, vow_id).unwrap());
    assert!(!engine.toggle_vow(character_id, vow_id).unwrap());
    assert_eq!(engine.character(character_id).unwrap().vows().len(), 1);
}

#[tokio::test]
async fn test_spells_and_states_reach_the_store_and_followers() {
    let store = memory_store();
    let mut engine = controller(store.clone());
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (_, character_id) = table(&mut engine, &player);
    engine.flush().await;
    let mut follower = controller(store.clone());
    follower.load_character(character_id).await.unwrap();
    let mut feed = follower.subscribe(StreamFilter::Aggregate(character_id)).await.unwrap();

    let spell_id = engine
        .learn_spell(character_id, Spell::new("Divergent Fist", MagicSchool::Invocation, 1, 5))
        .unwrap();
    engine.sign_in(Actor::master(Uuid::new_v4(), "GM"));
    let state_id = engine
        .apply_state(character_id, CharacterState::new("Exhausted", StateKind::Debuff).lasting(2))
        .unwrap();
    engine.flush().await;

    assert_eq!(follower.drain_remote(&mut feed).await, 2);
    let followed = follower.character(character_id).unwrap();
    assert_eq!(followed.spells()[0].id, spell_id);
    assert_eq!(followed.states()[0].id, state_id);

    engine.sign_in(Actor::player(Uuid::new_v4(), "Stranger"));
    assert!(matches!(
        engine.clear_state(character_id, state_id),
        Err(DomainError::Forbidden(_))
    ));
    engine.sign_in(player);
    engine.clear_state(character_id, state_id).unwrap();
    engine.forget_spell(character_id, spell_id).unwrap();
    engine.shutdown().await;

    let mut restarted = controller(store);
    let character = restarted.load_character(character_id).await.unwrap();
    assert!(character.spells().is_empty());
    assert!(character.states().is_empty());
    assert_eq!(character.version(), 5);
}

#[tokio::test]
async fn test_second_controller_follows_the_change_stream() {
    let store = memory_store();
    let mut gm = controller_with_rng(store.clone(), SequenceRng::new(vec![12]));
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, character_id) = table(&mut gm, &player);
    gm.flush().await;

    let mut follower = controller(store.clone());
    follower.load_session(session_id).await.unwrap();
    follower.load_character(character_id).await.unwrap();
    let mut feed = follower.subscribe(StreamFilter::All).await.unwrap();
    let log = ChangeLog::default();
    follower.register_observer(log.observer());

    gm.roll(RollRequest::plain(DieType::D20).against(10)).unwrap();
    gm.set_resource(character_id, ResourceKind::Health, 500).unwrap();
    gm.flush().await;

    assert_eq!(follower.drain_remote(&mut feed).await, 2);
    let session = follower.session(session_id).unwrap();
    assert_eq!(session.rolls().len(), 1);
    assert_eq!(session.version(), gm.session(session_id).unwrap().version());
    assert_eq!(
        follower
            .character(character_id)
            .unwrap()
            .resources()
            .health
            .current(),
        120
    );
    let changes = log.changes();
    assert!(matches!(
        &changes[0],
        Change::Roll { origin: Origin::Remote, roll, .. } if roll.raw_result == 12
    ));
    assert!(matches!(
        changes[1],
        Change::Character { origin: Origin::Remote, .. }
    ));
}

#[tokio::test]
async fn test_own_events_echoed_by_the_stream_are_skipped() {
    let store = memory_store();
    let mut engine = controller(store.clone());
    let mut feed = engine
        .subscribe(StreamFilter::EventTypePrefix("session.".into()))
        .await
        .unwrap();
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, _) = table(&mut engine, &player);
    engine.flush().await;

    let applied = engine.drain_remote(&mut feed).await;

    assert_eq!(applied, 0);
    assert_eq!(engine.session(session_id).unwrap().version(), 2);
}

#[tokio::test]
async fn test_remote_creation_brings_new_aggregates_into_view() {
    let store = memory_store();
    let mut watcher = controller(store.clone());
    let mut feed = watcher.subscribe(StreamFilter::All).await.unwrap();
    let mut gm = controller(store.clone());
    gm.sign_in(Actor::master(Uuid::new_v4(), "GM"));
    let session_id = gm.create_session("Kyoto Exchange").unwrap();
    gm.flush().await;

    assert_eq!(watcher.drain_remote(&mut feed).await, 1);

    assert_eq!(watcher.session(session_id).unwrap().name(), "Kyoto Exchange");
}

#[tokio::test]
async fn test_racing_advances_keep_the_first_write() {
    let store = memory_store();
    let mut gm = controller(store.clone());
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, character_id) = table(&mut gm, &player);
    let npc_roster = vec![vowbound_session::domain::combat::Combatant {
        id: Uuid::new_v4(),
        name: "Jogo".to_owned(),
        dexterity: 0,
        is_player: false,
        character_id: None,
    }];
    gm.start_combat(session_id, &npc_roster).unwrap();
    gm.flush().await;
    let mut rival = controller(store.clone());
    rival.load_session(session_id).await.unwrap();
    rival.load_character(character_id).await.unwrap();

    gm.advance_turn(session_id).unwrap();
    rival.advance_turn(session_id).unwrap();
    gm.flush().await;
    rival.flush().await;

    let stored = store.load_events(session_id).await.unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(
        stored.iter().filter(|e| e.event_type == "session.turn_advanced").count(),
        1
    );
    assert_eq!(rival.session(session_id).unwrap().combat().round, 2);
}

#[tokio::test]
async fn test_losing_a_write_race_reloads_and_later_writes_persist() {
    let store = memory_store();
    let mut gm = controller(store.clone());
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, _) = table(&mut gm, &player);
    gm.start_combat_with_enrolled(session_id).unwrap();
    gm.flush().await;
    let mut rival = controller(store.clone());
    rival.load_session(session_id).await.unwrap();
    let mut feed = rival
        .subscribe(StreamFilter::EventTypePrefix("session.".into()))
        .await
        .unwrap();

    gm.advance_turn(session_id).unwrap();
    gm.flush().await;
    rival.advance_turn(session_id).unwrap();
    rival.flush().await;
    rival.drain_remote(&mut feed).await;

    let head = store.load_events(session_id).await.unwrap();
    assert_eq!(head.len(), 4);
    assert_eq!(rival.session(session_id).unwrap().version(), 4);
    assert_eq!(
        rival.session(session_id).unwrap().combat(),
        gm.session(session_id).unwrap().combat()
    );

    rival.advance_turn(session_id).unwrap();
    rival.end_combat(session_id).unwrap();
    rival.flush().await;

    let stored = store.load_events(session_id).await.unwrap();
    assert_eq!(stored.len(), 6);
    assert_eq!(stored.last().unwrap().event_type, "session.combat_ended");
    let mut reloaded = controller(store);
    let session = reloaded.load_session(session_id).await.unwrap();
    assert!(!session.combat().active);
    assert_eq!(session.version(), 6);
}

#[tokio::test]
async fn test_npcs_sharing_an_owner_get_distinct_participants() {
    let mut engine = controller(memory_store());
    engine.sign_in(Actor::master(Uuid::new_v4(), "GM"));
    let session_id = engine.create_session("Shibuya Incident").unwrap();
    let jogo = engine.create_character(hero("Jogo", 12)).unwrap();
    let hanami = engine.create_character(hero("Hanami", 9)).unwrap();
    engine.enroll_character(session_id, jogo).unwrap();
    engine.enroll_character(session_id, hanami).unwrap();

    engine.start_combat_with_enrolled(session_id).unwrap();

    let combat = engine.session(session_id).unwrap().combat();
    let ids: Vec<Uuid> = combat.participants.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![jogo, hanami]);
}

#[tokio::test]
async fn test_failed_sync_keeps_local_state_and_notifies() {
    let mut engine = controller(Arc::new(UnwritableStore::default()));
    let log = ChangeLog::default();
    engine.register_observer(log.observer());
    engine.sign_in(Actor::master(Uuid::new_v4(), "GM"));

    let session_id = engine.create_session("Hidden Inventory").unwrap();
    engine.flush().await;

    assert!(engine.session(session_id).unwrap().is_created());
    assert_eq!(
        log.changes(),
        vec![Change::Session {
            session_id,
            origin: Origin::Local
        }]
    );
}

#[tokio::test]
async fn test_restart_rebuilds_state_from_the_store() {
    let store = memory_store();
    let mut engine = controller_with_rng(store.clone(), SequenceRng::new(vec![7]));
    let player = Actor::player(Uuid::new_v4(), "Yuji");
    let (session_id, character_id) = table(&mut engine, &player);
    engine.roll(RollRequest::plain(DieType::D8)).unwrap();
    engine.shutdown().await;

    let mut restarted = controller(store);
    let session = restarted.load_session(session_id).await.unwrap();

    assert_eq!(session.characters(), &[character_id]);
    assert_eq!(session.recent_rolls(5)[0].raw_result, 7);
    assert!(matches!(
        restarted.load_character(Uuid::new_v4()).await,
        Err(DomainError::AggregateNotFound(_))
    ));
}

#[tokio::test]
async fn test_unbound_controller_rejects_rolls() {
    let mut engine = controller(memory_store());
    engine.sign_in(Actor::player(Uuid::new_v4(), "Yuji"));

    let result = engine.roll(RollRequest::plain(DieType::D20));

    assert!(matches!(result, Err(DomainError::InvalidState(_))));
}
