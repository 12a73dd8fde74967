//! Session gateway flows against on-disk characters and terrains.

use std::fs;
use std::time::Duration;
use tactica::{
    new_player_id, CharacterStore, ClientHello, GameConfig, GameMap, GameMode, GameWorld,
    Outbound, Position, ServerEvent, SessionGateway, TerrainStore,
};
use tempfile::TempDir;

const ISLAND: &str = r#"{
    "gridWidth": 4,
    "gridHeight": 3,
    "terrain": [
        { "terrain": { "sprite": "tree", "properties": { "blockingVision": true } }, "background": "grass" },
        { "terrain": null, "background": "grass" },
        { "terrain": null, "background": "grass" },
        { "terrain": null, "background": "sand" },
        { "terrain": null, "background": "grass" },
        { "terrain": { "sprite": "bush", "properties": { "blockingVision": false } }, "background": "grass" },
        { "terrain": null, "background": "grass" },
        { "terrain": null, "background": "sand" },
        { "terrain": null, "background": null },
        { "terrain": null, "background": null },
        { "terrain": null, "background": null },
        { "terrain": null, "background": null }
    ],
    "npcs": [ { "id": "crab", "x": 3, "y": 2 } ]
}"#;

struct Setup {
    dir: TempDir,
    gateway: SessionGateway,
}

fn setup() -> Setup {
    let dir = TempDir::new().unwrap();
    let characters = dir.path().join("characters");
    let terrains = dir.path().join("terrains");
    fs::create_dir_all(&characters).unwrap();
    fs::create_dir_all(&terrains).unwrap();

    fs::write(
        characters.join("Aria.json"),
        r#"{"name":"Aria","charClass":"warrior","stats":{"strength":2,"luck":1}}"#,
    )
    .unwrap();
    fs::write(characters.join("Broken.json"), r#"{"name":"Broken"}"#).unwrap();
    fs::write(characters.join("Garbled.json"), "{{{").unwrap();
    fs::write(terrains.join("island.json"), ISLAND).unwrap();

    let world = GameWorld::new(GameMap::empty(25, 25), GameConfig::for_testing(), 11);
    let gateway = SessionGateway::new(
        world,
        CharacterStore::new(characters),
        TerrainStore::new(terrains),
    );
    Setup { dir, gateway }
}

fn hello(line: &str) -> ClientHello {
    tactica::parse_hello(line)
}

fn error_text(outbox: &[Outbound]) -> Option<&str> {
    outbox.iter().find_map(|o| match o {
        Outbound::Event {
            event: ServerEvent::Error(text),
            ..
        } => Some(text.as_str()),
        _ => None,
    })
}

#[test]
fn test_bad_character_files_are_refused_with_their_messages() {
    let mut s = setup();
    let cases = [
        (r#"{"character":"Broken"}"#, "Saved character has missing or invalid data."),
        (r#"{"character":"Garbled"}"#, "Error reading character file."),
        (r#"{"character":"../etc/passwd"}"#, "Character file not found."),
        ("not even json", "No character selected."),
    ];
    for (line, expected) in cases {
        let session = new_player_id();
        assert!(!s.gateway.connect(session, &hello(line)));
        let outbox = s.gateway.drain();
        assert_eq!(error_text(&outbox), Some(expected), "hello {}", line);
    }
    assert_eq!(s.gateway.world().registry().player_count(), 0);
    assert!(s.dir.path().join("characters").is_dir());
}

#[test]
fn test_admitted_player_carries_sheet_stats() {
    let mut s = setup();
    let session = new_player_id();
    assert!(s.gateway.connect(session, &hello(r#"{"character":"Aria"}"#)));

    let player = s.gateway.world().registry().player(&session).unwrap();
    assert_eq!(player.stats.strength, 2);
    assert_eq!(player.health, 24);
    assert_eq!(player.action_points, 10);
    assert_eq!(player.max_damage(), 6);
}

#[test]
fn test_travel_loads_terrain_and_roster() {
    let mut s = setup();
    let session = new_player_id();
    s.gateway.connect(session, &hello(r#"{"character":"Aria"}"#));
    s.gateway.drain();

    s.gateway
        .handle_line(session, r#"{"type":"travel","fileName":"island"}"#);

    let world = s.gateway.world();
    assert_eq!((world.grid().width, world.grid().height), (4, 3));
    assert!(world.grid().blocks_movement(Position::new(0, 0)));
    let bush = world.grid().terrain_at(Position::new(1, 1)).unwrap();
    assert!(!bush.blocks_vision && bush.blocks_movement);

    let ids: Vec<&str> = world.registry().npcs().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["crab"]);
    assert_eq!(world.registry().npc("crab").unwrap().health, 20);

    // (2,2) is still open on the island, so the player stays put
    assert_eq!(
        world.registry().player(&session).unwrap().position,
        Position::new(2, 2)
    );
}

#[test]
fn test_travel_is_refused_during_battle() {
    let mut s = setup();
    let session = new_player_id();
    s.gateway.connect(session, &hello(r#"{"character":"Aria"}"#));
    {
        let world = s.gateway.world_mut();
        let mut rat = tactica::Npc::hostile("npc1", Position::new(8, 8));
        rat.is_in_battle = true;
        world.registry_mut().replace_npcs(vec![rat]);
        world.start_battle();
    }
    s.gateway.drain();

    s.gateway
        .handle_line(session, r#"{"type":"travel","fileName":"island"}"#);
    assert_eq!(s.gateway.world().mode(), GameMode::Battle);
    assert_eq!(s.gateway.world().grid().width, 25);
    assert!(s.gateway.drain().is_empty());
}

#[test]
fn test_move_intent_runs_on_the_clock() {
    let mut s = setup();
    let session = new_player_id();
    s.gateway.connect(session, &hello(r#"{"character":"Aria"}"#));
    s.gateway.drain();

    s.gateway
        .handle_line(session, r#"{"type":"move","destX":5,"destY":2}"#);
    assert_eq!(
        s.gateway.world().registry().player(&session).unwrap().position,
        Position::new(3, 2)
    );

    s.gateway.tick(Duration::from_millis(1000));
    assert_eq!(
        s.gateway.world().registry().player(&session).unwrap().position,
        Position::new(5, 2)
    );
    let steps = s
        .gateway
        .drain()
        .into_iter()
        .filter(|o| matches!(o, Outbound::Event { event: ServerEvent::PlayerMoved { .. }, .. }))
        .count();
    // Three steps plus the completion broadcast
    assert_eq!(steps, 4);
}
