/// Generation integration tests: plans in, certified bundles out.
use mission_forge::core::assembler::{generate, load_plan, MissionForge};
use mission_forge::core::dialog::referenced_dialog_ids;
use mission_forge::core::seed::Seed;
use mission_forge::core::validator::validate;
use mission_forge::schema::catalog::AssetManifest;
use mission_forge::schema::mission::{MissionBundle, ValidationStatus};
use rustc_hash::FxHashSet;
use serde_json::{json, Value};
use std::path::Path;

const SEEDS: [u64; 6] = [1, 7, 42, 99, 1234, 98765];

fn fixture_forge() -> MissionForge {
    MissionForge::builder()
        .config_file("tests/fixtures/engine.ron")
        .manifest_file("tests/fixtures/manifest.json")
        .build()
        .unwrap()
}

fn fixture_plan() -> Value {
    load_plan(Path::new("tests/fixtures/plan.json")).unwrap()
}

fn squirrel_manifest() -> AssetManifest {
    serde_json::from_value(json!({
        "assets": [{
            "type": "sprite",
            "title": "Critters",
            "files": [{"path": "sprites/squirrel.png", "label": "Squirrel"}]
        }]
    }))
    .unwrap()
}

/// Properties every generated bundle must have, whatever the seed.
fn assert_well_formed(bundle: &MissionBundle, seed: u64) {
    assert_eq!(validate(bundle), Vec::<String>::new(), "seed {seed}");

    let cells: FxHashSet<(u32, u32)> = bundle.map.objects.iter().map(|o| (o.x, o.y)).collect();
    assert_eq!(cells.len(), bundle.map.objects.len(), "seed {seed}: shared cell");

    let mission = &bundle.mission;
    for id in referenced_dialog_ids(mission) {
        assert!(mission.dialog.node(&id).is_some(), "seed {seed}: dangling dialog '{id}'");
    }
    for objective in &mission.objectives {
        let action = objective.action().unwrap();
        for target in objective.targets() {
            assert!(bundle.map.has_object(&target), "seed {seed}: '{target}' not placed");
            assert!(
                mission
                    .interactions
                    .iter()
                    .any(|i| i.target_id == target && i.action_kind() == Some(action)),
                "seed {seed}: '{target}' has no '{action}' interaction"
            );
        }
    }
}

#[test]
fn squirrel_category_objective_is_satisfied() {
    let plan = json!({
        "layout": {"biome": "meadow", "size": {"w": 8, "h": 8}},
        "objectives": [
            {"type": "heal_count", "label": "Help a squirrel", "targetCategory": "squirrel", "targetCount": 1}
        ]
    });
    let forge = MissionForge::builder()
        .with_manifest(squirrel_manifest())
        .build()
        .unwrap();

    for seed in SEEDS {
        let bundle = forge.generate(&plan, &Seed::from(seed));
        assert_eq!((bundle.map.width, bundle.map.height), (8, 8));

        let objective = &bundle.mission.objectives[0];
        let ids = objective.target_ids.as_ref().unwrap();
        assert_eq!(ids.len() as u32, objective.target_count.unwrap());
        let category = objective.target_category.as_deref().unwrap();
        for id in ids {
            let placed = bundle.map.object(id).unwrap();
            let categories = forge.catalog().categories_of(&placed.kind);
            assert!(
                categories.iter().any(|c| c == category),
                "seed {seed}: '{}' lacks '{category}'",
                placed.kind
            );
        }
        assert_well_formed(&bundle, seed);
    }
}

#[test]
fn same_seed_same_bundle() {
    let forge = fixture_forge();
    let plan = fixture_plan();
    let first = forge.generate(&plan, &Seed::from("acorns"));
    let second = forge.generate(&plan, &Seed::from("acorns"));
    assert_eq!(first, second);

    let other = forge.generate(&plan, &Seed::from("pinecones"));
    assert_ne!(first.map, other.map);
}

#[test]
fn fixture_plan_is_valid_across_seeds() {
    let forge = fixture_forge();
    let plan = fixture_plan();
    for seed in SEEDS {
        let (bundle, errors) = forge.generate_certified(&plan, &Seed::from(seed));
        assert!(errors.is_empty(), "seed {seed}: {errors:?}");
        let report = bundle.mission.validation.as_ref().unwrap();
        assert_eq!(report.status, ValidationStatus::Ok);
        assert_well_formed(&bundle, seed);
    }
}

#[test]
fn fixture_plan_is_normalized() {
    let forge = fixture_forge();
    let bundle = forge.generate(&fixture_plan(), &Seed::from(42u64));
    let mission = &bundle.mission;

    assert_eq!(mission.title, "Acorn Woods");
    assert_eq!((bundle.map.width, bundle.map.height), (16, 12));

    let nodes: Vec<&str> = mission.dialog.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(
        nodes,
        vec!["welcome", "ask_about_acorns", "goodbye", "sign_text", "pond_hint"]
    );
    assert_eq!(mission.dialog.entry.as_deref(), Some("welcome"));
    assert_eq!(mission.dialog.start_by_target["signpost_1"], "sign_text");
    assert_eq!(mission.triggers[0].dialog.as_deref(), Some("pond_hint"));

    // Talk target keeps its id; the squirrels come out as a list.
    assert_eq!(mission.objectives[0].target_id.as_deref(), Some("owl_friend"));
    let squirrels = mission.objectives[1].target_ids.as_ref().unwrap();
    assert_eq!(squirrels, &["objective_2_1", "objective_2_2"]);
    assert_eq!(mission.objectives[1].target_category.as_deref(), Some("animal"));
    assert_eq!(mission.objectives[2].target_id.as_deref(), Some("signpost_1"));

    let sign = mission
        .interactions
        .iter()
        .find(|i| i.target_id == "signpost_1")
        .unwrap();
    assert_eq!(sign.action, "interact");
    assert_eq!(sign.dialog.as_deref(), Some("sign_text"));

    // The gate hangs off the map edge and gets pulled back in.
    let gate = mission.zones.iter().find(|z| z.id == "gate").unwrap();
    assert!(gate.rect.x + gate.rect.w <= 16);
    assert!(gate.rect.y + gate.rect.h <= 12);

    assert_eq!(mission.flags.local["asked"], json!(false));
    assert_eq!(mission.flags.global["acorns_found"], json!(0));

    let intro = mission.narrative.intro.as_ref().unwrap();
    assert_eq!(intro.text, vec!["Welcome to Acorn Woods!"]);
    let outro = mission.narrative.outro.as_ref().unwrap();
    assert_eq!(outro.text.len(), 2);

    // Referenced only by a narrative beat, yet still placed.
    let oak = bundle.map.object("old_oak").unwrap();
    assert_eq!(oak.kind, "oak_tree");

    assert_eq!(bundle.plan, fixture_plan());
}

#[test]
fn non_asset_entries_are_ignored() {
    let forge = fixture_forge();
    let catalog = forge.catalog();
    assert_eq!(catalog.tiles.len(), 6);
    assert_eq!(catalog.objects.len(), 9);
    assert!(catalog.object("forest_theme").is_none());
    assert!(catalog.object("rabbit").is_some());
    assert!(!catalog.tile_named("water").unwrap().walkable);
}

#[test]
fn mission_envelope_is_unwrapped() {
    let forge = fixture_forge();
    let plan = fixture_plan();
    let wrapped = json!({"mission": plan.clone()});
    let seed = Seed::from(5u64);
    let bare = forge.generate(&plan, &seed);
    let enveloped = forge.generate(&wrapped, &seed);
    assert_eq!(bare.mission, enveloped.mission);
    assert_eq!(bare.map, enveloped.map);
    assert_eq!(enveloped.plan, wrapped);
}

#[test]
fn config_defaults_apply_when_plan_is_sparse() {
    let forge = fixture_forge();
    let plan = json!({"objectives": [{"type": "magic_count"}]});
    let bundle = forge.generate(&plan, &Seed::from(3u64));

    assert_eq!((bundle.map.width, bundle.map.height), (12, 10));
    assert_eq!(bundle.mission.title, "Untitled Adventure");
    let checkpoints: Vec<&str> = bundle
        .mission
        .checkpoints
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(checkpoints, vec!["start", "objective_1"]);
    assert_well_formed(&bundle, 3);
}

#[test]
fn garbage_sections_fall_back() {
    let plan = json!({
        "title": 17,
        "layout": "huge",
        "objectives": [{"type": "talk_count"}, "not an objective"],
        "dialog": {"nodes": "none"},
        "zones": [{"id": "", "rect": {"x": -4, "y": 2, "w": 99, "h": 0}}],
        "narrative": 3
    });
    for seed in SEEDS {
        let bundle = generate(&plan, &Seed::from(seed), &AssetManifest::default());
        assert_eq!(bundle.mission.objectives.len(), 1);
        assert_eq!(bundle.mission.title, "A New Adventure");
        assert_eq!(bundle.mission.zones[0].id, "zone_1");
        assert_well_formed(&bundle, seed);
    }
}
