/// Validator integration tests: the reference scenarios plus degraded input.
use mission_forge::core::validator::{certify, certify_value, validate, validate_value};
use mission_forge::schema::mission::{MissionBundle, ValidationStatus};
use serde_json::{json, Value};

/// 3x3 all-grass map, spawn in the middle, one npc to talk to.
fn scenario_a() -> Value {
    json!({
        "tiles": [{"id": 0, "name": "grass", "walkable": true, "color": "#7cc96b"}],
        "objects": [
            {"type": "npc", "name": "npc", "class": "creature",
             "categories": ["npc", "creature", "character"]}
        ],
        "map": {
            "width": 3,
            "height": 3,
            "tiles": [0, 0, 0, 0, 0, 0, 0, 0, 0],
            "spawn": {"tx": 1, "ty": 1},
            "objects": [{"id": "objective_1", "type": "npc", "x": 2, "y": 1}]
        },
        "mission": {
            "title": "Say Hello",
            "objectives": [
                {"type": "talk_count", "label": "Say hello", "targetCount": 1, "targetId": "objective_1"}
            ],
            "interactions": [{"targetId": "objective_1", "action": "talk", "dialog": "intro"}],
            "dialog": {
                "nodes": [{"id": "intro", "speaker": "Guide", "text": ["Hello!"], "choices": []}],
                "entry": "intro",
                "startByTarget": {"objective_1": "intro"}
            }
        },
        "plan": {}
    })
}

fn has(errors: &[String], needle: &str) -> bool {
    errors.iter().any(|e| e.contains(needle))
}

#[test]
fn scenario_a_is_valid() {
    assert_eq!(validate_value(&scenario_a()), Vec::<String>::new());
}

#[test]
fn scenario_a_is_valid_as_typed_bundle() {
    let bundle: MissionBundle = serde_json::from_value(scenario_a()).unwrap();
    assert_eq!(validate(&bundle), Vec::<String>::new());
}

#[test]
fn scenario_b_orphan_node_is_unreachable() {
    let mut bundle = scenario_a();
    bundle["mission"]["dialog"]["nodes"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "orphan", "text": ["Nobody hears me."], "choices": []}));

    let errors = validate_value(&bundle);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("unreachable"));
    assert!(errors[0].contains("orphan"));
}

#[test]
fn scenario_c_checkpoint_out_of_bounds() {
    let mut bundle = scenario_a();
    bundle["mission"]["checkpoints"] = json!([{"id": "far_away", "tx": 9, "ty": 9}]);

    let errors = validate_value(&bundle);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("Checkpoint"));
    assert!(errors[0].contains("out of bounds"));
}

#[test]
fn scenario_d_count_above_one_needs_target_ids() {
    let mut bundle = scenario_a();
    bundle["mission"]["objectives"] = json!([
        {"type": "interact_count", "label": "Poke two things", "targetCount": 2}
    ]);

    let errors = validate_value(&bundle);
    assert!(has(&errors, "targetIds"), "{errors:?}");
}

#[test]
fn scenario_e_category_mismatch() {
    let mut bundle = scenario_a();
    bundle["objects"].as_array_mut().unwrap().push(json!({
        "type": "apple_tree", "name": "Apple Tree", "class": "structure",
        "categories": ["apple", "tree", "structure", "prop"]
    }));
    bundle["map"]["objects"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "tree_1", "type": "apple_tree", "x": 0, "y": 0}));
    bundle["mission"]["objectives"] = json!([{
        "type": "interact_count",
        "label": "Pick apples",
        "targetCount": 2,
        "targetCategory": "apple_tree",
        "targetIds": ["tree_1", "objective_1"]
    }]);
    bundle["mission"]["interactions"] = json!([
        {"targetId": "objective_1", "action": "interact", "dialog": "intro"},
        {"targetId": "tree_1", "action": "interact"}
    ]);

    let errors = validate_value(&bundle);
    assert!(has(&errors, "targetCategory"), "{errors:?}");
    assert!(has(&errors, "'objective_1' does not match targetCategory"));
    assert!(!has(&errors, "'tree_1' does not match targetCategory"));
}

#[test]
fn category_matches_tokens_of_the_type() {
    let mut bundle = scenario_a();
    bundle["mission"]["objectives"][0] = json!({
        "type": "talk_count", "targetCount": 1,
        "targetIds": ["objective_1"], "targetCategory": "Character"
    });
    assert_eq!(validate_value(&bundle), Vec::<String>::new());
}

#[test]
fn validation_is_idempotent() {
    let mut bundle = scenario_a();
    bundle["mission"]["checkpoints"] = json!([{"id": "far_away", "tx": 9, "ty": 9}]);
    bundle["mission"]["zones"] = json!([{"id": "z", "rect": {"x": 0, "y": 0, "w": 5, "h": 1}}]);

    let first = validate_value(&bundle);
    let second = validate_value(&bundle);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);

    let certified = certify_value(&mut bundle);
    assert_eq!(certified, first);
    assert_eq!(validate_value(&bundle), first);
}

#[test]
fn certify_records_status_on_the_mission() {
    let mut bundle: MissionBundle = serde_json::from_value(scenario_a()).unwrap();
    assert!(certify(&mut bundle).is_empty());
    let report = bundle.mission.validation.clone().unwrap();
    assert_eq!(report.status, ValidationStatus::Ok);
    assert!(report.errors.is_empty());

    bundle.map.spawn.tx = 7;
    let errors = certify(&mut bundle);
    assert_eq!(errors, vec!["Spawn (7,1) is out of bounds"]);
    let report = bundle.mission.validation.unwrap();
    assert_eq!(report.status, ValidationStatus::Error);
    assert_eq!(report.errors, errors);
}

#[test]
fn malformed_sections_do_not_stop_other_checks() {
    let mut bundle = scenario_a();
    bundle["mission"]["objectives"] = json!("talk to everyone");
    bundle["mission"]["flags"] = json!({"local": [], "global": {}});
    bundle["mission"]["checkpoints"] = json!([{"id": "far_away", "tx": 9, "ty": 9}]);
    bundle["objects"] = json!({"npc": {}});

    let errors = validate_value(&bundle);
    assert!(errors.contains(&"objects must be a list".to_string()));
    assert!(errors.contains(&"objectives must be a list".to_string()));
    assert!(errors.contains(&"flags.local must be an object".to_string()));
    assert!(has(&errors, "Object 'objective_1' has unknown type 'npc'"));
    assert!(has(&errors, "Checkpoint 'far_away' at (9,9) is out of bounds"));
}

#[test]
fn objective_target_rules() {
    let mut bundle = scenario_a();
    bundle["mission"]["objectives"] = json!([
        {"type": "talk_count", "targetId": "objective_1", "targetIds": ["objective_1"]},
        {"type": "talk_count", "targetCount": 3, "targetIds": ["objective_1", "objective_1"]},
        {"type": "sing_count", "targetId": "objective_1"},
        {"type": "talk_count", "targetCount": 0, "targetId": "ghost"},
        {"type": "talk_count", "targetCategory": "npc", "targetId": "objective_1"}
    ]);

    let errors = validate_value(&bundle);
    assert!(errors.contains(&"Objective #1 sets both targetId and targetIds".to_string()));
    assert!(errors.contains(
        &"Objective #2 lists target 'objective_1' more than once in targetIds".to_string()
    ));
    assert!(errors.contains(&"Objective #2 targetCount 3 does not match 2 targetIds".to_string()));
    assert!(errors.contains(&"Objective #3 has invalid type 'sing_count'".to_string()));
    assert!(errors.contains(&"Objective #4 targetCount must be a positive integer".to_string()));
    assert!(errors.contains(
        &"Objective #4 target 'ghost' does not match any placed object".to_string()
    ));
    assert!(errors.contains(&"Objective #5 targetCategory needs targetIds".to_string()));
}

#[test]
fn zones_triggers_and_narrative_references() {
    let mut bundle = scenario_a();
    bundle["mission"]["zones"] = json!([
        {"id": "yard", "rect": {"x": 0, "y": 0, "w": 2, "h": 2}},
        {"id": "yard", "rect": {"x": 1, "y": 1, "w": 1, "h": 1}},
        {"id": "sky", "rect": {"x": -1, "y": 0, "w": 1, "h": 1}}
    ]);
    bundle["mission"]["triggers"] = json!([
        {"id": "enter_yard", "zoneId": "yard", "dialog": "intro"},
        {"id": "enter_sea", "zoneId": "sea", "dialog": "splash"}
    ]);
    bundle["mission"]["narrative"] = json!({
        "intro": {"text": []},
        "outro": "Bye!",
        "onEnterZones": [{"zoneId": "yard"}, {"zoneId": "sea", "text": "Waves"}],
        "onInteract": [{"targetId": "objective_1", "dialog": "missing_node"}, {"targetId": "ghost", "text": "Boo"}]
    });

    let errors = validate_value(&bundle);
    let expected = [
        "Duplicate zone id 'yard'",
        "Zone 'sky' rect must have non-negative integer x, y, w and h",
        "Trigger 'enter_sea' references unknown zone 'sea'",
        "Trigger 'enter_sea' references unknown dialog 'splash'",
        "Narrative intro has no text",
        "Narrative onEnterZones #1 needs text or a dialog",
        "Narrative onEnterZones #2 references unknown zone 'sea'",
        "Narrative onInteract #1 references unknown dialog 'missing_node'",
        "Narrative onInteract #2 target 'ghost' does not match any placed object",
    ];
    assert_eq!(errors, expected);
}

#[test]
fn interactions_must_resolve() {
    let mut bundle = scenario_a();
    bundle["mission"]["interactions"] = json!([
        {"targetId": "objective_1", "action": "talk", "dialog": "intro"},
        {"targetId": "nobody", "action": "dance"},
        {"action": "talk", "dialog": "nowhere"}
    ]);

    let errors = validate_value(&bundle);
    assert_eq!(
        errors,
        vec![
            "Interaction #2 target 'nobody' does not match any placed object",
            "Interaction #2 has invalid action 'dance'",
            "Interaction #3 is missing a targetId",
            "Interaction #3 references unknown dialog 'nowhere'",
        ]
    );
}

#[test]
fn dialog_links_must_resolve() {
    let mut bundle = scenario_a();
    bundle["mission"]["dialog"] = json!({
        "nodes": [
            {"id": "intro", "text": "not a list", "choices": [{"text": "Go", "to": "outro"}]},
            {"id": "intro", "text": []}
        ],
        "entry": "start",
        "startByTarget": {"stranger": "intro", "objective_1": "epilogue"}
    });

    let errors = validate_value(&bundle);
    assert_eq!(
        errors,
        vec![
            "Duplicate dialog node id 'intro'",
            "Dialog node 'intro' text must be a list",
            "Dialog node 'intro' choice #1 points to unknown node 'outro'",
            "Dialog entry 'start' does not match any node",
            "startByTarget['objective_1'] points to unknown node 'epilogue'",
            "startByTarget key 'stranger' does not match any placed object",
        ]
    );
}
