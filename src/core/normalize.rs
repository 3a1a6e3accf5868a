//! Repair passes run by the assembler after placement. Each pass takes the
//! mission as it stands and leaves it closer to something the validator
//! accepts; none of them can fail.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::core::catalog::Catalog;
use crate::core::config::NarrativeConfig;
use crate::core::grid::{Cell, WalkGrid};
use crate::core::naming::{claim_unique, push_unique, slugify};
use crate::core::placer::RequiredTarget;
use crate::schema::map::MapGrid;
use crate::schema::mission::{
    Action, Checkpoint, Interaction, Mission, NarrativeBeat, Objective, Rect,
};

/// Preferred categories, in order, when several are shared.
const PREFERRED_CATEGORIES: [&str; 2] = ["animal", "prop"];

/// Recompute `targetCategory` for objectives with a known `targetIds`
/// list, as the category every resolved target shares.
pub fn align_categories(objectives: &mut [Objective], map: &MapGrid, catalog: &Catalog) {
    for objective in objectives.iter_mut() {
        let Some(ids) = objective.target_ids.as_ref().filter(|ids| !ids.is_empty()) else {
            continue;
        };
        let mut shared: Option<Vec<String>> = None;
        for object in ids.iter().filter_map(|id| map.object(id)) {
            let categories = catalog.categories_of(&object.kind);
            shared = Some(match shared {
                None => categories,
                Some(current) => current
                    .into_iter()
                    .filter(|c| categories.contains(c))
                    .collect(),
            });
        }
        let Some(shared) = shared else {
            continue;
        };
        let aligned = pick_category(&shared);
        if aligned != objective.target_category {
            debug!(
                label = %objective.label,
                from = ?objective.target_category,
                to = ?aligned,
                "aligned objective category"
            );
            objective.target_category = aligned;
        }
    }
}

fn pick_category(shared: &[String]) -> Option<String> {
    PREFERRED_CATEGORIES
        .iter()
        .find(|preferred| shared.iter().any(|c| c == *preferred))
        .map(|c| c.to_string())
        .or_else(|| shared.iter().min().cloned())
}

/// Collapse every objective to a single `targetId` (one target, no
/// category) or a `targetIds` list with a matching count.
pub fn backfill_target_ids(objectives: &mut [Objective]) {
    for objective in objectives.iter_mut() {
        let mut targets = Vec::new();
        for id in objective.targets() {
            push_unique(&mut targets, &id);
        }
        if targets.is_empty() {
            continue;
        }
        if targets.len() == 1 && objective.target_category.is_none() {
            objective.target_id = targets.pop();
            objective.target_ids = None;
            objective.target_count = Some(1);
        } else {
            objective.target_id = None;
            objective.target_count = Some(targets.len() as u32);
            objective.target_ids = Some(targets);
        }
    }
}

/// Add an interaction for every objective target that has none with the
/// objective's action. Returns how many were added.
pub fn synthesize_interactions(mission: &mut Mission) -> usize {
    let mut added = 0;
    for objective in &mission.objectives {
        let Some(action) = objective.action() else {
            continue;
        };
        for target in objective.targets() {
            let covered = mission
                .interactions
                .iter()
                .any(|i| i.target_id == target && i.action_kind() == Some(action));
            if covered {
                continue;
            }
            let dialog = mission.dialog.start_by_target.get(&target).cloned();
            mission.interactions.push(Interaction {
                target_id: target,
                action: action.as_str().to_string(),
                dialog,
                duration: None,
            });
            added += 1;
        }
    }
    if added > 0 {
        debug!(added, "synthesized interactions");
    }
    added
}

/// `start` at spawn plus one checkpoint per objective on its first target.
pub fn default_checkpoints(objectives: &[Objective], map: &MapGrid) -> Vec<Checkpoint> {
    let mut checkpoints = vec![Checkpoint {
        id: "start".to_string(),
        label: Some("Start".to_string()),
        tx: Some(i64::from(map.spawn.tx)),
        ty: Some(i64::from(map.spawn.ty)),
        target_id: None,
    }];
    for (index, objective) in objectives.iter().enumerate() {
        let Some(target) = objective.targets().into_iter().next() else {
            continue;
        };
        checkpoints.push(Checkpoint {
            id: format!("objective_{}", index + 1),
            label: Some(objective.label.clone()).filter(|l| !l.is_empty()),
            tx: None,
            ty: None,
            target_id: Some(target),
        });
    }
    checkpoints
}

/// Give every checkpoint a unique id, and move tile-anchored checkpoints
/// that sit off the walkable grid to spawn.
pub fn repair_checkpoints(checkpoints: &mut [Checkpoint], map: &MapGrid, walk: &WalkGrid) {
    let fallback = fallback_cell(map, walk);
    let mut taken = FxHashSet::default();
    for checkpoint in checkpoints.iter_mut() {
        let base = match slugify(&checkpoint.id) {
            slug if slug.is_empty() => "checkpoint".to_string(),
            slug => slug,
        };
        checkpoint.id = claim_unique(&base, &mut taken);

        if checkpoint.anchor_target().is_some() {
            continue;
        }
        checkpoint.target_id = None;
        let on_grid = match (checkpoint.tx, checkpoint.ty) {
            (Some(x), Some(y)) => walk.is_walkable_at(x, y),
            _ => false,
        };
        if on_grid {
            continue;
        }
        let Some(cell) = fallback else {
            continue;
        };
        warn!(
            id = %checkpoint.id,
            tx = ?checkpoint.tx,
            ty = ?checkpoint.ty,
            "checkpoint not on a walkable tile; moved to spawn"
        );
        checkpoint.tx = Some(cell.x as i64);
        checkpoint.ty = Some(cell.y as i64);
    }
}

/// Spawn if it is walkable, else the first walkable cell.
fn fallback_cell(map: &MapGrid, walk: &WalkGrid) -> Option<Cell> {
    let spawn = Cell::from(map.spawn);
    if walk.is_walkable(spawn) {
        return Some(spawn);
    }
    walk.walkable_cells().into_iter().next()
}

/// Clamp zones into the map and re-anchor any zone that covers no cell
/// reachable from spawn onto the spawn cell. Triggers and zone beats that
/// name an unknown zone are dropped. Zone and trigger ids come out unique;
/// a repeated zone id keeps its triggers on the first zone.
pub fn repair_zones(mission: &mut Mission, map: &MapGrid, walk: &WalkGrid) {
    let width = i64::from(map.width);
    let height = i64::from(map.height);
    let reachable = walk.reachable_from(Cell::from(map.spawn));
    let spawn = map.spawn;

    let mut taken = FxHashSet::default();
    for (index, zone) in mission.zones.iter_mut().enumerate() {
        let base = match zone.id.trim() {
            "" => format!("zone_{}", index + 1),
            _ => zone.id.clone(),
        };
        let id = claim_unique(&base, &mut taken);
        if id != zone.id {
            debug!(from = %zone.id, to = %id, "renamed zone");
            zone.id = id;
        }
        if width == 0 || height == 0 {
            continue;
        }

        let mut rect = zone.rect;
        rect.x = rect.x.clamp(0, width - 1);
        rect.y = rect.y.clamp(0, height - 1);
        rect.w = rect.w.clamp(1, width - rect.x);
        rect.h = rect.h.clamp(1, height - rect.y);

        let overlaps = cells_of(rect)
            .filter_map(|(x, y)| walk.index(Cell::new(x as usize, y as usize)))
            .any(|i| reachable.get(i).copied().unwrap_or(false));
        if !overlaps {
            warn!(id = %zone.id, "zone covers no reachable tile; anchored on spawn");
            rect = Rect {
                x: i64::from(spawn.tx),
                y: i64::from(spawn.ty),
                w: 1,
                h: 1,
            };
        }
        if rect != zone.rect {
            debug!(id = %zone.id, ?rect, "repaired zone rect");
            zone.rect = rect;
        }
    }

    let known: FxHashSet<&str> = mission.zones.iter().map(|z| z.id.as_str()).collect();
    let before = mission.triggers.len() + mission.narrative.on_enter_zones.len();
    mission.triggers.retain(|t| known.contains(t.zone_id.as_str()));
    mission
        .narrative
        .on_enter_zones
        .retain(|b| known.contains(b.zone_id.as_str()));
    let dropped = before - mission.triggers.len() - mission.narrative.on_enter_zones.len();
    if dropped > 0 {
        warn!(dropped, "dropped triggers and beats naming unknown zones");
    }

    let mut taken = FxHashSet::default();
    for (index, trigger) in mission.triggers.iter_mut().enumerate() {
        let base = match trigger.id.trim() {
            "" => format!("trigger_{}", index + 1),
            _ => trigger.id.clone(),
        };
        trigger.id = claim_unique(&base, &mut taken);
    }
}

fn cells_of(rect: Rect) -> impl Iterator<Item = (i64, i64)> {
    (rect.y..rect.y + rect.h).flat_map(move |y| (rect.x..rect.x + rect.w).map(move |x| (x, y)))
}

/// Fill the title and every narrative block that came through empty.
pub fn fill_narrative(mission: &mut Mission, config: &NarrativeConfig) {
    if mission.title.trim().is_empty() {
        mission.title = config.default_title.clone();
    }
    let title = mission.title.clone();
    let fill = |template: &str| template.replace("{title}", &title);

    let narrative = &mut mission.narrative;
    for (beat, template) in [
        (&mut narrative.intro, &config.intro),
        (&mut narrative.outro, &config.outro),
    ] {
        let beat = beat.get_or_insert_with(NarrativeBeat::default);
        if beat.text.is_empty() {
            beat.text = vec![fill(template)];
        }
    }
    for beat in &mut narrative.on_enter_zones {
        if beat.text.is_empty() && beat.dialog.is_none() {
            beat.text = vec![fill(&config.beat)];
        }
    }
    for beat in &mut narrative.on_interact {
        if beat.text.is_empty() && beat.dialog.is_none() {
            beat.text = vec![fill(&config.beat)];
        }
    }
}

/// Every object id the mission refers to, with whatever the reference
/// says about the object.
pub fn required_targets(mission: &Mission) -> Vec<RequiredTarget> {
    let mut required: Vec<RequiredTarget> = Vec::new();
    let mut add = |id: &str, action: Option<Action>, category: Option<&str>| {
        if id.is_empty() || required.iter().any(|r| r.id == id) {
            return;
        }
        required.push(RequiredTarget {
            id: id.to_string(),
            action,
            category: category.map(str::to_string),
        });
    };

    for objective in &mission.objectives {
        for id in objective.targets() {
            add(&id, objective.action(), objective.target_category.as_deref());
        }
    }
    for interaction in &mission.interactions {
        add(&interaction.target_id, interaction.action_kind(), None);
    }
    for target in mission.dialog.start_by_target.keys() {
        add(target, Some(Action::Talk), None);
    }
    for beat in &mission.narrative.on_interact {
        add(&beat.target_id, None, None);
    }
    for checkpoint in &mission.checkpoints {
        if let Some(target) = checkpoint.anchor_target() {
            add(target, None, None);
        }
    }
    required
}
