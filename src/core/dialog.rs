//! Dialog graph normalization: canonical node ids and closure over every
//! referenced id.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::core::naming::{claim_unique, push_unique, slugify};
use crate::schema::mission::{DialogNode, Mission};

/// Slugify every node id, suffixing collisions, and rewrite every dialog
/// reference in the mission through the rename. References to ids that
/// name no node are slugified too, so closure stubs come out canonical.
///
/// Returns the `(old, new)` pairs that changed.
pub fn normalize_dialog_ids(mission: &mut Mission) -> Vec<(String, String)> {
    let mut taken = FxHashSet::default();
    let mut rename: FxHashMap<String, String> = FxHashMap::default();
    let mut changed = Vec::new();

    for node in &mut mission.dialog.nodes {
        let base = match slugify(&node.id) {
            slug if slug.is_empty() => "node".to_string(),
            slug => slug,
        };
        let canonical = claim_unique(&base, &mut taken);
        if canonical != node.id {
            changed.push((node.id.clone(), canonical.clone()));
        }
        rename.entry(node.id.clone()).or_insert_with(|| canonical.clone());
        node.id = canonical;
    }

    let resolve = |reference: &str| -> Option<String> {
        match rename.get(reference) {
            Some(id) => Some(id.clone()),
            None => Some(slugify(reference)).filter(|s| !s.is_empty()),
        }
    };
    let rewrite = |slot: &mut Option<String>| {
        *slot = slot.as_deref().and_then(resolve);
    };

    let dialog = &mut mission.dialog;
    rewrite(&mut dialog.entry);
    dialog.start_by_target = std::mem::take(&mut dialog.start_by_target)
        .into_iter()
        .filter_map(|(target, node)| Some((target, resolve(&node)?)))
        .collect();
    for node in &mut dialog.nodes {
        for choice in &mut node.choices {
            rewrite(&mut choice.to);
        }
    }
    for interaction in &mut mission.interactions {
        rewrite(&mut interaction.dialog);
    }
    for trigger in &mut mission.triggers {
        rewrite(&mut trigger.dialog);
    }
    let narrative = &mut mission.narrative;
    for beat in [&mut narrative.intro, &mut narrative.outro].into_iter().flatten() {
        rewrite(&mut beat.dialog);
    }
    for beat in &mut narrative.on_enter_zones {
        rewrite(&mut beat.dialog);
    }
    for beat in &mut narrative.on_interact {
        rewrite(&mut beat.dialog);
    }

    if !changed.is_empty() {
        debug!(renamed = changed.len(), "normalized dialog ids");
    }
    changed
}

/// Every dialog id the mission points at, in first-seen order.
pub fn referenced_dialog_ids(mission: &Mission) -> Vec<String> {
    let mut ids = Vec::new();
    let dialog = &mission.dialog;
    if let Some(entry) = &dialog.entry {
        push_unique(&mut ids, entry);
    }
    for node in dialog.start_by_target.values() {
        push_unique(&mut ids, node);
    }
    for choice in dialog.nodes.iter().flat_map(|n| &n.choices) {
        if let Some(to) = &choice.to {
            push_unique(&mut ids, to);
        }
    }
    let narrative = &mission.narrative;
    let others = mission
        .interactions
        .iter()
        .filter_map(|i| i.dialog.as_deref())
        .chain(mission.triggers.iter().filter_map(|t| t.dialog.as_deref()))
        .chain(
            [&narrative.intro, &narrative.outro]
                .into_iter()
                .flatten()
                .filter_map(|b| b.dialog.as_deref()),
        )
        .chain(narrative.on_enter_zones.iter().filter_map(|b| b.dialog.as_deref()))
        .chain(narrative.on_interact.iter().filter_map(|b| b.dialog.as_deref()));
    for id in others {
        push_unique(&mut ids, id);
    }
    ids
}

/// Append a stub node for every referenced id that has no node. Returns
/// the stub ids.
///
/// Narrative beats are not dialog entry points, so a stub that only a
/// narrative beat points at stays unreachable and the validator reports it.
pub fn close_dialog_graph(mission: &mut Mission) -> Vec<String> {
    let known: FxHashSet<String> = mission.dialog.nodes.iter().map(|n| n.id.clone()).collect();
    let missing: Vec<String> = referenced_dialog_ids(mission)
        .into_iter()
        .filter(|id| !known.contains(id))
        .collect();
    for id in &missing {
        mission.dialog.nodes.push(DialogNode::stub(id.clone()));
    }
    if !missing.is_empty() {
        debug!(stubs = ?missing, "closed dialog graph");
    }
    missing
}

/// Point `entry` at the first node when the plan left it unset.
pub fn default_entry(mission: &mut Mission) {
    let dialog = &mut mission.dialog;
    if dialog.entry.is_none() {
        dialog.entry = dialog.nodes.first().map(|n| n.id.clone());
    }
}
