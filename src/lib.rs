//! Mission Forge: procedural mission generation and validation for a
//! children's adventure game.
//!
//! A loosely shaped mission plan goes in; a bundle comes out with a tile
//! map, placed objects, a closed dialog graph and trigger and checkpoint
//! wiring. The validator then reports every structural, referential and
//! reachability defect it finds, all in one pass.
//!
//! ```no_run
//! use mission_forge::core::assembler::MissionForge;
//! use mission_forge::core::seed::Seed;
//!
//! let forge = MissionForge::builder()
//!     .manifest_file("assets/manifest.json")
//!     .build()?;
//! let plan = serde_json::json!({"title": "Acorn Hunt", "objectives": [{"type": "talk_count"}]});
//! let (bundle, errors) = forge.generate_certified(&plan, &Seed::from("acorns"));
//! assert!(errors.is_empty(), "{errors:?}");
//! # let _ = bundle;
//! # Ok::<(), mission_forge::core::assembler::ForgeError>(())
//! ```

pub mod core;
pub mod schema;
