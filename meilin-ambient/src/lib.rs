//! # meilin-ambient
//!
//! Ambient behavior selection for the MeiLin companion: the sighs, giggles
//! and hums she produces on her own while chat is quiet.
//!
//! ## Design
//!
//! - A validated [`BehaviorCatalog`] and [`ModeTable`], loaded once from a
//!   JSON [`AmbientPack`] and immutable afterwards
//! - Weighted draws by explicit inverse-CDF over an injectable [`RandomSource`]
//! - Per-behavior cooldowns tracked lazily in [`SelectionHistory`]
//! - Personality modes that boost or suppress behaviors
//! - Context-filtered draws that fall back to unfiltered ones, flagged via
//!   [`Selection::matched_context`]
//! - Short [`ClipResponder`] clips for waiting, after-command and
//!   processing moments, with per-type cooldowns
//! - Time never comes from a hidden system call: callers pass a
//!   [`Timestamp`] or a [`Clock`]
//!
//! Everything is synchronous and allocation-light. A selector is meant to
//! have exactly one owner.
//!
//! # Examples
//!
//! ```
//! use meilin_ambient::{AmbientPack, StdRandom, Timestamp};
//!
//! # fn main() -> meilin_ambient::Result<()> {
//! let (mut selector, _idle, _settings) = AmbientPack::builtin()?.into_parts()?.into_selector()?;
//! let mut rng = StdRandom::seeded(7);
//! if let Some(pick) = selector.select_for_context("idle", "sleepy", Timestamp::ZERO, &mut rng)? {
//!     println!("{}: {}", pick.display_name, pick.chosen_sound);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod clips;
pub mod clock;
pub mod error;
pub mod history;
pub mod idle;
pub mod modes;
pub mod pack;
pub mod random;
pub mod selector;
pub mod types;

pub use catalog::BehaviorCatalog;
pub use clips::{AmbientClip, ClipEntry, ClipResponder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AmbientError, Result};
pub use history::{CooldownState, SelectionHistory};
pub use idle::{IdleResponder, IdleResponse, IdleResponseEntry, TimeOfDay};
pub use modes::ModeTable;
pub use pack::{AmbientPack, PackParts, PackSettings};
pub use random::{RandomSource, SequenceRandom, StdRandom, weighted_index};
pub use selector::{BehaviorSelector, ModeStats, ModeSummary};
pub use types::{Behavior, BehaviorId, ModeId, PersonalityMode, Selection, Timestamp};
