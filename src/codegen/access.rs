//! Non-local access rules.
//!
//! Every frame keeps its static link at `[bp+4]`: the frame of the unit the
//! running function was declared in. A frame whose body runs at nesting level
//! `n` links to a frame whose body runs at level `n - 1`.

use crate::{errors::errors::Error, MK_INTERNAL};

/// Where an entity's frame is found, seen from the unit being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Addressed through `bp`.
    Local,
    /// Addressed through `si` after loading `[bp+4]` and following `hops` more links.
    NonLocal { hops: u32 },
}

/// The static link pushed for a callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// The caller's own frame: the callee is declared in the running unit, or is a library routine.
    FrameBase,
    /// The caller's static link, passed on unchanged to a sibling.
    Inherited,
    /// The link found `hops` frames above the inherited one.
    Ancestor { hops: u32 },
}

pub fn resolve(entity_level: u32, current_level: u32) -> Result<Access, Error> {
    if entity_level == current_level {
        Ok(Access::Local)
    } else if entity_level < current_level {
        Ok(Access::NonLocal {
            hops: current_level - entity_level - 1,
        })
    } else {
        Err(MK_INTERNAL!(
            "entity at nesting level {} is not visible from level {}",
            entity_level,
            current_level
        ))
    }
}

/// `current_level` is the nesting level of the caller's body, so the caller
/// itself is declared one level above it.
pub fn link_for(current_level: u32, callee_level: u32, library: bool) -> LinkSource {
    let caller_level = current_level.saturating_sub(1);
    if library || caller_level < callee_level {
        LinkSource::FrameBase
    } else if caller_level == callee_level {
        LinkSource::Inherited
    } else {
        LinkSource::Ancestor {
            hops: caller_level - callee_level,
        }
    }
}
