//! World diff engine
//!
//! Compares two object snapshots and reports the transitions the active
//! adapter does not declare as noise. The engine has no idea why anything
//! changed; deciding what is noise is the adapter's job.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::adapter::GameAdapter;
use crate::error::{IntrospectError, RangeKind, Result};
use crate::snapshot::ObjectSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    ObjectMoved {
        object: u16,
        old_parent: u16,
        new_parent: u16,
    },
    AttributeSet {
        object: u16,
        attr: u16,
    },
    AttributeCleared {
        object: u16,
        attr: u16,
    },
}

impl ChangeEvent {
    pub fn object(&self) -> u16 {
        match *self {
            ChangeEvent::ObjectMoved { object, .. }
            | ChangeEvent::AttributeSet { object, .. }
            | ChangeEvent::AttributeCleared { object, .. } => object,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::ObjectMoved {
                object,
                old_parent,
                new_parent,
            } => write!(f, "obj {object}: moved {old_parent} -> {new_parent}"),
            ChangeEvent::AttributeSet { object, attr } => write!(f, "obj {object}: +attr {attr}"),
            ChangeEvent::AttributeCleared { object, attr } => {
                write!(f, "obj {object}: -attr {attr}")
            }
        }
    }
}

fn check_size(snapshot: &ObjectSnapshot, adapter: &GameAdapter) -> Result<()> {
    let expected = adapter.num_world_objs() as usize;
    if snapshot.len() != expected {
        return Err(IntrospectError::out_of_range(
            adapter.name(),
            RangeKind::Object,
            snapshot.len(),
            expected,
        ));
    }
    Ok(())
}

/// Events between `previous` and `current`, filtered by the adapter's
/// suppression predicates.
///
/// Without a previous snapshot the current one is only a baseline and no
/// events are produced. Output is ordered by object number; within one
/// object the move comes first, then attribute changes by ascending index.
pub fn world_diff(
    previous: Option<&ObjectSnapshot>,
    current: &ObjectSnapshot,
    adapter: &GameAdapter,
) -> Result<Vec<ChangeEvent>> {
    check_size(current, adapter)?;
    let previous = match previous {
        Some(previous) => previous,
        None => return Ok(Vec::new()),
    };
    check_size(previous, adapter)?;

    let mut events = Vec::new();
    for (old, new) in previous.iter().zip(current.iter()) {
        let obj = new.num;

        if old.parent != new.parent {
            if adapter.ignore_moved_obj(obj, new.parent)? {
                debug!("suppressed move of {} to {}", obj, new.parent);
            } else {
                events.push(ChangeEvent::ObjectMoved {
                    object: obj,
                    old_parent: old.parent,
                    new_parent: new.parent,
                });
            }
        }

        for idx in 0..new.attributes.len() {
            if old.attributes[idx] == new.attributes[idx] {
                continue;
            }
            let attr = idx as u16;
            if new.attributes[idx] {
                if adapter.ignore_attr_set(obj, attr)? {
                    debug!("suppressed set of attr {} on {}", attr, obj);
                } else {
                    events.push(ChangeEvent::AttributeSet { object: obj, attr });
                }
            } else if adapter.ignore_attr_cleared(obj, attr)? {
                debug!("suppressed clear of attr {} on {}", attr, obj);
            } else {
                events.push(ChangeEvent::AttributeCleared { object: obj, attr });
            }
        }
    }

    Ok(events)
}
