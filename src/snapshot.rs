use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::adapter::GameAdapter;
use crate::error::{IntrospectError, RangeKind, Result};
use crate::memory::{MemoryAccessor, WorldObject};

/// Immutable capture of objects 1..=num_world_objs at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSnapshot {
    game: String,
    objects: Vec<WorldObject>,
}

impl ObjectSnapshot {
    /// Read every object the adapter declares. Any link pointing past
    /// `num_world_objs` means the adapter and the story disagree, and fails.
    pub fn capture(mem: &dyn MemoryAccessor, adapter: &GameAdapter) -> Result<Self> {
        let n = adapter.num_world_objs();
        if adapter.num_attributes() > mem.attribute_count() {
            return Err(IntrospectError::out_of_range(
                adapter.name(),
                RangeKind::Attribute,
                adapter.num_attributes().saturating_sub(1) as usize,
                mem.attribute_count().saturating_sub(1) as usize,
            ));
        }

        let mut objects = Vec::with_capacity(n as usize);
        for num in 1..=n {
            let obj = mem.object(num)?;
            adapter.check_link(obj.parent)?;
            adapter.check_link(obj.sibling)?;
            adapter.check_link(obj.child)?;
            objects.push(obj);
        }

        Ok(ObjectSnapshot {
            game: adapter.name().to_string(),
            objects,
        })
    }

    /// Build a snapshot from already-decoded objects, numbered from 1
    pub fn from_objects(game: &str, objects: Vec<WorldObject>) -> Self {
        ObjectSnapshot {
            game: game.to_string(),
            objects,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, obj: u16) -> Result<&WorldObject> {
        if obj == 0 {
            return Err(self.out_of_range(obj));
        }
        self.objects
            .get(obj as usize - 1)
            .ok_or_else(|| self.out_of_range(obj))
    }

    pub fn parent_of(&self, obj: u16) -> Result<u16> {
        Ok(self.get(obj)?.parent)
    }

    /// Direct children of `obj`, following the child then sibling links
    pub fn children(&self, obj: u16) -> Result<Vec<u16>> {
        let mut children = Vec::new();
        let mut next = self.get(obj)?.child;
        while next != 0 {
            if children.len() >= self.objects.len() {
                return Err(IntrospectError::MalformedStory(format!(
                    "sibling chain under object {obj} in {} does not terminate",
                    self.game
                )));
            }
            children.push(next);
            next = self.get(next)?.sibling;
        }
        Ok(children)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.iter()
    }

    /// Hash of every parent and attribute set; equal world states hash equal
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for obj in &self.objects {
            obj.parent.hash(&mut hasher);
            obj.attributes.as_raw_slice().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn out_of_range(&self, obj: u16) -> IntrospectError {
        IntrospectError::out_of_range(&self.game, RangeKind::Object, obj as usize, self.objects.len())
    }
}
