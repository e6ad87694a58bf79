// Test utilities: synthetic story images and a scripted interpreter,
// so tests can exercise the introspection layer without real game files.

use std::collections::VecDeque;

use bitvec::prelude::*;

use crate::header::HEADER_SIZE;
use crate::interpreter::{Interpreter, StoryLoader};
use crate::error::Result as IntrospectResult;
use crate::memory::{
    MemoryAccessor, WorldObject, MAX_PROPERTIES_V3, MAX_PROPERTIES_V4, OBJECT_ENTRY_SIZE_V3,
    OBJECT_ENTRY_SIZE_V4,
};

/// Address the synthetic object table starts at
pub const OBJECT_TABLE_ADDR: usize = HEADER_SIZE;

/// Builder for a minimal story image: a header plus an object table
#[derive(Debug, Clone)]
pub struct StoryImage {
    memory: Vec<u8>,
    version: u8,
}

impl StoryImage {
    pub fn v3(num_objects: u16, size: usize) -> Self {
        Self::with_version(3, num_objects, size)
    }

    pub fn v4(num_objects: u16, size: usize) -> Self {
        Self::with_version(4, num_objects, size)
    }

    fn with_version(version: u8, num_objects: u16, size: usize) -> Self {
        let table_end = OBJECT_TABLE_ADDR
            + Self::defaults_len(version)
            + num_objects as usize * Self::entry_size(version);
        assert!(table_end <= size, "object table does not fit in image");

        let mut memory = vec![0u8; size];
        memory[0] = version;
        memory[0x0A..0x0C].copy_from_slice(&(OBJECT_TABLE_ADDR as u16).to_be_bytes());
        memory[0x0E..0x10].copy_from_slice(&(table_end as u16).to_be_bytes());
        StoryImage { memory, version }
    }

    fn defaults_len(version: u8) -> usize {
        if version <= 3 {
            MAX_PROPERTIES_V3 * 2
        } else {
            MAX_PROPERTIES_V4 * 2
        }
    }

    fn entry_size(version: u8) -> usize {
        if version <= 3 {
            OBJECT_ENTRY_SIZE_V3
        } else {
            OBJECT_ENTRY_SIZE_V4
        }
    }

    fn entry_addr(&self, obj: u16) -> usize {
        OBJECT_TABLE_ADDR
            + Self::defaults_len(self.version)
            + (obj as usize - 1) * Self::entry_size(self.version)
    }

    fn set_link(&mut self, obj: u16, slot: usize, value: u16) -> &mut Self {
        let addr = self.entry_addr(obj);
        if self.version <= 3 {
            self.memory[addr + 4 + slot] = value as u8;
        } else {
            let at = addr + 6 + slot * 2;
            self.memory[at..at + 2].copy_from_slice(&value.to_be_bytes());
        }
        self
    }

    pub fn set_release(&mut self, release: u16, serial: &str) -> &mut Self {
        self.memory[0x02..0x04].copy_from_slice(&release.to_be_bytes());
        self.memory[0x12..0x18].copy_from_slice(&serial.as_bytes()[..6]);
        self
    }

    pub fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.memory[0x1C..0x1E].copy_from_slice(&checksum.to_be_bytes());
        self
    }

    pub fn set_parent(&mut self, obj: u16, parent: u16) -> &mut Self {
        self.set_link(obj, 0, parent)
    }

    pub fn set_sibling(&mut self, obj: u16, sibling: u16) -> &mut Self {
        self.set_link(obj, 1, sibling)
    }

    pub fn set_child(&mut self, obj: u16, child: u16) -> &mut Self {
        self.set_link(obj, 2, child)
    }

    pub fn set_attribute(&mut self, obj: u16, attr: u16, on: bool) -> &mut Self {
        let addr = self.entry_addr(obj);
        let bytes = if self.version <= 3 { 4 } else { 6 };
        self.memory[addr..addr + bytes]
            .view_bits_mut::<Msb0>()
            .set(attr as usize, on);
        self
    }

    /// Insert `obj` as the first child of `parent`, keeping links consistent
    pub fn insert(&mut self, obj: u16, parent: u16) -> &mut Self {
        let first = self.child_of(parent);
        self.set_parent(obj, parent).set_sibling(obj, first);
        self.set_child(parent, obj)
    }

    /// Unlink `obj` from its parent and insert it under `parent` (0 detaches)
    pub fn move_object(&mut self, obj: u16, parent: u16) -> &mut Self {
        let old = self.link(obj, 0);
        if old != 0 {
            let next = self.link(obj, 1);
            if self.link(old, 2) == obj {
                self.set_child(old, next);
            } else {
                let mut prev = self.link(old, 2);
                while prev != 0 && self.link(prev, 1) != obj {
                    prev = self.link(prev, 1);
                }
                if prev != 0 {
                    self.set_sibling(prev, next);
                }
            }
        }
        self.set_parent(obj, 0).set_sibling(obj, 0);
        if parent != 0 {
            self.insert(obj, parent);
        }
        self
    }

    fn child_of(&self, obj: u16) -> u16 {
        self.link(obj, 2)
    }

    fn link(&self, obj: u16, slot: usize) -> u16 {
        let addr = self.entry_addr(obj);
        if self.version <= 3 {
            self.memory[addr + 4 + slot] as u16
        } else {
            let at = addr + 6 + slot * 2;
            u16::from_be_bytes([self.memory[at], self.memory[at + 1]])
        }
    }

    pub fn poke(&mut self, addr: usize, value: u8) -> &mut Self {
        self.memory[addr] = value;
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.memory
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.memory
    }
}

/// Accessor where every address holds the same byte and every object is
/// detached with no attributes set
#[derive(Debug, Clone)]
pub struct UniformMemory {
    fill: u8,
    attributes: u16,
}

impl UniformMemory {
    pub fn new(fill: u8, attributes: u16) -> Self {
        UniformMemory { fill, attributes }
    }
}

impl MemoryAccessor for UniformMemory {
    fn read_byte(&self, _addr: usize) -> IntrospectResult<u8> {
        Ok(self.fill)
    }

    fn object(&self, obj_num: u16) -> IntrospectResult<WorldObject> {
        Ok(WorldObject::new(obj_num))
    }

    fn attribute_count(&self) -> u16 {
        self.attributes
    }

    fn text(&self) -> &str {
        ""
    }
}

/// What one scripted turn does to the interpreter state
#[derive(Debug, Clone, Default)]
pub struct ScriptedTurn {
    pub output: String,
    pub parents: Vec<(u16, u16)>,
    pub attributes: Vec<(u16, u16, bool)>,
    pub pokes: Vec<(usize, u8)>,
    pub halt: bool,
    pub fail: bool,
}

impl ScriptedTurn {
    pub fn says(output: &str) -> Self {
        ScriptedTurn {
            output: output.to_string(),
            ..Default::default()
        }
    }

    pub fn moving(mut self, obj: u16, parent: u16) -> Self {
        self.parents.push((obj, parent));
        self
    }

    pub fn setting(mut self, obj: u16, attr: u16) -> Self {
        self.attributes.push((obj, attr, true));
        self
    }

    pub fn clearing(mut self, obj: u16, attr: u16) -> Self {
        self.attributes.push((obj, attr, false));
        self
    }

    pub fn poking(mut self, addr: usize, value: u8) -> Self {
        self.pokes.push((addr, value));
        self
    }

    pub fn halting(mut self) -> Self {
        self.halt = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

/// An interpreter that replays a fixed script instead of executing Z-code
#[derive(Debug)]
pub struct ScriptedInterpreter {
    image: StoryImage,
    text: String,
    turns: VecDeque<ScriptedTurn>,
    alive: bool,
    pub commands: Vec<String>,
}

impl Interpreter for ScriptedInterpreter {
    fn execute_command(&mut self, command: &str) -> Result<String, String> {
        if !self.alive {
            return Err("interpreter has halted".to_string());
        }
        self.commands.push(command.to_string());
        let turn = self
            .turns
            .pop_front()
            .ok_or_else(|| format!("script exhausted at command '{command}'"))?;
        if turn.fail {
            return Err(format!("scripted failure at command '{command}'"));
        }

        for (obj, parent) in &turn.parents {
            self.image.move_object(*obj, *parent);
        }
        for (obj, attr, on) in &turn.attributes {
            self.image.set_attribute(*obj, *attr, *on);
        }
        for (addr, value) in &turn.pokes {
            self.image.poke(*addr, *value);
        }
        if turn.halt {
            self.alive = false;
        }
        self.text = turn.output.clone();
        Ok(turn.output)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn memory(&self) -> &[u8] {
        self.image.bytes()
    }

    fn text_buffer(&self) -> &str {
        &self.text
    }
}

/// Loader handing out fresh `ScriptedInterpreter`s that share one script
#[derive(Debug, Clone)]
pub struct ScriptedLoader {
    pub version: u8,
    pub opening: String,
    pub turns: Vec<ScriptedTurn>,
    pub fail_load: bool,
}

impl ScriptedLoader {
    pub fn new(opening: &str, turns: Vec<ScriptedTurn>) -> Self {
        ScriptedLoader {
            version: 3,
            opening: opening.to_string(),
            turns,
            fail_load: false,
        }
    }
}

impl StoryLoader for ScriptedLoader {
    type Interpreter = ScriptedInterpreter;

    fn load(&self, story: &[u8]) -> Result<ScriptedInterpreter, String> {
        if self.fail_load {
            return Err("story rejected by interpreter".to_string());
        }
        if story.first().copied() != Some(self.version) {
            return Err(format!("expected a version {} story", self.version));
        }
        Ok(ScriptedInterpreter {
            image: StoryImage {
                memory: story.to_vec(),
                version: self.version,
            },
            text: self.opening.clone(),
            turns: self.turns.iter().cloned().collect(),
            alive: true,
            commands: Vec::new(),
        })
    }
}
