//! Channel vocabulary shared by the registry, the state store and the wire.
//!
//! A *channel* is one named input or output on the device, e.g. a push button
//! wired to a GPIO pin (`Input`/`Button`) or an LED the remote peer can switch
//! (`Output`/`Button`).  Every channel belongs to exactly one [`Direction`] and
//! one [`Category`]; the pair selects which slot table and value array hold it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a channel is read by the remote peer or written by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Device → peer.  Written locally, pushed to the subscriber.
    Input,
    /// Peer → device.  Written by `SET_OUTPUTS`, read locally.
    Output,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Input, Direction::Output];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// The four channel categories.  Buttons and events carry booleans, axes and
/// deltas carry signed 16-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Button,
    Axis,
    Delta,
    Event,
}

impl Category {
    /// Wire order of the categories inside every per-category document.
    pub const ALL: [Category; 4] = [
        Category::Button,
        Category::Axis,
        Category::Delta,
        Category::Event,
    ];

    /// Single-letter key used for this category in wire documents.
    pub fn tag(self) -> &'static str {
        match self {
            Category::Button => "b",
            Category::Axis => "a",
            Category::Delta => "d",
            Category::Event => "e",
        }
    }

    /// Returns `true` for the boolean categories (button, event).
    pub fn is_boolean(self) -> bool {
        matches!(self, Category::Button | Category::Event)
    }

    /// Position of this category in [`Category::ALL`].
    pub(crate) fn slot(self) -> usize {
        match self {
            Category::Button => 0,
            Category::Axis => 1,
            Category::Delta => 2,
            Category::Event => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Button => "button",
            Category::Axis => "axis",
            Category::Delta => "delta",
            Category::Event => "event",
        };
        f.write_str(name)
    }
}

/// A channel value as seen by callers.
///
/// Values are stored as `i16` internally; boolean categories hold `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i16),
}

impl Value {
    /// Normalises this value into the storage representation of `category`.
    ///
    /// Booleans written to numeric categories become `0`/`1`; non-zero
    /// integers written to boolean categories become `1`.
    pub fn to_raw(self, category: Category) -> i16 {
        match (self, category.is_boolean()) {
            (Value::Bool(b), _) => i16::from(b),
            (Value::Int(v), true) => i16::from(v != 0),
            (Value::Int(v), false) => v,
        }
    }

    /// Rebuilds a typed value from its storage representation.
    pub fn from_raw(raw: i16, category: Category) -> Self {
        if category.is_boolean() {
            Value::Bool(raw != 0)
        } else {
            Value::Int(raw)
        }
    }

    /// The zero default for `category`.
    pub fn zero(category: Category) -> Self {
        Self::from_raw(0, category)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int(value)
    }
}

/// Slot counts for the four categories of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    pub button: usize,
    pub axis: usize,
    pub delta: usize,
    pub event: usize,
}

impl Capacities {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Button => self.button,
            Category::Axis => self.axis,
            Category::Delta => self.delta,
            Category::Event => self.event,
        }
    }
}

impl Default for Capacities {
    /// 64 buttons, 32 axes, 32 deltas, 32 events.
    fn default() -> Self {
        Self {
            button: 64,
            axis: 32,
            delta: 32,
            event: 32,
        }
    }
}

/// Capacities for both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    pub inputs: Capacities,
    pub outputs: Capacities,
}

impl ChannelLayout {
    pub fn capacity(&self, direction: Direction, category: Category) -> usize {
        match direction {
            Direction::Input => self.inputs.get(category),
            Direction::Output => self.outputs.get(category),
        }
    }
}
