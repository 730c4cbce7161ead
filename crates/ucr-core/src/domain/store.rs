//! Current channel values and the input dirty flag.
//!
//! Inputs are written by the host program (sensors, switches) and read by the
//! engine when it builds subscriber pushes.  Outputs are written by the remote
//! peer through `SET_OUTPUTS` and read by the host program.
//!
//! All accessors are bounds-checked: an index outside the declared capacity is
//! a silent no-op on write and reads back as the zero default.

use tracing::warn;

use super::channel::{Category, ChannelLayout, Direction, Value};
use super::registry::DescriptorRegistry;

/// Input values of occupied slots, ready for a subscriber push.
///
/// Boolean categories are *inverted* (`true` → 0, `false` → 1); peers built
/// against the first protocol revision expect that convention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputSnapshot {
    values: [Vec<i16>; 4],
}

impl InputSnapshot {
    pub fn get(&self, category: Category) -> &[i16] {
        &self.values[category.slot()]
    }
}

/// Value arrays for both directions plus the input dirty flag.
#[derive(Debug, Clone)]
pub struct IoStore {
    inputs: [Vec<i16>; 4],
    outputs: [Vec<i16>; 4],
    dirty: bool,
}

impl IoStore {
    pub fn new(layout: ChannelLayout) -> Self {
        Self {
            inputs: Category::ALL.map(|c| vec![0; layout.inputs.get(c)]),
            outputs: Category::ALL.map(|c| vec![0; layout.outputs.get(c)]),
            dirty: false,
        }
    }

    /// Stores an input value.
    ///
    /// Returns `true` only when the stored value actually changed; in that
    /// case the dirty flag is raised.
    pub fn write_input(&mut self, category: Category, index: usize, value: impl Into<Value>) -> bool {
        let raw = value.into().to_raw(category);
        let Some(slot) = self.inputs[category.slot()].get_mut(index) else {
            return false;
        };
        if *slot == raw {
            return false;
        }
        *slot = raw;
        self.dirty = true;
        true
    }

    pub fn read_input(&self, category: Category, index: usize) -> Value {
        read(&self.inputs, category, index)
    }

    /// Current output value, or the zero default when `index` is out of range.
    pub fn read_output(&self, category: Category, index: usize) -> Value {
        read(&self.outputs, category, index)
    }

    /// Writes a batch of output values received from the peer.
    ///
    /// The batch comes straight off the network, so every index is checked
    /// against the declared capacity; offending entries are skipped.  Returns
    /// the number of entries applied.
    pub fn apply_outputs<I>(&mut self, writes: I) -> usize
    where
        I: IntoIterator<Item = (Category, i64, Value)>,
    {
        let mut applied = 0;
        for (category, index, value) in writes {
            let slot = usize::try_from(index)
                .ok()
                .and_then(|i| self.outputs[category.slot()].get_mut(i));
            match slot {
                Some(slot) => {
                    *slot = value.to_raw(category);
                    applied += 1;
                }
                None => warn!(%category, index, "dropping output write outside channel range"),
            }
        }
        applied
    }

    /// Zeroes every output value.  Inputs and descriptors are untouched.
    pub fn reset_outputs(&mut self) {
        for values in &mut self.outputs {
            values.fill(0);
        }
    }

    /// Builds the push payload from the input slots that have a descriptor.
    pub fn snapshot_inputs(&self, registry: &DescriptorRegistry) -> InputSnapshot {
        let values = Category::ALL.map(|category| {
            let stored = &self.inputs[category.slot()];
            registry
                .occupied_indices(Direction::Input, category)
                .map(|i| {
                    let raw = stored.get(i).copied().unwrap_or(0);
                    if category.is_boolean() {
                        i16::from(raw == 0)
                    } else {
                        raw
                    }
                })
                .collect::<Vec<i16>>()
        });
        InputSnapshot { values }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for IoStore {
    fn default() -> Self {
        Self::new(ChannelLayout::default())
    }
}

fn read(arrays: &[Vec<i16>; 4], category: Category, index: usize) -> Value {
    let raw = arrays[category.slot()].get(index).copied().unwrap_or(0);
    Value::from_raw(raw, category)
}
