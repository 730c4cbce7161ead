//! Descriptor registry: name ↔ index bindings for every channel.
//!
//! Each (direction, category) pair owns a bounded slot table.  The slot index
//! is the channel's identifier on the wire, so once a name is bound to an
//! index the binding never changes for the lifetime of the process.

use std::collections::BTreeMap;

use thiserror::Error;

use super::channel::{Category, ChannelLayout, Direction};

/// Errors raised by auto-assigned registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Every slot of the table is already bound.
    #[error("no free {direction} {category} slot (capacity {capacity})")]
    CapacityExceeded {
        direction: Direction,
        category: Category,
        capacity: usize,
    },
}

/// A single named channel as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub index: usize,
}

/// Bounded slot table for one (direction, category) pair.
#[derive(Debug, Clone)]
struct SlotTable {
    capacity: usize,
    names: BTreeMap<usize, String>,
}

impl SlotTable {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            names: BTreeMap::new(),
        }
    }

    fn bind(&mut self, index: usize, name: &str) -> bool {
        if index >= self.capacity || self.names.contains_key(&index) {
            return false;
        }
        self.names.insert(index, name.to_string());
        true
    }

    fn first_free(&self) -> Option<usize> {
        (0..self.capacity).find(|i| !self.names.contains_key(i))
    }
}

/// Registry of every channel descriptor on the device.
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    layout: ChannelLayout,
    inputs: [SlotTable; 4],
    outputs: [SlotTable; 4],
}

impl DescriptorRegistry {
    pub fn new(layout: ChannelLayout) -> Self {
        Self {
            layout,
            inputs: Category::ALL.map(|c| SlotTable::new(layout.inputs.get(c))),
            outputs: Category::ALL.map(|c| SlotTable::new(layout.outputs.get(c))),
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Binds `name` to an explicit `index`.
    ///
    /// Returns `None` without touching the table when the index is outside
    /// the declared capacity or already bound.
    pub fn register_at(
        &mut self,
        direction: Direction,
        category: Category,
        name: &str,
        index: usize,
    ) -> Option<usize> {
        self.table_mut(direction, category)
            .bind(index, name)
            .then_some(index)
    }

    /// Binds `name` to the lowest free index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CapacityExceeded`] when the table is full.
    pub fn register(
        &mut self,
        direction: Direction,
        category: Category,
        name: &str,
    ) -> Result<usize, RegistryError> {
        let table = self.table_mut(direction, category);
        let index = table.first_free().ok_or(RegistryError::CapacityExceeded {
            direction,
            category,
            capacity: table.capacity,
        })?;
        table.bind(index, name);
        Ok(index)
    }

    /// Name bound to `index`, if any.
    pub fn name(&self, direction: Direction, category: Category, index: usize) -> Option<&str> {
        self.table(direction, category)
            .names
            .get(&index)
            .map(String::as_str)
    }

    pub fn is_registered(&self, direction: Direction, category: Category, index: usize) -> bool {
        self.table(direction, category).names.contains_key(&index)
    }

    /// Occupied indices in ascending order.
    pub fn occupied_indices(
        &self,
        direction: Direction,
        category: Category,
    ) -> impl Iterator<Item = usize> + '_ {
        self.table(direction, category).names.keys().copied()
    }

    /// Descriptors of one table, ascending by index.
    pub fn descriptors(&self, direction: Direction, category: Category) -> Vec<Descriptor> {
        self.table(direction, category)
            .names
            .iter()
            .map(|(&index, name)| Descriptor {
                name: name.clone(),
                index,
            })
            .collect()
    }

    /// Full catalog for one direction, in [`Category::ALL`] order.
    pub fn catalog(&self, direction: Direction) -> Vec<(Category, Vec<Descriptor>)> {
        Category::ALL
            .iter()
            .map(|&c| (c, self.descriptors(direction, c)))
            .collect()
    }

    fn table(&self, direction: Direction, category: Category) -> &SlotTable {
        match direction {
            Direction::Input => &self.inputs[category.slot()],
            Direction::Output => &self.outputs[category.slot()],
        }
    }

    fn table_mut(&mut self, direction: Direction, category: Category) -> &mut SlotTable {
        match direction {
            Direction::Input => &mut self.inputs[category.slot()],
            Direction::Output => &mut self.outputs[category.slot()],
        }
    }
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new(ChannelLayout::default())
    }
}
