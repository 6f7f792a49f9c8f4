//! Multi-slot grid fields.

use crate::error::{SmokeError, SmokeResult};
use glam::UVec3;
use rhizome_plume_backend::{BufferHandle, ComputeBackend, ElementFormat};

/// Role of one buffer within a [`GridField`].
///
/// At the start of every stage `Read` holds the authoritative data and the
/// `Write*` slots are scratch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Authoritative data.
    Read,
    /// Primary scratch, target of most stages.
    Write,
    /// Forward advection result.
    Write2,
    /// Backward advection result.
    Write3,
}

impl Slot {
    /// All slots in index order.
    pub const ALL: [Slot; 4] = [Slot::Read, Slot::Write, Slot::Write2, Slot::Write3];

    fn index(self) -> usize {
        match self {
            Slot::Read => 0,
            Slot::Write => 1,
            Slot::Write2 => 2,
            Slot::Write3 => 3,
        }
    }
}

/// A grid quantity backed by 1 to 4 equally shaped backend buffers.
///
/// Slot roles change by swapping handles; buffer contents never move.
#[derive(Clone, Debug)]
pub struct GridField {
    name: &'static str,
    dims: UVec3,
    format: ElementFormat,
    slots: Vec<BufferHandle>,
}

impl GridField {
    /// Allocates `slot_count` zeroed buffers.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is not in `1..=4`.
    pub fn allocate<B: ComputeBackend + ?Sized>(
        backend: &mut B,
        name: &'static str,
        dims: UVec3,
        format: ElementFormat,
        slot_count: usize,
    ) -> SmokeResult<Self> {
        assert!(
            (1..=Slot::ALL.len()).contains(&slot_count),
            "{name}: a field has 1 to 4 slots, got {slot_count}"
        );
        let slots = (0..slot_count)
            .map(|_| backend.allocate(dims, format))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| SmokeError::Allocation {
                field: name,
                source,
            })?;
        Ok(Self {
            name,
            dims,
            format,
            slots,
        })
    }

    /// Field name, used in errors and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Grid extent.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Element format of every slot.
    pub fn format(&self) -> ElementFormat {
        self.format
    }

    /// Number of slots this field owns.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the buffer currently playing `slot`.
    ///
    /// # Panics
    ///
    /// Panics if the field does not own `slot`.
    pub fn slot(&self, slot: Slot) -> BufferHandle {
        self.slots[self.slot_index(slot)]
    }

    /// The authoritative buffer.
    pub fn read(&self) -> BufferHandle {
        self.slots[0]
    }

    /// The primary scratch buffer.
    pub fn write(&self) -> BufferHandle {
        self.slot(Slot::Write)
    }

    /// Exchanges two slot roles.
    pub fn swap(&mut self, a: Slot, b: Slot) {
        let (i, j) = (self.slot_index(a), self.slot_index(b));
        self.slots.swap(i, j);
    }

    /// Makes `slot` authoritative; the old `Read` buffer becomes scratch.
    pub fn promote(&mut self, slot: Slot) {
        self.swap(Slot::Read, slot);
    }

    /// Zeroes one slot.
    pub fn clear<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        slot: Slot,
    ) -> SmokeResult<()> {
        backend
            .clear(self.slot(slot))
            .map_err(|source| SmokeError::Clear {
                field: self.name,
                source,
            })
    }

    /// Zeroes every slot.
    pub fn clear_all<B: ComputeBackend + ?Sized>(&self, backend: &mut B) -> SmokeResult<()> {
        for &slot in &Slot::ALL[..self.slots.len()] {
            self.clear(backend, slot)?;
        }
        Ok(())
    }

    fn slot_index(&self, slot: Slot) -> usize {
        assert!(
            slot.index() < self.slots.len(),
            "{}: no {slot:?} slot in a {}-slot field",
            self.name,
            self.slots.len()
        );
        slot.index()
    }
}
