//! Private data element block allocation, per PS3.5 §7.8.
//!
//! Vendors place their attributes in odd-numbered groups. A *private
//! creator* element at (gggg,0010)..(gggg,00FF) reserves a block of
//! 256 data element slots: the creator at element `0x00nn` owns the
//! tags (gggg,nn00)..(gggg,nnFF). The allocator hands out blocks,
//! keeping at most one creator per slot and reusing the block of an
//! already registered creator identifier.
//!
//! The allocator is an explicit value to be created and shared by its
//! users, not a process-wide global. All operations are atomic against
//! concurrent callers.

use dcmio_core::{DataElement, DataSet, Tag, VR};
use snafu::{ensure, Snafu};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// The range of element numbers which reserve private blocks.
const CREATOR_ELEMENTS: std::ops::RangeInclusive<u16> = 0x0010..=0x00FF;

/// An error from private block allocation.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum BlockError {
    /// Private blocks only exist in odd-numbered groups.
    #[snafu(display("group {group:#06X} cannot hold private blocks"))]
    InvalidGroup {
        /// the offending group number
        group: u16,
    },
    /// All 240 blocks of the group are reserved.
    #[snafu(display("no private blocks left in group {group:#06X}"))]
    NoBlocksAvailable {
        /// the exhausted group number
        group: u16,
    },
}

pub type Result<T, E = BlockError> = std::result::Result<T, E>;

/// A reserved private block: a creator identifier bound to
/// a creator element slot in an odd group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrivateCreator {
    creator_id: String,
    group: u16,
    element: u16,
}

impl PrivateCreator {
    /// The creator identifier, as stored in the LO creator element.
    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    /// The group this block lives in.
    pub fn group(&self) -> u16 {
        self.group
    }

    /// The tag of the creator element itself.
    pub fn tag(&self) -> Tag {
        Tag(self.group, self.element)
    }

    /// The block number, equal to the creator element's low byte.
    pub fn block_number(&self) -> u8 {
        (self.element & 0x00FF) as u8
    }

    /// Whether the given private data tag belongs to this block.
    pub fn owns(&self, tag: Tag) -> bool {
        tag.group() == self.group && (tag.element() >> 8) == u16::from(self.block_number())
    }

    /// The data element tag at the given offset within this block.
    pub fn data_tag(&self, offset: u8) -> Tag {
        Tag(
            self.group,
            (u16::from(self.block_number()) << 8) | u16::from(offset),
        )
    }
}

/// An allocator of private data element blocks.
#[derive(Debug, Default)]
pub struct PrivateTagAllocator {
    // group number -> creator element number -> creator identifier
    blocks: Mutex<BTreeMap<u16, BTreeMap<u16, String>>>,
}

impl PrivateTagAllocator {
    /// Create an allocator with no reservations.
    pub fn new() -> Self {
        PrivateTagAllocator::default()
    }

    /// Reserve a block for `creator_id` in the given odd group.
    ///
    /// If the identifier already holds a block in the group, that
    /// block is returned instead of a new reservation. Otherwise the
    /// lowest free creator element in 0x0010..=0x00FF is claimed.
    pub fn allocate_block(&self, creator_id: &str, group: u16) -> Result<PrivateCreator> {
        // PS3.5 §7.8.1: odd groups, except the reserved ones below 0008
        // and group FFFF
        ensure!(
            group & 1 == 1 && group > 0x0008 && group != 0xFFFF,
            InvalidGroupSnafu { group }
        );

        let mut blocks = self.blocks.lock().expect("allocator lock poisoned");
        let slots = blocks.entry(group).or_default();

        if let Some((&element, _)) = slots.iter().find(|(_, id)| id.as_str() == creator_id) {
            return Ok(PrivateCreator {
                creator_id: creator_id.to_string(),
                group,
                element,
            });
        }

        let element = CREATOR_ELEMENTS
            .clone()
            .find(|e| !slots.contains_key(e))
            .ok_or(BlockError::NoBlocksAvailable { group })?;
        slots.insert(element, creator_id.to_string());
        Ok(PrivateCreator {
            creator_id: creator_id.to_string(),
            group,
            element,
        })
    }

    /// Reserve a block, or fetch the one already held by `creator_id`.
    ///
    /// Equivalent to [`allocate_block`](Self::allocate_block); kept as
    /// a separate name so call sites can state their intent.
    pub fn get_or_allocate(&self, creator_id: &str, group: u16) -> Result<PrivateCreator> {
        self.allocate_block(creator_id, group)
    }

    /// The data element tag at `offset` within the creator's block.
    pub fn create_tag(&self, creator: &PrivateCreator, offset: u8) -> Tag {
        creator.data_tag(offset)
    }

    /// Find the creator owning the given private data tag,
    /// if its block is reserved in this allocator.
    pub fn creator_for(&self, tag: Tag) -> Option<PrivateCreator> {
        let block = tag.block_number()?;
        let element = 0x0010 | u16::from(block);
        if !CREATOR_ELEMENTS.contains(&element) {
            return None;
        }
        let blocks = self.blocks.lock().expect("allocator lock poisoned");
        let creator_id = blocks.get(&tag.group())?.get(&element)?.clone();
        Some(PrivateCreator {
            creator_id,
            group: tag.group(),
            element,
        })
    }

    /// Drop every reservation.
    pub fn reset(&self) {
        self.blocks.lock().expect("allocator lock poisoned").clear();
    }

    /// Materialize the registered creator elements of `group`
    /// into the data set as LO elements.
    pub fn apply_to(&self, dataset: &mut DataSet, group: u16) {
        let blocks = self.blocks.lock().expect("allocator lock poisoned");
        if let Some(slots) = blocks.get(&group) {
            for (&element, creator_id) in slots {
                dataset.put(DataElement::new_str(
                    Tag(group, element),
                    VR::LO,
                    creator_id,
                ));
            }
        }
    }
}
