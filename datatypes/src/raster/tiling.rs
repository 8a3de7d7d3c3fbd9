use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

pub const MIN_BLOCK_SIZE: usize = 64;
pub const MAX_BLOCK_SIZE: usize = 4096;
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// The nominal size of the blocks a raster is split into
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    pub width: usize,
    pub height: usize,
}

impl BlockSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Creates a block size with each axis clamped into `[MIN_BLOCK_SIZE, MAX_BLOCK_SIZE]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::raster::BlockSize;
    ///
    /// assert_eq!(BlockSize::clamped(10, 10_000), BlockSize::new(64, 4096));
    /// ```
    ///
    pub fn clamped(width: usize, height: usize) -> Self {
        Self::new(
            width.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE),
            height.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE),
        )
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_SIZE)
    }
}

/// A single block of the lattice.
/// Offsets are pixel positions within the raster, `width`/`height` are already clipped to the raster edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// running number in row-major order
    pub index: usize,
    pub x_index: usize,
    pub y_index: usize,
    pub x_offset: usize,
    pub y_offset: usize,
    pub width: usize,
    pub height: usize,
}

/// Partitions a `raster_width` x `raster_height` raster into a regular grid of blocks.
/// The right column and bottom row are clipped, so blocks never extend past the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLattice {
    raster_width: usize,
    raster_height: usize,
    block_size: BlockSize,
    x_blocks: usize,
    y_blocks: usize,
}

impl BlockLattice {
    /// # Errors
    ///
    /// Fails if the raster or the block size has a zero extent on any axis
    ///
    pub fn new(raster_width: usize, raster_height: usize, block_size: BlockSize) -> Result<Self> {
        ensure!(
            raster_width > 0 && raster_height > 0 && block_size.width > 0 && block_size.height > 0,
            error::InvalidBlockGeometry {
                width: raster_width,
                height: raster_height,
                block_width: block_size.width,
                block_height: block_size.height,
            }
        );

        Ok(Self {
            raster_width,
            raster_height,
            block_size,
            x_blocks: raster_width.div_ceil(block_size.width),
            y_blocks: raster_height.div_ceil(block_size.height),
        })
    }

    /// A lattice with exactly one block covering the whole raster
    pub fn single_block(raster_width: usize, raster_height: usize) -> Result<Self> {
        Self::new(
            raster_width,
            raster_height,
            BlockSize::new(raster_width, raster_height),
        )
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn x_blocks(&self) -> usize {
        self.x_blocks
    }

    pub fn y_blocks(&self) -> usize {
        self.y_blocks
    }

    pub fn number_of_blocks(&self) -> usize {
        self.x_blocks * self.y_blocks
    }

    /// Returns the block at column `x_index` and row `y_index`, or `None` if it is outside the lattice.
    pub fn block(&self, x_index: usize, y_index: usize) -> Option<Block> {
        if x_index >= self.x_blocks || y_index >= self.y_blocks {
            return None;
        }

        let x_offset = x_index * self.block_size.width;
        let y_offset = y_index * self.block_size.height;

        Some(Block {
            index: y_index * self.x_blocks + x_index,
            x_index,
            y_index,
            x_offset,
            y_offset,
            width: self.block_size.width.min(self.raster_width - x_offset),
            height: self.block_size.height.min(self.raster_height - y_offset),
        })
    }

    /// All blocks, rows top to bottom and columns left to right within a row.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.y_blocks).flat_map(move |y_index| {
            (0..self.x_blocks).filter_map(move |x_index| self.block(x_index, y_index))
        })
    }
}
