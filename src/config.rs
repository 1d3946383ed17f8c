//! Immutable runtime configuration.
//!
//! A [`Settings`] value is built once at process start and passed to the
//! context factory; nothing here is ambient or mutable afterward. The
//! defaults match the tuning the renderer was designed around: 8x8
//! sub-pixel samples and 32-pixel block flags.

// ============================================================================
// Pooling configuration
// ============================================================================

/// Where idle contexts are cached between rasterization calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStrategy {
    /// One cached context per thread. Cheapest acquire/release; memory
    /// scales with the number of rendering threads.
    PerThread,
    /// A single shared free list guarded by a lock. Bounded memory no
    /// matter how many threads touch it.
    Shared,
}

/// How aggressively idle contexts are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep every released context (per-thread: the one slot; shared: an
    /// unbounded free list).
    Keep,
    /// Keep at most this many idle contexts; excess releases are dropped.
    /// Only meaningful for the shared strategy.
    Bounded(usize),
}

// ============================================================================
// Settings
// ============================================================================

/// Rasterizer configuration, fixed for the lifetime of a pool and all
/// contexts created from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// log2 of sub-pixel samples per pixel in x. 0 disables horizontal
    /// antialiasing.
    pub subpixel_lg_x: u32,
    /// log2 of sub-pixel samples per pixel in y. 0 disables vertical
    /// antialiasing.
    pub subpixel_lg_y: u32,
    /// log2 of the pixel-run granularity of the renderer's dirty-block
    /// flags.
    pub block_size_lg: u32,
    /// Context pooling strategy.
    pub pool_strategy: PoolStrategy,
    /// Idle-context retention policy.
    pub retention: Retention,
}

impl Settings {
    /// Maximum per-pixel coverage count: one per sub-pixel sample.
    #[inline]
    pub fn max_coverage(&self) -> u32 {
        1 << (self.subpixel_lg_x + self.subpixel_lg_y)
    }

    /// Settings for binary (non-antialiased) masks: a single sample per
    /// pixel, so any coverage is full coverage.
    pub fn binary() -> Self {
        Self {
            subpixel_lg_x: 0,
            subpixel_lg_y: 0,
            ..Self::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subpixel_lg_x: 3,
            subpixel_lg_y: 3,
            block_size_lg: 5,
            pool_strategy: PoolStrategy::PerThread,
            retention: Retention::Keep,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
