//! The renderer context and its pool.
//!
//! A [`RendererContext`] bundles one instance of every pipeline component
//! plus their scratch storage. Acquisition from a [`ContextPool`] is
//! exclusive: a context belongs to exactly one in-flight rasterization
//! and carries no locking. Release resets logical lengths in O(1) without
//! zeroing memory; a context whose call did not run to completion is
//! discarded instead of repooled.

use std::cell::{Cell, RefCell};
use std::sync::Mutex;

use crate::array::{DirtyBuffer, PolyStack};
use crate::config::{PoolStrategy, Retention, Settings};
use crate::renderer::Renderer;

// ============================================================================
// RendererContext
// ============================================================================

/// Per-call scratch arena: the renderer plus the stacks and buffers the
/// filter stages borrow while a pipeline is assembled.
pub struct RendererContext {
    settings: Settings,
    pub renderer: Renderer,
    /// closed-path detector's subpath buffer
    pub cpd_stack: PolyStack,
    /// stroker's reverse-side outline
    pub reverse_stack: PolyStack,
    /// stroker's curve subdivision scratch
    pub stroker_middle: DirtyBuffer<f32>,
    /// validated (and possibly rescaled) dash array copy
    pub dash_buffer: DirtyBuffer<f32>,
    /// dasher's leading-run buffer
    pub first_segments: PolyStack,
    /// closed-subpath flag shared between detector and stroker
    pub closed_path: Cell<bool>,
    dirty: bool,
}

impl RendererContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            renderer: Renderer::new(&settings),
            cpd_stack: PolyStack::new(),
            reverse_stack: PolyStack::new(),
            stroker_middle: DirtyBuffer::new(64),
            dash_buffer: DirtyBuffer::new(16),
            first_segments: PolyStack::new(),
            closed_path: Cell::new(false),
            dirty: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Marks the context as mid-call. A context released while dirty is
    /// discarded by the pool rather than reused.
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// O(1) logical reset of all scratch state; capacities are retained
    /// and contents stay dirty.
    pub fn reset(&mut self) {
        self.cpd_stack.clear();
        self.reverse_stack.clear();
        self.stroker_middle.clear();
        self.dash_buffer.clear();
        self.first_segments.clear();
        self.closed_path.set(false);
    }
}

// ============================================================================
// ContextPool
// ============================================================================

thread_local! {
    static THREAD_SLOT: RefCell<Option<RendererContext>> = const { RefCell::new(None) };
}

/// Pool of idle renderer contexts.
///
/// The per-thread strategy keeps one context in a thread-local slot; the
/// shared strategy keeps a mutex-guarded free list whose size is bounded
/// by the retention policy. The pool itself is safe to share across
/// threads; the contexts it hands out are not.
pub struct ContextPool {
    settings: Settings,
    shared: Mutex<Vec<RendererContext>>,
}

impl ContextPool {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            shared: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Take an idle context or create a fresh one. The returned context
    /// is exclusively owned by the caller until released.
    pub fn acquire(&self) -> RendererContext {
        match self.settings.pool_strategy {
            PoolStrategy::PerThread => {
                let cached = THREAD_SLOT.with(|slot| {
                    let mut slot = slot.borrow_mut();
                    match slot.take() {
                        // the slot is shared by all per-thread pools; a
                        // context built for other settings is put back
                        Some(ctx) if *ctx.settings() == self.settings => Some(ctx),
                        Some(ctx) => {
                            *slot = Some(ctx);
                            None
                        }
                        None => None,
                    }
                });
                cached.unwrap_or_else(|| self.create())
            }
            PoolStrategy::Shared => {
                let cached = self.shared.lock().unwrap().pop();
                cached.unwrap_or_else(|| self.create())
            }
        }
    }

    /// Return a context. Dirty contexts (a call that did not complete)
    /// are dropped; clean ones are reset and cached per the strategy.
    pub fn release(&self, mut ctx: RendererContext) {
        if ctx.is_dirty() {
            log::debug!(target: "sable::pool", "discarding context released mid-call");
            return;
        }
        ctx.reset();
        match self.settings.pool_strategy {
            PoolStrategy::PerThread => {
                THREAD_SLOT.with(|slot| {
                    *slot.borrow_mut() = Some(ctx);
                });
            }
            PoolStrategy::Shared => {
                let mut pool = self.shared.lock().unwrap();
                let keep = match self.settings.retention {
                    Retention::Keep => true,
                    Retention::Bounded(n) => pool.len() < n,
                };
                if keep {
                    pool.push(ctx);
                }
            }
        }
    }

    fn create(&self) -> RendererContext {
        log::debug!(target: "sable::pool", "creating renderer context");
        RendererContext::new(self.settings)
    }
}

// ============================================================================
// Tests
// ============================================================================
