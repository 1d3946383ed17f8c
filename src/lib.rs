//! # sable
//!
//! A software vector-graphics rasterizer: given a stream of path geometry
//! (moves, lines, quadratic/cubic curves, closes) plus optional stroke and
//! dash attributes, it produces an anti-aliased coverage (alpha) mask for
//! the filled or stroked shape, row by row, without heap allocation on the
//! hot path.
//!
//! ## Architecture
//!
//! Geometry flows through a chain of path-event consumers:
//!
//! 1. **Feed** — defensive coordinate checking and transform application
//! 2. **Filters** — per-vertex delta transforms, closed-path detection
//! 3. **Dasher** — splits the path into alternating on/off runs
//! 4. **Stroker** — converts a path into its stroked outline
//! 5. **Renderer** — scanline scan converter accumulating sub-pixel
//!    coverage, delivered row by row to an alpha consumer
//!
//! Every stage's scratch storage lives in a pooled [`context::RendererContext`];
//! arrays grow geometrically, never shrink, and are reused dirty, so
//! steady-state rasterization does not allocate.
//!
//! ```
//! use sable::basics::{Bounds, PathElement, WindingRule};
//! use sable::config::Settings;
//! use sable::context::RendererContext;
//! use sable::engine::rasterize_fill;
//!
//! let mut ctx = RendererContext::new(Settings::default());
//! let path = [
//!     PathElement::MoveTo { x: 1.0, y: 1.0 },
//!     PathElement::LineTo { x: 9.0, y: 1.0 },
//!     PathElement::LineTo { x: 5.0, y: 9.0 },
//!     PathElement::ClosePath,
//! ];
//! let mask = rasterize_fill(
//!     &mut ctx,
//!     path,
//!     None,
//!     WindingRule::NonZero,
//!     Bounds::unbounded(),
//! )
//! .unwrap();
//! assert_eq!(mask.alpha_at(4, 4), 255);
//! ```

// Foundation types and math
pub mod array;
pub mod basics;
pub mod config;
pub mod curves;
pub mod error;
pub mod math;
pub mod trans_affine;

// Pipeline stages
pub mod alpha;
pub mod dasher;
pub mod filters;
pub mod renderer;
pub mod stroker;

// Context, pooling, and orchestration
pub mod context;
pub mod engine;

pub use alpha::{AlphaConsumer, AlphaMap, MaskBuffer};
pub use basics::{Bounds, PathConsumer, PathElement, WindingRule};
pub use config::{PoolStrategy, Retention, Settings};
pub use context::{ContextPool, RendererContext};
pub use engine::{rasterize_fill, rasterize_stroke, DashParams};
pub use error::Error;
pub use stroker::{Cap, Join, StrokeParams};
pub use trans_affine::TransAffine;
