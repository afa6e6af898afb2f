//! Call-order indexed memoization for component render passes.
//!
//! Every mounted component instance owns a table of slots. During a render
//! pass, the n-th call to [`RenderContext::memoize`] uses the n-th slot: if
//! the slot's dependencies are unchanged, the cached payload is returned as is,
//! so handles like `Arc`s or [`Callback`]s keep their identity across passes.
//! The render routine must thus make the same calls in the same order on every
//! pass.
//!
//! ```
//! use std::sync::Arc;
//! use memoslot::{HookError, Runtime, deps};
//!
//! let runtime = Runtime::new();
//! let counter = runtime.mount("Counter");
//!
//! let label = |step: u32| {
//!     runtime.render(counter, |cx| {
//!         cx.memoize(|| Arc::new(format!("+{step}")), deps![step])
//!     })
//! };
//!
//! let a = label(1)?;
//! let b = label(1)?; // [Hit] Same step.
//! let c = label(2)?; // [Miss] Step changed.
//! assert!(Arc::ptr_eq(&a, &b));
//! assert!(!Arc::ptr_eq(&b, &c));
//! # Ok::<(), HookError>(())
//! ```

mod callback;
mod config;
mod cursor;
mod dependency;
mod error;
mod hash;
mod runtime;
mod slot;

#[cfg(feature = "testing")]
pub mod testing;

pub use crate::callback::Callback;
pub use crate::config::{Config, DIAGNOSTICS_ENV};
pub use crate::dependency::{ByAddress, ByValue, Dependency, Deps, IntoDeps, changed};
pub use crate::error::{HookError, HookResult};
pub use crate::runtime::{InstanceId, InstanceStats, RenderContext, Runtime};

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    pub use crate::cursor::CallCursor;
    pub use crate::hash::CallSite;
    pub use crate::slot::{Slot, SlotError, SlotTable};
}
