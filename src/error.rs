use thiserror::Error;

/// An error raised by the hook runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The number of `memoize` calls differs from the previous completed pass
    /// of the instance, e.g. because a call was made conditionally.
    #[error(
        "call order violation in {instance}: expected {expected} memoize calls, \
         found {actual}"
    )]
    CallOrderViolation {
        /// The name of the offending instance.
        instance: String,
        /// The slot count of the previous completed pass.
        expected: usize,
        /// The slot count reached in this pass.
        actual: usize,
    },
    /// A slot was visited from another call site than the one that created
    /// it, i.e. the positional order of `memoize` calls changed.
    #[error(
        "call order violation in {instance}: slot {slot} belongs to the call at \
         {expected}, but was visited from {actual}"
    )]
    CallSiteMismatch {
        /// The name of the offending instance.
        instance: String,
        /// The index of the slot.
        slot: usize,
        /// Where the call that created the slot lives.
        expected: String,
        /// Where the call that visited the slot lives.
        actual: String,
    },
    /// A slot was visited by a call that wants another payload type than the
    /// one stored, e.g. a generic helper called with its type arguments in
    /// swapped order.
    #[error(
        "call order violation in {instance}: slot {slot} holds a {expected}, \
         but was visited by a call producing {actual}"
    )]
    PayloadTypeMismatch {
        /// The name of the offending instance.
        instance: String,
        /// The index of the slot.
        slot: usize,
        /// The type of the stored payload.
        expected: &'static str,
        /// The type the visiting call produces.
        actual: &'static str,
    },
    /// `memoize` was invoked without an active render pass, for example on an
    /// instance that is unmounted or was never mounted.
    #[error("memoize invoked without an active render pass")]
    MissingInstanceContext,
    /// A render pass was started while another one was running for the same
    /// instance.
    #[error("{instance} is already rendering")]
    PassInProgress {
        /// The name of the instance.
        instance: String,
    },
}

impl HookError {
    /// Whether this error reports a broken call-order invariant.
    pub fn is_call_order_violation(&self) -> bool {
        matches!(
            self,
            Self::CallOrderViolation { .. }
                | Self::CallSiteMismatch { .. }
                | Self::PayloadTypeMismatch { .. }
        )
    }
}

/// A `Result` with a [`HookError`].
pub type HookResult<T> = Result<T, HookError>;
