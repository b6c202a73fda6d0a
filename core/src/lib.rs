//! # Vybeme Core
//!
//! Core traits and types for the check-in controller.
//!
//! The controller is written as a reducer: a pure function
//! `(State, Action, Environment) → (State, Effects)`. Effects are
//! descriptions of I/O (an HTTP call, a delayed action) that the runtime
//! executes and whose results are fed back into the reducer as actions.
//!
//! ## Core Concepts
//!
//! - **State**: everything the screen renders, with one source of truth
//! - **Action**: operator input, decoder output and API results
//! - **Reducer**: all transition logic, deterministic and testable
//! - **Effect**: a side effect description, never executed by the reducer
//! - **Environment**: injected dependencies (API, clock, session)
//!
//! ## Example
//!
//! ```ignore
//! use vybeme_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for ScannerReducer {
//!     type State = ScannerState;
//!     type Action = ScannerAction;
//!     type Environment = ScannerEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ScannerState,
//!         action: ScannerAction,
//!         env: &ScannerEnvironment,
//!     ) -> SmallVec<[Effect<ScannerAction>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns the effects the runtime
        /// should execute. Most actions produce zero or one effect, so the
        /// result is stored inline.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned from reducers and executed by the Store.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Boxed future produced by an effect
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(EffectFuture<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an async computation whose output is fed back as an action
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Returns `true` if this effect does nothing
        ///
        /// Composite effects are no-ops when all their children are.
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_none)
                },
                Effect::Delay { .. } | Effect::Future(_) => false,
            }
        }

        /// Number of async computations this effect will start
        ///
        /// Counts `Future` leaves, looking through `Parallel` and `Sequential`.
        #[must_use]
        pub fn future_count(&self) -> usize {
            match self {
                Effect::Future(_) => 1,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().map(Effect::future_count).sum()
                },
                Effect::None | Effect::Delay { .. } => 0,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Production uses [`SystemClock`]; tests use a fixed clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use std::time::Duration;

    #[test]
    fn none_effects_are_detected_through_composites() {
        let effect: Effect<u8> = Effect::merge(vec![Effect::None, Effect::chain(vec![])]);
        assert!(effect.is_none());

        let delayed: Effect<u8> = Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(1),
        };
        assert!(!delayed.is_none());
    }

    #[test]
    fn future_count_looks_through_composites() {
        let effect: Effect<u8> = Effect::merge(vec![
            Effect::future(async { Some(1) }),
            Effect::chain(vec![Effect::None, Effect::future(async { None })]),
        ]);
        assert_eq!(effect.future_count(), 2);
    }

    #[test]
    fn debug_hides_future_contents() {
        let effect: Effect<u8> = Effect::future(async { Some(1) });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }
}
