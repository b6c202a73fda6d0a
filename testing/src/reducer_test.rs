//! Ergonomic testing utilities for reducers
//!
//! A fluent Given-When-Then API over a single reducer step.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use vybeme_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several `when_action` calls are applied in order; effect assertions see
/// the effects of the last action only.
///
/// # Example
///
/// ```ignore
/// ReducerTest::new(CheckInReducer::new())
///     .with_env(env)
///     .given_state(state)
///     .when_action(CheckInAction::ScanAgain)
///     .then_state(|state| assert!(state.decoder_active()))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to apply (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use vybeme_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect would do something.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert how many async computations the effects start
    ///
    /// # Panics
    ///
    /// Panics if the number of `Future` effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_future_count<A>(effects: &[Effect<A>], expected: usize) {
        let found: usize = effects.iter().map(Effect::future_count).sum();
        assert_eq!(
            found, expected,
            "Expected {expected} future effects, but found {found}"
        );
    }

    /// Assert that effects contain a delayed action matching `predicate`
    ///
    /// # Panics
    ///
    /// Panics if no matching `Delay` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay<A, F>(effects: &[Effect<A>], predicate: F)
    where
        F: Fn(&A) -> bool,
    {
        fn find<A, F: Fn(&A) -> bool>(effect: &Effect<A>, predicate: &F) -> bool {
            match effect {
                Effect::Delay { action, .. } => predicate(action),
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().any(|e| find(e, predicate))
                },
                Effect::None | Effect::Future(_) => false,
            }
        }

        assert!(
            effects.iter().any(|e| find(e, &predicate)),
            "Expected a matching Delay effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vybeme_core::{SmallVec, smallvec};

    // Two-position switch with a delayed reset.
    #[derive(Clone, Debug, PartialEq)]
    enum Switch {
        Off,
        On,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SwitchAction {
        Flip,
        FlipAndReset,
        Refresh,
    }

    struct SwitchReducer;

    struct NoEnv;

    impl Reducer for SwitchReducer {
        type State = Switch;
        type Action = SwitchAction;
        type Environment = NoEnv;

        fn reduce(
            &self,
            state: &mut Switch,
            action: SwitchAction,
            _env: &NoEnv,
        ) -> SmallVec<[Effect<SwitchAction>; 4]> {
            match action {
                SwitchAction::Flip => {
                    *state = if *state == Switch::On { Switch::Off } else { Switch::On };
                    smallvec![Effect::None]
                },
                SwitchAction::FlipAndReset => {
                    *state = Switch::On;
                    smallvec![Effect::Delay {
                        duration: Duration::from_secs(1),
                        action: Box::new(SwitchAction::Flip),
                    }]
                },
                SwitchAction::Refresh => {
                    smallvec![Effect::future(async { Some(SwitchAction::Flip) })]
                },
            }
        }
    }

    #[test]
    fn applies_actions_in_order() {
        ReducerTest::new(SwitchReducer)
            .with_env(NoEnv)
            .given_state(Switch::Off)
            .when_action(SwitchAction::Flip)
            .when_action(SwitchAction::Flip)
            .when_action(SwitchAction::Flip)
            .then_state(|state| assert_eq!(*state, Switch::On))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn finds_delayed_actions() {
        ReducerTest::new(SwitchReducer)
            .with_env(NoEnv)
            .given_state(Switch::Off)
            .when_action(SwitchAction::FlipAndReset)
            .then_effects(|effects| {
                assertions::assert_has_delay(effects, |a| *a == SwitchAction::Flip);
                assertions::assert_future_count(effects, 0);
            })
            .run();
    }

    #[test]
    fn counts_futures() {
        ReducerTest::new(SwitchReducer)
            .with_env(NoEnv)
            .given_state(Switch::Off)
            .when_action(SwitchAction::Refresh)
            .then_state(|state| assert_eq!(*state, Switch::Off))
            .then_effects(|effects| assertions::assert_future_count(effects, 1))
            .run();
    }
}
