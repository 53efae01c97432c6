//! The structural properties a model can be checked for.
//!
//! Both checkers share the same preconditions, evaluated in order:
//!
//! 1. the model has a symbolic right-hand side,
//! 2. the model has at least one input,
//! 3. the dimension agrees with the states and right-hand side (a violation
//!    is a [`ModelError`], not a verdict),
//! 4. the system is input affine.
//!
//! The first three are cheap and run on the calling thread. The affinity test,
//! which expands the right-hand side, runs under a [`TimeoutGuard`] together
//! with the bracket computation, and parameter values are bound only after it
//! passes. Every outcome other than a dimension mismatch becomes a
//! [`VerificationResult`]; a `null` flag always comes with the reason in its
//! message.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
    AffineError, AffineSystem, CancelToken, CheckConfig, CheckError, ControlModel, GuardError,
    ModelError, Oracle, ParameterBinding, SampledOracle, TimeoutGuard, accessibility_distribution,
    check_dimensions, decompose, linearization_distributions,
};

pub const MSG_NOT_USEABLE: &str = "model representation not useable";
pub const MSG_NO_INPUT: &str = "model has no input";
pub const MSG_NOT_AFFINE: &str = "not input affine";
pub const MSG_TIMEOUT: &str = "timeout";
pub const MSG_ACCESSIBLE: &str = "local strong access";
pub const MSG_NOT_ACCESSIBLE: &str = "no local strong access";
pub const MSG_LINEARIZABLE: &str = "exact input state linearization exists";
pub const MSG_NOT_LINEARIZABLE: &str = "exact input state linearization does not exist";

/// How a check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The computation finished with a verdict.
    Completed,

    /// A precondition short-circuited the check.
    Unsupported,

    /// The computation exceeded its budget.
    TimedOut,

    /// The computation raised an error or panicked.
    Failed,
}

/// The verdict of one property check on one model.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// `Some` for a decided property, `None` when undecided.
    pub flag: Option<bool>,

    /// The verdict text, or the reason the property is undecided. Never
    /// empty when `flag` is `None`.
    pub message: String,

    /// Wall-clock time spent on the check.
    pub duration: Duration,

    /// How the check ended.
    pub outcome: CheckOutcome,
}

impl VerificationResult {
    fn completed(flag: bool, message: &str, start: Instant) -> Self {
        Self::new(Some(flag), message.to_owned(), start, CheckOutcome::Completed)
    }

    fn unsupported(message: &str, start: Instant) -> Self {
        Self::new(None, message.to_owned(), start, CheckOutcome::Unsupported)
    }

    fn timed_out(start: Instant) -> Self {
        Self::new(None, MSG_TIMEOUT.to_owned(), start, CheckOutcome::TimedOut)
    }

    fn failed(message: String, start: Instant) -> Self {
        let message = if message.is_empty() {
            "computation failed".to_owned()
        } else {
            message
        };
        Self::new(None, message, start, CheckOutcome::Failed)
    }

    fn new(flag: Option<bool>, message: String, start: Instant, outcome: CheckOutcome) -> Self {
        Self {
            flag,
            message,
            duration: start.elapsed(),
            outcome,
        }
    }
}

/// A structural property of control models.
pub trait Property: Send + Sync {
    /// Stable identifier used as a report key.
    fn key(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Checks `model` under the given parameter values.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] if the model's dimension
    /// disagrees with its states or right-hand side.
    fn check_with(
        &self,
        model: &dyn ControlModel,
        binding: &ParameterBinding,
    ) -> Result<VerificationResult, ModelError>;

    /// Checks `model` under its default parameter values.
    ///
    /// # Errors
    ///
    /// See [`Property::check_with`].
    fn check(&self, model: &dyn ControlModel) -> Result<VerificationResult, ModelError> {
        self.check_with(model, &model.parameter_substitutions())
    }
}

/// A verdict computed from an affine system.
struct Verdict {
    flag: bool,
    message: &'static str,
}

type Body = fn(&AffineSystem, &dyn Oracle, usize, &CancelToken) -> Result<Verdict, CheckError>;

/// Shared machinery of the property checkers.
#[derive(Clone)]
struct Checker {
    config: CheckConfig,
    oracle: Arc<dyn Oracle>,
}

impl Checker {
    fn new(config: CheckConfig) -> Self {
        let oracle = Arc::new(SampledOracle::new(*config.oracle()));
        Self { config, oracle }
    }

    fn run(
        &self,
        property: &'static str,
        model: &dyn ControlModel,
        binding: &ParameterBinding,
        body: Body,
    ) -> Result<VerificationResult, ModelError> {
        let start = Instant::now();

        let Some(rhs) = model.rhs_symbolic() else {
            return Ok(VerificationResult::unsupported(MSG_NOT_USEABLE, start));
        };
        let inputs = model.input_symbols();
        if inputs.is_empty() {
            return Ok(VerificationResult::unsupported(MSG_NO_INPUT, start));
        }
        check_dimensions(model, &rhs)?;

        let states = model.state_symbols();
        let binding = binding.clone();
        let oracle = Arc::clone(&self.oracle);
        let max_nodes = self.config.max_expression_nodes();
        let guard = TimeoutGuard::new(self.config.timeout());
        let outcome = guard.run(move |cancel: &CancelToken| -> Result<Verdict, CheckError> {
            // Affinity is decided on the symbolic form; parameter values
            // must not hide an input nonlinearity.
            let system = decompose(&rhs, &states, &inputs, &*oracle, max_nodes)?.with_binding(&binding);
            body(&system, &*oracle, max_nodes, cancel)
        });

        let result = match outcome {
            Ok(Ok(verdict)) => VerificationResult::completed(verdict.flag, verdict.message, start),
            Ok(Err(CheckError::Affine(AffineError::NotInputAffine { .. }))) => {
                VerificationResult::unsupported(MSG_NOT_AFFINE, start)
            }
            Ok(Err(error)) => VerificationResult::failed(error.to_string(), start),
            Err(GuardError::TimedOut(_)) => VerificationResult::timed_out(start),
            Err(error) => VerificationResult::failed(error.to_string(), start),
        };

        match result.outcome {
            CheckOutcome::Completed => {
                info!(property, flag = ?result.flag, duration = ?result.duration, "check completed");
            }
            CheckOutcome::Unsupported => info!(property, message = %result.message, "check skipped"),
            _ => warn!(property, message = %result.message, "check did not complete"),
        }
        Ok(result)
    }
}

/// Local strong accessibility: the accessibility distribution reaches full rank.
#[derive(Clone)]
pub struct LocalStrongAccessibility {
    checker: Checker,
}

impl LocalStrongAccessibility {
    pub const KEY: &'static str = "I7178";
    pub const NAME: &'static str = "local strong accessibility";

    #[must_use]
    pub fn new(config: CheckConfig) -> Self {
        Self {
            checker: Checker::new(config),
        }
    }

    /// Uses `oracle` for rank and zero decisions.
    #[must_use]
    pub fn with_oracle(config: CheckConfig, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            checker: Checker { config, oracle },
        }
    }
}

impl Default for LocalStrongAccessibility {
    fn default() -> Self {
        Self::new(CheckConfig::default())
    }
}

impl Property for LocalStrongAccessibility {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_with(
        &self,
        model: &dyn ControlModel,
        binding: &ParameterBinding,
    ) -> Result<VerificationResult, ModelError> {
        self.checker.run(Self::KEY, model, binding, |system, oracle, max_nodes, cancel| {
            let report = accessibility_distribution(system, oracle, max_nodes, cancel)?;
            Ok(if report.full_rank {
                Verdict {
                    flag: true,
                    message: MSG_ACCESSIBLE,
                }
            } else {
                Verdict {
                    flag: false,
                    message: MSG_NOT_ACCESSIBLE,
                }
            })
        })
    }
}

/// Exact input-state linearization: `Δₙ` has full rank and `Δₙ₋₁` is involutive.
#[derive(Clone)]
pub struct ExactInputStateLinearization {
    checker: Checker,
}

impl ExactInputStateLinearization {
    pub const KEY: &'static str = "I5358";
    pub const NAME: &'static str = "exact input-state linearization";

    #[must_use]
    pub fn new(config: CheckConfig) -> Self {
        Self {
            checker: Checker::new(config),
        }
    }

    /// Uses `oracle` for rank and zero decisions.
    #[must_use]
    pub fn with_oracle(config: CheckConfig, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            checker: Checker { config, oracle },
        }
    }
}

impl Default for ExactInputStateLinearization {
    fn default() -> Self {
        Self::new(CheckConfig::default())
    }
}

impl Property for ExactInputStateLinearization {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_with(
        &self,
        model: &dyn ControlModel,
        binding: &ParameterBinding,
    ) -> Result<VerificationResult, ModelError> {
        self.checker.run(Self::KEY, model, binding, |system, oracle, max_nodes, cancel| {
            let n = system.dimension();
            let dists = linearization_distributions(system, max_nodes, cancel)?;

            let full_rank = oracle.generic_rank(&dists.delta_n.to_matrix(), cancel)? == n;
            let linearizable = full_rank
                && oracle
                    .is_involutive(&dists.delta_n_minus_1, system.states(), cancel)?
                    .involutive;

            Ok(if linearizable {
                Verdict {
                    flag: true,
                    message: MSG_LINEARIZABLE,
                }
            } else {
                Verdict {
                    flag: false,
                    message: MSG_NOT_LINEARIZABLE,
                }
            })
        })
    }
}
