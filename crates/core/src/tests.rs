use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use ctrlprop_symbolic::{Expr, SymMatrix, Symbol, symbols};

use super::*;

fn model(states: &str, inputs: &str, rhs: &[&str]) -> SymbolicModel {
    SymbolicModel::builder()
        .states(states)
        .inputs(inputs)
        .rhs(rhs.iter().copied())
        .build()
        .expect("model should build")
}

fn verdict(result: &VerificationResult) -> (Option<bool>, &str) {
    (result.flag, result.message.as_str())
}

/// Counts oracle calls and delegates to the sampling oracle.
#[derive(Default)]
struct CountingOracle {
    inner: SampledOracle,
    calls: AtomicUsize,
}

impl Oracle for CountingOracle {
    fn generic_rank(&self, matrix: &SymMatrix, cancel: &CancelToken) -> Result<usize, RankError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.generic_rank(matrix, cancel)
    }

    fn is_involutive(
        &self,
        distribution: &Distribution,
        states: &[Symbol],
        cancel: &CancelToken,
    ) -> Result<Involutivity, RankError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.is_involutive(distribution, states, cancel)
    }

    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.is_generically_zero(expr)
    }
}

/// Never finishes a rank decision until cancelled.
struct StallingOracle;

impl Oracle for StallingOracle {
    fn generic_rank(&self, _: &SymMatrix, cancel: &CancelToken) -> Result<usize, RankError> {
        let give_up = Instant::now() + Duration::from_secs(30);
        while Instant::now() < give_up {
            if cancel.is_cancelled() {
                return Err(RankError::Cancelled);
            }
            thread::sleep(Duration::from_millis(5));
        }
        Ok(0)
    }

    fn is_involutive(
        &self,
        _: &Distribution,
        _: &[Symbol],
        _: &CancelToken,
    ) -> Result<Involutivity, RankError> {
        Ok(Involutivity {
            involutive: true,
            violating_pair: None,
        })
    }

    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError> {
        SampledOracle::default().is_generically_zero(expr)
    }
}

/// Fails every rank decision.
struct BrokenOracle;

impl Oracle for BrokenOracle {
    fn generic_rank(&self, _: &SymMatrix, _: &CancelToken) -> Result<usize, RankError> {
        Err(RankError::NonFinite { attempts: 9 })
    }

    fn is_involutive(
        &self,
        _: &Distribution,
        _: &[Symbol],
        _: &CancelToken,
    ) -> Result<Involutivity, RankError> {
        Err(RankError::NonFinite { attempts: 9 })
    }

    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError> {
        Ok(expr.is_zero())
    }
}

/// Panics inside the bracket computation.
struct PanickingOracle;

impl Oracle for PanickingOracle {
    fn generic_rank(&self, _: &SymMatrix, _: &CancelToken) -> Result<usize, RankError> {
        panic!("division by zero in rank routine")
    }

    fn is_involutive(
        &self,
        _: &Distribution,
        _: &[Symbol],
        _: &CancelToken,
    ) -> Result<Involutivity, RankError> {
        panic!("division by zero in involutivity routine")
    }

    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError> {
        Ok(expr.is_zero())
    }
}

/// A model without a symbolic form.
struct Opaque;

impl ControlModel for Opaque {
    fn state_symbols(&self) -> Vec<Symbol> {
        symbols("x")
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        symbols("u")
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        None
    }
}

/// A model that declares more states than equations.
struct Inconsistent;

impl ControlModel for Inconsistent {
    fn state_symbols(&self) -> Vec<Symbol> {
        symbols("x1 x2")
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        symbols("u")
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        Some(vec![Expr::sym(&Symbol::new("u"))])
    }
}

#[test]
fn controllable_double_integrator() {
    let m = model("x1 x2", "u", &["x2", "u"]);

    let access = LocalStrongAccessibility::default().check(&m).unwrap();
    let linear = ExactInputStateLinearization::default().check(&m).unwrap();

    assert_eq!(verdict(&access), (Some(true), MSG_ACCESSIBLE));
    assert_eq!(access.outcome, CheckOutcome::Completed);
    assert_eq!(verdict(&linear), (Some(true), MSG_LINEARIZABLE));
}

#[test]
fn uncontrollable_zero_system() {
    let m = model("x1 x2", "u", &["0*x1 + 0*u", "0*x2 + 0*u"]);

    let access = LocalStrongAccessibility::default().check(&m).unwrap();

    assert_eq!(verdict(&access), (Some(false), MSG_NOT_ACCESSIBLE));
}

#[test]
fn no_input_model_skips_all_computation() {
    let m = model("x y z", "", &["10*(y - x)", "x*(28 - z) - y", "x*y - 8/3*z"]);
    let oracle = Arc::new(CountingOracle::default());

    let access =
        LocalStrongAccessibility::with_oracle(CheckConfig::default(), oracle.clone()).check(&m);
    let linear =
        ExactInputStateLinearization::with_oracle(CheckConfig::default(), oracle.clone()).check(&m);

    assert_eq!(verdict(&access.unwrap()), (None, MSG_NO_INPUT));
    assert_eq!(verdict(&linear.unwrap()), (None, MSG_NO_INPUT));
    assert_eq!(oracle.calls.load(Ordering::Relaxed), 0);
}

#[test]
fn non_affine_input_skips_distributions() {
    let m = model("x1 x2", "u", &["x2", "-x1 + u^2"]);
    let oracle = Arc::new(CountingOracle::default());

    let access =
        LocalStrongAccessibility::with_oracle(CheckConfig::default(), oracle.clone()).check(&m);
    let linear =
        ExactInputStateLinearization::with_oracle(CheckConfig::default(), oracle.clone()).check(&m);

    let access = access.unwrap();
    assert_eq!(verdict(&access), (None, MSG_NOT_AFFINE));
    assert_eq!(access.outcome, CheckOutcome::Unsupported);
    assert_eq!(verdict(&linear.unwrap()), (None, MSG_NOT_AFFINE));

    // Only the affinity zero tests ran, never a rank decision.
    assert!(oracle.calls.load(Ordering::Relaxed) <= 2);
}

#[test]
fn small_quadratic_input_is_still_not_affine() {
    let m = model("x1 x2", "u", &["x2", "1e-10*u^2"]);

    let access = LocalStrongAccessibility::default().check(&m).unwrap();
    let linear = ExactInputStateLinearization::default().check(&m).unwrap();

    assert_eq!(verdict(&access), (None, MSG_NOT_AFFINE));
    assert_eq!(verdict(&linear), (None, MSG_NOT_AFFINE));
}

#[test]
fn zero_parameter_does_not_hide_a_quadratic_input() {
    let m = SymbolicModel::builder()
        .states("x1 x2")
        .inputs("u")
        .parameter("p", 0.0)
        .rhs(["x2", "u + p*u^2"])
        .build()
        .unwrap();

    let result = LocalStrongAccessibility::default().check(&m).unwrap();

    assert_eq!(verdict(&result), (None, MSG_NOT_AFFINE));
    assert_eq!(result.outcome, CheckOutcome::Unsupported);
}

#[test]
fn blow_up_while_decomposing_stays_within_budget() {
    let budget = Duration::from_secs(1);
    let config = CheckConfig::new(budget, 250_000, OracleConfig::default()).unwrap();
    let mut rhs: Vec<String> = (2..=8).map(|i| format!("x{i}")).collect();
    rhs.push("u*(x1 + x2 + x3 + x4 + x5 + x6 + x7 + x8)^8".to_owned());
    let rhs: Vec<&str> = rhs.iter().map(String::as_str).collect();
    let m = model("x1 x2 x3 x4 x5 x6 x7 x8", "u", &rhs);

    let start = Instant::now();
    let result = LocalStrongAccessibility::new(config).check(&m).unwrap();

    assert!(start.elapsed() < budget + Duration::from_secs(1));
    assert_eq!(result.flag, None);
    assert!(matches!(result.outcome, CheckOutcome::Failed | CheckOutcome::TimedOut));
}

#[test]
fn expansion_limit_is_a_computation_error() {
    let config = CheckConfig::new(Duration::from_secs(30), 1_000, OracleConfig::default()).unwrap();
    let m = model("x1 x2 x3 x4", "u", &["x2", "x3", "x4", "u*(x1 + x2 + x3 + x4)^8"]);

    let result = ExactInputStateLinearization::new(config).check(&m).unwrap();

    assert_eq!(result.flag, None);
    assert_eq!(result.outcome, CheckOutcome::Failed);
    assert!(result.message.contains("size limit exceeded"));
}

#[test]
fn unusable_representation() {
    let result = LocalStrongAccessibility::default().check(&Opaque).unwrap();

    assert_eq!(verdict(&result), (None, MSG_NOT_USEABLE));
}

#[test]
fn dimension_mismatch_is_an_error() {
    let result = ExactInputStateLinearization::default().check(&Inconsistent);

    assert_eq!(
        result,
        Err(ModelError::DimensionMismatch {
            dimension: 2,
            states: 2,
            rhs: 1
        })
    );
}

#[test]
fn timeout_returns_within_budget() {
    let budget = Duration::from_millis(200);
    let config = CheckConfig::new(budget, 10_000, OracleConfig::default()).unwrap();
    let property = LocalStrongAccessibility::with_oracle(config, Arc::new(StallingOracle));
    let m = model("x1 x2", "u", &["x2", "u"]);

    let start = Instant::now();
    let result = property.check(&m).unwrap();

    assert!(start.elapsed() < budget + Duration::from_secs(1));
    assert_eq!(verdict(&result), (None, MSG_TIMEOUT));
    assert_eq!(result.outcome, CheckOutcome::TimedOut);
}

#[test]
fn computation_errors_become_null_verdicts() {
    let property =
        ExactInputStateLinearization::with_oracle(CheckConfig::default(), Arc::new(BrokenOracle));
    let m = model("x1 x2", "u", &["x2", "u"]);

    let result = property.check(&m).unwrap();

    assert_eq!(result.flag, None);
    assert_eq!(result.outcome, CheckOutcome::Failed);
    assert!(result.message.contains("no finite sample point"));
}

#[test]
fn panics_become_null_verdicts() {
    let property =
        LocalStrongAccessibility::with_oracle(CheckConfig::default(), Arc::new(PanickingOracle));
    let m = model("x1 x2", "u", &["x2", "u"]);

    let result = property.check(&m).unwrap();

    assert_eq!(result.flag, None);
    assert!(result.message.contains("division by zero"));
}

#[test]
fn repeated_checks_agree() {
    let m = SymbolicModel::builder()
        .states("x1 x2")
        .inputs("u")
        .parameter("m", 1.0)
        .parameter("l", 0.5)
        .parameter("g", 9.81)
        .parameter("d", 0.1)
        .rhs(["x2", "-g/l*sin(x1) - d/(m*l^2)*x2 + u/(m*l^2)"])
        .build()
        .unwrap();
    let property = ExactInputStateLinearization::default();

    let first = property.check(&m).unwrap();
    let second = property.check(&m).unwrap();

    assert_eq!(verdict(&first), (Some(true), MSG_LINEARIZABLE));
    assert_eq!(verdict(&first), verdict(&second));
}

#[test]
fn parameter_values_reach_the_analysis() {
    // With b = 0 the input never reaches the states.
    let m = SymbolicModel::builder()
        .states("x1 x2")
        .inputs("u")
        .parameter("b", 1.0)
        .rhs(["x2", "b*u"])
        .build()
        .unwrap();
    let property = LocalStrongAccessibility::default();

    let nominal = property.check(&m).unwrap();
    let disconnected = property
        .check_with(&m, &m.with_parameters(&[0.0]).unwrap())
        .unwrap();

    assert_eq!(nominal.flag, Some(true));
    assert_eq!(disconnected.flag, Some(false));
}

#[test]
fn driftless_underactuated_model_is_not_linearizable() {
    // No drift, so every bracket block vanishes and the two input fields never span.
    let m = model("x1 x2 x3", "u1 u2", &["u1", "u2", "x2*u1"]);

    let result = ExactInputStateLinearization::default().check(&m).unwrap();

    assert_eq!(verdict(&result), (Some(false), MSG_NOT_LINEARIZABLE));
}

#[test]
fn property_keys_are_stable() {
    assert_eq!(LocalStrongAccessibility::default().key(), "I7178");
    assert_eq!(ExactInputStateLinearization::default().key(), "I5358");
}
