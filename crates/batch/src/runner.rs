use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use ctrlprop_core::{
    CheckConfig, ExactInputStateLinearization, LocalStrongAccessibility, Property,
};
use jiff::Timestamp;
use tracing::{error, info, info_span};

use crate::{BatchConfig, BatchError, ModelRegistry, RegisteredModel, Record, Report};

/// Runs every property against every selected model, one check at a time.
///
/// A check that errors or panics yields a record with a null flag and the
/// batch moves on to the next check.
pub struct BatchRunner {
    properties: Vec<Box<dyn Property>>,
}

impl BatchRunner {
    /// A runner for both structural properties under `config`.
    #[must_use]
    pub fn new(config: &CheckConfig) -> Self {
        Self::with_properties(vec![
            Box::new(LocalStrongAccessibility::new(*config)),
            Box::new(ExactInputStateLinearization::new(*config)),
        ])
    }

    #[must_use]
    pub fn with_properties(properties: Vec<Box<dyn Property>>) -> Self {
        Self { properties }
    }

    /// Runs all registered models in registration order.
    #[must_use]
    pub fn run(&self, registry: &ModelRegistry) -> Report {
        self.run_models(registry.iter())
    }

    /// Runs the models named by `keys`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::UnknownModel`] before any check runs if a key is
    /// not registered.
    pub fn run_selected(
        &self,
        registry: &ModelRegistry,
        keys: &[String],
    ) -> Result<Report, BatchError> {
        let models = registry.select(keys)?;
        Ok(self.run_models(models))
    }

    fn run_models<'a>(&self, models: impl IntoIterator<Item = &'a RegisteredModel>) -> Report {
        let started = Timestamp::now();
        let clock = Instant::now();

        let mut records = Vec::new();
        for model in models {
            let _span = info_span!("model", key = %model.key).entered();
            for property in &self.properties {
                records.push(Self::check_one(model, property.as_ref()));
            }
        }

        let report = Report::new(started, records, clock.elapsed());
        info!(
            records = report.records().len(),
            elapsed = ?report.elapsed(),
            "batch finished"
        );
        report
    }

    fn check_one(model: &RegisteredModel, property: &dyn Property) -> Record {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| property.check(model.model.as_ref())));

        let (flag, message, duration) = match outcome {
            Ok(Ok(result)) => (result.flag, result.message, result.duration),
            Ok(Err(model_error)) => {
                error!(property = property.key(), %model_error, "model rejected");
                (None, model_error.to_string(), start.elapsed())
            }
            Err(payload) => {
                let message = format!("check panicked: {}", panic_message(payload.as_ref()));
                error!(property = property.key(), %message, "check aborted");
                (None, message, start.elapsed())
            }
        };

        Record {
            model_key: model.key.clone(),
            model_name: model.name.clone(),
            property_key: property.key().to_owned(),
            property_name: property.name().to_owned(),
            flag,
            duration_seconds: duration.as_secs_f64(),
            message,
        }
    }
}

/// Runs a configured batch and persists its outputs.
///
/// The report is appended to `report_path` and the results mapping is
/// merged into `mapping_path` when those are set.
///
/// # Errors
///
/// Returns an error if the config is invalid, a selected model is unknown,
/// or an output file cannot be written.
pub fn run_batch(config: &BatchConfig, registry: &ModelRegistry) -> Result<Report, BatchError> {
    let runner = BatchRunner::new(&config.check_config()?);
    let report = match &config.models {
        Some(keys) => runner.run_selected(registry, keys)?,
        None => runner.run(registry),
    };

    if let Some(path) = &config.report_path {
        report.append_to_log(path)?;
    }
    if let Some(path) = &config.mapping_path {
        report.write_mapping(path)?;
    }
    Ok(report)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(&CheckConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use ctrlprop_core::{
        ControlModel, MSG_ACCESSIBLE, MSG_LINEARIZABLE, MSG_NO_INPUT, ModelError,
        ParameterBinding, VerificationResult,
    };
    use ctrlprop_models::{LinearSystem, Lorenz};
    use ctrlprop_symbolic::{Expr, Symbol};

    use super::*;

    /// A model whose right-hand side panics when requested.
    struct Exploding;

    impl ControlModel for Exploding {
        fn state_symbols(&self) -> Vec<Symbol> {
            vec![Symbol::new("x1")]
        }

        fn input_symbols(&self) -> Vec<Symbol> {
            vec![Symbol::new("u1")]
        }

        fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
            panic!("rhs exploded")
        }
    }

    /// Declares two states but supplies one equation.
    struct Short;

    impl ControlModel for Short {
        fn state_symbols(&self) -> Vec<Symbol> {
            vec![Symbol::new("x1"), Symbol::new("x2")]
        }

        fn input_symbols(&self) -> Vec<Symbol> {
            vec![Symbol::new("u1")]
        }

        fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
            Some(vec![Expr::sym(&Symbol::new("u1"))])
        }
    }

    /// A property that always panics.
    struct Faulty;

    impl Property for Faulty {
        fn key(&self) -> &'static str {
            "faulty"
        }

        fn name(&self) -> &'static str {
            "faulty property"
        }

        fn check_with(
            &self,
            _: &dyn ControlModel,
            _: &ParameterBinding,
        ) -> Result<VerificationResult, ModelError> {
            panic!("{} always fails", self.name())
        }
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::builder()
            .register("exploding", "Exploding", Arc::new(Exploding))
            .and_then(|b| b.register("short", "Short", Arc::new(Short)))
            .and_then(|b| {
                b.register("double_integrator", "Double integrator", Arc::new(LinearSystem::double_integrator()))
            })
            .and_then(|b| b.register("lorenz", "Lorenz", Arc::new(Lorenz::default())))
            .unwrap()
            .build()
    }

    fn find<'a>(report: &'a Report, model: &str, property: &str) -> &'a Record {
        report
            .records()
            .iter()
            .find(|r| r.model_key == model && r.property_key == property)
            .unwrap()
    }

    #[test]
    fn failing_models_do_not_stop_the_batch() {
        let report = BatchRunner::default().run(&registry());

        assert_eq!(report.records().len(), 8);

        let exploding = find(&report, "exploding", LocalStrongAccessibility::KEY);
        assert_eq!(exploding.flag, None);
        assert!(exploding.message.contains("rhs exploded"));

        let short = find(&report, "short", ExactInputStateLinearization::KEY);
        assert_eq!(short.flag, None);
        assert!(short.message.contains("dimension mismatch"));

        let accessible = find(&report, "double_integrator", LocalStrongAccessibility::KEY);
        assert_eq!((accessible.flag, accessible.message.as_str()), (Some(true), MSG_ACCESSIBLE));

        let linearizable = find(&report, "double_integrator", ExactInputStateLinearization::KEY);
        assert_eq!(
            (linearizable.flag, linearizable.message.as_str()),
            (Some(true), MSG_LINEARIZABLE)
        );

        let lorenz = find(&report, "lorenz", LocalStrongAccessibility::KEY);
        assert_eq!((lorenz.flag, lorenz.message.as_str()), (None, MSG_NO_INPUT));
    }

    #[test]
    fn panicking_properties_are_isolated() {
        let runner = BatchRunner::with_properties(vec![
            Box::new(Faulty),
            Box::new(LocalStrongAccessibility::default()),
        ]);

        let report = runner
            .run_selected(&registry(), &["double_integrator".to_owned()])
            .unwrap();

        let faulty = find(&report, "double_integrator", "faulty");
        assert_eq!(faulty.flag, None);
        assert_eq!(faulty.message, "check panicked: faulty property always fails");
        assert_eq!(find(&report, "double_integrator", LocalStrongAccessibility::KEY).flag, Some(true));
    }

    #[test]
    fn selection_keeps_requested_order() {
        let keys = ["lorenz".to_owned(), "double_integrator".to_owned()];
        let report = BatchRunner::default().run_selected(&registry(), &keys).unwrap();

        let models: Vec<_> = report.records().iter().map(|r| r.model_key.as_str()).collect();
        assert_eq!(models, ["lorenz", "lorenz", "double_integrator", "double_integrator"]);
    }

    #[test]
    fn unknown_selection_runs_nothing() {
        let result = BatchRunner::default().run_selected(&registry(), &["rocket".to_owned()]);

        assert!(matches!(result, Err(BatchError::UnknownModel(_))));
    }

    #[test]
    fn configured_batch_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("results.txt");
        let mapping_path = dir.path().join("results.yaml");
        let config = BatchConfig {
            models: Some(vec!["lorenz".to_owned()]),
            report_path: Some(report_path.clone()),
            mapping_path: Some(mapping_path.clone()),
            ..BatchConfig::default()
        };

        let report = run_batch(&config, &registry()).unwrap();

        assert_eq!(report.records().len(), 2);
        assert!(fs::read_to_string(&report_path).unwrap().contains(MSG_NO_INPUT));
        let mapping: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&mapping_path).unwrap()).unwrap();
        assert_eq!(
            mapping["lorenz"][LocalStrongAccessibility::KEY]["message"],
            serde_yaml::Value::from(MSG_NO_INPUT)
        );
    }
}
