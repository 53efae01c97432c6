//! Concrete control models.
//!
//! Every model is a flat implementer of [`ControlModel`]; there is no model
//! hierarchy. [`catalog`] lists them all under stable keys for batch runs.

mod integrator;
mod linear;
mod lorenz;
mod pendulum;
mod thrust;
mod vehicles;

pub use integrator::NIntegrator;
pub use linear::LinearSystem;
pub use lorenz::Lorenz;
pub use pendulum::Pendulum;
pub use thrust::QuadraticThrust;
pub use vehicles::{CartPole, Unicycle};

use ctrlprop_core::ControlModel;
use ctrlprop_symbolic::Symbol;

/// A model together with its catalog key and display name.
pub struct CatalogEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub model: Box<dyn ControlModel + Send + Sync>,
}

/// Every model in the crate with its default parameters.
#[must_use]
pub fn catalog() -> Vec<CatalogEntry> {
    let entry = |key, name, model: Box<dyn ControlModel + Send + Sync>| CatalogEntry {
        key,
        name,
        model,
    };

    vec![
        entry("double_integrator", "Double integrator", Box::new(LinearSystem::double_integrator())),
        entry("n_integrator", "Chain of integrators", Box::new(NIntegrator::default())),
        entry("pendulum", "Damped pendulum", Box::new(Pendulum::default())),
        entry("cart_pole", "Cart-pole", Box::new(CartPole::default())),
        entry("unicycle", "Kinematic unicycle", Box::new(Unicycle::default())),
        entry("lorenz", "Lorenz system", Box::new(Lorenz::default())),
        entry("quadratic_thrust", "Quadratic thrust", Box::new(QuadraticThrust::default())),
    ]
}

/// Symbols `prefix1`, `prefix2`, …, `prefix{n}`.
#[must_use]
pub fn indexed_symbols(prefix: &str, n: usize) -> Vec<Symbol> {
    (1..=n).map(|i| Symbol::new(&format!("{prefix}{i}"))).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ctrlprop_core::check_dimensions;

    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        let entries = catalog();
        let keys: HashSet<_> = entries.iter().map(|e| e.key).collect();

        assert_eq!(keys.len(), entries.len());
    }

    #[test]
    fn catalog_models_are_consistent() {
        for entry in catalog() {
            let rhs = entry.model.rhs_symbolic().expect("catalog models are symbolic");
            assert_eq!(check_dimensions(entry.model.as_ref(), &rhs), Ok(()), "{}", entry.key);
        }
    }

    #[test]
    fn indexed_symbols_start_at_one() {
        let names: Vec<_> = indexed_symbols("x", 3).iter().map(|s| s.name().to_owned()).collect();

        assert_eq!(names, ["x1", "x2", "x3"]);
    }
}
