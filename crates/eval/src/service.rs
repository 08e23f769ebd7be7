//! Typed evaluation facades, one per definition family.

use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;
use tabula_definition::{Definition, DefinitionFamily, DefinitionRepository, Mapped};
use tracing::debug;

use crate::context::EvaluationContext;
use crate::engine::Engine;
use crate::error::{EvalError, Result};
use crate::evaluated::Evaluated;

/// Compile-time tag for a definition family.
pub trait Family: Send + Sync + 'static {
    fn family() -> DefinitionFamily;
}

macro_rules! family_marker {
    ($(#[$doc:meta])* $name:ident => $family:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Family for $name {
            fn family() -> DefinitionFamily {
                $family
            }
        }
    };
}

family_marker!(
    /// Per-visit source data.
    VisitDataFamily => DefinitionFamily::VisitData
);
family_marker!(
    /// Single derived columns.
    ColumnFamily => DefinitionFamily::Column
);
family_marker!(
    /// Tabular data sets.
    DataSetFamily => DefinitionFamily::DataSet
);
family_marker!(
    /// Reports assembled from other definitions.
    ReportFamily => DefinitionFamily::Report
);

pub type VisitDataService = DefinitionService<VisitDataFamily>;
pub type ColumnDefinitionService = DefinitionService<ColumnFamily>;
pub type DataSetDefinitionService = DefinitionService<DataSetFamily>;
pub type ReportDefinitionService = DefinitionService<ReportFamily>;

/// Evaluates definitions of family `F` through a shared [`Engine`].
///
/// The service holds no state of its own; every instance over the same
/// engine behaves identically.
///
/// Evaluation only reads definitions and the context. Hosts backed by a
/// transactional store must call these methods inside a read-only
/// transaction (or an equivalent consistent snapshot); the service neither
/// opens nor verifies one.
pub struct DefinitionService<F: Family> {
    engine: Arc<Engine>,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family> DefinitionService<F> {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            _family: PhantomData,
        }
    }

    pub fn family(&self) -> DefinitionFamily {
        F::family()
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Evaluate with parameters from the context's globals and the
    /// definition's defaults.
    pub fn evaluate(&self, definition: &Arc<Definition>, context: &EvaluationContext) -> Result<Evaluated<F>> {
        self.evaluate_mapped(&Mapped::new(Arc::clone(definition)), context)
    }

    /// Resolve the bindings of `mapped` and evaluate it. The caller's
    /// context is left untouched.
    pub fn evaluate_mapped(&self, mapped: &Mapped, context: &EvaluationContext) -> Result<Evaluated<F>> {
        self.check_family(&mapped.definition)?;
        let (entry, cached) = self.engine.evaluate_entry(mapped, context)?;
        Ok(Evaluated::new(entry, cached))
    }

    /// Load a definition through `repository` and evaluate it.
    pub fn evaluate_stored(
        &self,
        id: &str,
        repository: &dyn DefinitionRepository,
        context: &EvaluationContext,
    ) -> Result<Evaluated<F>> {
        let definition = repository.load(id).map_err(|e| EvalError::Evaluation {
            definition: id.to_string(),
            source: e.into(),
        })?;
        debug!(definition_id = %id, "loaded definition from repository");
        self.evaluate(&definition, context)
    }

    /// Evaluate independent mapped definitions in parallel against the same
    /// context and cache. Results come back in input order; the first
    /// failure (in input order) is returned.
    pub fn evaluate_all(&self, mapped: &[Mapped], context: &EvaluationContext) -> Result<Vec<Evaluated<F>>> {
        mapped
            .par_iter()
            .map(|m| self.evaluate_mapped(m, context))
            .collect()
    }

    fn check_family(&self, definition: &Definition) -> Result<()> {
        if definition.family == F::family() {
            Ok(())
        } else {
            Err(EvalError::UnsupportedDefinitionType {
                family: definition.family.clone(),
                definition_type: definition.definition_type.clone(),
            })
        }
    }
}

impl<F: Family> Clone for DefinitionService<F> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.engine))
    }
}
