use std::any::Any;

use dagmc_core::{ErrorInfo, IntervalKind, LogDouble, McmcError, RealInterval};

use crate::change::ChangeInfo;
use crate::dependent::{CacheSlot, InfoProvider, Model, ProperDependent, Sampleable};
use crate::graph::{NodeId, ParentView};
use crate::parameter::{Scalar, Value};

/// Uniform prior over every element of a real parameter.
///
/// The likelihood is zero as soon as one element falls outside the interval.
/// Inside, it is 1, or `1 / width` per element when actual densities are
/// requested (bounded intervals only).
pub struct RealParameterUniformPrior {
    parameter: NodeId,
    parameter_name: String,
    interval: RealInterval,
    use_actual: bool,
    likelihood: CacheSlot<LogDouble>,
}

impl RealParameterUniformPrior {
    /// Prior on `parameter`, which must also be registered as the model's only parent.
    pub fn new(parameter: NodeId, interval: RealInterval) -> Self {
        Self {
            parameter,
            parameter_name: String::new(),
            interval,
            use_actual: false,
            likelihood: CacheSlot::new("uniform-prior", LogDouble::ONE),
        }
    }

    /// Returns `1 / width` per element instead of 1 inside the interval.
    pub fn with_actual_density(mut self, use_actual: bool) -> Self {
        self.use_actual = use_actual;
        self
    }

    /// Prior support.
    pub fn interval(&self) -> RealInterval {
        self.interval
    }

    fn evaluate(&self, parents: &ParentView<'_>) -> Result<LogDouble, McmcError> {
        let value = parents.value(self.parameter)?;
        let density = if self.use_actual {
            LogDouble::new(1.0 / self.interval.width())
        } else {
            LogDouble::ONE
        };
        let mut likelihood = LogDouble::ONE;
        for idx in 0..value.len() {
            match value.element(idx) {
                Some(Scalar::Real(x)) if self.interval.contains(x) => likelihood *= density,
                Some(Scalar::Real(_)) => return Ok(LogDouble::ZERO),
                _ => return Err(self.not_real(value)),
            }
        }
        Ok(likelihood)
    }

    fn not_real(&self, value: &Value) -> McmcError {
        McmcError::Config(
            ErrorInfo::new("not-real", "uniform prior needs a real-valued parameter")
                .with_context("parameter", self.parameter_name.clone())
                .with_context("kind", value.kind_name()),
        )
    }
}

impl ProperDependent for RealParameterUniformPrior {
    fn initialize(&mut self, parents: &ParentView<'_>) -> Result<(), McmcError> {
        self.parameter_name = parents.name(self.parameter)?.to_string();
        self.likelihood = CacheSlot::new(self.sample_header(), LogDouble::ONE);
        self.interval.ensure_proper(&self.parameter_name)?;
        if self.use_actual && self.interval.kind() != IntervalKind::Bounded {
            return Err(McmcError::Config(
                ErrorInfo::new("unbounded-prior", "actual uniform densities need a bounded interval")
                    .with_context("parameter", self.parameter_name.clone())
                    .with_context("interval", self.interval.to_string()),
            ));
        }
        let value = self.evaluate(parents)?;
        self.likelihood.set(value);
        Ok(())
    }

    fn cache_and_update(
        &mut self,
        parents: &ParentView<'_>,
        _will_sample: bool,
    ) -> Result<Option<ChangeInfo>, McmcError> {
        self.likelihood.cache()?;
        let old = *self.likelihood.get();
        let new = self.evaluate(parents)?;
        if new.ln().to_bits() == old.ln().to_bits() {
            return Ok(None);
        }
        self.likelihood.set(new);
        Ok(Some(ChangeInfo::new(parents.node(), "full uniform prior update")))
    }

    fn clear_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        self.likelihood.clear()
    }

    fn restore_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        self.likelihood.restore()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sampleable(&self) -> Option<&dyn Sampleable> {
        Some(self)
    }
}

impl Model for RealParameterUniformPrior {
    fn likelihood(&self) -> LogDouble {
        *self.likelihood.get()
    }
}

impl Sampleable for RealParameterUniformPrior {
    fn sample_header(&self) -> String {
        format!("{}UniformPriorLikelihood", self.parameter_name)
    }

    fn sample_value(&self) -> String {
        self.likelihood.get().to_string()
    }
}

impl InfoProvider for RealParameterUniformPrior {
    fn pre_info(&self, prefix: &str) -> String {
        format!(
            "{prefix}REAL-PARAMETER UNIFORM PRIOR\n{prefix}Parameter: {}\n{prefix}Interval: {}\n",
            self.parameter_name, self.interval
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn actual_density_is_inverse_width_per_element() {
        let mut builder = GraphBuilder::new();
        let x = builder.add_parameter("rates", Value::RealArray(vec![0.5, 1.5])).unwrap();
        let prior = builder
            .add_model(
                "prior",
                &[x],
                RealParameterUniformPrior::new(x, RealInterval::closed(0.0, 2.0)).with_actual_density(true),
            )
            .unwrap();
        let graph = builder.build().unwrap();
        assert!((graph.likelihood().value() - 0.25).abs() < 1e-12);
        let model = graph.dependent::<RealParameterUniformPrior>(prior).unwrap();
        assert_eq!(model.sample_header(), "ratesUniformPriorLikelihood");
    }

    #[test]
    fn outside_support_is_zero() {
        let mut builder = GraphBuilder::new();
        let x = builder.add_parameter("x", Value::Real(-1.0)).unwrap();
        builder
            .add_model("prior", &[x], RealParameterUniformPrior::new(x, RealInterval::positive()))
            .unwrap();
        assert!(builder.build().unwrap().likelihood().is_zero());
    }

    #[test]
    fn actual_density_needs_bounded_interval() {
        let mut builder = GraphBuilder::new();
        let x = builder.add_parameter("x", Value::Real(1.0)).unwrap();
        builder
            .add_model(
                "prior",
                &[x],
                RealParameterUniformPrior::new(x, RealInterval::positive()).with_actual_density(true),
            )
            .unwrap();
        assert_eq!(builder.build().err().unwrap().info().code, "unbounded-prior");
    }
}
