use crate::core::exchange::Exchange;
use crate::core::fault::FaultCause;

/// Result of a single step: the engine stamps failures with route and point
pub type StepResult = Result<(), FaultCause>;

/// A processing step inside a route segment
///
/// Steps are shared read-only across concurrent traversals, hence
/// `Send + Sync`. Any per-traversal state belongs on the [`Exchange`].
///
/// # Example
///
/// ```ignore
/// struct RequireHeader;
///
/// impl RouteStep for RequireHeader {
///     fn process(&self, exchange: &mut Exchange) -> StepResult {
///         if exchange.contains("header") {
///             Ok(())
///         } else {
///             Err(FaultCause::step(self.name(), "missing header"))
///         }
///     }
///
///     fn name(&self) -> &str {
///         "require-header"
///     }
/// }
/// ```
pub trait RouteStep: Send + Sync {
    fn process(&self, exchange: &mut Exchange) -> StepResult;

    fn name(&self) -> &str;
}

/// Adapts a closure into a [`RouteStep`]
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: Fn(&mut Exchange) -> StepResult + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> RouteStep for FnStep<F>
where
    F: Fn(&mut Exchange) -> StepResult + Send + Sync,
{
    fn process(&self, exchange: &mut Exchange) -> StepResult {
        (self.f)(exchange)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Step that always fails with the given message
pub struct FailingStep {
    name: String,
    message: String,
}

impl FailingStep {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl RouteStep for FailingStep {
    fn process(&self, _exchange: &mut Exchange) -> StepResult {
        Err(FaultCause::step(&self.name, &self.message))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_step_mutates_exchange() {
        let step = FnStep::new("mark", |ex: &mut Exchange| {
            ex.set("marked", true);
            Ok(())
        });
        let mut exchange = Exchange::new();

        assert!(step.process(&mut exchange).is_ok());
        assert_eq!(step.name(), "mark");
        assert_eq!(exchange.get::<bool>("marked"), Some(&true));
    }

    #[test]
    fn failing_step_reports_its_name() {
        let step = FailingStep::new("boom", "always");
        let err = step.process(&mut Exchange::new()).unwrap_err();
        assert_eq!(err, FaultCause::step("boom", "always"));
    }
}
