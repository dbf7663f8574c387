use hashbrown::{HashMap, HashSet};

use crate::core::fault::FaultPoint;

/// Deterministic fault injection for a traversal
///
/// Names the `(route, point)` pairs at which the engine raises an
/// injected fault when the point is reached. Points that are never
/// reached (a catch segment when the try segment succeeded, a clause
/// when no fault escaped) never fire.
///
/// # Example
///
/// ```ignore
/// let plan = FaultPlan::new()
///     .at("child", FaultPoint::Try)
///     .at("child", FaultPoint::Catch);
///
/// let exchange = router.send_with_faults("parent", Exchange::new(), &plan)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    points: HashMap<String, HashSet<FaultPoint>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an injection point (fluent API - consumes self)
    pub fn at(mut self, route_id: impl Into<String>, point: FaultPoint) -> Self {
        self.add(route_id, point);
        self
    }

    pub fn add(&mut self, route_id: impl Into<String>, point: FaultPoint) -> &mut Self {
        self.points.entry(route_id.into()).or_default().insert(point);
        self
    }

    pub fn contains(&self, route_id: &str, point: FaultPoint) -> bool {
        self.points
            .get(route_id)
            .is_some_and(|points| points.contains(&point))
    }

    pub fn is_empty(&self) -> bool {
        self.points.values().all(HashSet::is_empty)
    }

    pub fn len(&self) -> usize {
        self.points.values().map(HashSet::len).sum()
    }

    /// Injection points sorted by route id, then pipeline order
    pub fn points(&self) -> Vec<(&str, FaultPoint)> {
        let mut out: Vec<(&str, FaultPoint)> = self
            .points
            .iter()
            .flat_map(|(route, points)| points.iter().map(move |p| (route.as_str(), *p)))
            .collect();
        out.sort_unstable();
        out
    }
}
