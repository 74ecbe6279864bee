//! The in-memory stream graph
//!
//! Streams reference parents by id; evaluation never needs cyclic object
//! graphs. Insertion order is preserved as the user-visible ordering and as
//! the tie-break for the topological sort.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ConfigError, GraphError, ValidationError};

use super::ids::StreamId;
use super::settings::{CalculationMode, ModelSettings};
use super::stream::Stream;

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialModel {
    pub name: String,
    pub settings: ModelSettings,
    streams: FxHashMap<StreamId, Stream>,
    stream_order: Vec<StreamId>,
}

impl Default for FinancialModel {
    fn default() -> Self {
        Self::new("Untitled Model", ModelSettings::default())
    }
}

impl FinancialModel {
    pub fn new(name: impl Into<String>, settings: ModelSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            streams: FxHashMap::default(),
            stream_order: Vec::new(),
        }
    }

    pub fn stream(&self, id: &StreamId) -> Option<&Stream> {
        self.streams.get(id)
    }

    /// Streams in the user-visible (insertion) order.
    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.stream_order.iter().filter_map(|id| self.streams.get(id))
    }

    pub fn stream_order(&self) -> &[StreamId] {
        &self.stream_order
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn add_stream(&mut self, stream: Stream) -> Result<(), GraphError> {
        if self.streams.contains_key(&stream.id) {
            return Err(GraphError::DuplicateStream(stream.id));
        }
        if let Some(parent) = &stream.parent_stream_id
            && !self.streams.contains_key(parent)
            && parent != &stream.id
        {
            return Err(GraphError::DanglingParent {
                stream: stream.id.clone(),
                parent: parent.clone(),
            });
        }
        let id = stream.id.clone();
        self.streams.insert(id.clone(), stream);
        self.stream_order.push(id.clone());
        if self.has_cycle() {
            self.streams.remove(&id);
            self.stream_order.pop();
            return Err(GraphError::CircularDependency);
        }
        Ok(())
    }

    /// Insert without graph checks. Used by document loading, where a
    /// child may legitimately precede its parent in the stream list.
    pub(crate) fn insert_unchecked(&mut self, stream: Stream) {
        let id = stream.id.clone();
        self.streams.insert(id.clone(), stream);
        self.stream_order.push(id);
    }

    /// Replace the stream stored under `id`. The stored id wins: the
    /// replacement keeps `id` even if the caller passed a different one.
    pub fn update_stream(&mut self, id: &StreamId, mut stream: Stream) -> Result<(), GraphError> {
        let Some(previous) = self.streams.get(id).cloned() else {
            return Err(GraphError::StreamNotFound(id.clone()));
        };
        if let Some(parent) = &stream.parent_stream_id
            && !self.streams.contains_key(parent)
        {
            return Err(GraphError::DanglingParent {
                stream: id.clone(),
                parent: parent.clone(),
            });
        }
        stream.id = id.clone();
        self.streams.insert(id.clone(), stream);
        if self.has_cycle() {
            self.streams.insert(id.clone(), previous);
            return Err(GraphError::CircularDependency);
        }
        Ok(())
    }

    /// Remove a stream. Direct children are re-parented to the root level.
    pub fn remove_stream(&mut self, id: &StreamId) -> Result<(), GraphError> {
        if self.streams.remove(id).is_none() {
            return Err(GraphError::StreamNotFound(id.clone()));
        }
        self.stream_order.retain(|sid| sid != id);
        for stream in self.streams.values_mut() {
            if stream.parent_stream_id.as_ref() == Some(id) {
                stream.parent_stream_id = None;
            }
        }
        Ok(())
    }

    pub fn get_children(&self, parent_id: &StreamId) -> Vec<&Stream> {
        self.streams()
            .filter(|s| s.parent_stream_id.as_ref() == Some(parent_id))
            .collect()
    }

    /// Replace the user-visible ordering. The new order must be a
    /// permutation of the current stream ids.
    pub fn reorder_streams(&mut self, new_order: Vec<StreamId>) -> Result<(), GraphError> {
        if new_order.len() != self.streams.len() {
            return Err(GraphError::InvalidOrder);
        }
        let mut seen: FxHashSet<&StreamId> = FxHashSet::default();
        for id in &new_order {
            if !self.streams.contains_key(id) {
                return Err(GraphError::StreamNotFound(id.clone()));
            }
            if !seen.insert(id) {
                return Err(GraphError::InvalidOrder);
            }
        }
        self.stream_order = new_order;
        Ok(())
    }

    /// Kahn-style topological sort: roots first, each child only after its
    /// parent. Among nodes of equal depth, insertion order is preserved.
    pub fn execution_order(&self) -> Result<Vec<StreamId>, GraphError> {
        let mut in_degree: FxHashMap<&StreamId, usize> =
            self.stream_order.iter().map(|id| (id, 0)).collect();
        let mut children: FxHashMap<&StreamId, Vec<&StreamId>> = FxHashMap::default();

        for id in &self.stream_order {
            let stream = &self.streams[id];
            if let Some(parent) = &stream.parent_stream_id
                && self.streams.contains_key(parent)
            {
                children.entry(parent).or_default().push(id);
                *in_degree.entry(id).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<&StreamId> = self
            .stream_order
            .iter()
            .filter(|id| in_degree[*id] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.streams.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            if let Some(kids) = children.get(id) {
                for child in kids {
                    let degree = in_degree.get_mut(*child).expect("child was registered");
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }

        if order.len() != self.streams.len() {
            return Err(GraphError::CircularDependency);
        }
        Ok(order)
    }

    fn has_cycle(&self) -> bool {
        let mut visited: FxHashSet<&StreamId> = FxHashSet::default();
        let mut on_stack: FxHashSet<&StreamId> = FxHashSet::default();

        fn dfs<'a>(
            model: &'a FinancialModel,
            node: &'a StreamId,
            visited: &mut FxHashSet<&'a StreamId>,
            on_stack: &mut FxHashSet<&'a StreamId>,
        ) -> bool {
            visited.insert(node);
            on_stack.insert(node);
            for child in model.streams.values() {
                if child.parent_stream_id.as_ref() != Some(node) {
                    continue;
                }
                let child_id = &child.id;
                if !visited.contains(child_id) {
                    if dfs(model, child_id, visited, on_stack) {
                        return true;
                    }
                } else if on_stack.contains(child_id) {
                    return true;
                }
            }
            on_stack.remove(node);
            false
        }

        for id in &self.stream_order {
            if !visited.contains(id) && dfs(self, id, &mut visited, &mut on_stack) {
                return true;
            }
        }
        false
    }

    /// Validate the whole model: parent references resolve, windows and
    /// conversion rates are in range, every distribution's parameters hold,
    /// the graph is acyclic and, in NPV mode, the expected discount rate
    /// clears the terminal growth rate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for stream in self.streams() {
            if let Some(end) = stream.end_month
                && end < stream.start_month
            {
                return Err(ConfigError::WindowOrder {
                    stream: stream.id.clone(),
                    start_month: stream.start_month,
                    end_month: end,
                }
                .into());
            }
            if stream.periodicity_months == Some(0) {
                return Err(ConfigError::ZeroPeriodicity(stream.id.clone()).into());
            }
            if let Some(parent) = &stream.parent_stream_id {
                if !self.streams.contains_key(parent) {
                    return Err(GraphError::DanglingParent {
                        stream: stream.id.clone(),
                        parent: parent.clone(),
                    }
                    .into());
                }
                if !(0.0..=1.0).contains(&stream.conversion_rate) {
                    return Err(ConfigError::ConversionRateOutOfRange {
                        stream: stream.id.clone(),
                        value: stream.conversion_rate,
                    }
                    .into());
                }
            }
            stream.amount.validate()?;
            for dist in [
                stream.adoption_curve.as_ref(),
                stream.unit_value.as_ref(),
                stream.market_units.as_ref(),
            ]
            .into_iter()
            .flatten()
            {
                dist.validate()?;
            }
        }

        self.settings.discount_rate.validate()?;
        if let Some(esc) = &self.settings.escalation_rate {
            esc.validate()?;
        }

        if self.has_cycle() {
            return Err(GraphError::CircularDependency.into());
        }

        // Discount rate is unused in IRR mode, so the precondition only
        // applies when discounting.
        if self.settings.calculation_mode == CalculationMode::Npv {
            let discount = self.settings.discount_rate.deterministic(None);
            if discount <= self.settings.terminal_growth_rate {
                return Err(ValidationError::DiscountRateNotAboveGrowth {
                    discount_rate: discount,
                    terminal_growth_rate: self.settings.terminal_growth_rate,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Distribution, StreamKind};

    fn stream(id: &str, parent: Option<&str>) -> Stream {
        Stream {
            id: StreamId::from(id),
            name: id.to_string(),
            kind: StreamKind::Revenue,
            start_month: 0,
            end_month: None,
            amount: Distribution::fixed(100.0),
            adoption_curve: None,
            parent_stream_id: parent.map(StreamId::from),
            conversion_rate: 1.0,
            trigger_delay_months: 0,
            periodicity_months: None,
            amount_is_ratio: true,
            unit_value: None,
            market_units: None,
        }
    }

    fn model() -> FinancialModel {
        FinancialModel::new("test", ModelSettings::default())
    }

    #[test]
    fn test_add_rejects_duplicates_and_dangling_parents() {
        let mut m = model();
        m.add_stream(stream("a", None)).unwrap();
        assert_eq!(
            m.add_stream(stream("a", None)),
            Err(GraphError::DuplicateStream(StreamId::from("a")))
        );
        assert!(matches!(
            m.add_stream(stream("b", Some("ghost"))),
            Err(GraphError::DanglingParent { .. })
        ));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_self_parent_rejected_as_cycle() {
        let mut m = model();
        assert_eq!(
            m.add_stream(stream("a", Some("a"))),
            Err(GraphError::CircularDependency)
        );
        assert!(m.is_empty());
    }

    #[test]
    fn test_update_cycle_rolls_back() {
        let mut m = model();
        m.add_stream(stream("a", None)).unwrap();
        m.add_stream(stream("b", Some("a"))).unwrap();
        // Making a a child of b would close the loop
        let err = m.update_stream(&StreamId::from("a"), stream("a", Some("b")));
        assert_eq!(err, Err(GraphError::CircularDependency));
        assert!(m.stream(&StreamId::from("a")).unwrap().parent_stream_id.is_none());
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_remove_reparents_children_to_root() {
        let mut m = model();
        m.add_stream(stream("a", None)).unwrap();
        m.add_stream(stream("b", Some("a"))).unwrap();
        m.add_stream(stream("c", Some("a"))).unwrap();
        m.remove_stream(&StreamId::from("a")).unwrap();
        assert!(m.stream(&StreamId::from("b")).unwrap().is_root());
        assert!(m.stream(&StreamId::from("c")).unwrap().is_root());
        assert_eq!(
            m.remove_stream(&StreamId::from("a")),
            Err(GraphError::StreamNotFound(StreamId::from("a")))
        );
    }

    #[test]
    fn test_execution_order_parents_first_stable() {
        let mut m = model();
        m.add_stream(stream("r2", None)).unwrap();
        m.add_stream(stream("r1", None)).unwrap();
        m.add_stream(stream("c1", Some("r1"))).unwrap();
        m.add_stream(stream("g1", Some("c1"))).unwrap();
        m.add_stream(stream("c2", Some("r2"))).unwrap();

        let order = m.execution_order().unwrap();
        let pos = |id: &str| order.iter().position(|s| s.as_str() == id).unwrap();
        assert!(pos("r1") < pos("c1"));
        assert!(pos("c1") < pos("g1"));
        assert!(pos("r2") < pos("c2"));
        // Roots keep insertion order
        assert!(pos("r2") < pos("r1"));
    }

    #[test]
    fn test_get_children_in_order() {
        let mut m = model();
        m.add_stream(stream("p", None)).unwrap();
        m.add_stream(stream("x", Some("p"))).unwrap();
        m.add_stream(stream("y", Some("p"))).unwrap();
        let children: Vec<_> = m
            .get_children(&StreamId::from("p"))
            .iter()
            .map(|s| s.id.as_str().to_string())
            .collect();
        assert_eq!(children, vec!["x", "y"]);
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut m = model();
        m.add_stream(stream("a", None)).unwrap();
        m.add_stream(stream("b", None)).unwrap();
        assert_eq!(
            m.reorder_streams(vec![StreamId::from("a")]),
            Err(GraphError::InvalidOrder)
        );
        assert_eq!(
            m.reorder_streams(vec![StreamId::from("a"), StreamId::from("a")]),
            Err(GraphError::InvalidOrder)
        );
        m.reorder_streams(vec![StreamId::from("b"), StreamId::from("a")])
            .unwrap();
        let names: Vec<_> = m.streams().map(|s| s.id.as_str().to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_validate_conversion_rate_and_window() {
        let mut m = model();
        m.add_stream(stream("a", None)).unwrap();
        let mut bad = stream("b", Some("a"));
        bad.conversion_rate = 1.5;
        m.add_stream(bad).unwrap();
        assert!(matches!(
            m.validate(),
            Err(ValidationError::Config(
                ConfigError::ConversionRateOutOfRange { .. }
            ))
        ));

        let mut m = model();
        let mut bad = stream("a", None);
        bad.start_month = 10;
        bad.end_month = Some(5);
        m.add_stream(bad).unwrap();
        assert!(matches!(
            m.validate(),
            Err(ValidationError::Config(ConfigError::WindowOrder { .. }))
        ));
    }

    #[test]
    fn test_validate_discount_vs_growth() {
        let mut m = model();
        m.settings.discount_rate = Distribution::fixed(0.02);
        m.settings.terminal_growth_rate = 0.03;
        assert!(matches!(
            m.validate(),
            Err(ValidationError::DiscountRateNotAboveGrowth { .. })
        ));
        // The check is skipped in IRR mode, where the rate is unused
        m.settings.calculation_mode = CalculationMode::Irr;
        assert!(m.validate().is_ok());
    }
}
