//! Routing plan: the candidate sub-table set, the subset surviving
//! predicate evaluation, and the rewritten SQL grouped by node.

use std::ops::Bound;
use std::sync::Arc;

use fnv::FnvHashMap;

use super::{Error, Rule};
use crate::sql::{ComparisonOp, Expr, Value};

/// The statement fragment routing was derived from.
#[derive(Debug, Clone)]
pub enum Criteria {
    /// Nothing to evaluate; the default rule is in force.
    None,
    /// The `WHERE` expression of a select, update or delete.
    Where(Expr),
    /// Shard-key column values, one per inserted row.
    Keys(Vec<Value>),
}

/// Immutable routing result handed to the dispatcher.
#[derive(Debug)]
pub struct Plan {
    rule: Arc<Rule>,
    criteria: Criteria,
    table_indexes: Vec<usize>,
    route_table_indexes: Vec<usize>,
    route_node_indexes: Vec<usize>,
    rewritten_sqls: FnvHashMap<String, Vec<String>>,
}

impl Plan {
    /// The rule the plan was built against.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Full candidate set, `[0, sub-table count)`.
    pub fn table_indexes(&self) -> &[usize] {
        &self.table_indexes
    }

    /// Sub-table indices surviving predicate evaluation, ascending and
    /// deduplicated.
    pub fn route_table_indexes(&self) -> &[usize] {
        &self.route_table_indexes
    }

    /// Distinct node indices covering the routed sub-tables.
    pub fn route_node_indexes(&self) -> &[usize] {
        &self.route_node_indexes
    }

    /// Rewritten SQL per node, ordered by ascending sub-table index.
    pub fn rewritten_sqls(&self) -> &FnvHashMap<String, Vec<String>> {
        &self.rewritten_sqls
    }

    pub fn into_sqls(self) -> FnvHashMap<String, Vec<String>> {
        self.rewritten_sqls
    }
}

/// Mutable state while a plan is being built; frozen into a [`Plan`] by
/// the rewriter.
pub(crate) struct PlanBuilder {
    rule: Arc<Rule>,
    criteria: Criteria,
    table_indexes: Vec<usize>,
    route_table_indexes: Vec<usize>,
    route_node_indexes: Vec<usize>,
}

impl PlanBuilder {
    pub(crate) fn new(rule: Arc<Rule>, criteria: Criteria) -> Self {
        let table_indexes = (0..rule.table_count()).collect();
        Self {
            rule,
            criteria,
            table_indexes,
            route_table_indexes: vec![],
            route_node_indexes: vec![],
        }
    }

    pub(crate) fn rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    pub(crate) fn route_table_indexes(&self) -> &[usize] {
        &self.route_table_indexes
    }

    pub(crate) fn route_node_indexes(&self) -> &[usize] {
        &self.route_node_indexes
    }

    /// Evaluate the criteria against the rule's shard function. The
    /// default rule short-circuits to its single node with the statement
    /// left alone.
    pub(crate) fn calc_route_indexes(&mut self) -> Result<(), Error> {
        if self.rule.is_default() {
            self.route_node_indexes = vec![0];
            return Ok(());
        }

        let route = match &self.criteria {
            Criteria::None => vec![],
            Criteria::Keys(keys) => {
                let mut tables = Vec::with_capacity(keys.len());
                for key in keys {
                    tables.push(self.rule.shard().find_for_key(key)?);
                }
                tables.sort_unstable();
                tables.dedup();
                tables
            }
            Criteria::Where(expr) => self.eval(expr)?,
        };
        self.route_table_indexes = route;

        let mut nodes: Vec<usize> = self
            .route_table_indexes
            .iter()
            .map(|&table| self.rule.table_to_node()[table])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        self.route_node_indexes = nodes;
        Ok(())
    }

    /// A sharded rule that constrained nothing has no usable criteria.
    pub(crate) fn check_criteria(&self) -> Result<(), Error> {
        if !self.rule.is_default() && self.route_table_indexes.is_empty() {
            return Err(Error::NoCriteria);
        }
        Ok(())
    }

    pub(crate) fn freeze(self, rewritten_sqls: FnvHashMap<String, Vec<String>>) -> Plan {
        Plan {
            rule: self.rule,
            criteria: self.criteria,
            table_indexes: self.table_indexes,
            route_table_indexes: self.route_table_indexes,
            route_node_indexes: self.route_node_indexes,
            rewritten_sqls,
        }
    }

    /// Recursive walk over the boolean structure of a predicate. Anything
    /// the walk does not understand keeps the full candidate set.
    fn eval(&self, expr: &Expr) -> Result<Vec<usize>, Error> {
        match expr {
            Expr::And(left, right) => Ok(intersect(&self.eval(left)?, &self.eval(right)?)),
            Expr::Or(left, right) => Ok(union(&self.eval(left)?, &self.eval(right)?)),
            Expr::Not(inner) => Ok(difference(&self.table_indexes, &self.eval(inner)?)),
            Expr::Paren(inner) => self.eval(inner),
            Expr::Comparison { op, left, right } => self.eval_comparison(*op, left, right),
            Expr::Between {
                negated,
                expr,
                low,
                high,
            } => self.eval_between(*negated, expr, low, high),
            _ => Ok(self.all()),
        }
    }

    fn eval_comparison(
        &self,
        op: ComparisonOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Vec<usize>, Error> {
        let (op, column, value) = match (left, right) {
            (Expr::Column(column), value) => (op, column, value),
            (value, Expr::Column(column)) => match op.mirrored() {
                Some(op) => (op, column, value),
                None => return Ok(self.all()),
            },
            _ => return Ok(self.all()),
        };
        if !self.rule.is_key(column) {
            return Ok(self.all());
        }

        let shard = self.rule.shard();
        match op {
            ComparisonOp::Eq => match value {
                Expr::Literal(value) => Ok(vec![shard.find_for_key(value)?]),
                _ => Ok(self.all()),
            },
            ComparisonOp::Ne => match value {
                Expr::Literal(value) => Ok(difference(
                    &self.table_indexes,
                    &[shard.find_for_key(value)?],
                )),
                _ => Ok(self.all()),
            },
            ComparisonOp::In | ComparisonOp::NotIn => {
                let Some(keys) = tuple_literals(value) else {
                    return Ok(self.all());
                };
                let mut tables = Vec::with_capacity(keys.len());
                for key in keys {
                    tables.push(shard.find_for_key(key)?);
                }
                tables.sort_unstable();
                tables.dedup();
                if op == ComparisonOp::In {
                    Ok(tables)
                } else {
                    Ok(difference(&self.table_indexes, &tables))
                }
            }
            ComparisonOp::Lt | ComparisonOp::Le | ComparisonOp::Gt | ComparisonOp::Ge => {
                let Expr::Literal(value) = value else {
                    return Ok(self.all());
                };
                if !shard.supports_range() {
                    return Ok(self.all());
                }
                match op {
                    ComparisonOp::Lt => {
                        Ok(shard.find_for_range(Bound::Unbounded, Bound::Excluded(value))?)
                    }
                    ComparisonOp::Le => {
                        Ok(shard.find_for_range(Bound::Unbounded, Bound::Included(value))?)
                    }
                    _ => Ok(shard.find_for_range(Bound::Included(value), Bound::Unbounded)?),
                }
            }
        }
    }

    fn eval_between(
        &self,
        negated: bool,
        expr: &Expr,
        low: &Expr,
        high: &Expr,
    ) -> Result<Vec<usize>, Error> {
        let Expr::Column(column) = expr else {
            return Ok(self.all());
        };
        if !self.rule.is_key(column) {
            return Ok(self.all());
        }
        let (Expr::Literal(low), Expr::Literal(high)) = (low, high) else {
            return Ok(self.all());
        };

        let shard = self.rule.shard();
        if !shard.supports_range() {
            return Ok(self.all());
        }

        let mut start = shard.find_for_key(low)?;
        let mut stop = shard.find_for_key(high)?;
        if start > stop {
            std::mem::swap(&mut start, &mut stop);
        }
        if negated {
            // Boundary sub-tables keep keys on either side of the band.
            let below: Vec<usize> = (0..=start).collect();
            let above: Vec<usize> = (stop..self.table_indexes.len()).collect();
            Ok(union(&below, &above))
        } else {
            Ok((start..=stop).collect())
        }
    }

    fn all(&self) -> Vec<usize> {
        self.table_indexes.clone()
    }
}

/// Literal members of an `IN` list; `None` when any member is something
/// the evaluator cannot place.
fn tuple_literals(expr: &Expr) -> Option<Vec<&Value>> {
    match expr {
        Expr::Tuple(items) => items
            .iter()
            .map(|item| match item {
                Expr::Literal(value) => Some(value),
                _ => None,
            })
            .collect(),
        Expr::Literal(value) => Some(vec![value]),
        _ => None,
    }
}

/// Merge union of two sorted, deduplicated index sets.
pub(crate) fn union(left: &[usize], right: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => {
                result.push(left[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                result.push(right[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                result.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&left[i..]);
    result.extend_from_slice(&right[j..]);
    result
}

/// Merge intersection of two sorted, deduplicated index sets.
pub(crate) fn intersect(left: &[usize], right: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

/// Members of `left` absent from `right`; both sorted and deduplicated.
pub(crate) fn difference(left: &[usize], right: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(left.len());
    let mut j = 0;
    for &item in left {
        while j < right.len() && right[j] < item {
            j += 1;
        }
        if j == right.len() || right[j] != item {
            result.push(item);
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_union() {
        assert_eq!(union(&[0, 2], &[1, 2, 3]), vec![0, 1, 2, 3]);
        assert_eq!(union(&[], &[1]), vec![1]);
        assert_eq!(union(&[1], &[]), vec![1]);
    }

    #[test]
    fn test_intersect() {
        assert_eq!(intersect(&[0, 1, 2], &[1, 2, 3]), vec![1, 2]);
        assert_eq!(intersect(&[0, 1], &[2, 3]), Vec::<usize>::new());
    }

    #[test]
    fn test_difference() {
        assert_eq!(difference(&[0, 1, 2, 3], &[1, 3]), vec![0, 2]);
        assert_eq!(difference(&[0, 1], &[]), vec![0, 1]);
        assert_eq!(difference(&[], &[1]), Vec::<usize>::new());
    }

    #[test]
    fn test_tuple_literals() {
        let tuple = Expr::Tuple(vec![Expr::literal(1), Expr::literal(2)]);
        assert_eq!(tuple_literals(&tuple).unwrap().len(), 2);

        let mixed = Expr::Tuple(vec![Expr::literal(1), Expr::column("x")]);
        assert!(tuple_literals(&mixed).is_none());

        assert!(tuple_literals(&Expr::literal(7)).is_some());
        assert!(tuple_literals(&Expr::column("x")).is_none());
    }
}
