//! Hierarchy resolution for `child_of` and `parent_of`
//!
//! Two strategies:
//! - materialized path: descendants match `parent_path =like '<root path>%'`
//!   and ancestors are the ids listed in each root's path
//! - adjacency list: breadth-first walk over the parent field, one search
//!   per level, with a visited set and an iteration cap
//!
//! Walks run privileged so intermediate nodes hidden from the caller still
//! link the tree; the caller's own filters apply to the final domain.

use std::collections::BTreeSet;

use crate::domain::{or_all, Domain, Operator, RecordId};
use crate::errors::{DomainError, DomainResult};
use crate::observability::{log_event, Event};
use crate::schema::ModelDef;

use super::backend::SearchOptions;
use super::expression::DomainCompiler;

/// Direction of a hierarchy walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `child_of`: the roots and all their descendants
    Descendants,
    /// `parent_of`: the roots and all their ancestors
    Ancestors,
}

impl Direction {
    pub fn from_operator(operator: Operator) -> Option<Self> {
        match operator {
            Operator::ChildOf => Some(Direction::Descendants),
            Operator::ParentOf => Some(Direction::Ancestors),
            _ => None,
        }
    }
}

/// How a resolved id set is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// `[('id', 'in', ids)]` (or the path condition) on the model itself
    Ids,
    /// `[(left, 'in', <search of the model>)]` on the referencing model
    Prefixed(&'a str),
}

impl DomainCompiler {
    /// Domain equivalent to `[left, child_of|parent_of, ids]` on `model`.
    ///
    /// `parent` overrides the parent field used for the walk; the
    /// materialized path is only used with the model's own parent field.
    pub async fn hierarchy_domain(
        &self,
        direction: Direction,
        ids: &[RecordId],
        model: &ModelDef,
        parent: Option<&str>,
        target: Target<'_>,
    ) -> DomainResult<Domain> {
        if ids.is_empty() {
            return Ok(Domain::false_domain());
        }
        let parent_name = parent.unwrap_or(&model.parent_name);
        let use_path = model.parent_store && parent_name == model.parent_name;

        let domain = match (direction, use_path) {
            (Direction::Descendants, true) => self.descendants_by_path(model, ids).await?,
            (Direction::Ancestors, true) => self.ancestors_by_path(model, ids).await?,
            (_, false) => {
                let found = self.walk(direction, model, parent_name, ids).await?;
                Domain::leaf("id", Operator::In, ids_value(&found))
            }
        };

        match target {
            Target::Ids => Ok(domain),
            Target::Prefixed(left) => {
                let result = self.search(&model.name, &domain).await?;
                Ok(Domain::leaf(left, Operator::In, result.into_operand()))
            }
        }
    }

    async fn descendants_by_path(&self, model: &ModelDef, ids: &[RecordId]) -> DomainResult<Domain> {
        let paths = self.backend().read_parent_paths(model, ids).await?;
        log_expanded(model, "parent_path", paths.len());
        or_all(paths.into_iter().map(|(_, path)| {
            Domain::leaf(
                "parent_path",
                Operator::EqLike,
                serde_json::Value::from(format!("{}%", path)),
            )
        }))
    }

    async fn ancestors_by_path(&self, model: &ModelDef, ids: &[RecordId]) -> DomainResult<Domain> {
        let paths = self.backend().read_parent_paths(model, ids).await?;
        let mut ancestors = BTreeSet::new();
        for (id, path) in &paths {
            for label in path.split('/').filter(|label| !label.is_empty()) {
                let ancestor = label.parse::<RecordId>().map_err(|_| {
                    DomainError::backend(format!(
                        "{} record {} has a malformed parent_path '{}'",
                        model.name, id, path
                    ))
                })?;
                ancestors.insert(ancestor);
            }
        }
        log_expanded(model, "parent_path", ancestors.len());
        Ok(Domain::leaf("id", Operator::In, ids_value(&ancestors)))
    }

    /// Breadth-first walk from `roots`. Every id is visited once, so a
    /// cycle in the parent links ends the walk instead of looping.
    async fn walk(
        &self,
        direction: Direction,
        model: &ModelDef,
        parent_name: &str,
        roots: &[RecordId],
    ) -> DomainResult<BTreeSet<RecordId>> {
        let limit = self.context().hierarchy_max_iterations;
        let options = SearchOptions::privileged(self.context().active_test);
        let mut visited: BTreeSet<RecordId> = BTreeSet::new();
        let mut frontier: Vec<RecordId> = roots.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut rounds = 0;

        while !frontier.is_empty() {
            rounds += 1;
            if rounds > limit {
                return Err(DomainError::HierarchyLimit {
                    model: model.name.clone(),
                    limit,
                });
            }
            visited.extend(frontier.iter().copied());

            let next = match direction {
                Direction::Descendants => {
                    let domain = Domain::leaf(parent_name, Operator::In, ids_value(&frontier));
                    self.backend().search_ids(model, &domain, options).await?
                }
                Direction::Ancestors => {
                    self.backend()
                        .read_references(model, &frontier, parent_name)
                        .await?
                }
            };
            frontier = next
                .into_iter()
                .filter(|id| !visited.contains(id))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
        }

        log_expanded(model, "adjacency", visited.len());
        Ok(visited)
    }
}

fn ids_value<'a>(ids: impl IntoIterator<Item = &'a RecordId>) -> serde_json::Value {
    serde_json::Value::Array(ids.into_iter().map(|id| serde_json::Value::from(*id)).collect())
}

fn log_expanded(model: &ModelDef, strategy: &str, count: usize) {
    let count = count.to_string();
    log_event(
        Event::HierarchyExpanded,
        &[
            ("model", model.name.as_str()),
            ("strategy", strategy),
            ("records", count.as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_operator() {
        assert_eq!(
            Direction::from_operator(Operator::ChildOf),
            Some(Direction::Descendants)
        );
        assert_eq!(
            Direction::from_operator(Operator::ParentOf),
            Some(Direction::Ancestors)
        );
        assert_eq!(Direction::from_operator(Operator::In), None);
    }

    #[test]
    fn test_ids_value_is_a_json_list() {
        let ids: BTreeSet<RecordId> = [3, 1, 2].into_iter().collect();
        assert_eq!(ids_value(&ids), serde_json::json!([1, 2, 3]));
    }
}
