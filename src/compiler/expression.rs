//! Domain compiler
//!
//! Compiles a domain on a model into WHERE conditions and joins of a
//! [`Query`]. Leaves are rewritten one at a time on a work stack: a
//! rewrite either emits SQL or pushes replacement tokens (on the same
//! model or on a related one) for later processing. Operators combine
//! the emitted fragments on a result stack, so arbitrarily long related
//! paths never grow the call stack.
//!
//! Rewrites that need ids from the database (name searches, hierarchy
//! walks, related-path searches) await the backend before continuing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{and_all, distribute_not, is_false, Domain, Operand, Operator, RecordId, Token};
use crate::errors::{DomainError, DomainResult};
use crate::observability::{log_event, Event};
use crate::query::{qualified, Join, Query, SqlFragment, SqlParam};
use crate::schema::{ModelDef, Registry};

use super::backend::ModelBackend;
use super::context::CompileContext;
use super::rewrite::{Step, WorkItem};

/// Boxed future of a compiler call that may recurse into itself
pub type CompileFuture<'a, T> = Pin<Box<dyn Future<Output = DomainResult<T>> + Send + 'a>>;

/// Outcome of [`DomainCompiler::search`]
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// The domain is statically empty
    Ids(Vec<RecordId>),
    /// Lazy query selecting the matching ids
    Query(Query),
}

impl SearchResult {
    /// Right-hand side of an `in` leaf matching the same records
    pub fn into_operand(self) -> Operand {
        match self {
            SearchResult::Ids(ids) => {
                Operand::Value(Value::Array(ids.into_iter().map(Value::from).collect()))
            }
            SearchResult::Query(query) => Operand::Subquery(query.subselect(None)),
        }
    }
}

/// Serializable view of a compiled domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explain {
    pub model: String,
    pub table: String,
    /// `SELECT "alias"."id" FROM ... WHERE ...`
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub joins: Vec<Join>,
}

/// Domain-to-SQL compiler over a model registry.
///
/// Cheap to clone: the registry and backend are shared.
#[derive(Clone)]
pub struct DomainCompiler {
    registry: Arc<Registry>,
    backend: Arc<dyn ModelBackend>,
    context: CompileContext,
}

impl std::fmt::Debug for DomainCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainCompiler")
            .field("models", &self.registry.len())
            .field("context", &self.context)
            .finish()
    }
}

impl DomainCompiler {
    pub fn new(registry: Arc<Registry>, backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            registry,
            backend,
            context: CompileContext::default(),
        }
    }

    /// Same compiler with another context
    pub fn with_context(&self, context: CompileContext) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            backend: Arc::clone(&self.backend),
            context,
        }
    }

    pub fn context(&self) -> &CompileContext {
        &self.context
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn backend(&self) -> &dyn ModelBackend {
        self.backend.as_ref()
    }

    /// Compile `domain` on `model` and add the result to `query`'s WHERE
    /// clause. Joins needed by the domain are added to `query` as well.
    pub async fn compile(&self, model: &str, domain: &Domain, query: &mut Query) -> DomainResult<()> {
        let model = self.registry.model(model)?;
        let alias = query.table_alias().to_string();
        let fragment = self.compile_on(model, &alias, domain, query).await?;

        let leaves = domain.leaves().count().to_string();
        let params = fragment.params.len().to_string();
        let joins = query.joins().len().to_string();
        log_event(
            Event::DomainCompiled,
            &[
                ("model", model.name.as_str()),
                ("leaves", leaves.as_str()),
                ("params", params.as_str()),
                ("joins", joins.as_str()),
            ],
        );

        query.add_where_fragment(fragment);
        Ok(())
    }

    async fn compile_on<'s>(
        &'s self,
        model: &'s ModelDef,
        alias: &str,
        domain: &Domain,
        query: &mut Query,
    ) -> DomainResult<SqlFragment> {
        let domain = distribute_not(domain)?;
        let mut work: Vec<WorkItem<'s>> = domain
            .into_tokens()
            .into_iter()
            .map(|token| WorkItem::new(token, model, alias))
            .collect();
        let mut results: Vec<SqlFragment> = Vec::new();

        while let Some(item) = work.pop() {
            match item.token {
                Token::And | Token::Or => {
                    let lhs = pop_result(&mut results)?;
                    let rhs = pop_result(&mut results)?;
                    results.push(if matches!(item.token, Token::And) {
                        lhs.and(rhs)
                    } else {
                        lhs.or(rhs)
                    });
                }
                Token::Not => {
                    let operand = pop_result(&mut results)?;
                    results.push(operand.negate());
                }
                Token::True => results.push(SqlFragment::literal(true)),
                Token::False => results.push(SqlFragment::literal(false)),
                Token::Leaf(_) => match self.rewrite(item, query).await? {
                    Step::Emit(fragment) => results.push(fragment),
                    Step::Requeue(items) => work.extend(items),
                },
            }
        }

        match (results.pop(), results.is_empty()) {
            (Some(fragment), true) => Ok(fragment),
            _ => Err(DomainError::Malformed(
                "domain did not reduce to a single condition".to_string(),
            )),
        }
    }

    /// Build the query of `domain` on `model`.
    ///
    /// When archived records are hidden and the domain does not mention
    /// the model's active field, `(active, '=', true)` is prepended. The
    /// field may belong to a delegated parent, in which case the leaf goes
    /// through the parent join.
    pub fn where_calc<'a>(&'a self, model: &'a str, domain: &'a Domain) -> CompileFuture<'a, Query> {
        Box::pin(async move {
            let model_def = self.registry.model(model)?;
            let mut domain = domain.clone();

            if self.context.active_test {
                if let Some(active) = self.registry.active_field(model_def) {
                    if !domain.leaves().any(|leaf| leaf.left == active) {
                        domain = and_all([
                            Domain::leaf(active, Operator::Eq, Value::Bool(true)),
                            domain,
                        ])?;
                    }
                }
            }

            let mut query = Query::new(&model_def.table);
            if !domain.is_empty() {
                self.compile(model, &domain, &mut query).await?;
            }
            Ok(query)
        })
    }

    /// Lazy search: a statically empty domain gives no ids, anything
    /// else a query ordered by id.
    pub fn search<'a>(&'a self, model: &'a str, domain: &'a Domain) -> CompileFuture<'a, SearchResult> {
        Box::pin(async move {
            if is_false(domain)? {
                return Ok(SearchResult::Ids(Vec::new()));
            }
            let mut query = self.where_calc(model, domain).await?;
            let order = qualified(query.table_alias(), "id");
            query.set_order(order);
            Ok(SearchResult::Query(query))
        })
    }

    /// Compile `domain` and describe the resulting id query
    pub async fn explain(&self, model: &str, domain: &Domain) -> DomainResult<Explain> {
        let model_def = self.registry.model(model)?;
        let query = self.where_calc(model, domain).await?;
        let select = query.select(&[qualified(query.table_alias(), "id")]);
        Ok(Explain {
            model: model_def.name.clone(),
            table: model_def.table.clone(),
            sql: select.sql,
            params: select.params,
            joins: query.joins().to_vec(),
        })
    }
}

fn pop_result(results: &mut Vec<SqlFragment>) -> DomainResult<SqlFragment> {
    results
        .pop()
        .ok_or_else(|| DomainError::Malformed("operator is missing operands".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::OfflineBackend;
    use crate::schema::{FieldDef, ModelDef};
    use serde_json::json;

    fn compiler() -> DomainCompiler {
        let registry = Registry::new()
            .with_model(
                ModelDef::new("res.partner", "res_partner")
                    .with_field(FieldDef::char("name"))
                    .with_field(FieldDef::boolean("active"))
                    .with_field(FieldDef::integer("color")),
            )
            .unwrap();
        DomainCompiler::new(Arc::new(registry), Arc::new(OfflineBackend))
    }

    fn domain(value: serde_json::Value) -> Domain {
        Domain::from_json(&value).unwrap()
    }

    #[tokio::test]
    async fn test_compile_combines_leaves() {
        let compiler = compiler();
        let mut query = Query::new("res_partner");
        compiler
            .compile(
                "res.partner",
                &domain(json!(["|", ["name", "=", "Azure"], ["color", ">", 3]])),
                &mut query,
            )
            .await
            .unwrap();

        let clause = query.where_clause();
        assert_eq!(
            clause.sql,
            r#"(("res_partner"."name" = %s) OR ("res_partner"."color" > %s))"#
        );
        assert_eq!(
            clause.params,
            vec![SqlParam::Text("Azure".into()), SqlParam::Int(3)]
        );
    }

    #[tokio::test]
    async fn test_negation_reaches_the_leaf() {
        let compiler = compiler();
        let mut query = Query::new("res_partner");
        compiler
            .compile(
                "res.partner",
                &domain(json!(["!", ["color", "=", 3]])),
                &mut query,
            )
            .await
            .unwrap();

        let clause = query.where_clause();
        assert!(clause.sql.contains("!="));
        assert!(!clause.sql.contains("NOT ("));
    }

    #[tokio::test]
    async fn test_where_calc_adds_active_filter() {
        let compiler = compiler();
        let query = compiler
            .where_calc("res.partner", &domain(json!([["color", "=", 3]])))
            .await
            .unwrap();
        let clause = query.where_clause();
        assert!(clause.sql.contains(r#""res_partner"."active""#));

        let query = compiler
            .where_calc("res.partner", &domain(json!([["active", "=", false]])))
            .await
            .unwrap();
        assert!(!query.where_clause().sql.contains(" AND "));

        let inactive = compiler.with_context(CompileContext::default().with_active_test(false));
        let query = inactive.where_calc("res.partner", &Domain::new(Vec::new())).await.unwrap();
        assert_eq!(query.where_clause().sql, "TRUE");
    }

    #[tokio::test]
    async fn test_search_of_false_domain_has_no_ids() {
        let compiler = compiler();
        let result = compiler
            .search("res.partner", &domain(json!([["id", "in", []]])))
            .await
            .unwrap();
        assert_eq!(result, SearchResult::Ids(Vec::new()));
        assert_eq!(result.into_operand(), Operand::Value(json!([])));
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let compiler = compiler();
        let mut query = Query::new("x");
        let err = compiler
            .compile("res.nowhere", &Domain::true_domain(), &mut query)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AERO_DOMAIN_UNKNOWN_MODEL");
    }

    #[tokio::test]
    async fn test_explain() {
        let compiler = compiler().with_context(CompileContext::default().with_active_test(false));
        let explain = compiler
            .explain("res.partner", &domain(json!([["name", "ilike", "az"]])))
            .await
            .unwrap();
        assert_eq!(explain.table, "res_partner");
        assert!(explain.sql.starts_with(r#"SELECT "res_partner"."id" FROM "res_partner""#));
        assert_eq!(explain.params, vec![SqlParam::Text("%az%".into())]);
        assert!(explain.joins.is_empty());
    }
}
