//! 갱신 가능성 분석

use crate::catalog::SchemaProvider;
use crate::sql::ast::{Query, QueryBody, SetOperator};
use std::fmt;

/// 뷰 본문의 갱신 가능성: `NotUpdatable < PartiallyUpdatable < Updatable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Updatability {
    NotUpdatable,
    /// UPDATE만 허용 (조인 본문)
    PartiallyUpdatable,
    Updatable,
}

impl Updatability {
    pub fn is_updatable(self) -> bool {
        self == Updatability::Updatable
    }
}

impl fmt::Display for Updatability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Updatability::NotUpdatable => "not updatable",
            Updatability::PartiallyUpdatable => "partially updatable",
            Updatability::Updatable => "updatable",
        })
    }
}

/// 질의 본문 분류
pub fn classify(query: &Query, schema: &dyn SchemaProvider) -> Updatability {
    match &query.body {
        QueryBody::SetOp { op, left, right } => match op {
            SetOperator::Union if !query.distinct => {
                classify(left, schema).min(classify(right, schema))
            }
            // 행의 출처가 모호
            _ => Updatability::NotUpdatable,
        },
        QueryBody::Select(select) => {
            if query.distinct
                || select.has_aggregate()
                || select.is_hierarchical()
                || select.from.is_empty()
            {
                return Updatability::NotUpdatable;
            }
            let mut result = Updatability::Updatable;
            for spec in &select.from {
                let spec_result = match &spec.derived {
                    Some(body) => classify(body, schema),
                    None => {
                        let blocked = spec.entities.iter().any(|class| {
                            schema
                                .class(class)
                                .is_none_or(|info| info.reuse_oid || info.system)
                        });
                        if blocked {
                            Updatability::NotUpdatable
                        } else {
                            Updatability::Updatable
                        }
                    }
                };
                result = result.min(spec_result);
            }
            if select.from.len() > 1 {
                result = result.min(Updatability::PartiallyUpdatable);
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassBuilder, InMemoryCatalog};
    use crate::sql::ast::IdGenerator;
    use crate::sql::{Binder, SqlParser};
    use crate::types::DataType;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_class(
                ClassBuilder::real("emp")
                    .attr("id", DataType::Integer)
                    .attr("dept", DataType::Integer)
                    .attr("sal", DataType::Integer),
            )
            .with_class(
                ClassBuilder::real("dept")
                    .attr("id", DataType::Integer)
                    .attr("name", DataType::Varchar),
            )
            .with_class(ClassBuilder::real("log").attr("id", DataType::Integer).reuse_oid())
    }

    fn classify_sql(sql: &str) -> Updatability {
        let catalog = catalog();
        let mut ids = IdGenerator::new();
        let mut query = SqlParser::new().parse_query(sql).unwrap();
        Binder::new(&catalog, &mut ids).bind_query(&mut query).unwrap();
        classify(&query, &catalog)
    }

    #[test]
    fn test_simple_select_is_updatable() {
        assert_eq!(
            classify_sql("SELECT id, sal FROM emp WHERE dept = 1"),
            Updatability::Updatable
        );
    }

    #[test]
    fn test_blocking_clauses() {
        for sql in [
            "SELECT DISTINCT id FROM emp",
            "SELECT dept, SUM(sal) FROM emp GROUP BY dept",
            "SELECT COUNT(*) FROM emp",
            "SELECT 1",
            "SELECT id FROM log",
        ] {
            assert_eq!(classify_sql(sql), Updatability::NotUpdatable, "{sql}");
        }
    }

    #[test]
    fn test_join_is_partial() {
        assert_eq!(
            classify_sql("SELECT e.id, d.name FROM emp e, dept d WHERE e.dept = d.id"),
            Updatability::PartiallyUpdatable
        );
    }

    #[test]
    fn test_set_operations() {
        assert_eq!(
            classify_sql("SELECT id FROM emp UNION ALL SELECT id FROM dept"),
            Updatability::Updatable
        );
        assert_eq!(
            classify_sql("SELECT id FROM emp UNION ALL SELECT e.id FROM emp e, dept d"),
            Updatability::PartiallyUpdatable
        );
        assert_eq!(
            classify_sql("SELECT id FROM emp UNION SELECT id FROM dept"),
            Updatability::NotUpdatable
        );
        assert_eq!(
            classify_sql("SELECT id FROM emp INTERSECT ALL SELECT id FROM dept"),
            Updatability::NotUpdatable
        );
    }

    #[test]
    fn test_derived_table_inherits() {
        assert_eq!(
            classify_sql("SELECT x.id FROM (SELECT id FROM emp) x"),
            Updatability::Updatable
        );
        assert_eq!(
            classify_sql("SELECT x.d FROM (SELECT DISTINCT dept AS d FROM emp) x"),
            Updatability::NotUpdatable
        );
    }

    #[test]
    fn test_ordering() {
        assert!(Updatability::NotUpdatable < Updatability::PartiallyUpdatable);
        assert!(Updatability::PartiallyUpdatable < Updatability::Updatable);
        assert!(Updatability::Updatable.is_updatable());
        assert_eq!(Updatability::PartiallyUpdatable.to_string(), "partially updatable");
    }
}
