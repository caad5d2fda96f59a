//! 쓰기 문장 번역
//!
//! 쓰기 대상 스펙은 뷰의 갱신 형태(`for_update`/`for_partial_update`)로
//! 인라인되며, 문장 안의 질의는 읽기로 번역된다.

use super::context::ViewTranslator;
use super::updatable::Updatability;
use crate::catalog::Privilege;
use crate::error::{VtxError, VtxResult};
use crate::sql::ast::*;
use crate::types::ClassId;

impl ViewTranslator<'_> {
    /// 쓰기 대상 스펙을 확장하고 경로를 번역
    fn translate_write(&mut self, mut stmt: Statement, what_for: Privilege) -> VtxResult<Vec<Statement>> {
        self.translate_nested_reads(&mut stmt)?;
        let parts = self.expand_statement(stmt, what_for, false)?;
        let mut out = Vec::with_capacity(parts.len());
        for mut part in parts {
            self.translate_paths(&mut part)?;
            out.push(part);
        }
        Ok(out)
    }

    pub(crate) fn translate_update(&mut self, update: Update) -> VtxResult<Vec<Statement>> {
        let out = self.translate_write(Statement::Update(update), Privilege::UPDATE)?;
        if out.is_empty() {
            return Err(VtxError::UpdateEmpty);
        }
        Ok(out)
    }

    pub(crate) fn translate_delete(&mut self, delete: Delete) -> VtxResult<Vec<Statement>> {
        let out = self.translate_write(Statement::Delete(delete), Privilege::DELETE)?;
        if out.is_empty() {
            return Err(VtxError::DeleteEmpty);
        }
        Ok(out)
    }

    /// INSERT: 지정한 클래스에만 삽입 (하위 클래스 제외)
    pub(crate) fn translate_insert(&mut self, mut insert: Insert) -> VtxResult<Vec<Statement>> {
        insert.spec.entities.truncate(1);
        let what_for = if insert.is_replace {
            Privilege::REPLACE
        } else if !insert.on_duplicate.is_empty() {
            Privilege::INSERT_UPDATE
        } else {
            Privilege::INSERT
        };

        let parts = self.translate_write(Statement::Insert(insert), what_for)?;
        let out: Vec<Statement> = parts
            .into_iter()
            .filter(|stmt| match stmt {
                Statement::Insert(i) => {
                    !i.spec.is_derived()
                        && !i.spec.entities.is_empty()
                        && i.spec.entities.iter().all(|c| !self.is_virtual(c))
                }
                _ => false,
            })
            .collect();
        if out.is_empty() {
            return Err(VtxError::InsertEmpty);
        }
        Ok(out)
    }

    /// MERGE: 가상 원본은 파생 테이블로, 가상 대상은 단일 분기로 인라인
    pub(crate) fn translate_merge(&mut self, merge: Merge) -> VtxResult<Vec<Statement>> {
        let mut what_for = Privilege::NONE;
        if let Some(update) = &merge.update {
            if !update.assignments.is_empty() {
                what_for |= Privilege::UPDATE;
            }
            if update.delete {
                what_for |= Privilege::DELETE;
            }
        }
        if merge.insert.is_some() {
            what_for |= Privilege::INSERT;
        }

        let source_virtual = self.has_virtual(&merge.source);
        let mut stmt = Statement::Merge(merge);
        if source_virtual {
            self.wrap_spec_as_derived(&mut stmt, 1, None)?;
        }
        self.translate_nested_reads(&mut stmt)?;

        let target = match &stmt {
            Statement::Merge(m) => m.target.clone(),
            _ => return Err(VtxError::structural("merge statement expected")),
        };
        if self.has_virtual(&target) {
            let [class]: [ClassId; 1] = target
                .entities
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .try_into()
                .map_err(|_| VtxError::NotUpdatable {
                    class: target.range_var.clone(),
                })?;
            let def = self.view_definition(&class)?;
            let [branch] = def.write_branches() else {
                return Err(VtxError::NotUpdatable {
                    class: class.to_string(),
                });
            };
            if def.updatability != Updatability::Updatable {
                return Err(VtxError::NotUpdatable {
                    class: class.to_string(),
                });
            }
            self.authorize_view(&def, what_for)?;
            if !self.class_lambda(&mut stmt, 0, &def, branch, false)? {
                return Err(VtxError::NotUpdatable {
                    class: class.to_string(),
                });
            }
        }

        self.translate_paths(&mut stmt)?;
        Ok(vec![stmt])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CheckOptionKind, ClassBuilder, InMemoryCatalog};
    use crate::rewrite::TranslatedStatement;
    use crate::types::DataType;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_class(
                ClassBuilder::real("emp")
                    .attr("id", DataType::Integer)
                    .attr("name", DataType::Varchar)
                    .attr("sal", DataType::Integer)
                    .attr("dept", DataType::Integer),
            )
            .with_class(
                ClassBuilder::real("dept")
                    .attr("id", DataType::Integer)
                    .attr("title", DataType::Varchar),
            )
            .with_class(
                ClassBuilder::view("v_emp")
                    .attr("id", DataType::Integer)
                    .attr("name", DataType::Varchar)
                    .attr("pay", DataType::Integer)
                    .query("SELECT id, name, sal * 12 FROM emp WHERE dept = 1")
                    .check_option(CheckOptionKind::Cascaded),
            )
            .with_class(
                ClassBuilder::view("v_join")
                    .attr("name", DataType::Varchar)
                    .attr("title", DataType::Varchar)
                    .query("SELECT e.name, d.title FROM emp e, dept d WHERE e.dept = d.id"),
            )
            .with_class(
                ClassBuilder::view("v_cnt")
                    .attr("dept", DataType::Integer)
                    .attr("n", DataType::Integer)
                    .query("SELECT dept, COUNT(*) FROM emp GROUP BY dept"),
            )
    }

    fn translate(cat: &InMemoryCatalog, sql: &str) -> VtxResult<TranslatedStatement> {
        ViewTranslator::new(cat).translate_sql(sql)
    }

    // ── UPDATE ──

    #[test]
    fn test_update_through_view_inverts_assignment() {
        let cat = catalog();
        let out = translate(&cat, "UPDATE v_emp SET pay = 1200 WHERE id = 7").unwrap();
        assert_eq!(out.len(), 1);
        match out.first().unwrap() {
            Statement::Update(u) => {
                assert_eq!(u.assignments.len(), 1);
                assert_eq!(u.assignments[0].target.name, "sal");
                assert_eq!(u.assignments[0].value.to_string(), "1200 / 12");
                assert_eq!(u.where_clause.len(), 2);
                assert_eq!(u.check_where.len(), 1);
                assert_eq!(u.specs[0].entities[0].as_str(), "emp");
            }
            other => panic!("Expected update, got: {:?}", other),
        }
    }

    #[test]
    fn test_update_join_view_is_partial() {
        let cat = catalog();
        let out = translate(&cat, "UPDATE v_join SET title = 'x' WHERE name = 'kim'").unwrap();
        match out.first().unwrap() {
            Statement::Update(u) => {
                assert_eq!(u.specs.len(), 2);
                assert_eq!(u.assignments[0].target.name, "title");
            }
            other => panic!("Expected update, got: {:?}", other),
        }
    }

    #[test]
    fn test_update_grouped_view_rejected() {
        let cat = catalog();
        match translate(&cat, "UPDATE v_cnt SET dept = 3") {
            Err(VtxError::NotUpdatable { class }) => assert_eq!(class, "v_cnt"),
            other => panic!("Expected NotUpdatable, got: {:?}", other),
        }
    }

    // ── DELETE ──

    #[test]
    fn test_delete_through_view() {
        let cat = catalog();
        let out = translate(&cat, "DELETE FROM v_emp WHERE pay > 100").unwrap();
        match out.first().unwrap() {
            Statement::Delete(d) => {
                assert_eq!(d.specs[0].entities[0].as_str(), "emp");
                let text: Vec<String> = d.where_clause.iter().map(|e| e.to_string()).collect();
                assert_eq!(text[0], "v_emp.dept = 1");
                assert_eq!(text[1], "(v_emp.sal * 12) > 100");
            }
            other => panic!("Expected delete, got: {:?}", other),
        }
    }

    #[test]
    fn test_delete_join_view_rejected() {
        let cat = catalog();
        match translate(&cat, "DELETE FROM v_join WHERE name = 'kim'") {
            Err(VtxError::NotUpdatable { class }) => assert_eq!(class, "v_join"),
            other => panic!("Expected NotUpdatable, got: {:?}", other),
        }
    }

    // ── INSERT ──

    #[test]
    fn test_insert_through_view_fills_values() {
        let cat = catalog();
        let out = translate(&cat, "INSERT INTO v_emp (id, pay) VALUES (1, 2400)").unwrap();
        match out.first().unwrap() {
            Statement::Insert(i) => {
                assert_eq!(i.spec.entities[0].as_str(), "emp");
                let cols: Vec<&str> = i.columns.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(cols, ["id", "sal"]);
                match &i.source {
                    InsertSource::Values(rows) => assert_eq!(rows[0][1].to_string(), "2400 / 12"),
                    other => panic!("Expected values, got: {:?}", other),
                }
                assert_eq!(i.check_where.len(), 1);
            }
            other => panic!("Expected insert, got: {:?}", other),
        }
    }

    #[test]
    fn test_update_aggregate_column_not_invertible() {
        let cat = catalog();
        match translate(&cat, "UPDATE v_cnt SET n = 3") {
            Err(VtxError::NotInvertible { view, attribute }) => {
                assert_eq!(view, "v_cnt");
                assert_eq!(attribute, "n");
            }
            other => panic!("Expected NotInvertible, got: {:?}", other),
        }
    }

    #[test]
    fn test_insert_into_grouped_view_rejected() {
        let cat = catalog();
        assert!(matches!(
            translate(&cat, "INSERT INTO v_cnt (dept) VALUES (1)"),
            Err(VtxError::NotUpdatable { .. })
        ));
    }

    // ── MERGE ──

    #[test]
    fn test_merge_into_view_target() {
        let cat = catalog();
        let out = translate(
            &cat,
            "MERGE INTO v_emp t USING dept s ON (t.id = s.id) \
             WHEN MATCHED THEN UPDATE SET t.name = s.title \
             WHEN NOT MATCHED THEN INSERT (id, name) VALUES (s.id, s.title)",
        )
        .unwrap();
        match out.first().unwrap() {
            Statement::Merge(m) => {
                assert_eq!(m.target.entities[0].as_str(), "emp");
                assert_eq!(m.check_where.len(), 1);
                let update = m.update.as_ref().unwrap();
                assert_eq!(update.where_clause.len(), 1);
            }
            other => panic!("Expected merge, got: {:?}", other),
        }
    }

    #[test]
    fn test_merge_view_source_becomes_derived() {
        let cat = catalog();
        let out = translate(
            &cat,
            "MERGE INTO dept t USING v_emp s ON (t.id = s.id) \
             WHEN MATCHED THEN UPDATE SET t.title = s.name",
        )
        .unwrap();
        match out.first().unwrap() {
            Statement::Merge(m) => {
                assert!(m.source.is_derived());
                assert_eq!(m.source.as_attr_list.len(), 2);
            }
            other => panic!("Expected merge, got: {:?}", other),
        }
    }
}
