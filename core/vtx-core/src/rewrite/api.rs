//! 번역기 밖에서 쓰는 뷰 질의 연산
//!
//! 복제, 트리거 호출자가 뷰 속성 목록, 갱신 가능성, 실제 객체 기준 뷰
//! 컬럼 값을 묻는다. 모두 소유자 기준으로 컴파일된 뷰 정의를 쓰며 요청자
//! 권한은 검사하지 않는다.

use super::context::ViewTranslator;
use super::invert::instantiate;
use super::registry::rebind;
use super::updatable::Updatability;
use super::view_cache::ViewDefinition;
use crate::catalog::{CheckOptionKind, ObjectRow};
use crate::error::{VtxError, VtxResult};
use crate::eval::{evaluate, is_satisfied};
use crate::sql::ast::*;
use crate::types::{ClassId, Value};

/// 첫 FROM 스펙의 후보 클래스
fn branch_classes(branch: &Query) -> &[ClassId] {
    branch
        .as_select()
        .and_then(|s| s.from.first())
        .map(|spec| spec.entities.as_slice())
        .unwrap_or(&[])
}

impl ViewTranslator<'_> {
    /// 클래스의 속성 목록 (식별자 자리 제외)
    pub fn attributes_of(&mut self, class: &ClassId) -> VtxResult<Vec<NameRef>> {
        if self.is_virtual(class) {
            let def = self.view_definition(class)?;
            return Ok(def.attributes.iter().filter(|a| !a.is_oid()).cloned().collect());
        }
        let info = self
            .schema
            .class(class)
            .ok_or_else(|| VtxError::ClassNotFound(class.to_string()))?;
        Ok(info
            .attributes
            .iter()
            .map(|a| NameRef::new(a.name.to_lowercase()).with_type(a.domain.clone()))
            .collect())
    }

    /// `real`이 뷰의 어느 분기의 실제 클래스인지 (하위 클래스 포함)
    pub fn is_real_class_of_view(&mut self, real: &ClassId, view: &ClassId) -> VtxResult<bool> {
        let def = self.view_definition(view)?;
        Ok(self.write_or_read_branches(&def).iter().any(|branch| {
            branch_classes(branch)
                .iter()
                .any(|c| c == real || self.schema.is_subclass_of(real, c))
        }))
    }

    /// 갱신 가능한 뷰의 대표 실제 클래스
    pub fn one_real_class_of(&mut self, view: &ClassId) -> VtxResult<Option<ClassId>> {
        let def = self.view_definition(view)?;
        if !def.updatability.is_updatable() {
            return Ok(None);
        }
        Ok(def
            .for_update
            .first()
            .and_then(|b| branch_classes(b).first().cloned()))
    }

    /// 실제 클래스는 항상, 뷰는 완전 갱신 가능할 때만
    pub fn is_updatable(&mut self, class: &ClassId) -> VtxResult<bool> {
        if !self.is_virtual(class) {
            return Ok(self.schema.class(class).is_some());
        }
        Ok(self.view_definition(class)?.updatability == Updatability::Updatable)
    }

    /// `real` 클래스를 통해 뷰 속성 `attr`을 쓸 수 있는지
    pub fn is_updatable_attribute(&mut self, view: &ClassId, attr: &str, real: &ClassId) -> VtxResult<bool> {
        if !self.is_virtual(view) {
            return Ok(self
                .schema
                .class(view)
                .is_some_and(|info| info.attribute(attr).is_some()));
        }
        let def = self.view_definition(view)?;
        let Some(pos) = def.attribute_position(attr) else {
            return Ok(false);
        };
        Ok(self
            .write_branch_for(&def, real)
            .and_then(|i| def.inverted_for_update.get(i))
            .and_then(|row| row.get(pos))
            .is_some_and(Option::is_some))
    }

    /// 뷰 속성에 대한 쓰기를 실제 컬럼 쓰기로 바꾼다
    pub fn update_attribute(
        &mut self,
        view: &ClassId,
        attr: &str,
        value: Expr,
        real: &ClassId,
    ) -> VtxResult<(NameRef, Expr)> {
        let def = self.view_definition(view)?;
        let not_invertible = || VtxError::NotInvertible {
            view: view.to_string(),
            attribute: attr.to_string(),
        };
        let pos = def.attribute_position(attr).ok_or_else(|| VtxError::AttributeNotFound {
            class: view.to_string(),
            attribute: attr.to_string(),
        })?;
        let branch = self.write_branch_for(&def, real).ok_or_else(|| VtxError::NotUpdatable {
            class: view.to_string(),
        })?;
        let (column, template) = def
            .inverted_for_update
            .get(branch)
            .and_then(|row| row.get(pos))
            .and_then(Option::as_ref)
            .ok_or_else(not_invertible)?;
        Ok((column.clone(), instantiate(template, &value)))
    }

    /// 식 텍스트를 실제 객체에 대해 평가
    pub fn evaluate_expression_against_object(&mut self, expr_text: &str, object: &ObjectRow) -> VtxResult<Value> {
        let expr = self.parser.parse_expr(expr_text)?;
        evaluate(&expr, object)
    }

    /// 실제 객체로부터 뷰 속성 값 계산
    pub fn get_attribute(&mut self, view: &ClassId, attr: &str, object: &ObjectRow) -> VtxResult<Value> {
        let def = self.view_definition(view)?;
        let pos = def.attribute_position(attr).ok_or_else(|| VtxError::AttributeNotFound {
            class: view.to_string(),
            attribute: attr.to_string(),
        })?;
        let branch = self.branch_for_object(&def, &object.class)?;
        let column = ViewDefinition::column_of(&branch, pos)
            .ok_or_else(|| VtxError::structural(format!("view '{view}' lost column {pos}")))?;
        tracing::trace!(view = %view, attr, column = %column, "evaluating view column");
        evaluate(column, object)
    }

    /// 뷰의 검사 술어를 실제 객체에 대해 평가: 거짓이나 알 수 없음은 위반
    pub fn evaluate_check_option(&mut self, view: &ClassId, object: &ObjectRow) -> VtxResult<()> {
        let def = self.view_definition(view)?;
        if def.check_option == CheckOptionKind::None {
            return Ok(());
        }
        let branch = self.branch_for_object(&def, &object.class)?;
        let Some(select) = branch.as_select() else {
            return Ok(());
        };
        for term in &select.check_where {
            if !is_satisfied(term, object)? {
                tracing::warn!(view = %view, oid = object.oid, term = %term, "check option violated");
                return Err(VtxError::CheckOptionViolation {
                    view: view.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 스펙의 실제 행 식별자 식
    ///
    /// 실제 클래스 스펙은 자신의 OID, 갱신 가능한 단일 분기 뷰 스펙은 분기의
    /// 식별자 컬럼을 스펙에 다시 묶은 식이다.
    pub fn get_identity_expression(&mut self, spec: &EntitySpec) -> VtxResult<Option<Expr>> {
        if spec.is_derived() {
            return Ok(None);
        }
        let Some(class) = spec.first_entity().cloned() else {
            return Ok(None);
        };
        if !self.is_virtual(&class) {
            return Ok(Some(Expr::Name(NameRef::oid(
                spec.id,
                spec.range_var.clone(),
                Some(class),
            ))));
        }
        let def = self.view_definition(&class)?;
        let [branch] = def.write_branches() else {
            return Ok(None);
        };
        let Some(select) = branch.as_select() else {
            return Ok(None);
        };
        let (Some(source), Some(column)) = (select.from.first(), ViewDefinition::column_of(branch, 0)) else {
            return Ok(None);
        };
        let mut identity = column.clone();
        rebind(&mut identity, source.id, spec.id, Some(&spec.range_var));
        Ok(Some(identity))
    }

    // ── helpers ──

    /// 쓰기 분기, 없으면 읽기 분기 중 SELECT 분기
    fn write_or_read_branches(&self, def: &ViewDefinition) -> Vec<Query> {
        if !def.write_branches().is_empty() {
            return def.write_branches().to_vec();
        }
        def.for_select.iter().filter(|q| q.is_select()).cloned().collect()
    }

    fn write_branch_for(&self, def: &ViewDefinition, real: &ClassId) -> Option<usize> {
        def.write_branches().iter().position(|branch| {
            branch_classes(branch)
                .iter()
                .any(|c| c == real || self.schema.is_subclass_of(real, c))
        })
    }

    fn branch_for_object(&self, def: &ViewDefinition, class: &ClassId) -> VtxResult<Query> {
        self.write_or_read_branches(def)
            .into_iter()
            .find(|branch| {
                branch_classes(branch)
                    .iter()
                    .any(|c| c == class || self.schema.is_subclass_of(class, c))
            })
            .ok_or_else(|| {
                VtxError::structural(format!("'{class}' is not a real class of view '{}'", def.class))
            })
    }
}
