//! 경로 스펙 번역
//!
//! `e.dept.name` 같은 경로 탐색이 가상 클래스로 이어지면 경로 스펙을 뷰의
//! 실제 클래스로 바꾼다. 분기가 하나면 치환하고, 단순 분기 여러 개면 후보
//! 클래스만 합친다.

use super::context::{ViewTranslator, root_specs_mut, where_mut};
use super::lambda::Substitution;
use super::registry::{prune_unreferenced_paths, rebind, reset_ids};
use super::view_cache::ViewDefinition;
use crate::catalog::Privilege;
use crate::error::{VtxError, VtxResult};
use crate::sql::ast::*;
use crate::types::ClassId;

/// 번역할 경로 스펙과 그 최상위 스펙의 파생 여부
struct PathSite {
    root_derived: bool,
    path: EntitySpec,
}

fn find_virtual_path(
    spec: &EntitySpec,
    is_virtual: &dyn Fn(&ClassId) -> bool,
) -> Option<EntitySpec> {
    for path in &spec.path_entities {
        if path.entities.iter().any(is_virtual) {
            return Some(path.clone());
        }
        if let Some(found) = find_virtual_path(path, is_virtual) {
            return Some(found);
        }
    }
    None
}

/// 클래스 하나, 경로 없음, WHERE 없음, 컬럼이 이름 그대로인 분기
fn is_simple_branch(branch: &Query, def: &ViewDefinition) -> bool {
    let Some(select) = branch.as_select() else {
        return false;
    };
    let [spec] = select.from.as_slice() else {
        return false;
    };
    if spec.is_derived() || !spec.path_entities.is_empty() || !select.where_clause.is_empty() {
        return false;
    }
    let columns: Vec<&Expr> = select.list.iter().filter(|c| !c.hidden).map(|c| &c.expr).collect();
    if columns.len() != def.attributes.len() {
        return false;
    }
    columns.iter().zip(&def.attributes).all(|(expr, attr)| match expr.as_name() {
        Some(n) if attr.is_oid() => n.is_oid() && n.spec_id == Some(spec.id),
        Some(n) => n.spec_id == Some(spec.id) && n.name.eq_ignore_ascii_case(&attr.name),
        None => false,
    })
}

impl ViewTranslator<'_> {
    /// 문장 최상위 스펙 아래의 가상 경로 스펙을 모두 번역
    pub(crate) fn translate_paths(&mut self, stmt: &mut Statement) -> VtxResult<()> {
        while let Some(site) = self.next_virtual_path(stmt) {
            if site.root_derived {
                return Err(VtxError::SqlNotSupported {
                    feature: "path expression through a view below a derived table".into(),
                    hint: "join the view explicitly".into(),
                });
            }
            self.translate_path(stmt, site.path)?;
        }

        let roots: Vec<SpecId> = stmt.specs().iter().map(|s| s.id).collect();
        for root in roots {
            prune_unreferenced_paths(stmt, root);
        }
        Ok(())
    }

    fn next_virtual_path(&self, stmt: &Statement) -> Option<PathSite> {
        let is_virtual = |c: &ClassId| self.is_virtual(c);
        stmt.specs().into_iter().find_map(|root| {
            find_virtual_path(root, &is_virtual).map(|path| PathSite {
                root_derived: root.is_derived(),
                path,
            })
        })
    }

    fn translate_path(&mut self, stmt: &mut Statement, path: EntitySpec) -> VtxResult<()> {
        let (virtuals, reals): (Vec<ClassId>, Vec<ClassId>) =
            path.entities.iter().cloned().partition(|c| self.is_virtual(c));

        let mut defs = Vec::with_capacity(virtuals.len());
        let mut branch_count = 0;
        for class in &virtuals {
            let def = self.get_view(class, Privilege::SELECT)?;
            if def.has_set_operation() {
                return Err(VtxError::SqlNotSupported {
                    feature: format!("path expression through set-operation view '{class}'"),
                    hint: "join the view explicitly".into(),
                });
            }
            branch_count += def.for_select.len();
            defs.push(def);
        }

        if reals.is_empty() && branch_count == 1 {
            let def = &defs[0];
            return self.inline_path_branch(stmt, &path, def, &def.for_select[0]);
        }

        let simple = defs
            .iter()
            .all(|def| def.for_select.iter().all(|b| is_simple_branch(b, def)));
        if !simple {
            return Err(VtxError::SqlNotSupported {
                feature: format!("path expression '{}' through a multi-branch view", path.range_var),
                hint: "join the view explicitly".into(),
            });
        }

        let mut entities: Vec<ClassId> = reals;
        for def in &defs {
            for branch in &def.for_select {
                for class in &branch.leading_select().from[0].entities {
                    if !entities.contains(class) {
                        entities.push(class.clone());
                    }
                }
            }
        }
        let target = self.path_spec_mut(stmt, path.id)?;
        target.entities = entities.into_iter().collect();
        tracing::debug!(path = %path.id, "path spec candidates merged");
        Ok(())
    }

    fn path_spec_mut<'s>(&self, stmt: &'s mut Statement, id: SpecId) -> VtxResult<&'s mut EntitySpec> {
        root_specs_mut(stmt)
            .into_iter()
            .find_map(|root| {
                if root.id == id {
                    Some(root)
                } else {
                    find_spec_mut(&mut root.path_entities, id)
                }
            })
            .ok_or_else(|| VtxError::structural(format!("path spec {id} vanished")))
    }

    /// 분기 하나를 경로 스펙 자리에 치환
    fn inline_path_branch(
        &mut self,
        stmt: &mut Statement,
        path: &EntitySpec,
        def: &ViewDefinition,
        branch: &Query,
    ) -> VtxResult<()> {
        let mut branch = branch.clone();
        reset_ids(&mut branch, &mut self.ids);
        let QueryBody::Select(body) = branch.body else {
            return Err(VtxError::structural("set-operation branch on a path"));
        };
        let mut body = *body;
        let source = match body.from.as_slice() {
            [only] if !only.is_derived() => only.clone(),
            _ => {
                return Err(VtxError::SqlNotSupported {
                    feature: format!("path expression through join view '{}'", def.class),
                    hint: "join the view explicitly".into(),
                });
            }
        };
        rebind(&mut body, source.id, path.id, Some(&path.range_var));

        let replacements: Vec<Expr> = body
            .list
            .iter()
            .filter(|c| !c.hidden)
            .map(|c| c.expr.clone())
            .collect();
        if replacements.len() != def.attributes.len() {
            return Err(VtxError::ArityMismatch {
                view: def.class.to_string(),
                detail: format!(
                    "query spec has {} columns for {} attributes",
                    replacements.len(),
                    def.attributes.len()
                ),
            });
        }
        Substitution::new(path.id, def.attributes.clone(), replacements, &mut self.ids).apply(stmt);

        // 분기 자신의 경로 스펙은 재바인딩된 본문 스펙 밑에 있다
        let branch_paths = body
            .from
            .pop()
            .map(|s| s.path_entities)
            .unwrap_or_default();
        let branch_where = std::mem::take(&mut body.where_clause);

        let target = self.path_spec_mut(stmt, path.id)?;
        target.entities = source.entities.clone();
        let children = std::mem::take(&mut target.path_entities);
        target.path_entities = branch_paths;
        for child in children {
            let parent = child
                .path_join_left()
                .and_then(Expr::as_name)
                .and_then(|n| n.spec_id);
            match parent {
                Some(id) if id == path.id => target.path_entities.push(child),
                Some(id) => match find_spec_mut(&mut target.path_entities, id) {
                    Some(owner) => owner.path_entities.push(child),
                    None => {
                        return Err(VtxError::structural(format!(
                            "path spec '{}' lost its parent in view '{}'",
                            child.range_var, def.class
                        )));
                    }
                },
                None => {
                    return Err(VtxError::structural(format!(
                        "path spec '{}' has no join term",
                        child.range_var
                    )));
                }
            }
        }

        if !branch_where.is_empty() {
            match where_mut(stmt) {
                Some(terms) => terms.extend(branch_where),
                None => {
                    return Err(VtxError::SqlNotSupported {
                        feature: format!("filtered view '{}' on an INSERT path", def.class),
                        hint: "select through the view in a subquery".into(),
                    });
                }
            }
        }
        tracing::debug!(path = %path.id, view = %def.class, "path spec inlined");
        Ok(())
    }
}
