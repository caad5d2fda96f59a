//! AST → SQL 텍스트
//!
//! 번역 결과를 사람이 읽을 수 있는 SQL로 출력한다. 경로 스펙은
//! `emp e {dept d}` 형태로 루트 스펙 뒤에 중괄호로 표기한다.

use super::*;
use std::fmt::{self, Display, Formatter, Write};

fn join<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn conjuncts(f: &mut Formatter<'_>, keyword: &str, terms: &[Expr]) -> fmt::Result {
    if terms.is_empty() {
        return Ok(());
    }
    write!(f, " {keyword} ")?;
    join(f, terms, " AND ")
}

impl Display for NameRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.meta {
            NameMeta::Parameter => f.write_str("?"),
            NameMeta::Oid => match &self.resolved {
                Some(rv) if !rv.is_empty() => f.write_str(rv),
                _ => f.write_str("oid"),
            },
            _ => match &self.resolved {
                Some(rv) if !rv.is_empty() => write!(f, "{}.{}", rv, self.name),
                _ => f.write_str(&self.name),
            },
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Concat => "||",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Like => "LIKE",
        })
    }
}

impl Display for PseudoColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PseudoColumn::Rownum => "ROWNUM",
            PseudoColumn::InstNum => "INST_NUM()",
            PseudoColumn::OrderbyNum => "ORDERBY_NUM()",
            PseudoColumn::GroupbyNum => "GROUPBY_NUM()",
        })
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(n) => write!(f, "{n}"),
            Expr::Value(v) => write!(f, "{v}"),
            Expr::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Not => write!(f, "NOT {expr}"),
                UnaryOp::Minus => write!(f, "-{expr}"),
                UnaryOp::IsNull => write!(f, "{expr} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{expr} IS NOT NULL"),
            },
            Expr::Function(func) => {
                write!(f, "{}(", func.name)?;
                if func.star {
                    f.write_char('*')?;
                } else {
                    if func.distinct {
                        f.write_str("DISTINCT ")?;
                    }
                    join(f, &func.args, ", ")?;
                }
                f.write_char(')')?;
                if let Some(window) = &func.over {
                    f.write_str(" OVER (")?;
                    let mut sep = "";
                    if !window.partition_by.is_empty() {
                        f.write_str("PARTITION BY ")?;
                        join(f, &window.partition_by, ", ")?;
                        sep = " ";
                    }
                    if !window.order_by.is_empty() {
                        write!(f, "{sep}ORDER BY ")?;
                        join(f, &window.order_by, ", ")?;
                    }
                    f.write_char(')')?;
                }
                Ok(())
            }
            Expr::Method(m) => {
                write!(f, "{}(", m.name.name)?;
                let mut first = true;
                if let Some(target) = &m.target {
                    write!(f, "{target}")?;
                    first = false;
                }
                for arg in &m.args {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                    first = false;
                }
                f.write_char(')')
            }
            Expr::Dot { left, right } => write!(f, "{left}.{}", right.name),
            Expr::Subquery(q) => write!(f, "({q})"),
            Expr::Exists(q) => write!(f, "EXISTS ({q})"),
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}IN ({query})")
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}IN (")?;
                join(f, list, ", ")?;
                f.write_char(')')
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}BETWEEN {low} AND {high}")
            }
            Expr::Nested(inner) => write!(f, "({inner})"),
            Expr::Pseudo(p) => write!(f, "{p}"),
            Expr::Assign { variable, value } => write!(f, "@{variable} := {value}"),
            Expr::Variable(v) => write!(f, "@{v}"),
            Expr::Sequence(items) => {
                f.write_char('{')?;
                join(f, items, ", ")?;
                f.write_char('}')
            }
            Expr::Star(None) => f.write_char('*'),
            Expr::Star(Some(q)) => write!(f, "{q}.*"),
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.key {
            SortKey::Position(pos) => write!(f, "{pos}")?,
            SortKey::Expr(e) => write!(f, "{e}")?,
        }
        if !self.asc {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

impl Display for Hints {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str("/*+")?;
        let groups = [
            (HintFlags::ORDERED, "ORDERED", &self.ordered),
            (HintFlags::USE_NL, "USE_NL", &self.use_nl),
            (HintFlags::USE_IDX, "USE_IDX", &self.use_idx),
            (HintFlags::USE_MERGE, "USE_MERGE", &self.use_merge),
        ];
        for (flag, keyword, names) in groups {
            if !self.flags.contains(flag) {
                continue;
            }
            write!(f, " {keyword}")?;
            if !names.is_empty() {
                f.write_char('(')?;
                for (i, n) in names.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(n.resolved.as_deref().unwrap_or(&n.name))?;
                }
                f.write_char(')')?;
            }
        }
        f.write_str(" */")
    }
}

fn index_names(f: &mut Formatter<'_>, names: &[NameRef]) -> fmt::Result {
    if names.is_empty() {
        return Ok(());
    }
    f.write_str(" USING INDEX ")?;
    for (i, n) in names.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match &n.resolved {
            Some(rv) if !rv.is_empty() => write!(f, "{rv}.{}", n.name)?,
            _ => f.write_str(&n.name)?,
        }
    }
    Ok(())
}

impl Display for EntitySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(q) = &self.derived {
            write!(f, "({q}) {}", self.range_var)?;
            if !self.as_attr_list.is_empty() {
                f.write_str(" (")?;
                for (i, n) in self.as_attr_list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(if n.is_oid() { "oid" } else { n.name.as_str() })?;
                }
                f.write_char(')')?;
            }
        } else {
            match self.entities.as_slice() {
                [single] => {
                    write!(f, "{single}")?;
                    if !self.range_var.is_empty() && self.range_var != single.as_str() {
                        write!(f, " {}", self.range_var)?;
                    }
                }
                many => {
                    f.write_char('(')?;
                    join(f, many, ", ")?;
                    write!(f, ") {}", self.range_var)?;
                }
            }
        }
        for path in &self.path_entities {
            write!(f, " {{{path}}}")?;
        }
        Ok(())
    }
}

fn spec_list(f: &mut Formatter<'_>, specs: &[EntitySpec]) -> fmt::Result {
    for (i, spec) in specs.iter().enumerate() {
        if i == 0 {
            write!(f, "{spec}")?;
            continue;
        }
        match spec.join_type {
            JoinType::None => write!(f, ", {spec}")?,
            JoinType::Inner => write!(f, " INNER JOIN {spec}")?,
            JoinType::LeftOuter => write!(f, " LEFT OUTER JOIN {spec}")?,
            JoinType::RightOuter => write!(f, " RIGHT OUTER JOIN {spec}")?,
        }
        if spec.join_type != JoinType::None && !spec.on_cond.is_empty() {
            f.write_str(" ON ")?;
            join(f, &spec.on_cond, " AND ")?;
        }
    }
    Ok(())
}

struct SelectWithDistinct<'a>(&'a Select, bool);

impl Display for SelectWithDistinct<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let SelectWithDistinct(s, distinct) = *self;
        f.write_str("SELECT ")?;
        if !s.hints.is_empty() {
            write!(f, "{} ", s.hints)?;
        }
        if distinct {
            f.write_str("DISTINCT ")?;
        }
        join(f, &s.list, ", ")?;
        if !s.from.is_empty() {
            f.write_str(" FROM ")?;
            spec_list(f, &s.from)?;
        }
        conjuncts(f, "WHERE", &s.where_clause)?;
        conjuncts(f, "START WITH", &s.start_with)?;
        conjuncts(f, "CONNECT BY", &s.connect_by)?;
        if !s.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            join(f, &s.group_by, ", ")?;
        }
        conjuncts(f, "HAVING", &s.having)?;
        index_names(f, &s.using_index)
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SelectWithDistinct(self, false))
    }
}

fn set_arm(f: &mut Formatter<'_>, arm: &Query) -> fmt::Result {
    let bare = arm.is_select() && arm.order_by.is_empty() && arm.limit.is_none();
    if bare {
        write!(f, "{arm}")
    } else {
        write!(f, "({arm})")
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.body {
            QueryBody::Select(s) => write!(f, "{}", SelectWithDistinct(s, self.distinct))?,
            QueryBody::SetOp { op, left, right } => {
                set_arm(f, left)?;
                let keyword = match op {
                    SetOperator::Union => "UNION",
                    SetOperator::Difference => "EXCEPT",
                    SetOperator::Intersection => "INTERSECT",
                };
                let all = if self.distinct { "" } else { " ALL" };
                write!(f, " {keyword}{all} ")?;
                set_arm(f, right)?;
            }
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            join(f, &self.order_by, ", ")?;
        }
        if let Some(e) = &self.orderby_for {
            write!(f, " FOR {e}")?;
        }
        if let Some(e) = &self.limit {
            write!(f, " LIMIT {e}")?;
        }
        Ok(())
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.value)
    }
}

fn check_options(f: &mut Formatter<'_>, checks: &[CheckOption]) -> fmt::Result {
    for check in checks.iter().filter(|c| !c.predicate.is_empty()) {
        f.write_str(" WITH CHECK (")?;
        join(f, &check.predicate, " AND ")?;
        f.write_char(')')?;
    }
    Ok(())
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Query(q) => write!(f, "{q}"),
            Statement::Update(u) => {
                f.write_str("UPDATE ")?;
                if !u.hints.is_empty() {
                    write!(f, "{} ", u.hints)?;
                }
                spec_list(f, &u.specs)?;
                f.write_str(" SET ")?;
                join(f, &u.assignments, ", ")?;
                conjuncts(f, "WHERE", &u.where_clause)?;
                index_names(f, &u.using_index)?;
                check_options(f, &u.check_where)
            }
            Statement::Insert(i) => {
                let verb = if i.is_replace { "REPLACE" } else { "INSERT" };
                write!(f, "{verb} INTO {}", i.spec)?;
                if !i.columns.is_empty() {
                    f.write_str(" (")?;
                    for (n, col) in i.columns.iter().enumerate() {
                        if n > 0 {
                            f.write_str(", ")?;
                        }
                        f.write_str(&col.name)?;
                    }
                    f.write_char(')')?;
                }
                match &i.source {
                    InsertSource::Values(rows) => {
                        f.write_str(" VALUES ")?;
                        for (n, row) in rows.iter().enumerate() {
                            if n > 0 {
                                f.write_str(", ")?;
                            }
                            f.write_char('(')?;
                            join(f, row, ", ")?;
                            f.write_char(')')?;
                        }
                    }
                    InsertSource::DefaultValues => f.write_str(" DEFAULT VALUES")?,
                    InsertSource::Query(q) => write!(f, " {q}")?,
                }
                if !i.on_duplicate.is_empty() {
                    f.write_str(" ON DUPLICATE KEY UPDATE ")?;
                    join(f, &i.on_duplicate, ", ")?;
                }
                if !i.check_where.is_empty() {
                    f.write_str(" WITH CHECK (")?;
                    join(f, &i.check_where, " AND ")?;
                    f.write_char(')')?;
                }
                Ok(())
            }
            Statement::Delete(d) => {
                f.write_str("DELETE ")?;
                if !d.hints.is_empty() {
                    write!(f, "{} ", d.hints)?;
                }
                f.write_str("FROM ")?;
                spec_list(f, &d.specs)?;
                conjuncts(f, "WHERE", &d.where_clause)?;
                index_names(f, &d.using_index)
            }
            Statement::Merge(m) => {
                write!(f, "MERGE INTO {} USING {} ON (", m.target, m.source)?;
                join(f, &m.on, " AND ")?;
                f.write_char(')')?;
                if let Some(up) = &m.update {
                    if up.assignments.is_empty() && up.delete {
                        f.write_str(" WHEN MATCHED THEN DELETE")?;
                        conjuncts(f, "WHERE", &up.where_clause)?;
                    } else {
                        f.write_str(" WHEN MATCHED THEN UPDATE SET ")?;
                        join(f, &up.assignments, ", ")?;
                        conjuncts(f, "WHERE", &up.where_clause)?;
                        if up.delete {
                            f.write_str(" DELETE")?;
                        }
                    }
                }
                if let Some(ins) = &m.insert {
                    f.write_str(" WHEN NOT MATCHED THEN INSERT (")?;
                    for (n, col) in ins.columns.iter().enumerate() {
                        if n > 0 {
                            f.write_str(", ")?;
                        }
                        f.write_str(&col.name)?;
                    }
                    f.write_str(") VALUES (")?;
                    join(f, &ins.values, ", ")?;
                    f.write_char(')')?;
                    conjuncts(f, "WHERE", &ins.where_clause)?;
                }
                check_options(f, &m.check_where)
            }
        }
    }
}
