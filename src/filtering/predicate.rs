//! Store-independent boolean predicate tree and its lowering to sea-orm.

use sea_orm::{
    Condition, DbBackend, Value,
    sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr},
};
use std::fmt;

use super::params::FilterValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOp {
    Exact,
    /// Case-insensitive equality
    IExact,
    /// Case-insensitive substring test
    Contains,
    StartsWith,
    EndsWith,
    /// Membership in a list value
    In,
    /// `true` tests IS NULL, `false` IS NOT NULL
    IsNull,
}

/// `(column, operator, value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub column: String,
    /// Key of a JSON object stored in `column`; the leaf then tests the text
    /// under that key instead of the whole column
    pub json_key: Option<String>,
    pub op: LeafOp,
    pub value: FilterValue,
}

/// Boolean predicate tree. `True` is the empty filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    #[default]
    True,
    Leaf(Leaf),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn leaf(column: impl Into<String>, op: LeafOp, value: impl Into<FilterValue>) -> Self {
        Self::Leaf(Leaf {
            column: column.into(),
            json_key: None,
            op,
            value: value.into(),
        })
    }

    /// Leaf over the text stored under `key` of the JSON object in `column`.
    pub fn json_leaf(
        column: impl Into<String>,
        key: impl Into<String>,
        op: LeafOp,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self::Leaf(Leaf {
            column: column.into(),
            json_key: Some(key.into()),
            op,
            value: value.into(),
        })
    }

    pub fn exact(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(column, LeafOp::Exact, value)
    }

    pub fn iexact(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(column, LeafOp::IExact, value)
    }

    pub fn contains(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::leaf(column, LeafOp::Contains, value)
    }

    pub fn is_in(column: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::leaf(column, LeafOp::In, FilterValue::List(values))
    }

    pub fn is_null(column: impl Into<String>, is_null: bool) -> Self {
        Self::leaf(column, LeafOp::IsNull, is_null)
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Conjunction, flattening nested `And`s and dropping `True`.
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Self::True, p) | (p, Self::True) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, Self::And(mut right)) => {
                right.insert(0, p);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested `Or`s. `True` absorbs.
    #[must_use]
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), p) => {
                left.push(p);
                Self::Or(left)
            }
            (p, Self::Or(mut right)) => {
                right.insert(0, p);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
        parts.into_iter().fold(Self::True, Self::and)
    }

    /// Disjunction of `parts`; an empty iterator matches nothing.
    pub fn any(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut parts = parts.into_iter();
        match parts.next() {
            Some(first) => parts.fold(first, Self::or),
            None => Self::Or(Vec::new()),
        }
    }

    #[must_use]
    pub fn negate(self) -> Predicate {
        match self {
            Self::Not(inner) => *inner,
            p => Self::Not(Box::new(p)),
        }
    }

    /// Every leaf, depth first.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Self::True => {}
            Self::Leaf(leaf) => out.push(leaf),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.collect_leaves(out);
                }
            }
            Self::Not(inner) => inner.collect_leaves(out),
        }
    }

    /// Lower to a sea-orm condition for `backend`.
    #[must_use]
    pub fn to_condition(&self, backend: DbBackend) -> Condition {
        match self {
            Self::True => Condition::all(),
            Self::Leaf(leaf) => Condition::all().add(leaf.to_expr(backend)),
            Self::And(parts) => parts.iter().fold(Condition::all(), |cond, part| {
                cond.add(part.to_condition(backend))
            }),
            Self::Or(parts) if parts.is_empty() => Condition::all().add(Expr::cust("1 = 0")),
            Self::Or(parts) => parts.iter().fold(Condition::any(), |cond, part| {
                cond.add(part.to_condition(backend))
            }),
            Self::Not(inner) => inner.to_condition(backend).not(),
        }
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn to_sea_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null | FilterValue::List(_) => Value::String(None),
        FilterValue::Bool(flag) => (*flag).into(),
        FilterValue::Int(number) => (*number).into(),
        FilterValue::Text(text) => text.clone().into(),
    }
}

/// Text stored under `key` of the JSON object in `column`; NULL when absent.
fn json_text(backend: DbBackend, column: SimpleExpr, key: &str) -> SimpleExpr {
    let path = SimpleExpr::Value(format!("$.\"{key}\"").into());
    match backend {
        DbBackend::Postgres => Expr::cust_with_exprs(
            "(CAST($1 AS jsonb) ->> $2)",
            [column, SimpleExpr::Value(key.into())],
        ),
        DbBackend::MySql => {
            Expr::cust_with_exprs("JSON_UNQUOTE(JSON_EXTRACT($1, $2))", [column, path])
        }
        DbBackend::Sqlite => SimpleExpr::FunctionCall(
            Func::cust(Alias::new("json_extract")).arg(column).arg(path),
        ),
    }
}

impl Leaf {
    /// The column, or the JSON text this leaf reads.
    fn target(&self, backend: DbBackend) -> Expr {
        let column = Expr::col(Alias::new(self.column.as_str()));
        match &self.json_key {
            Some(key) => Expr::expr(json_text(backend, column.into(), key)),
            None => column,
        }
    }

    fn upper_target(&self, backend: DbBackend) -> SimpleExpr {
        SimpleExpr::FunctionCall(Func::upper(self.target(backend)))
    }

    fn like(&self, backend: DbBackend, prefix: &str, suffix: &str) -> SimpleExpr {
        let escaped = escape_like_wildcards(&self.value.to_string()).to_uppercase();
        let pattern = format!("{prefix}{escaped}{suffix}");
        self.upper_target(backend)
            .like(LikeExpr::new(pattern).escape('\\'))
    }

    /// Build the sea-query expression for this leaf.
    #[must_use]
    pub fn to_expr(&self, backend: DbBackend) -> SimpleExpr {
        let column = self.target(backend);
        match self.op {
            LeafOp::Exact => match &self.value {
                FilterValue::Null => column.is_null(),
                FilterValue::List(values) => column.is_in(values.iter().map(to_sea_value)),
                value => column.eq(to_sea_value(value)),
            },
            LeafOp::IExact => self
                .upper_target(backend)
                .eq(self.value.to_string().to_uppercase()),
            LeafOp::Contains => self.like(backend, "%", "%"),
            LeafOp::StartsWith => self.like(backend, "", "%"),
            LeafOp::EndsWith => self.like(backend, "%", ""),
            LeafOp::In => column.is_in(
                self.value
                    .to_list()
                    .iter()
                    .filter(|value| !value.is_empty())
                    .map(to_sea_value),
            ),
            LeafOp::IsNull => {
                if self.value.as_bool().unwrap_or(true) {
                    column.is_null()
                } else {
                    column.is_not_null()
                }
            }
        }
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, value: &FilterValue) -> fmt::Result {
    match value {
        FilterValue::Null => f.write_str("NULL"),
        FilterValue::Text(text) => write!(f, "{text:?}"),
        FilterValue::List(values) => {
            f.write_str("(")?;
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_value(f, value)?;
            }
            f.write_str(")")
        }
        scalar => write!(f, "{scalar}"),
    }
}

struct JsonKey<'a>(&'a Leaf);

impl fmt::Display for JsonKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.json_key {
            Some(key) => write!(f, "[{key:?}]"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            LeafOp::IsNull => {
                let keyword = if self.value.as_bool().unwrap_or(true) {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                return write!(f, "{}{} {keyword}", self.column, JsonKey(self));
            }
            LeafOp::Exact => "=",
            LeafOp::IExact => "IEXACT",
            LeafOp::Contains => "CONTAINS",
            LeafOp::StartsWith => "STARTSWITH",
            LeafOp::EndsWith => "ENDSWITH",
            LeafOp::In => "IN",
        };
        write!(f, "{}{} {op} ", self.column, JsonKey(self))?;
        fmt_value(f, &self.value)
    }
}

/// Human-readable form, used in logs and assertions.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_joined(
            f: &mut fmt::Formatter<'_>,
            parts: &[Predicate],
            separator: &str,
        ) -> fmt::Result {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(separator)?;
                }
                match part {
                    Predicate::And(_) | Predicate::Or(_) => write!(f, "({part})")?,
                    _ => write!(f, "{part}")?,
                }
            }
            Ok(())
        }

        match self {
            Self::True => f.write_str("TRUE"),
            Self::Leaf(leaf) => write!(f, "{leaf}"),
            Self::And(parts) => write_joined(f, parts, " AND "),
            Self::Or(parts) if parts.is_empty() => f.write_str("FALSE"),
            Self::Or(parts) => write_joined(f, parts, " OR "),
            Self::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}
