//! Text rendering of expressions, matching the query language surface form.

use std::fmt;

use crate::{Expression, Extractor, MetaKind, Predicate};

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => f.write_str("#type"),
            Self::Field => f.write_str("#field"),
        }
    }
}

impl fmt::Display for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta(kind) => write!(f, "{kind}"),
            Self::Field(name) => f.write_str(name),
            Self::Type(ty) => write!(f, ":{ty}"),
            Self::Column { layout, column, .. } => write!(f, "{layout}[{column}]"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// Wrap combinator children in parentheses where precedence demands it.
fn fmt_child(child: &Expression, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match child {
        Expression::Conjunction(_) | Expression::Disjunction(_) => write!(f, "({child})"),
        _ => write!(f, "{child}"),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conjunction(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" && ")?;
                    }
                    fmt_child(child, f)?;
                }
                Ok(())
            }
            Self::Disjunction(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    fmt_child(child, f)?;
                }
                Ok(())
            }
            Self::Negation(child) => {
                f.write_str("! ")?;
                fmt_child(child, f)
            }
            Self::Predicate(p) => write!(f, "{p}"),
            Self::Nil => f.write_str("<nil>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use telemark_types::{Data, RelOp, Subnet, Type};

    use super::*;

    #[test]
    fn renders_the_query_surface_form() {
        let expr = Expression::conjunction([
            Expression::predicate(
                Extractor::meta_type(),
                RelOp::Equal,
                Data::String("zeek.conn".into()),
            ),
            Expression::predicate(
                Extractor::field("source_ip"),
                RelOp::In,
                Data::Subnet(Subnet::new("10.0.0.0".parse().unwrap(), 8)),
            ),
        ]);
        assert_eq!(
            expr.to_string(),
            "#type == \"zeek.conn\" && source_ip in 10.0.0.0/8"
        );
    }

    #[test]
    fn renders_negation_and_nesting() {
        let inner = Expression::disjunction([
            Expression::predicate(Extractor::field("orig_p"), RelOp::Less, 100_u64),
            Expression::predicate(Extractor::field("orig_p"), RelOp::Greater, 500_u64),
        ]);
        let expr = Expression::negation(inner);
        assert_eq!(
            expr.to_string(),
            "! (orig_p < 100 || orig_p > 500)"
        );
    }

    #[test]
    fn renders_extractors() {
        assert_eq!(Extractor::meta_field().to_string(), "#field");
        assert_eq!(Extractor::Type(Type::address()).to_string(), ":addr");
        assert_eq!(
            Extractor::Column {
                layout: "conn".into(),
                column: 3,
                ty: Type::count(),
            }
            .to_string(),
            "conn[3]"
        );
    }
}
