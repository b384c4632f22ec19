use crate::document::Document;

use super::{Arity, BuiltinError, BuiltinRegistry, BuiltinResult};

pub fn install(registry: &mut BuiltinRegistry) {
    registry.register("to_number", Arity::Exact(1), to_number);
    registry.register("is_number", Arity::Exact(1), is_number);
    registry.register("is_string", Arity::Exact(1), is_string);
    registry.register("is_boolean", Arity::Exact(1), is_boolean);
    registry.register("is_array", Arity::Exact(1), is_array);
    registry.register("is_object", Arity::Exact(1), is_object);
    registry.register("is_set", Arity::Exact(1), is_set);
    registry.register("is_null", Arity::Exact(1), is_null);
}

/// Numeric coercion: null → 0, booleans → 0/1, numbers pass through,
/// strings must hold a valid number literal.
fn to_number(args: &[Document]) -> BuiltinResult {
    match args.first() {
        Some(Document::Null) => Ok(Some(Document::int(0))),
        Some(Document::Bool(b)) => Ok(Some(Document::int(i64::from(*b)))),
        Some(Document::Number(n)) => Ok(Some(Document::Number(*n))),
        Some(Document::String(s)) => {
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Some(Document::int(i)));
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Some(Document::float(f))),
                _ => Err(BuiltinError::new(format!(
                    "to_number: \"{}\" is not a number",
                    s
                ))),
            }
        }
        Some(other) => Err(BuiltinError::new(format!(
            "to_number not defined on {}",
            other.type_name()
        ))),
        None => Err(BuiltinError::new("to_number missing argument 0")),
    }
}

// The guard family signals a failed check as undefined rather than an
// error, so a guard never aborts a strict-mode evaluation.

fn guard(holds: bool) -> BuiltinResult {
    if holds {
        Ok(Some(Document::Bool(true)))
    } else {
        Ok(None)
    }
}

fn is_number(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::Number(_))))
}

fn is_string(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::String(_))))
}

fn is_boolean(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::Bool(_))))
}

fn is_array(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::Array(_))))
}

fn is_object(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::Object(_))))
}

fn is_set(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::Set(_))))
}

fn is_null(args: &[Document]) -> BuiltinResult {
    guard(matches!(args.first(), Some(Document::Null)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_number_parses_ints_and_floats() {
        assert_eq!(
            to_number(&[Document::string("42")]).unwrap(),
            Some(Document::int(42))
        );
        assert_eq!(
            to_number(&[Document::string("2.5")]).unwrap(),
            Some(Document::float(2.5))
        );
    }

    #[test]
    fn to_number_coerces_null_and_bool() {
        assert_eq!(to_number(&[Document::Null]).unwrap(), Some(Document::int(0)));
        assert_eq!(
            to_number(&[Document::Bool(true)]).unwrap(),
            Some(Document::int(1))
        );
    }

    #[test]
    fn to_number_rejects_non_numeric_string() {
        assert!(to_number(&[Document::string("not a number")]).is_err());
    }

    #[test]
    fn guards_are_undefined_not_errors() {
        assert_eq!(is_number(&[Document::string("x")]).unwrap(), None);
        assert_eq!(
            is_number(&[Document::int(1)]).unwrap(),
            Some(Document::Bool(true))
        );
    }
}
