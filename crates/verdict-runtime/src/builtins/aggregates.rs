use crate::document::{Document, Number};

use super::{Arity, BuiltinError, BuiltinRegistry, BuiltinResult};

pub fn install(registry: &mut BuiltinRegistry) {
    registry.register("count", Arity::Exact(1), count);
    registry.register("sum", Arity::Exact(1), sum);
    registry.register("product", Arity::Exact(1), product);
    registry.register("max", Arity::Exact(1), max);
    registry.register("min", Arity::Exact(1), min);
}

fn count(args: &[Document]) -> BuiltinResult {
    match args.first().and_then(|d| d.len()) {
        Some(n) => Ok(Some(Document::int(n as i64))),
        None => Err(BuiltinError::new(format!(
            "count not defined on {}",
            args.first().map(|d| d.type_name()).unwrap_or("nothing")
        ))),
    }
}

fn members<'a>(args: &'a [Document], fn_name: &str) -> Result<Vec<&'a Document>, BuiltinError> {
    match args.first() {
        Some(Document::Array(items)) => Ok(items.iter().collect()),
        Some(Document::Set(items)) => Ok(items.iter().collect()),
        Some(other) => Err(BuiltinError::new(format!(
            "{} expected array or set, got {}",
            fn_name,
            other.type_name()
        ))),
        None => Err(BuiltinError::new(format!("{} missing argument", fn_name))),
    }
}

fn numeric_fold(
    args: &[Document],
    fn_name: &str,
    init: f64,
    int_init: i64,
    f: impl Fn(f64, f64) -> f64,
    g: impl Fn(i64, i64) -> Option<i64>,
) -> BuiltinResult {
    let items = members(args, fn_name)?;
    let mut int_acc = Some(int_init);
    let mut acc = init;
    for item in &items {
        let n = match item {
            Document::Number(n) => n,
            other => {
                return Err(BuiltinError::new(format!(
                    "{} expected numbers, found {}",
                    fn_name,
                    other.type_name()
                )))
            }
        };
        acc = f(acc, n.as_f64());
        int_acc = match (int_acc, n) {
            (Some(a), Number::Int(b)) => g(a, *b),
            _ => None,
        };
    }
    match int_acc {
        Some(total) => Ok(Some(Document::int(total))),
        None => Ok(Some(Document::float(acc))),
    }
}

fn sum(args: &[Document]) -> BuiltinResult {
    numeric_fold(args, "sum", 0.0, 0, |a, b| a + b, i64::checked_add)
}

fn product(args: &[Document]) -> BuiltinResult {
    numeric_fold(args, "product", 1.0, 1, |a, b| a * b, i64::checked_mul)
}

/// Largest member; undefined on an empty collection.
fn max(args: &[Document]) -> BuiltinResult {
    let items = members(args, "max")?;
    Ok(items.into_iter().max().cloned())
}

/// Smallest member; undefined on an empty collection.
fn min(args: &[Document]) -> BuiltinResult {
    let items = members(args, "min")?;
    Ok(items.into_iter().min().cloned())
}
