use crate::document::{Document, Number};

use super::{expect_int, expect_number, Arity, BuiltinError, BuiltinRegistry, BuiltinResult};

pub fn install(registry: &mut BuiltinRegistry) {
    registry.register("plus", Arity::Exact(2), plus);
    registry.register("minus", Arity::Exact(2), minus);
    registry.register("mul", Arity::Exact(2), mul);
    registry.register("div", Arity::Exact(2), div);
    registry.register("rem", Arity::Exact(2), rem);
    registry.register("neg", Arity::Exact(1), neg);
    registry.register("abs", Arity::Exact(1), abs);
    registry.register("round", Arity::Exact(1), round);
    registry.register("ceil", Arity::Exact(1), ceil);
    registry.register("floor", Arity::Exact(1), floor);
    registry.register("numbers.range", Arity::Exact(2), range);
    registry.register("lt", Arity::Exact(2), lt);
    registry.register("lte", Arity::Exact(2), lte);
    registry.register("gt", Arity::Exact(2), gt);
    registry.register("gte", Arity::Exact(2), gte);
    registry.register("equal", Arity::Exact(2), equal);
    registry.register("neq", Arity::Exact(2), neq);
}

fn checked(op: &str, result: Option<i64>) -> Result<Document, BuiltinError> {
    result
        .map(Document::int)
        .ok_or_else(|| BuiltinError::new(format!("{}: integer overflow", op)))
}

fn plus(args: &[Document]) -> BuiltinResult {
    let (a, b) = (expect_number(args, 0, "plus")?, expect_number(args, 1, "plus")?);
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Ok(Some(checked("plus", x.checked_add(y))?)),
        _ => Ok(Some(Document::float(a.as_f64() + b.as_f64()))),
    }
}

fn minus(args: &[Document]) -> BuiltinResult {
    // Doubles as set difference; see collections::set_difference.
    if let (Some(Document::Set(a)), Some(Document::Set(b))) = (args.first(), args.get(1)) {
        return Ok(Some(Document::Set(a.difference(b).cloned().collect())));
    }
    let (a, b) = (
        expect_number(args, 0, "minus")?,
        expect_number(args, 1, "minus")?,
    );
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Ok(Some(checked("minus", x.checked_sub(y))?)),
        _ => Ok(Some(Document::float(a.as_f64() - b.as_f64()))),
    }
}

fn mul(args: &[Document]) -> BuiltinResult {
    let (a, b) = (expect_number(args, 0, "mul")?, expect_number(args, 1, "mul")?);
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Ok(Some(checked("mul", x.checked_mul(y))?)),
        _ => Ok(Some(Document::float(a.as_f64() * b.as_f64()))),
    }
}

fn div(args: &[Document]) -> BuiltinResult {
    let (a, b) = (expect_number(args, 0, "div")?, expect_number(args, 1, "div")?);
    if b.as_f64() == 0.0 {
        return Err(BuiltinError::new("div: divide by zero"));
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) if x % y == 0 => Ok(Some(Document::int(x / y))),
        _ => Ok(Some(Document::float(a.as_f64() / b.as_f64()))),
    }
}

fn rem(args: &[Document]) -> BuiltinResult {
    let a = expect_int(args, 0, "rem")?;
    let b = expect_int(args, 1, "rem")?;
    if b == 0 {
        return Err(BuiltinError::new("rem: modulo by zero"));
    }
    Ok(Some(Document::int(a % b)))
}

fn neg(args: &[Document]) -> BuiltinResult {
    match expect_number(args, 0, "neg")? {
        Number::Int(n) => Ok(Some(checked("neg", n.checked_neg())?)),
        Number::Float(f) => Ok(Some(Document::float(-f))),
    }
}

fn abs(args: &[Document]) -> BuiltinResult {
    match expect_number(args, 0, "abs")? {
        Number::Int(n) => Ok(Some(checked("abs", n.checked_abs())?)),
        Number::Float(f) => Ok(Some(Document::float(f.abs()))),
    }
}

fn round(args: &[Document]) -> BuiltinResult {
    match expect_number(args, 0, "round")? {
        Number::Int(n) => Ok(Some(Document::int(n))),
        Number::Float(f) => Ok(Some(Document::int(f.round() as i64))),
    }
}

fn ceil(args: &[Document]) -> BuiltinResult {
    match expect_number(args, 0, "ceil")? {
        Number::Int(n) => Ok(Some(Document::int(n))),
        Number::Float(f) => Ok(Some(Document::int(f.ceil() as i64))),
    }
}

fn floor(args: &[Document]) -> BuiltinResult {
    match expect_number(args, 0, "floor")? {
        Number::Int(n) => Ok(Some(Document::int(n))),
        Number::Float(f) => Ok(Some(Document::int(f.floor() as i64))),
    }
}

/// Inclusive integer range, ascending or descending.
fn range(args: &[Document]) -> BuiltinResult {
    let a = expect_int(args, 0, "numbers.range")?;
    let b = expect_int(args, 1, "numbers.range")?;
    let items: Vec<Document> = if a <= b {
        (a..=b).map(Document::int).collect()
    } else {
        (b..=a).rev().map(Document::int).collect()
    };
    Ok(Some(Document::Array(items)))
}

fn pair<'a>(args: &'a [Document], fn_name: &str) -> Result<(&'a Document, &'a Document), BuiltinError> {
    match (args.first(), args.get(1)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(BuiltinError::new(format!("{} expects two arguments", fn_name))),
    }
}

fn lt(args: &[Document]) -> BuiltinResult {
    let (a, b) = pair(args, "lt")?;
    Ok(Some(Document::Bool(a < b)))
}

fn lte(args: &[Document]) -> BuiltinResult {
    let (a, b) = pair(args, "lte")?;
    Ok(Some(Document::Bool(a <= b)))
}

fn gt(args: &[Document]) -> BuiltinResult {
    let (a, b) = pair(args, "gt")?;
    Ok(Some(Document::Bool(a > b)))
}

fn gte(args: &[Document]) -> BuiltinResult {
    let (a, b) = pair(args, "gte")?;
    Ok(Some(Document::Bool(a >= b)))
}

fn equal(args: &[Document]) -> BuiltinResult {
    let (a, b) = pair(args, "equal")?;
    Ok(Some(Document::Bool(a == b)))
}

fn neq(args: &[Document]) -> BuiltinResult {
    let (a, b) = pair(args, "neq")?;
    Ok(Some(Document::Bool(a != b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_ints() {
        assert_eq!(
            plus(&[Document::int(2), Document::int(3)]).unwrap(),
            Some(Document::int(5))
        );
    }

    #[test]
    fn plus_mixed_promotes_to_float() {
        assert_eq!(
            plus(&[Document::int(1), Document::float(0.5)]).unwrap(),
            Some(Document::float(1.5))
        );
    }

    #[test]
    fn plus_rejects_strings() {
        assert!(plus(&[Document::string("a"), Document::int(1)]).is_err());
    }

    #[test]
    fn div_exact_stays_integer() {
        assert_eq!(
            div(&[Document::int(6), Document::int(3)]).unwrap(),
            Some(Document::int(2))
        );
        assert_eq!(
            div(&[Document::int(1), Document::int(2)]).unwrap(),
            Some(Document::float(0.5))
        );
    }

    #[test]
    fn div_by_zero_is_error() {
        assert!(div(&[Document::int(1), Document::int(0)]).is_err());
    }

    #[test]
    fn minus_on_sets_is_difference() {
        let a = Document::Set([Document::int(1), Document::int(2)].into_iter().collect());
        let b = Document::Set([Document::int(2)].into_iter().collect());
        assert_eq!(
            minus(&[a, b]).unwrap(),
            Some(Document::Set([Document::int(1)].into_iter().collect()))
        );
    }

    #[test]
    fn range_descending() {
        assert_eq!(
            range(&[Document::int(2), Document::int(0)]).unwrap(),
            Some(Document::Array(vec![
                Document::int(2),
                Document::int(1),
                Document::int(0)
            ]))
        );
    }

    #[test]
    fn comparisons_return_bool() {
        assert_eq!(
            lt(&[Document::int(1), Document::int(2)]).unwrap(),
            Some(Document::Bool(true))
        );
        assert_eq!(
            gte(&[Document::string("a"), Document::string("b")]).unwrap(),
            Some(Document::Bool(false))
        );
    }

    #[test]
    fn overflow_is_error() {
        assert!(plus(&[Document::int(i64::MAX), Document::int(1)]).is_err());
    }
}
