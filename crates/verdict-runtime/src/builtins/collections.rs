use std::collections::BTreeSet;

use crate::document::Document;

use super::{expect_array, expect_int, Arity, BuiltinError, BuiltinRegistry, BuiltinResult};

pub fn install(registry: &mut BuiltinRegistry) {
    registry.register("array.concat", Arity::Exact(2), array_concat);
    registry.register("array.slice", Arity::Exact(3), array_slice);
    registry.register("array.reverse", Arity::Exact(1), array_reverse);
    registry.register("object.get", Arity::Exact(3), object_get);
    registry.register("object.keys", Arity::Exact(1), object_keys);
    registry.register("object.remove", Arity::Exact(2), object_remove);
    registry.register("intersection", Arity::Exact(2), intersection);
    registry.register("union", Arity::Exact(2), union);
}

fn array_concat(args: &[Document]) -> BuiltinResult {
    let a = expect_array(args, 0, "array.concat")?;
    let b = expect_array(args, 1, "array.concat")?;
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    Ok(Some(Document::Array(out)))
}

/// Half-open slice with clamped bounds, matching the upstream contract:
/// out-of-range indices never fail, they produce a shorter array.
fn array_slice(args: &[Document]) -> BuiltinResult {
    let items = expect_array(args, 0, "array.slice")?;
    let start = expect_int(args, 1, "array.slice")?.max(0) as usize;
    let stop = expect_int(args, 2, "array.slice")?.max(0) as usize;
    let start = start.min(items.len());
    let stop = stop.clamp(start, items.len());
    Ok(Some(Document::Array(items[start..stop].to_vec())))
}

fn array_reverse(args: &[Document]) -> BuiltinResult {
    let items = expect_array(args, 0, "array.reverse")?;
    Ok(Some(Document::Array(items.iter().rev().cloned().collect())))
}

/// Key lookup with a caller-supplied default for the missing case.
fn object_get(args: &[Document]) -> BuiltinResult {
    let obj = match args.first() {
        Some(Document::Object(map)) => map,
        Some(other) => {
            return Err(BuiltinError::new(format!(
                "object.get expected object, got {}",
                other.type_name()
            )))
        }
        None => return Err(BuiltinError::new("object.get missing argument 0")),
    };
    let key = match args.get(1) {
        Some(Document::String(k)) => k,
        Some(_) | None => return Ok(args.get(2).cloned()),
    };
    match obj.get(key) {
        Some(v) => Ok(Some(v.clone())),
        None => Ok(args.get(2).cloned()),
    }
}

fn object_keys(args: &[Document]) -> BuiltinResult {
    match args.first() {
        Some(Document::Object(map)) => {
            let keys: BTreeSet<Document> = map.keys().map(Document::string).collect();
            Ok(Some(Document::Set(keys)))
        }
        Some(other) => Err(BuiltinError::new(format!(
            "object.keys expected object, got {}",
            other.type_name()
        ))),
        None => Err(BuiltinError::new("object.keys missing argument 0")),
    }
}

/// Copy of the object without the given keys (array or set of strings).
fn object_remove(args: &[Document]) -> BuiltinResult {
    let obj = match args.first() {
        Some(Document::Object(map)) => map,
        Some(other) => {
            return Err(BuiltinError::new(format!(
                "object.remove expected object, got {}",
                other.type_name()
            )))
        }
        None => return Err(BuiltinError::new("object.remove missing argument 0")),
    };
    let dropped: Vec<&Document> = match args.get(1) {
        Some(Document::Array(items)) => items.iter().collect(),
        Some(Document::Set(members)) => members.iter().collect(),
        Some(other) => {
            return Err(BuiltinError::new(format!(
                "object.remove expected array or set of keys, got {}",
                other.type_name()
            )))
        }
        None => return Err(BuiltinError::new("object.remove missing argument 1")),
    };
    let mut out = obj.clone();
    for key in dropped {
        if let Document::String(k) = key {
            out.remove(k);
        }
    }
    Ok(Some(Document::Object(out)))
}

fn expect_set<'a>(
    args: &'a [Document],
    idx: usize,
    fn_name: &str,
) -> Result<&'a BTreeSet<Document>, BuiltinError> {
    match args.get(idx) {
        Some(Document::Set(members)) => Ok(members),
        Some(other) => Err(BuiltinError::new(format!(
            "{} expected set at argument {}, got {}",
            fn_name,
            idx,
            other.type_name()
        ))),
        None => Err(BuiltinError::new(format!(
            "{} missing argument {}",
            fn_name, idx
        ))),
    }
}

fn intersection(args: &[Document]) -> BuiltinResult {
    let a = expect_set(args, 0, "intersection")?;
    let b = expect_set(args, 1, "intersection")?;
    Ok(Some(Document::Set(a.intersection(b).cloned().collect())))
}

fn union(args: &[Document]) -> BuiltinResult {
    let a = expect_set(args, 0, "union")?;
    let b = expect_set(args, 1, "union")?;
    Ok(Some(Document::Set(a.union(b).cloned().collect())))
}
