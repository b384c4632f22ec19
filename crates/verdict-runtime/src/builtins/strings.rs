use crate::document::Document;

use super::{expect_array, expect_string, Arity, BuiltinError, BuiltinRegistry, BuiltinResult};

pub fn install(registry: &mut BuiltinRegistry) {
    registry.register("concat", Arity::Exact(2), concat);
    registry.register("contains", Arity::Exact(2), contains);
    registry.register("startswith", Arity::Exact(2), startswith);
    registry.register("endswith", Arity::Exact(2), endswith);
    registry.register("lower", Arity::Exact(1), lower);
    registry.register("upper", Arity::Exact(1), upper);
    registry.register("trim", Arity::Exact(2), trim);
    registry.register("split", Arity::Exact(2), split);
    registry.register("replace", Arity::Exact(3), replace);
    registry.register("indexof", Arity::Exact(2), indexof);
}

/// Join an array of strings with a delimiter.
fn concat(args: &[Document]) -> BuiltinResult {
    let delim = expect_string(args, 0, "concat")?;
    let items = expect_array(args, 1, "concat")?;
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Document::String(s) => parts.push(s.as_str()),
            other => {
                return Err(BuiltinError::new(format!(
                    "concat expected array of strings, found {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Some(Document::string(parts.join(delim))))
}

fn contains(args: &[Document]) -> BuiltinResult {
    let haystack = expect_string(args, 0, "contains")?;
    let needle = expect_string(args, 1, "contains")?;
    Ok(Some(Document::Bool(haystack.contains(needle))))
}

fn startswith(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "startswith")?;
    let prefix = expect_string(args, 1, "startswith")?;
    Ok(Some(Document::Bool(s.starts_with(prefix))))
}

fn endswith(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "endswith")?;
    let suffix = expect_string(args, 1, "endswith")?;
    Ok(Some(Document::Bool(s.ends_with(suffix))))
}

fn lower(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "lower")?;
    Ok(Some(Document::string(s.to_lowercase())))
}

fn upper(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "upper")?;
    Ok(Some(Document::string(s.to_uppercase())))
}

/// Trim every character in the cutset from both ends.
fn trim(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "trim")?;
    let cutset: Vec<char> = expect_string(args, 1, "trim")?.chars().collect();
    Ok(Some(Document::string(s.trim_matches(|c| cutset.contains(&c)))))
}

fn split(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "split")?;
    let delim = expect_string(args, 1, "split")?;
    let parts: Vec<Document> = s.split(delim).map(Document::string).collect();
    Ok(Some(Document::Array(parts)))
}

fn replace(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "replace")?;
    let old = expect_string(args, 1, "replace")?;
    let new = expect_string(args, 2, "replace")?;
    Ok(Some(Document::string(s.replace(old, new))))
}

/// Character offset of the first occurrence, -1 when absent.
fn indexof(args: &[Document]) -> BuiltinResult {
    let s = expect_string(args, 0, "indexof")?;
    let needle = expect_string(args, 1, "indexof")?;
    match s.find(needle) {
        Some(byte_idx) => Ok(Some(Document::int(s[..byte_idx].chars().count() as i64))),
        None => Ok(Some(Document::int(-1))),
    }
}
