use md5::Md5;
use sha2::{Digest, Sha256};

use crate::document::Document;

use super::{expect_string, Arity, BuiltinRegistry, BuiltinResult};

pub fn install(registry: &mut BuiltinRegistry) {
    registry.register("crypto.md5", Arity::Exact(1), crypto_md5);
    registry.register("crypto.sha256", Arity::Exact(1), crypto_sha256);
    registry.register("uuid.rfc4122", Arity::Exact(1), uuid_rfc4122);
}

fn crypto_md5(args: &[Document]) -> BuiltinResult {
    let input = expect_string(args, 0, "crypto.md5")?;
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    Ok(Some(Document::string(format!("{:x}", hasher.finalize()))))
}

fn crypto_sha256(args: &[Document]) -> BuiltinResult {
    let input = expect_string(args, 0, "crypto.sha256")?;
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Ok(Some(Document::string(format!("{:x}", hasher.finalize()))))
}

/// Fresh v4 UUID per call. Nondeterministic: plans using it trade away
/// repeatable evaluation, as with the upstream contract. The key
/// argument only labels the call site.
fn uuid_rfc4122(args: &[Document]) -> BuiltinResult {
    expect_string(args, 0, "uuid.rfc4122")?;
    Ok(Some(Document::string(uuid::Uuid::new_v4().to_string())))
}
