//! Digest-verified audit artifacts for outcomes and batch reports.
//!
//! Layout:
//! - `<dir>/units/<encoded unit_id>/outcome.json` + `outcome.digest`
//! - `<dir>/batches/<batch_id>/batch_report.json` + `batch_report.digest`
//!
//! Unit ids are percent-encoded into directory names, so distinct ids never
//! share a directory. Digests are SHA-256 hex over the exact JSON bytes
//! written.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::batch::BatchReport;
use crate::domain::{GcrError, Outcome, Result};

const UNITS_DIR: &str = "units";
const BATCHES_DIR: &str = "batches";
const OUTCOME_FILE: &str = "outcome";
const BATCH_FILE: &str = "batch_report";

/// SHA-256 hex digest of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Directory name for a unit id.
///
/// ASCII alphanumerics, `-`, `_` and non-leading `.` are kept; every other
/// byte becomes `%XX`. The empty id maps to `%`, which no other id produces.
fn unit_dir_name(unit_id: &str) -> String {
    if unit_id.is_empty() {
        return "%".to_string();
    }
    let mut name = String::with_capacity(unit_id.len());
    for (i, b) in unit_id.bytes().enumerate() {
        let keep = b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (b == b'.' && i > 0);
        if keep {
            name.push(char::from(b));
        } else {
            name.push_str(&format!("%{b:02X}"));
        }
    }
    name
}

fn unit_dir(dir: &Path, unit_id: &str) -> PathBuf {
    dir.join(UNITS_DIR).join(unit_dir_name(unit_id))
}

fn write_with_digest<T: Serialize>(value: &T, dir: &Path, stem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("{stem}.json"));
    let digest_path = dir.join(format!("{stem}.digest"));
    let json = serde_json::to_vec_pretty(value)?;

    std::fs::write(&path, &json)?;
    std::fs::write(&digest_path, content_digest(&json).as_bytes())?;
    Ok(path)
}

fn read_with_digest<T: DeserializeOwned>(dir: &Path, stem: &str) -> Result<T> {
    let json = std::fs::read(dir.join(format!("{stem}.json")))?;
    let expected = std::fs::read_to_string(dir.join(format!("{stem}.digest")))?;
    let actual = content_digest(&json);
    if expected.trim() != actual {
        return Err(GcrError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}

/// Persist `<dir>/units/<unit_id>/outcome.json` and its digest.
pub fn write_outcome_artifact(outcome: &Outcome, dir: &Path) -> Result<PathBuf> {
    write_with_digest(outcome, &unit_dir(dir, &outcome.unit_id), OUTCOME_FILE)
}

/// Read and verify the outcome written for `unit_id`.
pub fn read_outcome_artifact(unit_id: &str, dir: &Path) -> Result<Outcome> {
    let outcome: Outcome = read_with_digest(&unit_dir(dir, unit_id), OUTCOME_FILE)?;
    if outcome.unit_id != unit_id {
        return Err(GcrError::UnitMismatch {
            expected: unit_id.to_string(),
            actual: outcome.unit_id,
        });
    }
    Ok(outcome)
}

/// Persist `<dir>/batches/<batch_id>/batch_report.json` and its digest.
pub fn write_batch_report(report: &BatchReport, dir: &Path) -> Result<PathBuf> {
    write_with_digest(
        report,
        &dir.join(BATCHES_DIR).join(report.batch_id.to_string()),
        BATCH_FILE,
    )
}

/// Read and verify a batch report written by [`write_batch_report`].
pub fn read_batch_report(batch_id: Uuid, dir: &Path) -> Result<BatchReport> {
    read_with_digest(
        &dir.join(BATCHES_DIR).join(batch_id.to_string()),
        BATCH_FILE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_unit_dir_name_is_path_safe() {
        assert_eq!(unit_dir_name("lesson/3:card 2"), "lesson%2F3%3Acard%202");
        assert_eq!(unit_dir_name(".."), "%2E.");
        assert_eq!(unit_dir_name("."), "%2E");
        assert_eq!(unit_dir_name("card-1.v2"), "card-1.v2");
        assert_eq!(unit_dir_name("é"), "%C3%A9");
    }

    #[test]
    fn test_unit_dir_name_is_injective() {
        let ids = ["a/b", "a:b", "a b", "a_b", "a%2Fb", "", "%", ".a", "%2Ea"];
        let names: std::collections::HashSet<String> =
            ids.iter().map(|id| unit_dir_name(id)).collect();
        assert_eq!(names.len(), ids.len());
    }
}
