//! Permit and application number generators
//!
//! Permit numbers look like `DENR-IV-A-01082025-01L`: a fixed prefix, the
//! issuance date as `mdY`, a two-digit daily sequence, and a one-letter
//! province suffix. The daily sequence is claimed from a counter row locked
//! `FOR UPDATE` inside the caller's transaction, so two concurrent final
//! approvals on the same day cannot compute the same sequence. Application
//! numbers (`DENR-R4A-2025-0001`) use the same counter discipline with a
//! yearly scope.

use chrono::{Datelike, NaiveDate};
use sqlx::{Postgres, Transaction};

use crate::workflow::error::WorkflowError;

pub const PERMIT_PREFIX: &str = "DENR-IV-A";
pub const APPLICATION_PREFIX: &str = "DENR-R4A";

const PERMIT_SCOPE: &str = "permit";
const APPLICATION_SCOPE: &str = "application";

// =============================================================================
// Pure Formatting & Parsing
// =============================================================================

/// One-letter suffix for a province code. Unrecognized codes fall back to
/// `X` on purpose; out-of-region applicants still get a permit number.
pub fn province_suffix(province_code: Option<&str>) -> char {
    match province_code.map(str::trim) {
        Some("21") => 'C',
        Some("34") => 'L',
        Some("10") => 'B',
        Some("58") => 'R',
        Some("56") => 'Q',
        _ => 'X',
    }
}

/// Date key in `mdY` form, e.g. `01082025` for 2025-01-08.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%m%d%Y").to_string()
}

pub fn format_permit_no(date_key: &str, sequence: i64, suffix: char) -> String {
    format!("{}-{}-{:02}{}", PERMIT_PREFIX, date_key, sequence, suffix)
}

pub fn format_application_no(year: i32, sequence: i64) -> String {
    format!("{}-{}-{:04}", APPLICATION_PREFIX, year, sequence)
}

/// Extract the two-digit sequence from a permit number
/// (`DENR-IV-A-01082025-01L` -> 1). The trailing shape is `-NNX` with a
/// single uppercase suffix letter.
pub fn parse_permit_sequence(permit_no: &str) -> Option<i64> {
    let bytes = permit_no.as_bytes();
    if bytes.len() < 4 {
        return None;
    }
    let suffix = bytes[bytes.len() - 1];
    if !suffix.is_ascii_uppercase() {
        return None;
    }
    let digits = &permit_no[bytes.len() - 3..bytes.len() - 1];
    if bytes[bytes.len() - 4] != b'-' || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Extract the four-digit sequence from an application number
/// (`DENR-R4A-2025-0001` -> 1).
pub fn parse_application_sequence(application_no: &str) -> Option<i64> {
    let (_, tail) = application_no.rsplit_once('-')?;
    if tail.len() != 4 || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// Starting value for a fresh counter row, one past the highest number
/// already issued for the period (or 1 when none exists yet).
fn seed_after(highest: Option<&str>, parse: fn(&str) -> Option<i64>) -> i64 {
    highest.and_then(parse).unwrap_or(0) + 1
}

// =============================================================================
// Sequence Claiming
// =============================================================================

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Claim the next value of a scoped counter, locking its row until the
/// surrounding transaction commits.
///
/// A missing counter row is created at `seed_start`; if a concurrent
/// transaction creates it first, the insert loses on the primary key and we
/// fall back to the locked increment once.
async fn claim_sequence(
    tx: &mut Transaction<'_, Postgres>,
    scope: &str,
    seq_key: &str,
    seed_start: i64,
) -> Result<i64, sqlx::Error> {
    let current: Option<i64> = sqlx::query_scalar(
        "SELECT last_seq FROM number_sequences WHERE scope = $1 AND seq_key = $2 FOR UPDATE",
    )
    .bind(scope)
    .bind(seq_key)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(n) = current {
        return bump_sequence(tx, scope, seq_key, n + 1).await;
    }

    let inserted = sqlx::query(
        "INSERT INTO number_sequences (scope, seq_key, last_seq) VALUES ($1, $2, $3)",
    )
    .bind(scope)
    .bind(seq_key)
    .bind(seed_start)
    .execute(&mut **tx)
    .await;

    match inserted {
        Ok(_) => Ok(seed_start),
        Err(e) if is_unique_violation(&e) => {
            // Lost the first-of-period race; the row exists now.
            let n: i64 = sqlx::query_scalar(
                "SELECT last_seq FROM number_sequences WHERE scope = $1 AND seq_key = $2 FOR UPDATE",
            )
            .bind(scope)
            .bind(seq_key)
            .fetch_one(&mut **tx)
            .await?;
            bump_sequence(tx, scope, seq_key, n + 1).await
        }
        Err(e) => Err(e),
    }
}

async fn bump_sequence(
    tx: &mut Transaction<'_, Postgres>,
    scope: &str,
    seq_key: &str,
    next: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query("UPDATE number_sequences SET last_seq = $3 WHERE scope = $1 AND seq_key = $2")
        .bind(scope)
        .bind(seq_key)
        .bind(next)
        .execute(&mut **tx)
        .await?;
    Ok(next)
}

// =============================================================================
// Generators
// =============================================================================

/// Generate the next permit number for `date`.
///
/// Must be called inside the transaction that also writes the permit number
/// to the application row; the counter lock is held until that commit. The
/// caller takes the application row lock first (fixed lock order).
pub async fn issue_permit_no(
    tx: &mut Transaction<'_, Postgres>,
    date: NaiveDate,
    province_code: Option<&str>,
) -> Result<String, WorkflowError> {
    let key = date_key(date);

    // Seed a fresh counter from permits issued before the counter existed.
    let pattern = format!("{}-{}-%", PERMIT_PREFIX, key);
    let highest: Option<String> = sqlx::query_scalar(
        "SELECT permit_no FROM applications WHERE permit_no LIKE $1 ORDER BY permit_no DESC LIMIT 1",
    )
    .bind(&pattern)
    .fetch_optional(&mut **tx)
    .await?;
    let seed_start = seed_after(highest.as_deref(), parse_permit_sequence);

    let sequence = claim_sequence(tx, PERMIT_SCOPE, &key, seed_start).await?;
    Ok(format_permit_no(&key, sequence, province_suffix(province_code)))
}

/// Generate the next application number for the submission year.
pub async fn next_application_no(
    tx: &mut Transaction<'_, Postgres>,
    date: NaiveDate,
) -> Result<String, WorkflowError> {
    let year = date.year();
    let key = year.to_string();

    let pattern = format!("{}-{}-%", APPLICATION_PREFIX, year);
    let highest: Option<String> = sqlx::query_scalar(
        "SELECT application_no FROM applications WHERE application_no LIKE $1 ORDER BY application_no DESC LIMIT 1",
    )
    .bind(&pattern)
    .fetch_optional(&mut **tx)
    .await?;
    let seed_start = seed_after(highest.as_deref(), parse_application_sequence);

    let sequence = claim_sequence(tx, APPLICATION_SCOPE, &key, seed_start).await?;
    Ok(format_application_no(year, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_province_suffix_known_codes() {
        assert_eq!(province_suffix(Some("21")), 'C');
        assert_eq!(province_suffix(Some("34")), 'L');
        assert_eq!(province_suffix(Some("10")), 'B');
        assert_eq!(province_suffix(Some("58")), 'R');
        assert_eq!(province_suffix(Some("56")), 'Q');
    }

    #[test]
    fn test_province_suffix_fallback() {
        assert_eq!(province_suffix(Some("99")), 'X');
        assert_eq!(province_suffix(Some("")), 'X');
        assert_eq!(province_suffix(None), 'X');
    }

    #[test]
    fn test_province_suffix_trims_whitespace() {
        assert_eq!(province_suffix(Some(" 34 ")), 'L');
    }

    #[test]
    fn test_date_key_format() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        assert_eq!(date_key(d), "01082025");
    }

    #[test]
    fn test_format_permit_no_first_of_day() {
        assert_eq!(format_permit_no("01082025", 1, 'L'), "DENR-IV-A-01082025-01L");
    }

    #[test]
    fn test_format_permit_no_second_of_day() {
        assert_eq!(format_permit_no("01082025", 2, 'L'), "DENR-IV-A-01082025-02L");
    }

    #[test]
    fn test_parse_permit_sequence() {
        assert_eq!(parse_permit_sequence("DENR-IV-A-01082025-01L"), Some(1));
        assert_eq!(parse_permit_sequence("DENR-IV-A-01082025-17B"), Some(17));
        assert_eq!(parse_permit_sequence("DENR-IV-A-01082025-99X"), Some(99));
    }

    #[test]
    fn test_parse_permit_sequence_rejects_malformed() {
        assert_eq!(parse_permit_sequence(""), None);
        assert_eq!(parse_permit_sequence("DENR-IV-A-01082025-1L"), None);
        assert_eq!(parse_permit_sequence("DENR-IV-A-01082025-01"), None);
        assert_eq!(parse_permit_sequence("DENR-IV-A-01082025-ABL"), None);
    }

    #[test]
    fn test_permit_round_trip() {
        let no = format_permit_no("12312025", 42, 'Q');
        assert_eq!(parse_permit_sequence(&no), Some(42));
    }

    #[test]
    fn test_format_application_no() {
        assert_eq!(format_application_no(2025, 1), "DENR-R4A-2025-0001");
        assert_eq!(format_application_no(2025, 123), "DENR-R4A-2025-0123");
    }

    #[test]
    fn test_seed_after_empty_period_starts_at_one() {
        assert_eq!(seed_after(None, parse_permit_sequence), 1);
        assert_eq!(seed_after(None, parse_application_sequence), 1);
    }

    #[test]
    fn test_seed_after_continues_past_highest() {
        assert_eq!(
            seed_after(Some("DENR-IV-A-01082025-01L"), parse_permit_sequence),
            2
        );
        assert_eq!(
            seed_after(Some("DENR-R4A-2025-0017"), parse_application_sequence),
            18
        );
    }

    #[test]
    fn test_seed_after_unparseable_highest_starts_over() {
        assert_eq!(seed_after(Some("garbage"), parse_permit_sequence), 1);
    }

    // Two approvals on the same day must not collide: the second seed
    // formats to a distinct number.
    #[test]
    fn test_same_day_sequence_stays_unique() {
        let first = format_permit_no("01082025", 1, 'L');
        let next = seed_after(Some(&first), parse_permit_sequence);
        let second = format_permit_no("01082025", next, 'L');
        assert_eq!(first, "DENR-IV-A-01082025-01L");
        assert_eq!(second, "DENR-IV-A-01082025-02L");
        assert_ne!(first, second);
    }

    #[test]
    fn test_parse_application_sequence() {
        assert_eq!(parse_application_sequence("DENR-R4A-2025-0001"), Some(1));
        assert_eq!(parse_application_sequence("DENR-R4A-2025-9999"), Some(9999));
        assert_eq!(parse_application_sequence("DENR-R4A-2025-12"), None);
        assert_eq!(parse_application_sequence("garbage"), None);
    }
}
