//! Campaign normalization pipeline: date-field extraction, record
//! flattening, payload-shape resolution, and recency ordering.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use cins_core::{defaults, format_instant, CanonicalCampaign, JobDetails, Skill};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

pub const CRATE_NAME: &str = "cins-normalize";

/// Creation-timestamp candidate fields, probed in priority order. The
/// upstream system has changed its serialization several times; every name
/// here has been observed in the wild.
pub const CREATED_FIELDS: &[&str] = &[
    "created",
    "created_at",
    "createdAt",
    "date_created",
    "dateCreated",
    "timestamp",
    "date",
    "time",
];

/// Update-timestamp candidates; falls back to the creation timestamp when
/// none normalizes.
pub const UPDATED_FIELDS: &[&str] = &[
    "updated",
    "updated_at",
    "updatedAt",
    "date_updated",
    "dateUpdated",
    "modified",
];

/// Identifier candidates; a positional `campaign-<index>` placeholder is
/// used when none is present.
pub const ID_FIELDS: &[&str] = &["id", "campaign_id", "_id", "uuid"];

/// Wrapper keys probed when the upstream payload is an object rather than
/// a bare array.
pub const WRAPPER_KEYS: &[&str] = &["campaigns", "data", "results"];

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
}

// ── Date field extraction ───────────────────────────────────────────────

/// The shapes a date-bearing value has been observed to take. Classified
/// once, then dispatched, so each normalizer stays independently testable.
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue<'a> {
    /// ISO-8601-ish text, possibly malformed.
    Text(&'a str),
    /// Nested date/time parts with name-mangled ("dunder") field names.
    DunderObject(&'a Map<String, Value>),
    /// Flat year/month/day fields; dunder names accepted as aliases.
    PlainObject(&'a Map<String, Value>),
    /// Unix-epoch-like numeric timestamp, milliseconds.
    EpochMillis(i64),
    Unsupported,
}

impl<'a> DateValue<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => DateValue::Text(s.as_str()),
            Value::Object(map) if map.contains_key("_DateTime__date") => {
                DateValue::DunderObject(map)
            }
            Value::Object(map)
                if map.contains_key("year") || map.contains_key("_Date__year") =>
            {
                DateValue::PlainObject(map)
            }
            Value::Number(n) => match n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)) {
                Some(millis) => DateValue::EpochMillis(millis),
                None => DateValue::Unsupported,
            },
            _ => DateValue::Unsupported,
        }
    }
}

/// Normalize one date-bearing value into an instant, or `None` if the value
/// is unparsable in every known encoding.
pub fn normalize_date_value(value: &Value) -> Option<DateTime<Utc>> {
    match DateValue::classify(value) {
        DateValue::Text(text) => normalize_text(text),
        DateValue::DunderObject(map) => normalize_dunder_object(map),
        DateValue::PlainObject(map) => normalize_plain_object(map),
        DateValue::EpochMillis(millis) => Utc.timestamp_millis_opt(millis).single(),
        DateValue::Unsupported => None,
    }
}

/// Probe `candidates` in order and return the first value that normalizes.
/// `None` is a valid terminal state, not an error.
pub fn extract_timestamp(record: &Value, candidates: &[&str]) -> Option<DateTime<Utc>> {
    let map = record.as_object()?;
    for field in candidates {
        let Some(value) = map.get(*field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(instant) = normalize_date_value(value) {
            return Some(instant);
        }
    }
    None
}

fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Direct parse first, then syntactic repairs in sequence, re-attempting
/// the parse after each. First valid instant wins; the repairs compound on
/// the working copy.
fn normalize_text(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(instant) = parse_instant(trimmed) {
        return Some(instant);
    }

    // Repair 1: date/time separator substitution ("2024-01-15 10:30:00").
    let mut repaired = trimmed.replacen(' ', "T", 1);
    if let Some(instant) = parse_instant(&repaired) {
        return Some(instant);
    }

    // Repair 2: strip a trailing zone marker and parse naive-as-UTC.
    if let Some(stripped) = repaired
        .strip_suffix('Z')
        .or_else(|| repaired.strip_suffix('z'))
    {
        repaired = stripped.to_string();
        if let Some(instant) = parse_instant(&repaired) {
            return Some(instant);
        }
    }

    // Repair 3: clamp sub-second precision to exactly three digits and
    // reassert UTC.
    if let Some(dot) = repaired.find('.') {
        let mut millis: String = repaired[dot + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .take(3)
            .collect();
        while millis.len() < 3 {
            millis.push('0');
        }
        let candidate = format!("{}.{millis}Z", &repaired[..dot]);
        if let Some(instant) = parse_instant(&candidate) {
            return Some(instant);
        }
    }

    None
}

fn int_field(map: &Map<String, Value>, names: &[&str]) -> Option<i64> {
    for name in names {
        if let Some(value) = map.get(*name) {
            if let Some(n) = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)) {
                return Some(n);
            }
        }
    }
    None
}

/// Assemble a zero-padded ISO string and validate by re-parsing; out-of-range
/// components (month 13, day 32) fail the parse and disqualify the object.
fn build_instant(
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
    millis: i64,
) -> Option<DateTime<Utc>> {
    let candidate =
        format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z");
    parse_instant(&candidate)
}

/// Convention A: nested date and time parts under name-mangled keys. The
/// date part is required in full; absent time sub-fields default to zero.
fn normalize_dunder_object(map: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let date = map.get("_DateTime__date")?.as_object()?;
    let year = int_field(date, &["_Date__year"])?;
    let month = int_field(date, &["_Date__month"])?;
    let day = int_field(date, &["_Date__day"])?;

    let time = map.get("_DateTime__time").and_then(Value::as_object);
    let hour = time.and_then(|t| int_field(t, &["_Time__hour"])).unwrap_or(0);
    let minute = time
        .and_then(|t| int_field(t, &["_Time__minute"]))
        .unwrap_or(0);
    let second = time
        .and_then(|t| int_field(t, &["_Time__second"]))
        .unwrap_or(0);
    let nanos = time
        .and_then(|t| int_field(t, &["_Time__nanosecond"]))
        .unwrap_or(0);

    build_instant(year, month, day, hour, minute, second, nanos / 1_000_000)
}

/// Convention B: flat fields with plain names, dunder names accepted as
/// aliases. No nanosecond field is expected in this convention.
fn normalize_plain_object(map: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let year = int_field(map, &["year", "_Date__year"])?;
    let month = int_field(map, &["month", "_Date__month"])?;
    let day = int_field(map, &["day", "_Date__day"])?;
    let hour = int_field(map, &["hour", "_Time__hour"]).unwrap_or(0);
    let minute = int_field(map, &["minute", "_Time__minute"]).unwrap_or(0);
    let second = int_field(map, &["second", "_Time__second"]).unwrap_or(0);

    build_instant(year, month, day, hour, minute, second, 0)
}

// ── Record flattening ───────────────────────────────────────────────────

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Precedence chain: nested `job.<field>` wins over top-level `<field>`.
fn field_value<'a>(
    job: Option<&'a Map<String, Value>>,
    record: &'a Map<String, Value>,
    field: &str,
) -> Option<&'a Value> {
    job.and_then(|j| j.get(field))
        .filter(|v| !v.is_null())
        .or_else(|| record.get(field).filter(|v| !v.is_null()))
}

fn scalar_field(
    job: Option<&Map<String, Value>>,
    record: &Map<String, Value>,
    field: &str,
    default: &str,
) -> String {
    field_value(job, record, field)
        .and_then(coerce_string)
        .unwrap_or_else(|| default.to_string())
}

fn nullable_string(
    job: Option<&Map<String, Value>>,
    record: &Map<String, Value>,
    field: &str,
) -> Option<String> {
    field_value(job, record, field).and_then(coerce_string)
}

fn nullable_number(
    job: Option<&Map<String, Value>>,
    record: &Map<String, Value>,
    field: &str,
) -> Option<f64> {
    field_value(job, record, field).and_then(coerce_number)
}

fn array_source<'a>(
    job: Option<&'a Map<String, Value>>,
    record: &'a Map<String, Value>,
    field: &str,
) -> Option<&'a Vec<Value>> {
    job.and_then(|j| j.get(field))
        .and_then(Value::as_array)
        .or_else(|| record.get(field).and_then(Value::as_array))
}

fn list_field(
    job: Option<&Map<String, Value>>,
    record: &Map<String, Value>,
    field: &str,
) -> Vec<String> {
    array_source(job, record, field)
        .map(|items| items.iter().filter_map(coerce_string).collect())
        .unwrap_or_default()
}

fn skill_from_value(value: &Value) -> Option<Skill> {
    match value {
        Value::String(_) => coerce_string(value).map(|name| Skill {
            name,
            mastery: None,
        }),
        Value::Object(map) => {
            let name = map.get("name").and_then(coerce_string)?;
            let mastery = map.get("mastery").and_then(coerce_string);
            Some(Skill { name, mastery })
        }
        _ => None,
    }
}

fn skill_entries(
    job: Option<&Map<String, Value>>,
    record: &Map<String, Value>,
) -> Vec<Skill> {
    array_source(job, record, "skills")
        .map(|items| items.iter().filter_map(skill_from_value).collect())
        .unwrap_or_default()
}

/// Build the flattened job sub-record. Pure transform; every missing
/// defaulted field gets its named substitute, nullable fields stay `None`.
pub fn flatten_job(record: &Map<String, Value>) -> JobDetails {
    let job = record.get("job").and_then(Value::as_object);
    JobDetails {
        title: scalar_field(job, record, "title", defaults::TITLE),
        company: scalar_field(job, record, "company", defaults::COMPANY),
        location: scalar_field(job, record, "location", defaults::LOCATION),
        contract_type: scalar_field(job, record, "contract_type", defaults::CONTRACT_TYPE),
        work_mode: scalar_field(job, record, "work_mode", defaults::WORK_MODE),
        seniority: nullable_string(job, record, "seniority"),
        salary_min: nullable_number(job, record, "salary_min"),
        salary_max: nullable_number(job, record, "salary_max"),
        salary_currency: scalar_field(job, record, "salary_currency", defaults::SALARY_CURRENCY),
        description: scalar_field(job, record, "description", defaults::DESCRIPTION),
        company_description: scalar_field(
            job,
            record,
            "company_description",
            defaults::COMPANY_DESCRIPTION,
        ),
        application_link: nullable_string(job, record, "application_link"),
        department: nullable_string(job, record, "department"),
        skills: skill_entries(job, record),
        languages: list_field(job, record, "languages"),
        benefits: list_field(job, record, "benefits"),
        requirements: list_field(job, record, "requirements"),
        responsibilities: list_field(job, record, "responsibilities"),
    }
}

fn campaign_id(record: &Map<String, Value>, index: usize) -> String {
    for field in ID_FIELDS {
        if let Some(value) = record.get(*field) {
            if let Some(id) = coerce_string(value) {
                return id;
            }
        }
    }
    format!("campaign-{index}")
}

/// One canonical row plus the parsed instant it sorts by. The instant is
/// captured at construction so ordering never re-parses the rendered string.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub sort_key: Option<DateTime<Utc>>,
    pub campaign: CanonicalCampaign,
}

pub fn flatten_record(record: &Value, index: usize) -> Result<NormalizedRecord, RecordError> {
    let map = record.as_object().ok_or(RecordError::NotAnObject)?;
    let created = extract_timestamp(record, CREATED_FIELDS);
    let updated = extract_timestamp(record, UPDATED_FIELDS).or(created);
    Ok(NormalizedRecord {
        sort_key: created,
        campaign: CanonicalCampaign {
            campaign_id: campaign_id(map, index),
            campaign_raw: record.to_string(),
            created_at: created.map(format_instant),
            updated_at: updated.map(format_instant),
            job: flatten_job(map),
        },
    })
}

/// Fixed placeholder for a record that failed to transform; the raw record
/// is still preserved for audit.
pub fn error_placeholder(record: &Value, index: usize) -> CanonicalCampaign {
    CanonicalCampaign {
        campaign_id: format!("error-{index}"),
        campaign_raw: record.to_string(),
        created_at: None,
        updated_at: None,
        job: JobDetails::error_placeholder(),
    }
}

// ── Payload shape resolution ────────────────────────────────────────────

/// The three upstream payload shapes, resolved once at the boundary so the
/// rest of the pipeline only ever sees a uniform list.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamPayload {
    List(Vec<Value>),
    Wrapped { key: &'static str, items: Vec<Value> },
    Single(Value),
}

impl UpstreamPayload {
    pub fn resolve(payload: Value) -> Self {
        match payload {
            Value::Array(items) => UpstreamPayload::List(items),
            Value::Object(mut map) => {
                for key in WRAPPER_KEYS {
                    if matches!(map.get(*key), Some(Value::Array(_))) {
                        if let Some(Value::Array(items)) = map.remove(*key) {
                            return UpstreamPayload::Wrapped { key, items };
                        }
                    }
                }
                UpstreamPayload::Single(Value::Object(map))
            }
            other => UpstreamPayload::Single(other),
        }
    }

    pub fn into_records(self) -> Vec<Value> {
        match self {
            UpstreamPayload::List(items) | UpstreamPayload::Wrapped { items, .. } => items,
            UpstreamPayload::Single(value) => vec![value],
        }
    }
}

// ── Batch pipeline ──────────────────────────────────────────────────────

/// Resolve the payload shape, transform every record, and order by recency.
/// Every input record yields exactly one output record; failures degrade
/// per record, never batch-wide.
pub fn normalize_batch(payload: Value) -> Vec<CanonicalCampaign> {
    let records = UpstreamPayload::resolve(payload).into_records();
    let mut rows: Vec<NormalizedRecord> = records
        .iter()
        .enumerate()
        .map(|(index, record)| match flatten_record(record, index) {
            Ok(row) => row,
            Err(err) => {
                warn!(index, %err, "record degraded to error placeholder");
                NormalizedRecord {
                    sort_key: None,
                    campaign: error_placeholder(record, index),
                }
            }
        })
        .collect();

    // Stable: ties and null-dated records keep their input order.
    rows.sort_by(|a, b| match (&a.sort_key, &b.sort_key) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.into_iter().map(|row| row.campaign).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn created_string(value: Value) -> Option<String> {
        extract_timestamp(&json!({ "created": value }), CREATED_FIELDS).map(format_instant)
    }

    #[test]
    fn microsecond_iso_string_truncates_to_milliseconds() {
        assert_eq!(
            created_string(json!("2024-01-15T10:30:00.123456Z")),
            Some("2024-01-15T10:30:00.123Z".to_string())
        );
    }

    #[test]
    fn valid_iso_string_round_trips_to_the_same_instant() {
        let input = "2024-03-09T08:00:15.250Z";
        let instant = normalize_date_value(&json!(input)).unwrap();
        assert_eq!(
            instant,
            DateTime::parse_from_rfc3339(input).unwrap().with_timezone(&Utc)
        );
        assert_eq!(format_instant(instant), input);
    }

    #[test]
    fn space_separator_is_repaired() {
        assert_eq!(
            created_string(json!("2024-01-15 10:30:00")),
            Some("2024-01-15T10:30:00.000Z".to_string())
        );
    }

    #[test]
    fn overlong_fraction_with_trailing_junk_is_clamped_to_three_digits() {
        // Direct parse and separator repair both fail; the precision clamp
        // drops the trailing junk after the digits and reasserts UTC.
        assert_eq!(
            created_string(json!("2024-01-15T10:30:00.1234567890junk")),
            Some("2024-01-15T10:30:00.123Z".to_string())
        );
    }

    #[test]
    fn short_fraction_is_zero_padded() {
        assert_eq!(
            created_string(json!("2024-01-15T10:30:00.5garbage")),
            Some("2024-01-15T10:30:00.500Z".to_string())
        );
    }

    #[test]
    fn dunder_object_normalizes_with_zero_padding() {
        let value = json!({
            "_DateTime__date": { "_Date__year": 2023, "_Date__month": 6, "_Date__day": 1 },
            "_DateTime__time": { "_Time__hour": 14, "_Time__minute": 5, "_Time__second": 0 }
        });
        assert_eq!(
            created_string(value),
            Some("2023-06-01T14:05:00.000Z".to_string())
        );
    }

    #[test]
    fn dunder_nanoseconds_become_milliseconds() {
        let value = json!({
            "_DateTime__date": { "_Date__year": 2023, "_Date__month": 6, "_Date__day": 1 },
            "_DateTime__time": { "_Time__hour": 1, "_Time__minute": 2, "_Time__second": 3, "_Time__nanosecond": 456_789_000 }
        });
        assert_eq!(
            created_string(value),
            Some("2023-06-01T01:02:03.456Z".to_string())
        );
    }

    #[test]
    fn dunder_object_missing_time_part_defaults_to_midnight() {
        let value = json!({
            "_DateTime__date": { "_Date__year": 2022, "_Date__month": 12, "_Date__day": 31 }
        });
        assert_eq!(
            created_string(value),
            Some("2022-12-31T00:00:00.000Z".to_string())
        );
    }

    #[test]
    fn structured_object_missing_day_is_disqualified() {
        let value = json!({
            "_DateTime__date": { "_Date__year": 2023, "_Date__month": 6 },
            "_DateTime__time": { "_Time__hour": 14 }
        });
        assert_eq!(normalize_date_value(&value), None);
    }

    #[test]
    fn structured_object_with_out_of_range_month_is_disqualified() {
        let value = json!({ "year": 2023, "month": 13, "day": 1 });
        assert_eq!(normalize_date_value(&value), None);
    }

    #[test]
    fn plain_object_accepts_dunder_aliases() {
        let value = json!({
            "year": 2024, "month": 2, "day": 29,
            "_Time__hour": 23, "minute": 59, "second": 58
        });
        assert_eq!(
            created_string(value),
            Some("2024-02-29T23:59:58.000Z".to_string())
        );
    }

    #[test]
    fn numeric_value_is_epoch_milliseconds() {
        assert_eq!(
            created_string(json!(1_700_000_000_000_i64)),
            Some("2023-11-14T22:13:20.000Z".to_string())
        );
    }

    #[test]
    fn candidate_fields_are_probed_in_priority_order() {
        let record = json!({
            "date": "2020-01-01T00:00:00Z",
            "created_at": "2024-01-01T00:00:00Z"
        });
        let instant = extract_timestamp(&record, CREATED_FIELDS).unwrap();
        assert_eq!(format_instant(instant), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn unparsable_candidate_falls_through_to_the_next_field() {
        let record = json!({
            "created": "not a date at all",
            "timestamp": "2024-05-01T12:00:00Z"
        });
        let instant = extract_timestamp(&record, CREATED_FIELDS).unwrap();
        assert_eq!(format_instant(instant), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn record_without_any_date_field_yields_none() {
        let record = json!({ "title": "Backend Engineer", "company": "Acme" });
        assert_eq!(extract_timestamp(&record, CREATED_FIELDS), None);
    }

    #[test]
    fn nested_job_fields_win_over_top_level() {
        let record = json!({
            "title": "Old Title",
            "job": { "title": "Platform Engineer", "company": "Acme" },
            "location": "Berlin"
        });
        let job = flatten_job(record.as_object().unwrap());
        assert_eq!(job.title, "Platform Engineer");
        assert_eq!(job.company, "Acme");
        // Top-level value used when the nested object lacks the field.
        assert_eq!(job.location, "Berlin");
    }

    #[test]
    fn missing_scalars_get_named_defaults() {
        let record = json!({});
        let job = flatten_job(record.as_object().unwrap());
        assert_eq!(job.title, "Untitled Position");
        assert_eq!(job.company, "Unknown Company");
        assert_eq!(job.location, "Remote");
        assert_eq!(job.contract_type, "Full-time");
        assert_eq!(job.work_mode, "Hybrid");
        assert_eq!(job.description, "No description available");
        assert_eq!(job.salary_currency, "USD");
    }

    #[test]
    fn nullable_fields_preserve_absence() {
        let record = json!({ "job": { "salary_min": 60000 } });
        let job = flatten_job(record.as_object().unwrap());
        assert_eq!(job.salary_min, Some(60000.0));
        assert_eq!(job.salary_max, None);
        assert_eq!(job.seniority, None);
        assert_eq!(job.department, None);
        assert_eq!(job.application_link, None);
    }

    #[test]
    fn skills_normalize_bare_strings_and_objects() {
        let record = json!({
            "skills": [
                "Rust",
                { "name": "SQL", "mastery": "advanced" },
                { "mastery": "orphaned" },
                42
            ]
        });
        let job = flatten_job(record.as_object().unwrap());
        assert_eq!(
            job.skills,
            vec![
                Skill { name: "Rust".to_string(), mastery: None },
                Skill { name: "SQL".to_string(), mastery: Some("advanced".to_string()) },
            ]
        );
    }

    #[test]
    fn non_array_nested_list_falls_back_to_top_level() {
        let record = json!({
            "benefits": ["remote budget"],
            "job": { "benefits": "not-a-list" }
        });
        let job = flatten_job(record.as_object().unwrap());
        assert_eq!(job.benefits, vec!["remote budget".to_string()]);
        assert!(job.languages.is_empty());
    }

    #[test]
    fn campaign_id_prefers_source_id_then_positional_fallback() {
        let with_id = flatten_record(&json!({ "id": 17 }), 3).unwrap();
        assert_eq!(with_id.campaign.campaign_id, "17");

        let without_id = flatten_record(&json!({ "title": "x" }), 3).unwrap();
        assert_eq!(without_id.campaign.campaign_id, "campaign-3");
    }

    #[test]
    fn updated_at_falls_back_to_created_at() {
        let row = flatten_record(&json!({ "created_at": "2024-01-01T00:00:00Z" }), 0).unwrap();
        assert_eq!(row.campaign.updated_at, row.campaign.created_at);

        let explicit = flatten_record(
            &json!({
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-02-02T00:00:00Z"
            }),
            0,
        )
        .unwrap();
        assert_eq!(
            explicit.campaign.updated_at.as_deref(),
            Some("2024-02-02T00:00:00.000Z")
        );
    }

    #[test]
    fn wrapped_payloads_resolve_to_their_first_array_field() {
        let wrapped = UpstreamPayload::resolve(json!({ "campaigns": [{}, {}] }));
        assert!(matches!(wrapped, UpstreamPayload::Wrapped { key: "campaigns", .. }));
        assert_eq!(wrapped.into_records().len(), 2);

        let results = UpstreamPayload::resolve(json!({ "data": "nope", "results": [{}] }));
        assert!(matches!(results, UpstreamPayload::Wrapped { key: "results", .. }));
    }

    #[test]
    fn bare_single_object_becomes_a_one_element_batch() {
        let output = normalize_batch(json!({ "id": "solo", "title": "Solo" }));
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].campaign_id, "solo");
    }

    #[test]
    fn output_length_matches_record_count_even_with_bad_records() {
        let output = normalize_batch(json!([
            { "id": "a", "created_at": "2024-01-01T00:00:00Z" },
            "not an object",
            { "id": "b" }
        ]));
        assert_eq!(output.len(), 3);
        assert_eq!(output[0].campaign_id, "a");
        // Placeholder and dateless records sort after the dated one,
        // keeping their input order.
        assert_eq!(output[1].campaign_id, "error-1");
        assert_eq!(output[1].job.title, "Error");
        assert_eq!(output[1].campaign_raw, "\"not an object\"");
        assert_eq!(output[2].campaign_id, "b");
    }

    #[test]
    fn sort_is_created_at_descending_with_nulls_last() {
        let output = normalize_batch(json!([
            { "id": "undated-early" },
            { "id": "old", "created_at": "2020-06-01T00:00:00Z" },
            { "id": "undated-late" },
            { "id": "new", "created_at": "2025-06-01T00:00:00Z" }
        ]));
        let ids: Vec<&str> = output.iter().map(|c| c.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated-early", "undated-late"]);
    }

    #[test]
    fn pipeline_is_idempotent_for_the_same_payload() {
        let payload = json!({ "data": [
            { "id": "a", "created": 1_700_000_000_000_i64 },
            { "id": "b", "created": "2024-01-15 08:00:00" }
        ]});
        let first = normalize_batch(payload.clone());
        let second = normalize_batch(payload);
        assert_eq!(first, second);
    }

    #[test]
    fn campaign_raw_preserves_the_original_record() {
        let output = normalize_batch(json!([{ "id": "a", "oddball_key": [1, 2] }]));
        let raw: Value = serde_json::from_str(&output[0].campaign_raw).unwrap();
        assert_eq!(raw["oddball_key"], json!([1, 2]));
    }
}
