/// Query-string parsing for metadata and query endpoints
///
/// Both endpoints accept repeated keys (`includeKey=a&includeKey=b`), which the
/// stock `Query` extractor cannot express, so the raw query string is parsed here.

use crate::error::GatewayError;
use crate::workflow::types::{MetadataFilters, QueryFilters, WorkflowId};
use chrono::{DateTime, Utc};

/// Label filters a caller might try to pass to the engine; always dropped
const LABEL_PARAMS: &[&str] = &["label", "labelor", "excludeLabelAnd", "excludeLabelOr"];

fn pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, GatewayError> {
    value
        .parse()
        .map_err(|_| GatewayError::CallerInput(format!("{} must be true or false, got {:?}", key, value)))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, GatewayError> {
    value
        .parse()
        .map_err(|_| GatewayError::CallerInput(format!("{} must be a non-negative integer, got {:?}", key, value)))
}

fn parse_time(key: &str, value: &str) -> Result<DateTime<Utc>, GatewayError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| GatewayError::CallerInput(format!("{} must be an RFC 3339 timestamp, got {:?}", key, value)))
}

pub fn parse_metadata_filters(raw: Option<&str>) -> Result<MetadataFilters, GatewayError> {
    let mut filters = MetadataFilters::default();
    for (key, value) in pairs(raw) {
        match key.as_str() {
            "includeKey" => filters.include_keys.push(value),
            "excludeKey" => filters.exclude_keys.push(value),
            "expandSubWorkflows" => filters.expand_sub_workflows = parse_bool(&key, &value)?,
            _ => return Err(GatewayError::CallerInput(format!("unsupported metadata parameter: {}", key))),
        }
    }
    Ok(filters)
}

/// Parse caller query filters. Label parameters are dropped, never forwarded.
pub fn parse_query_filters(raw: Option<&str>) -> Result<QueryFilters, GatewayError> {
    let mut filters = QueryFilters::default();
    for (key, value) in pairs(raw) {
        match key.as_str() {
            "status" => filters.statuses.push(value),
            "name" => filters.names.push(value),
            "id" => filters.ids.push(
                value
                    .parse::<WorkflowId>()
                    .map_err(|_| GatewayError::CallerInput(format!("invalid workflow id: {}", value)))?,
            ),
            "submission" => filters.submission = Some(parse_time(&key, &value)?),
            "start" => filters.start = Some(parse_time(&key, &value)?),
            "end" => filters.end = Some(parse_time(&key, &value)?),
            "page" => filters.page = Some(parse_u32(&key, &value)?),
            "pageSize" => filters.page_size = Some(parse_u32(&key, &value)?),
            "includeSubworkflows" => filters.include_subworkflows = Some(parse_bool(&key, &value)?),
            "additionalQueryResultFields" => filters.additional_query_result_fields.push(value),
            label if LABEL_PARAMS.contains(&label) => {
                tracing::warn!("🏷️ Dropping caller-supplied {} filter {:?}", label, value);
            }
            _ => return Err(GatewayError::CallerInput(format!("unsupported query parameter: {}", key))),
        }
    }
    Ok(filters)
}
