//! Request validation.
//!
//! Runs over the raw JSON body so that every problem is reported at once,
//! with its field path, before anything is deserialized or written.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{Map, Value};

use super::{ImportRequest, ValidationErrors, MAX_BATCH_SIZE, MAX_PHOTOS_PER_RECORD};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_CREATOR_FIELD_LEN: usize = 500;
const MAX_SHORT_TEXT_LEN: usize = 500;

static PARTIAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}(-\d{2}-\d{2})?$").unwrap());

const WEIGHT_KEYS: [&str; 6] = [
    "gps",
    "title",
    "artist",
    "referenceIds",
    "tagSimilarity",
    "creatorName",
];

/// Validate a raw request body and turn it into an [`ImportRequest`].
pub fn validate_request(body: &Value) -> Result<ImportRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let Some(root) = body.as_object() else {
        errors.push("", "invalid_type", "request body must be a JSON object");
        return Err(errors);
    };

    require_text(root, "importId", "importId", MAX_TITLE_LEN, &mut errors);
    check_source(root.get("source"), &mut errors);
    check_config(root.get("config"), &mut errors);
    check_data(root.get("data"), &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut body = body.clone();
    strip_nulls(&mut body);

    serde_json::from_value(body).map_err(|e| {
        let mut errors = ValidationErrors::default();
        errors.push("", "invalid_shape", e.to_string());
        errors
    })
}

fn check_source(source: Option<&Value>, errors: &mut ValidationErrors) {
    let Some(source) = source else {
        errors.push("source", "required", "source is required");
        return;
    };
    let Some(source) = source.as_object() else {
        errors.push("source", "invalid_type", "source must be an object");
        return;
    };

    require_text(source, "pluginName", "source.pluginName", MAX_SHORT_TEXT_LEN, errors);
    require_text(
        source,
        "originalDataSource",
        "source.originalDataSource",
        MAX_SHORT_TEXT_LEN,
        errors,
    );

    match source.get("importTimestamp") {
        None | Some(Value::Null) => errors.push(
            "source.importTimestamp",
            "required",
            "importTimestamp is required",
        ),
        Some(Value::String(s)) if DateTime::parse_from_rfc3339(s).is_ok() => {}
        Some(_) => errors.push(
            "source.importTimestamp",
            "invalid_format",
            "importTimestamp must be an RFC 3339 timestamp",
        ),
    }
}

fn check_config(config: Option<&Value>, errors: &mut ValidationErrors) {
    let config = match config {
        None | Some(Value::Null) => return,
        Some(Value::Object(map)) => map,
        Some(_) => {
            errors.push("config", "invalid_type", "config must be an object");
            return;
        }
    };

    if let Some(value) = present(config, "duplicateThreshold") {
        match value.as_f64() {
            Some(t) if (0.0..=1.0).contains(&t) => {}
            Some(_) => errors.push(
                "config.duplicateThreshold",
                "out_of_range",
                "duplicateThreshold must be within [0, 1]",
            ),
            None => errors.push(
                "config.duplicateThreshold",
                "invalid_type",
                "duplicateThreshold must be a number",
            ),
        }
    }

    if let Some(value) = present(config, "duplicateWeights") {
        match value.as_object() {
            Some(weights) => {
                for key in WEIGHT_KEYS {
                    let field = format!("config.duplicateWeights.{}", key);
                    if let Some(w) = present(weights, key) {
                        match w.as_f64() {
                            Some(w) if w.is_finite() && w >= 0.0 => {}
                            Some(_) => errors.push(
                                field,
                                "out_of_range",
                                "weight must be a non-negative number",
                            ),
                            None => errors.push(field, "invalid_type", "weight must be a number"),
                        }
                    }
                }
            }
            None => errors.push(
                "config.duplicateWeights",
                "invalid_type",
                "duplicateWeights must be an object",
            ),
        }
    }

    if let Some(value) = present(config, "batchSize") {
        match value.as_i64() {
            Some(n) if n >= 1 && n as usize <= MAX_BATCH_SIZE => {}
            // Integers too large for i64 land here too.
            _ if value.is_i64() || value.is_u64() => errors.push(
                "config.batchSize",
                "out_of_range",
                format!("batchSize must be within [1, {}]", MAX_BATCH_SIZE),
            ),
            _ => errors.push("config.batchSize", "invalid_type", "batchSize must be an integer"),
        }
    }

    for flag in ["enableTagMerging", "createMissingArtists", "autoApproveArtists"] {
        if let Some(value) = present(config, flag) {
            if !value.is_boolean() {
                errors.push(
                    format!("config.{}", flag),
                    "invalid_type",
                    format!("{} must be a boolean", flag),
                );
            }
        }
    }
}

fn check_data(data: Option<&Value>, errors: &mut ValidationErrors) {
    let Some(data) = data else {
        errors.push("data", "required", "data is required");
        return;
    };
    let Some(data) = data.as_object() else {
        errors.push("data", "invalid_type", "data must be an object");
        return;
    };

    let artworks = record_array(data, "artworks", errors);
    let artists = record_array(data, "artists", errors);

    let total = artworks.map_or(0, Vec::len) + artists.map_or(0, Vec::len);
    if total == 0 {
        errors.push(
            "data",
            "empty_batch",
            "at least one of data.artworks or data.artists must be non-empty",
        );
    }
    if total > MAX_BATCH_SIZE {
        errors.push(
            "data",
            "batch_too_large",
            format!("{} records exceeds the maximum of {}", total, MAX_BATCH_SIZE),
        );
    }

    for (i, record) in artworks.into_iter().flatten().enumerate() {
        check_artwork(record, &format!("data.artworks[{}]", i), errors);
    }
    for (i, record) in artists.into_iter().flatten().enumerate() {
        check_creator(record, &format!("data.artists[{}]", i), errors);
    }
}

fn record_array<'a>(
    data: &'a Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a Vec<Value>> {
    match present(data, key) {
        None => None,
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            errors.push(
                format!("data.{}", key),
                "invalid_type",
                format!("{} must be an array", key),
            );
            None
        }
    }
}

fn check_artwork(record: &Value, path: &str, errors: &mut ValidationErrors) {
    let Some(record) = record.as_object() else {
        errors.push(path, "invalid_type", "artwork record must be an object");
        return;
    };

    require_text(record, "title", &format!("{}.title", path), MAX_TITLE_LEN, errors);
    optional_text(
        record,
        "description",
        &format!("{}.description", path),
        MAX_DESCRIPTION_LEN,
        errors,
    );

    if present(record, "artist").is_some() && present(record, "creator").is_some() {
        errors.push(
            format!("{}.artist", path),
            "conflict",
            "give either artist or creator, not both",
        );
    }
    for key in ["artist", "creator"] {
        optional_text(
            record,
            key,
            &format!("{}.{}", path, key),
            MAX_CREATOR_FIELD_LEN,
            errors,
        );
    }

    check_coordinate(record, "lat", path, 90.0, errors);
    check_coordinate(record, "lon", path, 180.0, errors);

    require_text(record, "source", &format!("{}.source", path), MAX_SHORT_TEXT_LEN, errors);
    optional_text(
        record,
        "externalId",
        &format!("{}.externalId", path),
        MAX_SHORT_TEXT_LEN,
        errors,
    );
    check_tags(record, path, errors);

    if let Some(photos) = present(record, "photos") {
        let field = format!("{}.photos", path);
        match photos.as_array() {
            Some(photos) => {
                if photos.len() > MAX_PHOTOS_PER_RECORD {
                    errors.push(
                        &field,
                        "too_many_photos",
                        format!(
                            "{} photos exceeds the maximum of {}",
                            photos.len(),
                            MAX_PHOTOS_PER_RECORD
                        ),
                    );
                }
                for (i, photo) in photos.iter().enumerate() {
                    check_photo(photo, &format!("{}[{}]", field, i), errors);
                }
            }
            None => errors.push(field, "invalid_type", "photos must be an array"),
        }
    }
}

fn check_photo(photo: &Value, path: &str, errors: &mut ValidationErrors) {
    let Some(photo) = photo.as_object() else {
        errors.push(path, "invalid_type", "photo must be an object");
        return;
    };

    let url_field = format!("{}.url", path);
    match photo.get("url") {
        None | Some(Value::Null) => errors.push(url_field, "required", "photo url is required"),
        Some(Value::String(s)) => {
            if !is_http_url(s) {
                errors.push(url_field, "invalid_url", "photo url must be an absolute http(s) URL");
            }
        }
        Some(_) => errors.push(url_field, "invalid_type", "photo url must be a string"),
    }

    optional_text(photo, "caption", &format!("{}.caption", path), MAX_SHORT_TEXT_LEN, errors);
    optional_text(photo, "credit", &format!("{}.credit", path), MAX_SHORT_TEXT_LEN, errors);
}

fn check_creator(record: &Value, path: &str, errors: &mut ValidationErrors) {
    let Some(record) = record.as_object() else {
        errors.push(path, "invalid_type", "artist record must be an object");
        return;
    };

    let has_title = present(record, "title").is_some();
    let has_name = present(record, "name").is_some();
    match (has_title, has_name) {
        (true, true) => errors.push(
            format!("{}.title", path),
            "conflict",
            "give either title or name, not both",
        ),
        (false, true) => {
            require_text(record, "name", &format!("{}.name", path), MAX_TITLE_LEN, errors)
        }
        _ => require_text(record, "title", &format!("{}.title", path), MAX_TITLE_LEN, errors),
    }

    optional_text(
        record,
        "description",
        &format!("{}.description", path),
        MAX_DESCRIPTION_LEN,
        errors,
    );
    require_text(record, "source", &format!("{}.source", path), MAX_SHORT_TEXT_LEN, errors);
    optional_text(
        record,
        "externalId",
        &format!("{}.externalId", path),
        MAX_SHORT_TEXT_LEN,
        errors,
    );
    check_tags(record, path, errors);

    let birth = check_date(record, "birthDate", path, errors);
    let death = check_date(record, "deathDate", path, errors);
    if let (Some(birth), Some(death)) = (birth, death) {
        if death < birth {
            errors.push(
                format!("{}.deathDate", path),
                "invalid_range",
                "deathDate is before birthDate",
            );
        }
    }

    if let Some(website) = present(record, "website") {
        let field = format!("{}.website", path);
        match website.as_str() {
            Some(s) if is_http_url(s) => {}
            Some(_) => errors.push(field, "invalid_url", "website must be an absolute http(s) URL"),
            None => errors.push(field, "invalid_type", "website must be a string"),
        }
    }
}

/// Drop null members so they read as absent. Tag maps are left as given.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for (key, v) in map.iter_mut() {
                if key != "tags" {
                    strip_nulls(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Value of `key` unless absent or null.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn require_text(
    map: &Map<String, Value>,
    key: &str,
    field: &str,
    max_len: usize,
    errors: &mut ValidationErrors,
) {
    match present(map, key) {
        None => errors.push(field, "required", format!("{} is required", key)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(field, "required", format!("{} must not be empty", key))
        }
        Some(Value::String(s)) => check_len(s, field, max_len, errors),
        Some(_) => errors.push(field, "invalid_type", format!("{} must be a string", key)),
    }
}

fn optional_text(
    map: &Map<String, Value>,
    key: &str,
    field: &str,
    max_len: usize,
    errors: &mut ValidationErrors,
) {
    match present(map, key) {
        None => {}
        Some(Value::String(s)) => check_len(s, field, max_len, errors),
        Some(_) => errors.push(field, "invalid_type", format!("{} must be a string", key)),
    }
}

fn check_len(s: &str, field: &str, max_len: usize, errors: &mut ValidationErrors) {
    let len = s.chars().count();
    if len > max_len {
        errors.push(
            field,
            "too_long",
            format!("{} characters exceeds the maximum of {}", len, max_len),
        );
    }
}

fn check_coordinate(
    record: &Map<String, Value>,
    key: &str,
    path: &str,
    limit: f64,
    errors: &mut ValidationErrors,
) {
    let field = format!("{}.{}", path, key);
    match present(record, key) {
        None => errors.push(field, "required", format!("{} is required", key)),
        Some(value) => match value.as_f64() {
            Some(v) if (-limit..=limit).contains(&v) => {}
            Some(_) => errors.push(
                field,
                "out_of_range",
                format!("{} must be within [{}, {}]", key, -limit, limit),
            ),
            None => errors.push(field, "invalid_type", format!("{} must be a number", key)),
        },
    }
}

fn check_tags(record: &Map<String, Value>, path: &str, errors: &mut ValidationErrors) {
    if let Some(tags) = present(record, "tags") {
        if !tags.is_object() {
            errors.push(
                format!("{}.tags", path),
                "invalid_type",
                "tags must be an object",
            );
        }
    }
}

/// Validate a `YYYY` or `YYYY-MM-DD` date, returning a comparable form.
fn check_date(
    record: &Map<String, Value>,
    key: &str,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = present(record, key)?;
    let field = format!("{}.{}", path, key);

    let Some(s) = value.as_str() else {
        errors.push(field, "invalid_type", format!("{} must be a string", key));
        return None;
    };

    let valid = PARTIAL_DATE.is_match(s)
        && (s.len() == 4 || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
    if !valid {
        errors.push(
            field,
            "invalid_format",
            format!("{} must be YYYY or YYYY-MM-DD", key),
        );
        return None;
    }

    // Compare on the year alone when either side is year-only
    Some(s[..4].to_string())
}

fn is_http_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_request() -> Value {
        json!({
            "importId": "imp-001",
            "source": {
                "pluginName": "osm-artworks",
                "originalDataSource": "openstreetmap",
                "importTimestamp": "2024-05-01T12:00:00Z"
            },
            "data": {
                "artworks": [{
                    "title": "Untitled Mural",
                    "lat": 49.28,
                    "lon": -123.12,
                    "source": "osm",
                    "artist": "Smith, John",
                    "tags": {"artwork_type": "mural"},
                    "photos": [{"url": "https://example.com/mural.jpg", "caption": "Front"}]
                }],
                "artists": [{
                    "name": "Emily Carr",
                    "source": "wikidata",
                    "birthDate": "1871-12-13",
                    "deathDate": "1945",
                    "website": "https://example.org/carr"
                }]
            }
        })
    }

    #[test]
    fn test_valid_request() {
        let request = validate_request(&valid_request()).unwrap();
        assert_eq!(request.import_id, "imp-001");
        assert_eq!(request.data.artworks.len(), 1);
        assert_eq!(request.data.artists[0].title, "Emily Carr");
        assert_eq!(request.config.duplicate_threshold, 0.7);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut body = valid_request();
        body["config"] = json!({"duplicateThreshold": 1.5});

        let errors = validate_request(&body).unwrap_err();
        assert!(errors.has_field("config.duplicateThreshold"));
        assert_eq!(errors.errors[0].code, "out_of_range");
    }

    #[test]
    fn test_collects_all_errors() {
        let body = json!({
            "importId": "",
            "source": {"pluginName": "p", "originalDataSource": "o", "importTimestamp": "yesterday"},
            "config": {"batchSize": 0},
            "data": {
                "artworks": [{
                    "title": "x".repeat(201),
                    "lat": 91.0,
                    "lon": -181.0,
                    "source": "s",
                    "photos": [{"url": "not a url"}]
                }]
            }
        });

        let errors = validate_request(&body).unwrap_err();
        for field in [
            "importId",
            "source.importTimestamp",
            "config.batchSize",
            "data.artworks[0].title",
            "data.artworks[0].lat",
            "data.artworks[0].lon",
            "data.artworks[0].photos[0].url",
        ] {
            assert!(errors.has_field(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_empty_data_rejected() {
        let mut body = valid_request();
        body["data"] = json!({"artworks": [], "artists": []});

        let errors = validate_request(&body).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].code, "empty_batch");
    }

    #[test]
    fn test_batch_too_large() {
        let mut body = valid_request();
        let artwork = body["data"]["artworks"][0].clone();
        body["data"]["artworks"] = Value::Array(vec![artwork; MAX_BATCH_SIZE + 1]);

        let errors = validate_request(&body).unwrap_err();
        assert!(errors.errors.iter().any(|e| e.code == "batch_too_large"));
    }

    #[test]
    fn test_batch_size_must_be_integer() {
        for bad in [json!(2.0), json!(2.5), json!("10")] {
            let mut body = valid_request();
            body["config"]["batchSize"] = bad;
            let errors = validate_request(&body).unwrap_err();
            let err = errors
                .errors
                .iter()
                .find(|e| e.field == "config.batchSize")
                .unwrap();
            assert_eq!(err.code, "invalid_type");
        }

        for bad in [json!(0), json!(-3), json!(MAX_BATCH_SIZE + 1)] {
            let mut body = valid_request();
            body["config"]["batchSize"] = bad;
            let errors = validate_request(&body).unwrap_err();
            assert!(errors
                .errors
                .iter()
                .any(|e| e.field == "config.batchSize" && e.code == "out_of_range"));
        }
    }

    #[test]
    fn test_too_many_photos() {
        let mut body = valid_request();
        let photo = json!({"url": "https://example.com/a.jpg"});
        body["data"]["artworks"][0]["photos"] = Value::Array(vec![photo; 11]);

        let errors = validate_request(&body).unwrap_err();
        assert!(errors.has_field("data.artworks[0].photos"));
    }

    #[test]
    fn test_long_creator_field_rejected() {
        let mut body = valid_request();
        body["data"]["artworks"][0]["artist"] = json!("a".repeat(501));

        let errors = validate_request(&body).unwrap_err();
        assert!(errors.has_field("data.artworks[0].artist"));
    }

    #[test]
    fn test_creator_dates_and_website() {
        let mut body = valid_request();
        body["data"]["artists"][0]["birthDate"] = json!("1871-13-01");
        body["data"]["artists"][0]["website"] = json!("ftp://example.org");

        let errors = validate_request(&body).unwrap_err();
        assert!(errors.has_field("data.artists[0].birthDate"));
        assert!(errors.has_field("data.artists[0].website"));
    }

    #[test]
    fn test_death_before_birth() {
        let mut body = valid_request();
        body["data"]["artists"][0]["birthDate"] = json!("1900");
        body["data"]["artists"][0]["deathDate"] = json!("1850-01-01");

        let errors = validate_request(&body).unwrap_err();
        assert!(errors.has_field("data.artists[0].deathDate"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut body = valid_request();
        body["config"] = json!({"duplicateWeights": {"gps": -1.0, "title": 2.0}});

        let errors = validate_request(&body).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("config.duplicateWeights.gps"));
    }

    #[test]
    fn test_null_optionals_read_as_absent() {
        let mut body = valid_request();
        body["config"] = Value::Null;
        body["data"]["artworks"][0]["tags"] = Value::Null;
        body["data"]["artworks"][0]["photos"] = Value::Null;
        body["data"]["artworks"][0]["description"] = Value::Null;

        let request = validate_request(&body).unwrap();
        assert!(request.data.artworks[0].tags.is_empty());
        assert!(request.data.artworks[0].photos.is_empty());
    }

    #[test]
    fn test_non_object_body() {
        let errors = validate_request(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.errors[0].code, "invalid_type");
    }

    #[test]
    fn test_missing_sections() {
        let errors = validate_request(&json!({"importId": "x"})).unwrap_err();
        assert!(errors.has_field("source"));
        assert!(errors.has_field("data"));
    }
}
