use std::time::Duration;

/// Read an environment variable, treating blank values as unset.
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// Split a comma separated list, dropping blank entries.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parse a duration given either as plain milliseconds (`"1500"`) or in
/// humantime form (`"1s 500ms"`).
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if let Ok(millis) = trimmed.parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    humantime::parse_duration(trimmed).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_drops_blanks() {
        assert_eq!(split_csv(" a, ,b ,"), vec!["a", "b"]);
    }

    #[test]
    fn durations_accept_millis_and_humantime() {
        assert_eq!(parse_duration("250"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(
            parse_duration("1s 500ms"),
            Ok(Duration::from_millis(1500))
        );
        assert!(parse_duration("soon").is_err());
    }
}
