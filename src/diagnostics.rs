/// Which source lines the parser trace covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TracingConfig {
    All,
    Between(usize, usize),
    Before(usize),
    After(usize),
    Only(usize),
    Off,
}

impl TracingConfig {
    /// Parses the value of a `--trace-*` flag: "all", a single line
    /// number, or a "start:end" range with either side left open.
    pub fn parse(value: Option<&str>) -> TracingConfig {
        let value = match value {
            Some(value) => value,
            None => return TracingConfig::Off,
        };
        if value == "all" {
            return TracingConfig::All;
        }
        match value.find(':') {
            None => value
                .parse()
                .map(TracingConfig::Only)
                .unwrap_or(TracingConfig::Off),
            Some(i) => {
                let start = value[..i].parse().ok();
                let end = value[i + 1..].parse().ok();
                match (start, end) {
                    (Some(start), Some(end)) => TracingConfig::Between(start, end),
                    (Some(start), None) => TracingConfig::After(start),
                    (None, Some(end)) => TracingConfig::Before(end),
                    (None, None) => TracingConfig::Off,
                }
            }
        }
    }
}

#[cfg(test)]
mod test_tracing_config {
    use super::TracingConfig;

    #[test]
    fn test_parse() {
        assert_eq!(TracingConfig::parse(None), TracingConfig::Off);
        assert_eq!(TracingConfig::parse(Some("all")), TracingConfig::All);
        assert_eq!(TracingConfig::parse(Some("5")), TracingConfig::Only(5));
        assert_eq!(TracingConfig::parse(Some("5:")), TracingConfig::After(5));
        assert_eq!(TracingConfig::parse(Some(":5")), TracingConfig::Before(5));
        assert_eq!(
            TracingConfig::parse(Some("2:8")),
            TracingConfig::Between(2, 8)
        );
        assert_eq!(TracingConfig::parse(Some("junk")), TracingConfig::Off);
    }
}
