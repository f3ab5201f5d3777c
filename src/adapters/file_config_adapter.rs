//! INI file configuration adapter.

use crate::domain::error::AltdipError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AltdipError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| AltdipError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, AltdipError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| AltdipError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[executor]
quote_asset = USDT

[data]
dir = /srv/altdip/caps
excluded = USDC,WBTC
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("executor", "quote_asset"),
            Some("USDT".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "excluded"),
            Some("USDC,WBTC".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[index]\nbasket_size = 10\n").unwrap();
        assert_eq!(adapter.get_string("index", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_value_and_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[buy_dip]\ncool = 5\nwin = abc\n").unwrap();
        assert_eq!(adapter.get_int("buy_dip", "cool", 0), 5);
        assert_eq!(adapter.get_int("buy_dip", "missing", 42), 42);
        assert_eq!(adapter.get_int("buy_dip", "win", 42), 42);
    }

    #[test]
    fn get_double_value_and_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[sell_sl]\ntresh = 0.2\nsl_share = lots\n").unwrap();
        assert_eq!(adapter.get_double("sell_sl", "tresh", 0.0), 0.2);
        assert_eq!(adapter.get_double("sell_sl", "missing", 99.9), 99.9);
        assert_eq!(adapter.get_double("sell_sl", "sl_share", 1.0), 1.0);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[flags]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("flags", "a", false));
        assert!(adapter.get_bool("flags", "b", false));
        assert!(adapter.get_bool("flags", "c", false));
        assert!(!adapter.get_bool("flags", "d", true));
        assert!(!adapter.get_bool("flags", "e", true));
        assert!(!adapter.get_bool("flags", "f", true));
        assert!(adapter.get_bool("flags", "g", true));
        assert!(!adapter.get_bool("flags", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[state]\npath = /var/lib/altdip/state.json\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("state", "path"),
            Some("/var/lib/altdip/state.json".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/altdip.ini");
        assert!(matches!(result, Err(AltdipError::ConfigParse { .. })));
    }
}
