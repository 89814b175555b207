use serde::de::DeserializeOwned;

/// Problems found while loading a config that still deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Keys the schema does not know, as dotted TOML paths.
    pub unknown_keys: Vec<String>,
    pub warnings: Vec<ConfigWarning>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty()
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `checking.checkers` names a checker that is not built in.
    UnknownChecker { name: String },
    /// A `[checker.<name>]` table for a checker that is not enabled.
    InactiveOverride { name: String },
    InvalidValue { toml_path: String, message: String },
}

pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(normalize_path(path));
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}

/// `serde_ignored` renders a leading `.` and sequence indices as `.0`.
fn normalize_path(path: serde_ignored::Path) -> String {
    let raw = path.to_string();
    raw.trim_start_matches('.')
        .split('.')
        .enumerate()
        .fold(String::new(), |mut out, (idx, segment)| {
            if idx > 0 && !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                out.push('[');
                out.push_str(segment);
                out.push(']');
                return out;
            }
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(segment);
            out
        })
}
