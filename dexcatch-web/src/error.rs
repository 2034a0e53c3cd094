//! Errors surfaced to JavaScript by the bridge.
use dexcatch_game::{CatchConfig, ConfigError, ExportFormat, ImportError, UnknownBall};
use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ball(#[from] UnknownBall),
    #[error("{0}")]
    Format(String),
    #[error("export failed: {0}")]
    Export(#[from] serde_json::Error),
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl From<BridgeError> for JsValue {
    fn from(err: BridgeError) -> Self {
        Self::from_str(&err.to_string())
    }
}

/// Tuning for a new session: the JSON override when one is given, else defaults.
///
/// # Errors
/// Returns [`BridgeError::Config`] if the override fails to parse or validate.
pub fn session_config(config_json: Option<&str>) -> Result<CatchConfig, BridgeError> {
    match config_json.map(str::trim) {
        Some(json) if !json.is_empty() => Ok(CatchConfig::from_json(json)?),
        _ => Ok(CatchConfig::default_config()),
    }
}

/// # Errors
/// Returns [`BridgeError::Format`] for anything but `json` or `csv`.
pub fn export_format(name: &str) -> Result<ExportFormat, BridgeError> {
    name.parse().map_err(BridgeError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexcatch_game::parse_import;

    #[test]
    fn blank_override_uses_defaults() {
        assert_eq!(session_config(None).unwrap(), CatchConfig::default_config());
        assert_eq!(session_config(Some("  ")).unwrap(), CatchConfig::default_config());
        assert_eq!(
            session_config(Some(r#"{ "catalog_size": 151 }"#))
                .unwrap()
                .catalog_size,
            151
        );
    }

    #[test]
    fn bad_inputs_map_to_variants() {
        assert!(matches!(
            session_config(Some(r#"{ "great_bonus_every": 0 }"#)),
            Err(BridgeError::Config(ConfigError::Invalid(_)))
        ));
        assert!(matches!(
            session_config(Some("{")),
            Err(BridgeError::Config(ConfigError::Json(_)))
        ));
        assert!(matches!(export_format("xml"), Err(BridgeError::Format(_))));
        assert_eq!(export_format(" CSV ").unwrap(), ExportFormat::Csv);

        let ball: Result<dexcatch_game::BallKind, BridgeError> =
            "master".parse::<dexcatch_game::BallKind>().map_err(Into::into);
        assert_eq!(
            ball.unwrap_err().to_string(),
            "unknown ball kind: master"
        );
        let import: BridgeError = parse_import("", 10).unwrap_err().into();
        assert_eq!(import.to_string(), "import data is empty");
    }
}
