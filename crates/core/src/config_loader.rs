use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging TOML, environment variables, and JSON.
    ///
    /// Environment variables use the `BAND_TRADE_` prefix with `__` as the
    /// section separator, so `BAND_TRADE_BYBIT__API_KEY` reaches
    /// `bybit.api_key`. Credentials belong in the environment, not the
    /// files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed("BAND_TRADE_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }

    /// Loads application configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("BAND_TRADE_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyKind;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [engine]
                symbol = "ETHUSDT"

                [signal]
                policy = "breakout"
            "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(cfg.engine.symbol, "ETHUSDT");
        assert_eq!(cfg.signal.policy, PolicyKind::Breakout);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.engine.interval, "5");
        assert_eq!(cfg.risk.cooldown_secs, 300);
        assert_eq!(cfg.scanner.symbols.len(), 11);
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let cfg: AppConfig = Figment::new().extract().unwrap();
        assert_eq!(cfg.engine.symbol, "BTCUSDT");
        assert_eq!(cfg.risk.risk_percent, 1.0);
        assert!(cfg.bybit.api_key.is_empty());
    }
}
