use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub mongo: MongoConfig,
    pub firebase: FirebaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed browser origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: String,
    #[serde(default)]
    pub service_account_path: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origins() -> String {
    "http://localhost:3001,http://localhost:3000,http://10.0.2.2:3000".to_string()
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_server_selection_timeout_ms() -> u64 {
    5000
}

impl ServerConfig {
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env(config::Environment::default().separator("__"))
    }

    fn from_env(env: config::Environment) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(env)
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origins", default_cors_origins())?
            .set_default("mongo.uri", "mongodb://localhost:27017")?
            .set_default("mongo.database", "nwu_connect")?
            .set_default("mongo.max_pool_size", 10)?
            .set_default("mongo.server_selection_timeout_ms", 5000)?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default()
            .separator("__")
            .source(Some(source))
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_env(env(&[("FIREBASE__PROJECT_ID", "nwu-connect")])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.mongo.database, "nwu_connect");
        assert_eq!(config.mongo.max_pool_size, 10);
        assert_eq!(config.firebase.project_id, "nwu-connect");
        assert!(config.firebase.service_account_path.is_none());
        assert_eq!(config.server.cors_origins().len(), 3);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_env(env(&[
            ("FIREBASE__PROJECT_ID", "nwu-connect"),
            ("SERVER__PORT", "8088"),
            ("SERVER__CORS_ORIGINS", "https://admin.nwuconnect.app, "),
            ("MONGO__DATABASE", "nwu_test"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.mongo.database, "nwu_test");
        assert_eq!(
            config.server.cors_origins(),
            vec!["https://admin.nwuconnect.app".to_string()]
        );
    }

    #[test]
    fn test_project_id_is_required() {
        assert!(Config::from_env(env(&[])).is_err());
    }
}
