use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub records: RecordsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    /// Record types accepted for create/update. SOA is deliberately absent:
    /// the SOA row is never edited directly, only its serial is maintained.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl RecordsConfig {
    pub fn is_allowed_type(&self, rtype: &str) -> bool {
        self.allowed_types.iter().any(|t| t == rtype)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self { allowed_types: default_allowed_types() }
    }
}

fn default_db_path() -> String {
    "./zonewarden.db".to_string()
}

fn default_allowed_types() -> Vec<String> {
    [
        "A", "A6", "AAAA", "AFSDB", "ALIAS", "APL", "CAA", "CDNSKEY", "CDS", "CERT", "CNAME",
        "CSYNC", "DHCID", "DLV", "DNAME", "DNSKEY", "DS", "EUI48", "EUI64", "HINFO",
        "IPSECKEY", "KEY", "KX", "LOC", "LUA", "MAILA", "MAILB", "MINFO", "MR",
        "MX", "NAPTR", "NS", "NSEC", "NSEC3", "NSEC3PARAM", "OPENPGPKEY",
        "PTR", "RKEY", "RP", "RRSIG", "SIG", "SMIMEA", "SPF",
        "SRV", "TKEY", "SSHFP", "TLSA", "TSIG", "TXT", "WKS", "URI",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.records.allowed_types.is_empty() {
        anyhow::bail!("CONFIG ERROR: records.allowed_types must not be empty");
    }

    // The serial maintenance owns the SOA row; letting callers edit it
    // directly would desynchronize zone versioning.
    if cfg.records.is_allowed_type("SOA") {
        anyhow::bail!("CONFIG ERROR: SOA must not appear in records.allowed_types");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}

pub fn load() -> Result<Config> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name("zonewarden").required(false))
        .add_source(config::Environment::with_prefix("ZONEWARDEN").separator("__"))
        .set_default("database.path", default_db_path())?
        .set_default("records.allowed_types", default_allowed_types())?
        .build()?
        .try_deserialize()?;

    validate(&cfg)?;

    Ok(cfg)
}
