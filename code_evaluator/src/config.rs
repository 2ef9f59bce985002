use serde::Deserialize;

fn get_default_port() -> u16 {
    8080
}

fn get_default_execution_timeout() -> u64 {
    10
}

fn get_default_request_grace() -> u64 {
    5
}

fn get_default_attempt_idle() -> u64 {
    3600
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "get_default_port")]
    pub port: u16,
    pub api_base_url: String,
    pub api_token: Option<String>,
    #[serde(default = "get_default_execution_timeout")]
    pub execution_timeout_secs: u64,
    #[serde(default = "get_default_request_grace")]
    pub request_grace_secs: u64,
    #[serde(default = "get_default_attempt_idle")]
    pub attempt_idle_secs: u64,
    pub use_judge0: Option<bool>,
}

impl Config {
    /// Base url with a trailing slash so relative endpoint paths keep its prefix.
    pub fn base_url(&self) -> String {
        if self.api_base_url.ends_with('/') {
            self.api_base_url.clone()
        } else {
            format!("{}/", self.api_base_url)
        }
    }
}
