//! Doctor command for deployment diagnostics
//!
//! Checks that the configuration is usable and that the generation gateway
//! and the search service answer.

use crate::config::Config;
use crate::gateway::HttpGateway;
use crate::search::HttpSearchClient;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
}

impl Doctor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        vec![
            self.check_config(),
            self.check_shrink_schedule(),
            self.check_gateway().await,
            self.check_search().await,
        ]
    }

    /// Check 1: configuration ranges
    fn check_config(&self) -> HealthCheck {
        match self.config.validate() {
            Ok(()) => HealthCheck::new("Configuration", HealthStatus::Pass),
            Err(e) => HealthCheck::new("Configuration", HealthStatus::Fail(e.to_string())),
        }
    }

    /// Check 2: the shrink schedule must fit inside the prompt cap
    fn check_shrink_schedule(&self) -> HealthCheck {
        let shrink = &self.config.gateway.shrink;
        let prompt_cap = self.config.prompt.max_bytes;
        let status = if shrink.max_bytes < prompt_cap {
            HealthStatus::Warn(format!(
                "gateway cap {} bytes is below prompt cap {} bytes; first attempt always truncates",
                shrink.max_bytes, prompt_cap
            ))
        } else if shrink.tail_bytes >= shrink.max_bytes {
            HealthStatus::Fail("shrink tail is not smaller than the byte cap".to_string())
        } else {
            HealthStatus::Pass
        };
        HealthCheck::new("Shrink Schedule", status)
    }

    /// Check 3: generation gateway reachable
    async fn check_gateway(&self) -> HealthCheck {
        let gateway = match HttpGateway::with_config(self.config.gateway.connection.clone()) {
            Ok(gateway) => gateway,
            Err(e) => return HealthCheck::new("Gateway", HealthStatus::Fail(e.to_string())),
        };
        match gateway.health_check().await {
            Ok(true) => HealthCheck::new("Gateway", HealthStatus::Pass),
            _ => HealthCheck::new(
                "Gateway",
                HealthStatus::Warn("not reachable; answers will use the local fallback".to_string()),
            ),
        }
    }

    /// Check 4: search service reachable
    async fn check_search(&self) -> HealthCheck {
        let search = match HttpSearchClient::with_config(self.config.search.clone()) {
            Ok(search) => search,
            Err(e) => return HealthCheck::new("Search Service", HealthStatus::Fail(e.to_string())),
        };
        match search.health_check().await {
            Ok(true) => HealthCheck::new("Search Service", HealthStatus::Pass),
            _ => HealthCheck::new(
                "Search Service",
                HealthStatus::Fail("not reachable; no evidence can be retrieved".to_string()),
            ),
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\nGroundAsk Diagnostics\n");
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "PASS".to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg),
            };
            println!("{:<20} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_check() {
        let doctor = Doctor::new(Config::default());
        assert_eq!(doctor.check_config().status, HealthStatus::Pass);

        let mut config = Config::default();
        config.retrieval.params.alpha = -0.1;
        assert!(matches!(
            Doctor::new(config).check_config().status,
            HealthStatus::Fail(_)
        ));
    }

    #[test]
    fn test_shrink_schedule_check() {
        assert_eq!(
            Doctor::new(Config::default()).check_shrink_schedule().status,
            HealthStatus::Pass
        );

        let mut config = Config::default();
        config.gateway.shrink.max_bytes = 4_000;
        assert!(matches!(
            Doctor::new(config).check_shrink_schedule().status,
            HealthStatus::Warn(_)
        ));
    }

    #[test]
    fn test_overall_status() {
        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Warn("warning".to_string())),
        ];
        assert!(Doctor::overall_status(&checks));

        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Fail("error".to_string())),
        ];
        assert!(!Doctor::overall_status(&checks));
    }
}
