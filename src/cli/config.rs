//! Conversion of CLI arguments into a [`ServiceConfig`]

use crate::cli::main_impl::{BackendChoice, Cli};
use crate::config::{BackendSpec, ServiceConfig, DEFAULT_LOCAL_NAME};
use anyhow::{Context, Result};
use std::time::Duration;

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a validated `ServiceConfig` from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .host(cli.host.clone())
            .port(cli.port)
            .fetch_timeout(Duration::from_secs(cli.fetch_timeout))
            .backend_timeout(Duration::from_secs(cli.backend_timeout))
            .max_body_bytes(cli.max_body_bytes)
            .require_local_model(!cli.optional_local_model)
            .backends(Self::backend_specs(cli));

        for origin in &cli.allowed_origins {
            builder = builder.allowed_origin(origin.clone());
        }

        builder.build().context("Invalid gateway configuration")
    }

    fn backend_specs(cli: &Cli) -> Vec<BackendSpec> {
        let mut specs: Vec<BackendSpec> = Vec::new();

        // A kind listed twice is only added once
        for choice in cli.backend_order.iter().copied() {
            match choice {
                BackendChoice::Local => {
                    if specs.iter().any(|s| matches!(s, BackendSpec::Local { .. })) {
                        continue;
                    }
                    specs.push(BackendSpec::Local {
                        name: DEFAULT_LOCAL_NAME.to_string(),
                        model: cli.model.clone(),
                        model_path: cli.model_path.clone(),
                    });
                },
                BackendChoice::Remote => {
                    if specs.iter().any(|s| matches!(s, BackendSpec::Remote { .. })) {
                        continue;
                    }
                    let endpoints: Vec<&String> = cli
                        .remote_endpoints
                        .iter()
                        .filter(|e| !e.trim().is_empty())
                        .collect();
                    for (index, endpoint) in endpoints.iter().enumerate() {
                        let name = if index == 0 {
                            "remote".to_string()
                        } else {
                            format!("remote-{}", index + 1)
                        };
                        specs.push(BackendSpec::Remote {
                            name,
                            endpoint: endpoint.trim().to_string(),
                            token: cli.hf_token.clone(),
                        });
                    }
                },
            }
        }

        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["bgremove-gateway"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_default_order_is_local_then_remote() {
        let config = CliConfigBuilder::from_cli(&parse(&[])).unwrap();
        let names: Vec<&str> = config.backends.iter().map(BackendSpec::name).collect();
        assert_eq!(names, vec!["local", "remote"]);
    }

    #[test]
    fn test_remote_only_with_multiple_endpoints() {
        let cli = parse(&[
            "--backend-order",
            "remote",
            "--remote-endpoint",
            "https://a.example/rmbg,https://b.example/rmbg",
            "--hf-token",
            "hf_abc",
        ]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert!(matches!(
            &config.backends[1],
            BackendSpec::Remote { name, token: Some(token), .. } if name == "remote-2" && token == "hf_abc"
        ));
    }

    #[test]
    fn test_repeated_kind_is_added_once() {
        let cli = parse(&["--backend-order", "local,remote,local"]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.backends.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let cli = parse(&["--backend-timeout", "0"]);
        assert!(CliConfigBuilder::from_cli(&cli).is_err());

        let cli = parse(&["--model", "no-such-model"]);
        assert!(CliConfigBuilder::from_cli(&cli).is_err());
    }

    #[test]
    fn test_origins_are_forwarded() {
        let cli = parse(&["--allowed-origin", "https://app.example,https://admin.example"]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.allowed_origins.len(), 2);
    }
}
