use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::identity::Role;
use crate::routes::{normalize_path, redirect_target, Access, RouteTable, Visibility};

#[derive(Subcommand)]
pub enum RoutesCommands {
    #[command(about = "List the active route table")]
    List,

    #[command(about = "Classify a path for a caller")]
    Check {
        #[arg(help = "Request path, e.g. /dashboard/org/users")]
        path: String,
        #[arg(long, help = "Caller role (USER or ORGANIZATION)")]
        role: Option<Role>,
        #[arg(long, help = "Treat the caller as authenticated")]
        authenticated: bool,
    },
}

fn visibility_label(visibility: Visibility) -> String {
    match visibility {
        Visibility::Public => "public".to_string(),
        Visibility::Authenticated => "authenticated".to_string(),
        Visibility::Restricted(role) => format!("role:{}", role),
    }
}

pub fn handle(cmd: RoutesCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let table = RouteTable::from_config(&config.gate)?;

    match cmd {
        RoutesCommands::List => {
            let descriptors = table.descriptors();
            match output_format {
                OutputFormat::Json => {
                    let routes: Vec<_> = descriptors
                        .iter()
                        .map(|d| json!({ "pattern": d.pattern, "visibility": visibility_label(d.visibility) }))
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "routes": routes,
                            "auth_redirect": table.auth_redirect_patterns(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    for d in &descriptors {
                        println!("{:<16} {}", visibility_label(d.visibility), d.pattern);
                    }
                    println!("{:<16} {}", "auth-redirect", table.auth_redirect_patterns().join(", "));
                }
            }
            Ok(())
        }
        RoutesCommands::Check { path, role, authenticated } => {
            let path = normalize_path(&path);
            let access = table.classify(&path, role, authenticated);
            let verdict = match access {
                Access::Allow => "ALLOW",
                Access::Deny => "DENY",
            };
            let redirect = match (access, authenticated) {
                (Access::Allow, _) => None,
                (Access::Deny, true) => Some(redirect_target(role).to_string()),
                (Access::Deny, false) => Some(format!(
                    "{}?redirect={}",
                    config.gate.login_path,
                    urlencoding::encode(&path)
                )),
            };

            let message = match &redirect {
                Some(target) => format!("{} {} -> {}", verdict, path, target),
                None => format!("{} {}", verdict, path),
            };
            output_success(
                &output_format,
                &message,
                Some(json!({
                    "path": path,
                    "access": verdict,
                    "visibility": table.visibility(&path).map(visibility_label),
                    "redirect": redirect,
                })),
            )
        }
    }
}
