use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::identity::Identity;
use crate::session::AuthState;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(extra)) = data {
                if let Some(object) = response.as_object_mut() {
                    object.extend(extra);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

fn print_identity(identity: &Identity) {
    println!("User: {} <{}>", identity.name, identity.email);
    println!("Role: {}", identity.role);
    println!("Email verified: {}", identity.email_verified);
    if identity.is_admin() {
        println!("Admin: yes");
    }
    if let Some(org) = &identity.organization_id {
        println!("Organization: {}", org);
    }
}

/// Output a mounted session state
pub fn output_auth_state(output_format: &OutputFormat, state: &AuthState) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "authenticated": state.authenticated,
                    "degraded": state.degraded,
                    "user": state.identity,
                }))?
            );
        }
        OutputFormat::Text => match &state.identity {
            Some(identity) if state.authenticated => {
                print_identity(identity);
                if state.degraded {
                    println!("(identity service unreachable, showing cached identity)");
                }
            }
            _ => println!("Not authenticated"),
        },
    }
    Ok(())
}
