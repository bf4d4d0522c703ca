use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::issue_token;
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(help = "User id (uuid) to place in the token subject")]
    pub user_id: Uuid,

    #[arg(long, help = "Display name claim")]
    pub name: Option<String>,
}

pub fn handle(args: TokenArgs, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = issue_token(&config.security, args.user_id, args.name)?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({
                "token": token,
                "user_id": args.user_id,
                "expires_in_hours": config.security.jwt_expiry_hours,
            })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
