use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "modulectl")]
#[command(about = "Manage modules of a running module gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "MODULECTL_URL")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION", env = "MODULECTL_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show route table and registry status
    Status,
    /// List every linked module with its install state
    List,
    /// Install a module, optionally under a custom base path ("/" mounts at the root)
    Install {
        module_id: String,
        #[arg(long)]
        base_path: Option<String>,
    },
    /// Uninstall a module (its record is kept)
    Uninstall { module_id: String },
    /// Record the linked version of an installed module
    Upgrade { module_id: String },
    /// Change the base path of a module
    SetPath { module_id: String, base_path: String },
    /// Force every process to rebuild its route table
    Reload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::List => client.get(format!("{base}/admin/modules")),
        Commands::Install {
            module_id,
            base_path,
        } => client
            .post(format!("{base}/admin/modules/{module_id}/install"))
            .json(&json!({ "base_path": base_path })),
        Commands::Uninstall { module_id } => {
            client.post(format!("{base}/admin/modules/{module_id}/uninstall"))
        }
        Commands::Upgrade { module_id } => {
            client.post(format!("{base}/admin/modules/{module_id}/upgrade"))
        }
        Commands::SetPath {
            module_id,
            base_path,
        } => client
            .put(format!("{base}/admin/modules/{module_id}/path"))
            .json(&json!({ "base_path": base_path })),
        Commands::Reload => client.post(format!("{base}/admin/reload")),
    };

    let res = request.headers(headers).send().await?;
    let success = print_response(res).await?;
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) if status.is_success() => {
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(true)
        }
        Ok(json) => {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            eprintln!("Error ({}): {}", status, message);
            Ok(false)
        }
        Err(_) => {
            eprintln!("Error: Admin API returned status {}", status);
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
            Ok(status.is_success())
        }
    }
}
