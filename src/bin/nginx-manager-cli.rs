use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "nginx-manager-cli")]
#[command(about = "Command line client for the nginx-manager admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9000")]
    url: String,

    /// Bearer key, when the server has `api.api_key` set
    #[arg(short, long, env = "NGINX_MANAGER_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every site with its state
    Sites,
    /// Print the raw config of a site
    Show { name: String },
    /// Enable a site, then validate and reload
    Enable { name: String },
    /// Disable a site, then validate and reload
    Disable { name: String },
    /// Move a site to the archive
    Archive { name: String },
    /// Bring an archived site back (disabled)
    Restore { name: String },
    /// Write an app manifest for the watcher to deploy
    App {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        port: u16,
        #[arg(long, default_value = "http")]
        protocol: String,
        #[arg(long, default_value = "127.0.0.1")]
        hostname: String,
    },
    /// Request a TLS certificate for a domain
    Ssl { domain: String },
    /// Check the server is up
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api", cli.url.trim_end_matches('/'));

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let request = match cli.command {
        Commands::Sites => {
            let res = client.get(format!("{}/sites", api)).headers(headers).send().await?;
            return print_sites(res).await;
        }
        Commands::Show { name } => {
            let res = client
                .get(format!("{}/sites/{}", api, name))
                .headers(headers)
                .send()
                .await?;
            let body = read_json(res).await?;
            println!("{}", body["content"].as_str().unwrap_or_default());
            return Ok(());
        }
        Commands::Enable { name } => client
            .post(format!("{}/sites/{}/toggle", api, name))
            .json(&json!({ "enabled": true })),
        Commands::Disable { name } => client
            .post(format!("{}/sites/{}/toggle", api, name))
            .json(&json!({ "enabled": false })),
        Commands::Archive { name } => client.post(format!("{}/sites/{}/archive", api, name)),
        Commands::Restore { name } => client.post(format!("{}/sites/{}/restore", api, name)),
        Commands::App {
            domain,
            port,
            protocol,
            hostname,
        } => client.post(format!("{}/apps", api)).json(&json!({
            "domain": domain,
            "protocol": protocol,
            "hostname": hostname,
            "port": port,
        })),
        Commands::Ssl { domain } => client
            .post(format!("{}/ssl", api))
            .json(&json!({ "domain": domain })),
        Commands::Health => client.get(format!("{}/health", api)),
    };

    let res = request.headers(headers).send().await?;
    let body = read_json(res).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn read_json(res: reqwest::Response) -> Result<Value, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or(text);
        return Err(format!("admin API returned {}: {}", status, message).into());
    }
    Ok(serde_json::from_str(&text)?)
}

async fn print_sites(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let body = read_json(res).await?;
    let sites = body["sites"].as_array().cloned().unwrap_or_default();

    println!("{:<32} {:<8} {:<8} {:<9} {}", "NAME", "ENABLED", "TLS", "STATE", "URL");
    for site in sites {
        let state = if site["isArchived"].as_bool().unwrap_or(false) {
            "archived"
        } else {
            site["isActive"].as_str().unwrap_or("unknown")
        };
        println!(
            "{:<32} {:<8} {:<8} {:<9} {}",
            site["name"].as_str().unwrap_or_default(),
            site["isEnabled"].as_bool().unwrap_or(false),
            site["hasTls"].as_bool().unwrap_or(false),
            state,
            site["displayUrl"].as_str().unwrap_or_default(),
        );
    }
    Ok(())
}
