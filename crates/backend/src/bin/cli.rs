use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared_types::{
    LoginResponse, LoginUserRequest, RegisterUserRequest, StatusResponse, UserEnvelope,
};

#[derive(Parser)]
#[command(name = "auth-cli")]
#[command(about = "CLI for the authentication API")]
#[command(
    long_about = "A command-line client for the authentication server.\n\n\
    Registers local accounts, signs in to obtain a session token, and calls\n\
    protected endpoints with that token as a bearer credential."
)]
struct Cli {
    /// Backend server URL to connect to.
    #[arg(
        short,
        long,
        default_value = "http://localhost:8000",
        env = "AUTH_API_URL"
    )]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a local account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in and print the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the account the token belongs to
    Me {
        #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Ask the server to clear the session cookie
    Logout {
        #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.base_url.trim_end_matches('/');

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            let response = client
                .post(format!("{}/api/auth/register", base_url))
                .json(&RegisterUserRequest {
                    name,
                    email,
                    password,
                })
                .send()
                .await?;
            let envelope: UserEnvelope = parse(response).await?;
            let user = envelope.data.user;
            println!("Registered [{}] {} <{}>", &user.id.to_string()[..8], user.name, user.email);
        }
        Commands::Login { email, password } => {
            let response = client
                .post(format!("{}/api/auth/login", base_url))
                .json(&LoginUserRequest { email, password })
                .send()
                .await?;
            let login: LoginResponse = parse(response).await?;
            println!("{}", login.token);
        }
        Commands::Me { token } => {
            let response = client
                .get(format!("{}/api/users/me", base_url))
                .bearer_auth(token)
                .send()
                .await?;
            let envelope: UserEnvelope = parse(response).await?;
            let user = envelope.data.user;
            println!("[{}] {} <{}>", &user.id.to_string()[..8], user.name, user.email);
            println!("    role: {}, provider: {}, verified: {}", user.role, user.provider, user.verified);
        }
        Commands::Logout { token } => {
            let response = client
                .get(format!("{}/api/auth/logout", base_url))
                .bearer_auth(token)
                .send()
                .await?;
            let _: StatusResponse = parse(response).await?;
            println!("Logged out. The token remains valid until it expires; discard it.");
        }
    }

    Ok(())
}

/// Decode a success body, or turn the server's error body into an error.
async fn parse<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["message"].as_str().unwrap_or("request failed");
        anyhow::bail!("{} ({})", message, status);
    }

    response.json().await.context("Invalid response from server")
}
