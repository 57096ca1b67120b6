//! `zyxel` - run one command on a switch CLI and print its output.
//!
//! Connection settings come from flags, the environment, or a `.env` file
//! in the working directory:
//!
//! ```text
//! ZYXEL_HOST=192.168.1.1
//! ZYXEL_USER=admin
//! ZYXEL_PASSWORD=secret
//! ZYXEL_PORT=22
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{debug, warn};

use zyxsh::{DriverBuilder, HostKeyVerification, Response};

const EXAMPLES: &str = "\
Examples:
  zyxel -c 'show system-information'
  zyxel -c 'show running-config'
  zyxel -c 'show interface *'
  zyxel -c 'show mac address-table'
  zyxel -c 'show vlan'
  zyxel -c '?'                        # show available commands";

#[derive(Parser, Debug)]
#[command(name = "zyxel", version)]
#[command(about = "Run a command on a switch CLI over SSH")]
#[command(after_help = EXAMPLES)]
struct Args {
    /// Command to execute
    #[arg(short, long)]
    command: String,

    /// Switch hostname or IP
    #[arg(long, env = "ZYXEL_HOST")]
    host: String,

    /// SSH port
    #[arg(long, env = "ZYXEL_PORT", default_value_t = 22)]
    port: u16,

    /// SSH username
    #[arg(short, long, env = "ZYXEL_USER")]
    user: String,

    /// SSH password
    #[arg(long, env = "ZYXEL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Private key file, used when no password is given
    #[arg(long, env = "ZYXEL_KEY")]
    key: Option<PathBuf>,

    /// Host key checking
    #[arg(long, value_enum, default_value_t = HostKeyCheck::AcceptNew)]
    host_key_check: HostKeyCheck,

    /// Seconds to wait for the connection and authentication
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Seconds to wait for the first prompt
    #[arg(long, default_value_t = 5)]
    prompt_timeout: u64,

    /// Seconds to wait for the command's output
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Milliseconds of silence that end the output
    #[arg(long, default_value_t = 500)]
    idle_ms: u64,

    /// Remove terminal escape sequences from the output
    #[arg(long)]
    strip_ansi: bool,

    /// Print the transcript as received instead of the cleaned lines
    #[arg(long, conflicts_with = "json")]
    raw: bool,

    /// Print the response as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HostKeyCheck {
    Strict,
    AcceptNew,
    Disabled,
}

impl From<HostKeyCheck> for HostKeyVerification {
    fn from(check: HostKeyCheck) -> Self {
        match check {
            HostKeyCheck::Strict => HostKeyVerification::Strict,
            HostKeyCheck::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyCheck::Disabled => HostKeyVerification::Disabled,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before parsing so the env fallbacks see it
    let dotenv = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match dotenv {
        Ok(path) => debug!("loaded {}", path.display()),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => warn!("ignoring .env: {}", e),
    }

    let args = Args::parse();

    match run(&args).await {
        Ok(response) => {
            print_response(&args, &response);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<Response, Box<dyn std::error::Error>> {
    let mut builder = DriverBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .host_key_verification(args.host_key_check.into())
        .timeout(Duration::from_secs(args.connect_timeout))
        .prompt_timeout(Duration::from_secs(args.prompt_timeout))
        .command_timeout(Duration::from_secs(args.timeout))
        .idle_timeout(Duration::from_millis(args.idle_ms))
        .strip_ansi(args.strip_ansi);

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        return Err("ZYXEL_PASSWORD (or --password / --key) must be set".into());
    }

    Ok(builder.build()?.execute(&args.command).await?)
}

fn print_response(args: &Args, response: &Response) {
    if args.json {
        match serde_json::to_string_pretty(response) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else if args.raw {
        print!("{}", response.raw_result);
    } else {
        for line in response.lines() {
            println!("{}", line);
        }
    }
}
