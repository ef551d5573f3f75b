use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use salien_core::{
    AccessToken, Coordinator, GameClient, HttpGameClient, Session, SwarmConfig, Worker,
};

const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    token: Option<String>,
    token_file: Option<String>,
    language: Option<String>,
    clan: Option<String>,
    config_path: String,
    list_planets: bool,
    debug: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            token: None,
            token_file: None,
            language: None,
            clan: None,
            config_path: DEFAULT_CONFIG_FILE.to_string(),
            list_planets: false,
            debug: false,
        }
    }
}

fn main() {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    if raw_args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return;
    }

    let options = match parse_options(raw_args.iter().map(|arg| arg.as_str())) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            print_help();
            process::exit(1);
        }
    };

    init_tracing(options.debug);

    if let Err(err) = run(options) {
        eprintln!("salien_bot failed: {err}");
        process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

fn run(options: CliOptions) -> Result<(), String> {
    let mut config = SwarmConfig::from_path_or_env(Path::new(options.config_path.as_str()))
        .map_err(|err| err.to_string())?;
    if let Some(language) = options.language.clone() {
        config.language = language;
    }
    if let Some(clan) = options.clan.clone() {
        config.clan_id = Some(clan);
    }

    let client = Arc::new(HttpGameClient::new(&config).map_err(|err| err.to_string())?);

    if options.list_planets {
        return list_planets(&*client);
    }

    let accounts = load_accounts(&options)?;
    if accounts.is_empty() {
        return Err("no valid access tokens; use --token or --token-file".to_string());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|err| format!("failed to install signal handler: {err}"))?;
    }

    let mut coordinator = Coordinator::new(Arc::clone(&client), config.clone());
    coordinator.start().map_err(|err| err.to_string())?;

    let mut workers = Vec::new();
    for (name, token) in accounts {
        let session = Session::new(token, name.clone());
        let worker = Worker::new(
            session,
            Arc::clone(&client),
            coordinator.handle(),
            config.clone(),
            Arc::clone(&shutdown),
        );
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run())
            .map_err(|err| format!("failed to spawn worker thread: {err}"))?;
        tracing::info!(worker = %name, "worker thread started");
        workers.push(join);
    }

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(300));
    }
    tracing::info!("shutdown requested, draining workers");
    for join in workers {
        let _ = join.join();
    }
    coordinator.stop().map_err(|err| err.to_string())?;
    Ok(())
}

fn list_planets(client: &HttpGameClient) -> Result<(), String> {
    let response = client.planets();
    if !response.result.is_ok() {
        return Err(format!("planet list rejected: {}", response.result));
    }
    for planet in response.body.map(|body| body.planets).unwrap_or_default() {
        println!(
            "{}: {} ({}%)",
            planet.id,
            planet.state.name,
            (planet.state.capture_progress * 100.0).round() as u32
        );
    }
    Ok(())
}

fn load_accounts(options: &CliOptions) -> Result<Vec<(String, AccessToken)>, String> {
    if let Some(path) = options.token_file.as_deref() {
        let content = fs::read_to_string(path)
            .map_err(|err| format!("failed to read token file {path}: {err}"))?;
        return Ok(parse_token_lines(&content));
    }
    if let Some(raw) = options.token.as_deref() {
        let token = AccessToken::parse(raw).map_err(|err| err.to_string())?;
        return Ok(vec![("Account #0".to_string(), token)]);
    }
    Err("no access token provided; use --token or --token-file".to_string())
}

fn parse_token_lines(content: &str) -> Vec<(String, AccessToken)> {
    let mut accounts = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match AccessToken::parse(line) {
            Ok(token) => {
                accounts.push((format!("Account #{}", accounts.len()), token));
            }
            Err(err) => {
                tracing::warn!(line = index + 1, %err, "skipping invalid token line");
            }
        }
    }
    accounts
}

fn parse_options<'a>(args: impl Iterator<Item = &'a str>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.peekable();

    while let Some(arg) = iter.next() {
        match arg {
            "--token" | "-t" => {
                options.token = Some(parse_required_value(&mut iter, "--token")?);
            }
            "--token-file" | "-f" => {
                options.token_file = Some(parse_required_value(&mut iter, "--token-file")?);
            }
            "--language" => {
                options.language = Some(parse_required_value(&mut iter, "--language")?);
            }
            "--clan" => {
                options.clan = Some(parse_required_value(&mut iter, "--clan")?);
            }
            "--config" => {
                options.config_path = parse_required_value(&mut iter, "--config")?;
            }
            "--list-planets" | "-l" => {
                options.list_planets = true;
            }
            "--debug" | "-d" => {
                options.debug = true;
            }
            _ => return Err(format!("unknown option: {arg}")),
        }
    }

    Ok(options)
}

fn parse_required_value<'a, I>(
    iter: &mut std::iter::Peekable<I>,
    flag: &str,
) -> Result<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let Some(value) = iter.next() else {
        return Err(format!("{flag} requires a value"));
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{flag} requires a non-empty value"));
    }
    Ok(value.to_string())
}

fn print_help() {
    println!(
        "Usage: salien_bot [options]\n\n\
Coordinated multi-account automation for the territory-control minigame.\n\n\
Options:\n\
  -t, --token <token>        access token for a single account\n\
  -f, --token-file <path>    file with one access token per line\n\
      --language <language>  response language (default: english)\n\
      --clan <clanid>        represent this clan after startup\n\
      --config <path>        config file path (default: {DEFAULT_CONFIG_FILE})\n\
  -l, --list-planets         list contestable planets and exit\n\
  -d, --debug                default log filter at debug level\n\
  -h, --help                 show help"
    );
}
