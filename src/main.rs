use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use geo_gacha::{
    client,
    contract,
    network,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

const LOG_FILE_PREFIX: &str = "geo-gacha.log";

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: geo-gacha [--agent-url <url>] [--rpc-url <url>] [--contract <address>]\n\
         [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --agent-url <url>      JSON-RPC endpoint of your wallet (signing agent)\n\
           --rpc-url <url>        Override the network RPC URL (default {})\n\
           --contract <address>   Randomness contract address (default {})\n\
           --log-dir <path>       Directory for log files (default {})",
        network::flow_evm_testnet().rpc_url,
        contract::DEFAULT_RANDOMNESS_CONTRACT,
        client::DEFAULT_LOG_DIR,
    );
    std::process::exit(0);
}

fn take_value(
    flag: &str,
    args: &mut impl Iterator<Item = String>,
    slot: &mut Option<String>,
) -> Result<()> {
    let value = args
        .next()
        .ok_or_else(|| eyre!("{flag} requires a value"))?;
    if slot.is_some() {
        return Err(eyre!("{flag} may only be specified once"));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<client::AppConfig> {
    let mut args = args.into_iter();
    let mut agent_url: Option<String> = None;
    let mut rpc_url: Option<String> = None;
    let mut contract: Option<String> = None;
    let mut log_dir: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--agent-url" => take_value("--agent-url", &mut args, &mut agent_url)?,
            "--rpc-url" => take_value("--rpc-url", &mut args, &mut rpc_url)?,
            "--contract" => take_value("--contract", &mut args, &mut contract)?,
            "--log-dir" => take_value("--log-dir", &mut args, &mut log_dir)?,
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let log_dir = match log_dir {
        Some(raw) => PathBuf::from(shellexpand::tilde(&raw).into_owned()),
        None => PathBuf::from(client::DEFAULT_LOG_DIR),
    };

    Ok(client::AppConfig {
        agent_url,
        rpc_url,
        contract: contract
            .unwrap_or_else(|| contract::DEFAULT_RANDOMNESS_CONTRACT.to_string()),
        log_dir,
    })
}

/// The terminal UI owns stdout, so logs go to a daily rolling file.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!(e))?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args(std::env::args().skip(1))?;
    let _guard = init_tracing(&app_config.log_dir)?;
    tracing::info!("starting geo-gacha client");
    client::run_app(app_config).await
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_cli_args__defaults_without_flags() {
        let config = parse_cli_args(Vec::new()).unwrap();

        assert_eq!(config.agent_url, None);
        assert_eq!(config.rpc_url, None);
        assert_eq!(config.contract, contract::DEFAULT_RANDOMNESS_CONTRACT);
        assert_eq!(config.log_dir, PathBuf::from(client::DEFAULT_LOG_DIR));
    }

    #[test]
    fn parse_cli_args__reads_every_flag() {
        // given
        let raw = args(&[
            "--agent-url",
            "http://127.0.0.1:1248",
            "--contract",
            "0xabc",
            "--log-dir",
            "/tmp/gacha",
        ]);

        // when
        let config = parse_cli_args(raw).unwrap();

        // then
        assert_eq!(config.agent_url.as_deref(), Some("http://127.0.0.1:1248"));
        assert_eq!(config.contract, "0xabc");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/gacha"));
    }

    #[test]
    fn parse_cli_args__rejects_repeated_flag() {
        let raw = args(&["--rpc-url", "http://a", "--rpc-url", "http://b"]);

        let err = parse_cli_args(raw).unwrap_err();

        assert!(err.to_string().contains("only be specified once"));
    }

    #[test]
    fn parse_cli_args__rejects_missing_value_and_unknown_flag() {
        assert!(parse_cli_args(args(&["--agent-url"])).is_err());
        assert!(parse_cli_args(args(&["--fake-vrf"])).is_err());
    }
}
