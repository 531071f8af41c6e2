//! ping-thing: probe loop binary.
//!
//! thin orchestration: env -> feeds -> probe loop -> exit on first failure

use ping_core::config::{parse_commitment, Config, ConfigError};
use ping_core::{
    keypair_from_base58, ProbeLoop, ReportSink, RpcChain, RpcNetwork, TransactionTemplate,
};
use ping_live::LiveState;
use ping_pubsub::PubsubSource;
use solana_sdk::signature::{Keypair, Signer};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // a missing .env is fine, the environment may already be set
    let _ = dotenvy::dotenv();

    let verbose = env::var("VERBOSE_LOG").is_ok_and(|v| v == "true");
    init_tracing(verbose);

    let args: Vec<String> = env::args().collect();
    let (config, payer) = match parse_config(&args, |name| env::var(name).ok()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("config: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("starting");
    tracing::info!("rpc={}", config.rpc.rpc_url);
    tracing::info!("ws={}", config.rpc.ws_url);
    tracing::info!("commitment={}", config.rpc.commitment.commitment);
    tracing::info!("payer={}", payer.pubkey());
    tracing::info!(
        "report={}",
        if config.report.skip { "log only" } else { config.report.url.as_str() }
    );

    let chain = Arc::new(RpcChain::new(&config.rpc.rpc_url, config.rpc.commitment));
    let pubsub = PubsubSource::new(&config.rpc.ws_url, config.rpc.commitment);

    // start blockhash and slot feeds
    let mut live = LiveState::new(config.live.clone());
    if let Err(e) = live.start(Arc::new(pubsub.clone()), Arc::clone(&chain)) {
        tracing::error!("live state failed: {}", e);
        std::process::exit(1);
    }

    let reporter = match ReportSink::from_config(&config.report) {
        Ok(reporter) => reporter,
        Err(e) => {
            tracing::error!("reporter: {}", e);
            std::process::exit(1);
        }
    };

    let network = Arc::new(RpcNetwork::new(chain, pubsub, config.rpc.block_height_poll));
    let template = TransactionTemplate::new(payer, &config.payload);
    let probe = ProbeLoop::new(
        live.anchors(),
        live.slots(),
        network,
        reporter,
        template,
        &config,
    );

    tokio::select! {
        err = probe.run() => {
            tracing::error!("probe loop exited: {}", err);
            std::process::exit(1);
        }
        err = live.stopped() => {
            tracing::error!("live feed exited: {}", err);
            std::process::exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("caught interrupt signal, shutting down");
        }
    }

    live.stop();
    tracing::info!("done");
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,ping_core=debug,ping_live=debug,ping_pubsub=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// cli flags first, then environment, then defaults.
fn parse_config(
    args: &[String],
    var: impl Fn(&str) -> Option<String>,
) -> Result<(Config, Keypair), ConfigError> {
    let defaults = Config::default();

    let rpc_url = arg_value(args, "--rpc")
        .or_else(|| var("RPC_ENDPOINT"))
        .unwrap_or_else(|| defaults.rpc.rpc_url.clone());

    let ws_url = arg_value(args, "--ws")
        .or_else(|| var("WS_ENDPOINT"))
        .unwrap_or_else(|| defaults.rpc.ws_url.clone());

    let payer = var("WALLET_PRIVATE_KEYPAIR")
        .ok_or(ConfigError::Missing("WALLET_PRIVATE_KEYPAIR"))
        .and_then(|encoded| keypair_from_base58(encoded.as_str()))?;

    let mut config = Config::custom(rpc_url, ws_url);

    if let Some(commitment) = var("COMMITMENT") {
        config = config.with_commitment(parse_commitment(&commitment)?);
    }
    if let Some(ms) = parse_var::<u64>(&var, "SLEEP_MS_RPC")? {
        config = config.with_settle_delay(Duration::from_millis(ms));
    }
    if let Some(ms) = parse_var::<u64>(&var, "SLEEP_MS_LOOP")? {
        config = config.with_loop_delay(Duration::from_millis(ms));
    }
    if let Some(key) = var("VA_API_KEY").filter(|key| !key.is_empty()) {
        config = config.with_api_key(key);
    }
    if let Some(url) = var("REPORT_URL") {
        config = config.with_report_url(url);
    }
    if let Some(fee) = parse_var::<u64>(&var, "PRIORITY_FEE")? {
        config = config.with_priority_fee(fee);
    }
    config = config.with_skip_report(var("SKIP_VALIDATORS_APP").is_some_and(|v| is_set(&v)));

    let mut live = config.live.clone();
    if let Some(attempts) = parse_var::<u32>(&var, "MAX_BLOCKHASH_FETCH_ATTEMPTS")? {
        live = live.with_max_anchor_attempts(attempts);
    }
    if let Some(attempts) = parse_var::<u32>(&var, "MAX_SLOT_FETCH_ATTEMPTS")? {
        live = live.with_max_slot_attempts(attempts);
    }
    config = config.with_live(live);

    config.validate()?;
    Ok((config, payer))
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(None),
    }
}

fn is_set(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false")
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}
