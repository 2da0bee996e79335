use std::{env, fs, io::ErrorKind, ops::Deref, sync::Arc};

use alloy_primitives::Address;
use url::Url;

use crate::{
    error::Error,
    handler::{ActionDispatcher, LoanAggregator},
    provider::{
        EventSource, EvmLoanContract, LoanContractReader, LoanContractWriter,
    },
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

/// Service object built once at start and shared with every consumer.
pub struct State {
    pub config: Config,
    pub aggregator: LoanAggregator,
    pub dispatcher: ActionDispatcher,
}

impl State {
    pub fn new(config: Config) -> Result<State, Error> {
        let contract = Arc::new(EvmLoanContract::new(&config)?);
        Ok(Self::with_contract(config, contract.clone(), contract))
    }

    pub fn with_contract(
        config: Config,
        reader: Arc<dyn LoanContractReader>,
        writer: Arc<dyn LoanContractWriter>,
    ) -> State {
        let aggregator =
            LoanAggregator::new(EventSource::new(reader), config.max_tasks);
        let dispatcher = ActionDispatcher::new(writer);

        Self {
            config,
            aggregator,
            dispatcher,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_host: Url,
    pub loan_contract: Address,
    pub from_block: u64,
    pub timeout: u64,
    pub receipt_poll_interval_ms: u64,
    pub max_tasks: usize,
    pub status_interval: u64,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<String>,
    pub auth: String,
}

pub fn get_configuration() -> Result<Config, Error> {
    let rpc_host = Url::parse(&env::var("RPC_HOST")?)?;
    let loan_contract = parse_address(&env::var("LOAN_CONTRACT")?)?;
    let from_block = env::var("FROM_BLOCK")?.parse()?;
    let timeout = env::var("TIMEOUT")?.parse()?;
    let receipt_poll_interval_ms =
        env::var("RECEIPT_POLL_INTERVAL_MS")?.parse()?;
    let max_tasks = env::var("MAX_TASKS")?.parse()?;
    let status_interval = env::var("STATUS_INTERVAL_IN_SEC")?.parse()?;

    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = env::var("ALLOWED_ORIGINS")?
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect::<Vec<String>>();
    let static_dir = optional_var("STATIC_DIRECTORY")?.map(|dir| {
        format!("{}/{}", env!("CARGO_MANIFEST_DIR"), dir)
    });
    let auth = env::var("AUTH")?;

    if auth.is_empty() {
        return Err(Error::ConfigurationError(String::from(
            "AUTH must not be empty",
        )));
    }

    let config = Config {
        rpc_host,
        loan_contract,
        from_block,
        timeout,
        receipt_poll_interval_ms,
        max_tasks,
        status_interval,
        server_host,
        port,
        allowed_origins,
        static_dir,
        auth,
    };

    Ok(config)
}

/// Loads `.env` (optional) and `microloan.conf` from the crate directory
/// into the process environment. Variables that are already set win.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";
    let service_config_file: &str = "microloan.conf";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);
    let service_config_path = format!("{}/{}", directory, service_config_file);

    match fs::read_to_string(path) {
        Ok(config_string) => apply_config(parse_config_string(&config_string)),
        Err(e) if e.kind() == ErrorKind::NotFound => {},
        Err(e) => return Err(Error::Io(e)),
    }

    let service_config_string = fs::read_to_string(service_config_path)?;
    apply_config(parse_config_string(&service_config_string));

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect()
}

fn apply_config(params: Vec<(String, String)>) {
    for (key, value) in params {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn optional_var(key: &str) -> Result<Option<String>, Error> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::VAR(e)),
    }
}

fn parse_address(value: &str) -> Result<Address, Error> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", value, e)))
}
