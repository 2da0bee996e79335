use anyhow::Context;
use tracing::{error, info, Level};

use microloan::{
    configuration::{
        get_configuration, set_configuration, AppState, Config, State,
    },
    error::Error,
    handler::status_task,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match init() {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    info!(
        "loan contract {} on {}",
        config.loan_contract, config.rpc_host
    );

    let state = State::new(config)
        .context("could not build the contract runtime client")?;
    let app_state = AppState::new(state);

    let (_, _) = tokio::try_join!(
        server::server_task(&app_state),
        status_task(app_state.clone()),
    )?;

    Ok(())
}

fn init() -> Result<Config, Error> {
    set_configuration()?;
    let config = get_configuration()?;
    Ok(config)
}
