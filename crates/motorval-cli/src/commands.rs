//! Command execution: wires the store and service together and renders
//! JSON to stdout.

use motorval_core::{
    ServiceConfig, StoreConfig, ValidationError, ValuationService, ValuationStore, Vrm,
};
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ValuationOutput {
    vrm: String,
    #[serde(rename = "lowestValue")]
    lowest_value: f64,
    #[serde(rename = "highestValue")]
    highest_value: f64,
    provider: String,
}

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let store = open_store(cli)?;
    tracing::debug!(db_path = %store.db_path().display(), "valuation store opened");

    match &cli.command {
        Command::Value { vrm, mileage } => {
            if *mileage == 0 {
                return Err(ValidationError::MileageNotPositive.into());
            }
            let vrm = Vrm::parse(vrm)?;
            let service = ValuationService::from_config(store, &ServiceConfig::from_env());
            let valuation = service.fetch_or_create(&vrm, *mileage).await?;
            render(cli, &valuation_output(&vrm, &valuation))
        }
        Command::Lookup { vrm } => {
            let vrm = Vrm::parse(vrm)?;
            let service = ValuationService::from_config(store, &ServiceConfig::from_env());
            match service.lookup(&vrm)? {
                Some(valuation) => render(cli, &valuation_output(&vrm, &valuation)),
                None => Err(CliError::NotFound(vrm.to_string())),
            }
        }
        Command::Logs { vrm } => {
            let vrm = Vrm::parse(vrm)?;
            let logs = store.provider_logs_for(vrm.as_str())?;
            render(cli, &logs)
        }
    }
}

fn open_store(cli: &Cli) -> Result<ValuationStore, CliError> {
    let mut config = StoreConfig::default();
    if let Some(db_path) = &cli.db_path {
        config.db_path = db_path.clone();
    }
    Ok(ValuationStore::open(config)?)
}

fn valuation_output(vrm: &Vrm, valuation: &motorval_core::Valuation) -> ValuationOutput {
    ValuationOutput {
        vrm: vrm.to_string(),
        lowest_value: valuation.lowest_value,
        highest_value: valuation.highest_value,
        provider: valuation.provider.display_name().to_owned(),
    }
}

fn render<T: Serialize>(cli: &Cli, value: &T) -> Result<(), CliError> {
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
