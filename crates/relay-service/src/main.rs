//! Main entry point for the claim relay.
//!
//! The `relay` binary relays finders' signed claims to the Recover contract,
//! paying for the transactions with the relay account. It can run as an HTTP
//! server, process a single event the way a function-as-a-service handler
//! would, or produce a claim signature for testing.

use clap::{Parser, Subcommand};
use relay_account::codec;
use relay_config::Config;
use relay_types::{parse_address, parse_item_id};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

mod factory_registry;
mod handler;
mod server;

/// Command-line arguments for the relay.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP API server.
	Serve {
		/// Path to configuration file
		#[arg(short, long, default_value = "config.toml")]
		config: PathBuf,
	},
	/// Relay one claim event and print the response envelope.
	///
	/// Without `--config` the relay is configured from the MNEMONIC,
	/// PROVIDER_URL and CONTRACT_ADDRESS environment variables.
	Invoke {
		/// Path to configuration file
		#[arg(short, long)]
		config: Option<PathBuf>,
		/// Event JSON file, or `-` for stdin
		#[arg(short, long)]
		event: String,
	},
	/// Sign a claim with the item's claimer key and print the signature.
	SignClaim {
		/// Claimer private key (hex)
		#[arg(long, env = "CLAIMER_PRIVATE_KEY", hide_env_values = true)]
		private_key: String,
		/// Item identifier (bytes32 hex)
		#[arg(long)]
		good_id: String,
		/// Finder address
		#[arg(long)]
		finder: String,
		/// Description link submitted with the claim
		#[arg(long)]
		description_link: String,
	},
}

/// Main entry point for the relay.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// stdout carries command output
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	match args.command {
		Command::Serve { config } => serve(config).await,
		Command::Invoke { config, event } => invoke(config, &event).await,
		Command::SignClaim {
			private_key,
			good_id,
			finder,
			description_link,
		} => sign_claim(&private_key, &good_id, &finder, &description_link),
	}
}

async fn serve(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_file(&config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.relay.id);

	let api_config = match config.api.clone() {
		Some(api) if api.enabled => api,
		_ => return Err("The [api] section must be present and enabled to serve".into()),
	};

	let engine = Arc::new(factory_registry::build_relay_from_config(config).await?);
	server::start_server(api_config, engine).await?;

	tracing::info!("Stopped relay");
	Ok(())
}

async fn invoke(
	config_path: Option<PathBuf>,
	event: &str,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = match config_path {
		Some(path) => Config::from_file(path).await?,
		None => Config::from_env()?,
	};
	let body = read_event(event).await?;

	let engine = factory_registry::build_relay_from_config(config).await?;
	match handler::handle_raw_event(&engine, &body).await {
		Ok(response) => {
			println!("{}", serde_json::to_string_pretty(&response)?);
			Ok(())
		},
		Err(e) => {
			let response = handler::unavailable_response(&e);
			println!("{}", serde_json::to_string_pretty(&response)?);
			Err(e.into())
		},
	}
}

async fn read_event(source: &str) -> Result<Vec<u8>, std::io::Error> {
	if source == "-" {
		let mut buffer = Vec::new();
		tokio::io::stdin().read_to_end(&mut buffer).await?;
		Ok(buffer)
	} else {
		tokio::fs::read(source).await
	}
}

fn sign_claim(
	private_key: &str,
	good_id: &str,
	finder: &str,
	description_link: &str,
) -> Result<(), Box<dyn std::error::Error>> {
	let item_id = parse_item_id(good_id)?;
	let finder = parse_address("finder", finder)?;

	let digest = codec::encode(&item_id, &finder, description_link);
	let signature = codec::sign(private_key, &digest)?;

	let output = serde_json::json!({
		"goodID": item_id,
		"finder": finder,
		"descriptionLink": description_link,
		"digest": digest,
		"sig": signature,
	});
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_invoke_arguments() {
		let args = Args::parse_from(["relay", "invoke", "--event", "-", "-l", "debug"]);
		assert_eq!(args.log_level, "debug");
		assert!(matches!(
			args.command,
			Command::Invoke { config: None, ref event } if event == "-"
		));
	}

	#[test]
	fn test_serve_defaults() {
		let args = Args::parse_from(["relay", "serve"]);
		assert_eq!(args.log_level, "info");
		assert!(matches!(
			args.command,
			Command::Serve { ref config } if config == &PathBuf::from("config.toml")
		));
	}

	#[test]
	fn test_sign_claim_arguments() {
		let args = Args::parse_from([
			"relay",
			"sign-claim",
			"--private-key",
			handler::tests::CLAIMER_KEY,
			"--good-id",
			"0x1",
			"--finder",
			handler::tests::FINDER,
			"--description-link",
			"desc",
		]);
		assert!(matches!(args.command, Command::SignClaim { ref good_id, .. } if good_id == "0x1"));
	}

	#[test]
	fn test_sign_claim_rejects_bad_input() {
		assert!(sign_claim(handler::tests::CLAIMER_KEY, "0x1", "0x12", "desc").is_err());
		assert!(sign_claim("0x1234", "0x1", handler::tests::FINDER, "desc").is_err());
		assert!(sign_claim(handler::tests::CLAIMER_KEY, "0x1", handler::tests::FINDER, "d").is_ok());
	}

	#[tokio::test]
	async fn test_read_event_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(b"{\"goodID\":\"0x1\"}").unwrap();

		let body = read_event(file.path().to_str().unwrap()).await.unwrap();
		assert_eq!(body, b"{\"goodID\":\"0x1\"}");
	}
}
