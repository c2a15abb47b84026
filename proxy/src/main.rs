use std::net::{SocketAddr, TcpListener};
use std::process::ExitCode;

use proxy::{Config, ConnTable, ProxyState};
use runtime::logger::Logger;
use runtime::ActivityLog;
use utils::error::Result;

static LOGGER: Logger = Logger;

fn run() -> Result<()> {
	let args: Vec<String> = std::env::args().skip(1).collect();
	let config = Config::parse(&args)?;

	let mut activity_log = ActivityLog::open(&config.log_path)?;
	let mut table = ConnTable::new();
	let mut proxy = ProxyState::new(config.alpha);

	// The manifest bootstrap connection is opened before the listener
	// starts accepting browsers, so the bitrate list is primed by the
	// time the first fragment request needs one (spec.md §4.6).
	proxy::server::bootstrap_manifest(&config, &mut table)?;

	let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.listen_port)))?;
	listener.set_nonblocking(true)?;

	log::info!("proxy listening on port {}", config.listen_port);

	proxy::server::run(&listener, &config, &mut table, &mut proxy, &mut activity_log)
}

fn main() -> ExitCode {
	log::set_logger(&LOGGER).expect("logger installed exactly once");
	log::set_max_level(log::LevelFilter::Info);

	match run() {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			log::error!("fatal: {err}");
			ExitCode::FAILURE
		}
	}
}
