use std::net::{SocketAddr, UdpSocket};
use std::process::ExitCode;

use nameserver::config::Mode;
use nameserver::{Config, State};
use runtime::logger::Logger;
use runtime::ActivityLog;
use topo::LsaStore;
use utils::error::Result;

static LOGGER: Logger = Logger;

fn run() -> Result<()> {
	let args: Vec<String> = std::env::args().skip(1).collect();
	let config = Config::parse(&args)?;

	let mut activity_log = ActivityLog::open(&config.log_path)?;

	let servers_contents = std::fs::read_to_string(&config.servers_path)?;
	let servers = nameserver::state::parse_servers(&servers_contents)?;

	let graph = match config.mode {
		Mode::RoundRobin => None,
		Mode::Geographic => {
			let lsa_contents = std::fs::read_to_string(&config.lsa_path)?;
			let mut store = LsaStore::new();
			store.ingest_file(&lsa_contents)?;
			Some(store.build_graph())
		}
	};

	let mut state = State::new(config.mode, servers, graph)?;

	let socket = UdpSocket::bind(SocketAddr::from((config.bind_ip, config.bind_port)))?;
	socket.set_nonblocking(true)?;

	log::info!("nameserver listening on {}:{} ({:?})", config.bind_ip, config.bind_port, config.mode);

	nameserver::server::run(&socket, &mut state, &mut activity_log)
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
