//! Command-line configuration (spec.md §6): `proxy <log> <alpha>
//! <listen-port> <fake-ip> <dns-ip> <dns-port> [<www-ip>]`.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use utils::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
	pub log_path: PathBuf,
	/// The EWMA smoothing factor, in `(0, 1]`.
	pub alpha: f64,
	pub listen_port: u16,
	/// The source address the proxy impersonates toward both the
	/// nameserver and the origin (spec.md §4.6, "Fake IP" in the
	/// glossary).
	pub fake_ip: Ipv4Addr,
	pub dns_ip: Ipv4Addr,
	pub dns_port: u16,
	/// When present, DNS resolution is bypassed entirely and every
	/// origin connection targets this address directly (spec.md §4.6).
	pub www_ip: Option<Ipv4Addr>,
}

const USAGE: &str = "usage: proxy <log> <alpha> <listen-port> <fake-ip> <dns-ip> <dns-port> [<www-ip>]";

impl Config {
	pub fn parse(args: &[String]) -> Result<Self> {
		let mut args = args.iter();

		let log_path = PathBuf::from(args.next().ok_or_else(|| Error::Config(USAGE.into()))?);

		let alpha: f64 = args
			.next()
			.ok_or_else(|| Error::Config(USAGE.into()))?
			.parse()
			.map_err(|_| Error::Config("alpha must be a float".into()))?;

		if !(0.0 < alpha && alpha <= 1.0) {
			return Err(Error::Config("alpha must be in (0, 1]".into()));
		}

		let listen_port: u16 = args
			.next()
			.ok_or_else(|| Error::Config(USAGE.into()))?
			.parse()
			.map_err(|_| Error::Config("invalid listen port".into()))?;

		let fake_ip: Ipv4Addr = args
			.next()
			.ok_or_else(|| Error::Config(USAGE.into()))?
			.parse()
			.map_err(|_| Error::Config("invalid fake ip".into()))?;

		let dns_ip: Ipv4Addr = args
			.next()
			.ok_or_else(|| Error::Config(USAGE.into()))?
			.parse()
			.map_err(|_| Error::Config("invalid dns ip".into()))?;

		let dns_port: u16 = args
			.next()
			.ok_or_else(|| Error::Config(USAGE.into()))?
			.parse()
			.map_err(|_| Error::Config("invalid dns port".into()))?;

		let www_ip = match args.next() {
			Some(s) => Some(s.parse().map_err(|_| Error::Config("invalid www ip".into()))?),
			None => None,
		};

		if args.next().is_some() {
			return Err(Error::Config(USAGE.into()));
		}

		Ok(Self { log_path, alpha, listen_port, fake_ip, dns_ip, dns_port, www_ip })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(s: &str) -> Vec<String> {
		s.split_whitespace().map(str::to_owned).collect()
	}

	#[test]
	fn parses_without_www_ip() {
		let cfg = Config::parse(&args("log.txt 0.8 9090 10.0.0.5 10.0.0.1 5300")).unwrap();
		assert_eq!(cfg.alpha, 0.8);
		assert_eq!(cfg.www_ip, None);
	}

	#[test]
	fn parses_with_www_ip() {
		let cfg = Config::parse(&args("log.txt 0.8 9090 10.0.0.5 10.0.0.1 5300 93.184.216.34")).unwrap();
		assert_eq!(cfg.www_ip, Some("93.184.216.34".parse().unwrap()));
	}

	#[test]
	fn alpha_out_of_range_is_rejected() {
		assert!(Config::parse(&args("log.txt 0.0 9090 10.0.0.5 10.0.0.1 5300")).is_err());
		assert!(Config::parse(&args("log.txt 1.5 9090 10.0.0.5 10.0.0.1 5300")).is_err());
	}

	#[test]
	fn missing_arguments_is_rejected() {
		assert!(Config::parse(&args("log.txt 0.8")).is_err());
	}
}
