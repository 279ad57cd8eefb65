use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
    /// The address memosync should listen on. By default
    /// memosync will listen just on the IPv4 loopback.
    #[arg(short, long, env = "MEMOSYNC_ADDRESS")]
    address: Option<String>,

    /// The port memosync listens on.
    #[arg(short, long, env = "PORT", default_value_t = 30000)]
    port: u16,

    /// Where users and their memos are stored.
    #[arg(short, long, env = "DATABASE_URL", default_value = ".")]
    database: PathBuf,

    /// Secret used to sign and check session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    secret: String,
}

/// Process wide settings, fixed once parsed.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database: PathBuf,
    pub secret: String,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn config(self) -> Result<Config, AddrParseError> {
        let addr = self.addr()?;

        Ok(Config {
            addr,
            database: self.database,
            secret: self.secret,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["memosync", "--secret", "s", "-d", "data"]).unwrap();
        let config = args.config().unwrap();

        if std::env::var_os("PORT").is_none() {
            assert_eq!(config.addr, "127.0.0.1:30000".parse().unwrap());
        }
        assert_eq!(config.database, PathBuf::from("data"));
        assert_eq!(config.secret, "s");
    }

    #[test]
    fn bad_address() {
        let args =
            Args::try_parse_from(["memosync", "--secret", "s", "-a", "localhost"]).unwrap();
        assert!(args.config().is_err());
    }
}
