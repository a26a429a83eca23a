//! Command-line configuration and default sink selection

use crate::core::{Result, SharedLogger};
use crate::dispatch::DispatchOptions;
use crate::sinks::otel::{DEFAULT_OTLP_ENDPOINT, OTLP_ENDPOINT_ENV};
use crate::sinks::push::DEFAULT_PUSH_URL;
use crate::sinks::{
    connect, ConsoleSink, Facility, Network, PushConfig, PushSink, SyslogSink, TimestampSource,
};
use clap::{ArgAction, Parser};
#[cfg(feature = "console")]
use std::io::IsTerminal;
use std::sync::Arc;

/// Generate synthetic log traffic for log-ingestion pipelines
#[derive(Parser, Debug, Clone)]
#[command(name = "log-generator", author, version, about, long_about = None)]
pub struct Cli {
    /// Loki push URL
    #[arg(long, default_value = DEFAULT_PUSH_URL)]
    pub url: String,

    /// Dry run: print logs to stdout instead of shipping them
    #[arg(long)]
    pub dry: bool,

    /// Ship logs of `-otel` services to an OpenTelemetry collector
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub otel: bool,

    /// Loki tenant ID
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// Password for basic auth against the push endpoint
    #[arg(long)]
    pub token: Option<String>,

    /// Send RFC 5424 messages to a syslog receiver instead of Loki
    #[arg(long)]
    pub syslog: bool,

    /// Syslog network type: udp or tcp
    #[arg(long, default_value = "udp")]
    pub syslog_network: Network,

    /// Syslog remote address
    #[arg(long, default_value = "127.0.0.1:514")]
    pub syslog_addr: String,

    /// Stamp syslog messages with the record time instead of the send time
    #[arg(long)]
    pub syslog_record_time: bool,

    /// OTLP/gRPC collector endpoint
    #[arg(long, env = OTLP_ENDPOINT_ENV, default_value = DEFAULT_OTLP_ENDPOINT)]
    pub otel_endpoint: String,

    /// Seed for generated content; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Which backend receives the logs of non-OTel services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    Syslog,
    Push,
}

impl Cli {
    /// Dry run wins over syslog, syslog over push
    pub fn sink_kind(&self) -> SinkKind {
        if self.dry {
            SinkKind::Console
        } else if self.syslog {
            SinkKind::Syslog
        } else {
            SinkKind::Push
        }
    }

    pub fn push_config(&self) -> PushConfig {
        let mut config = PushConfig::new(self.url.clone());
        if let Some(tenant_id) = self.tenant_id.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_tenant_id(tenant_id);
        }
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }
        config
    }

    pub fn timestamp_source(&self) -> TimestampSource {
        if self.syslog_record_time {
            TimestampSource::RecordTime
        } else {
            TimestampSource::SendTime
        }
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            otel_enabled: self.otel,
            seed: self.seed,
        }
    }
}

/// Build the process-wide sink shared by every non-OTel producer
pub fn build_default_sink(cli: &Cli) -> Result<SharedLogger> {
    let sink: SharedLogger = match cli.sink_kind() {
        SinkKind::Console => {
            let sink = ConsoleSink::stdout();
            #[cfg(feature = "console")]
            let sink = sink.with_colors(std::io::stdout().is_terminal());
            Arc::new(sink)
        }
        SinkKind::Syslog => {
            let transport = connect(cli.syslog_network, &cli.syslog_addr)?;
            tracing::info!(
                network = %cli.syslog_network,
                addr = %cli.syslog_addr,
                "Sending logs to syslog"
            );
            Arc::new(
                SyslogSink::new(transport, Facility::Daemon)
                    .with_timestamp_source(cli.timestamp_source()),
            )
        }
        SinkKind::Push => {
            tracing::info!(url = %cli.url, "Pushing logs");
            Arc::new(PushSink::new(cli.push_config())?)
        }
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("log-generator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.url, "http://localhost:3100/loki/api/v1/push");
        assert!(!cli.dry);
        assert!(cli.otel);
        assert!(!cli.syslog);
        assert_eq!(cli.syslog_network, Network::Udp);
        assert_eq!(cli.syslog_addr, "127.0.0.1:514");
        assert_eq!(cli.sink_kind(), SinkKind::Push);
        assert_eq!(cli.timestamp_source(), TimestampSource::SendTime);
    }

    #[test]
    fn test_syslog_record_time_flag() {
        let cli = parse(&["--syslog", "--syslog-record-time"]);
        assert_eq!(cli.timestamp_source(), TimestampSource::RecordTime);
    }

    #[test]
    fn test_dry_wins_over_syslog() {
        assert_eq!(parse(&["--dry", "--syslog"]).sink_kind(), SinkKind::Console);
        assert_eq!(parse(&["--syslog"]).sink_kind(), SinkKind::Syslog);
    }

    #[test]
    fn test_otel_flag_can_be_disabled() {
        let cli = parse(&["--otel", "false", "--seed", "7"]);
        let options = cli.dispatch_options();
        assert!(!options.otel_enabled);
        assert_eq!(options.seed, Some(7));
    }

    #[test]
    fn test_syslog_network_parsing() {
        assert_eq!(parse(&["--syslog-network", "tcp"]).syslog_network, Network::Tcp);
        assert!(Cli::try_parse_from(["log-generator", "--syslog-network", "sctp"]).is_err());
    }

    #[test]
    fn test_push_config_skips_empty_credentials() {
        let config = parse(&["--tenant-id", "", "--token", "secret"]).push_config();
        assert_eq!(config.tenant_id, None);
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_build_default_sink_per_kind() {
        assert_eq!(build_default_sink(&parse(&["--dry"])).unwrap().name(), "console");

        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap().to_string();
        let cli = parse(&["--syslog", "--syslog-addr", &addr]);
        assert_eq!(build_default_sink(&cli).unwrap().name(), "syslog");

        assert_eq!(build_default_sink(&parse(&[])).unwrap().name(), "push");
    }

    #[test]
    fn test_unreachable_tcp_syslog_fails_startup() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let cli = parse(&["--syslog", "--syslog-network", "tcp", "--syslog-addr", &addr]);
        assert!(build_default_sink(&cli).is_err());
    }
}
