//! The TCP protocol speaking generator.
//!
//! One connection is made at startup and held for the life of the process.
//! Every cycle the full key space is serialized into a single newline
//! delimited payload and written in one go, after which the generator sleeps
//! for the configured delay. There is no reconnect: a failed connect or a
//! failed write ends the run.
//!
//! ## Metrics
//!
//! `bytes_written`: Bytes sent successfully
//! `lines_sent`: Metric lines sent successfully
//! `cycles`: Payloads sent successfully
//! `request_failure`: Number of failed writes
//! `connection_failure`: Number of connection failures
//!

use std::time::{SystemTime, UNIX_EPOCH};

use keystorm_payload::Graphite;
use metrics::counter;
use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    time::{Duration, sleep},
};
use tracing::{debug, info};

use crate::{config::Config, signals};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Tcp`].
pub enum Error {
    /// The key space could not be built or serialized.
    #[error("Payload error: {0}")]
    Payload(#[from] keystorm_payload::Error),
    /// Error connecting to the carbon relay
    #[error("Couldn't connect to {host} on port {port}, is carbon-cache running? {source}")]
    ConnectionFailed {
        /// Target host
        host: String,
        /// Target port
        port: u16,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
    /// Error writing to the TCP socket
    #[error("Failed to write {bytes} bytes to {addr}: {source}")]
    WriteFailed {
        /// Target address
        addr: String,
        /// Size of the payload that failed
        bytes: usize,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
}

/// Current Unix time in whole seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[derive(Debug)]
/// The TCP generator.
///
/// This generator is responsible for connecting to the carbon relay and
/// streaming the key space into it.
pub struct Tcp {
    addr: String,
    connection: TcpStream,
    graphite: Graphite,
    rng: StdRng,
    delay: Duration,
    buffer: Vec<u8>,
    metric_labels: Vec<(String, String)>,
    shutdown: signals::Watcher,
}

impl Tcp {
    /// Connect to the configured relay and build the key space.
    ///
    /// The application name table is generated here, once, after the
    /// connection is made.
    ///
    /// # Errors
    ///
    /// Function will error if the connection cannot be established or the key
    /// space configuration is invalid. No retry is attempted.
    pub async fn connect(config: &Config, shutdown: signals::Watcher) -> Result<Self, Error> {
        let metric_labels = vec![
            ("component".to_string(), "generator".to_string()),
            ("component_name".to_string(), "tcp".to_string()),
        ];
        let mut rng = match config.seed {
            Some(seed) => StdRng::from_seed(seed),
            None => StdRng::from_os_rng(),
        };

        let connection = match TcpStream::connect((config.host.as_str(), config.port)).await {
            Ok(connection) => connection,
            Err(source) => {
                let mut error_labels = metric_labels.clone();
                error_labels.push(("error".to_string(), source.to_string()));
                counter!("connection_failure", &error_labels).increment(1);
                return Err(Error::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source: Box::new(source),
                });
            }
        };
        let addr = connection
            .peer_addr()
            .map_or_else(|_| format!("{}:{}", config.host, config.port), |a| a.to_string());
        info!("Connected to {addr}.");

        let graphite = Graphite::new(config.key_space.clone(), &mut rng)?;

        Ok(Self {
            addr,
            connection,
            graphite,
            rng,
            delay: Duration::from_secs(config.delay_seconds),
            buffer: Vec::new(),
            metric_labels,
            shutdown,
        })
    }

    /// Run one cycle: build the key space stamped with `now` and write it to
    /// the relay. Returns the number of lines sent, or `None` if the shutdown
    /// signal arrived before the payload was fully written.
    ///
    /// # Errors
    ///
    /// Function will error if the payload cannot be written to the socket.
    pub async fn tick(&mut self, now: u64) -> Result<Option<u64>, Error> {
        self.buffer.clear();
        let lines = self
            .graphite
            .to_bytes(now, &mut self.rng, &mut self.buffer)?;

        info!("sending metrics count: {lines}");
        // A relay that stops reading must not hold the process past shutdown.
        let res = tokio::select! {
            res = self.connection.write_all(&self.buffer) => res,
            () = self.shutdown.recv() => {
                info!("shutdown signal received mid-write, abandoning payload");
                return Ok(None);
            },
        };
        if let Err(err) = res {
            let mut error_labels = self.metric_labels.clone();
            error_labels.push(("error".to_string(), err.to_string()));
            counter!("request_failure", &error_labels).increment(1);
            return Err(Error::WriteFailed {
                addr: self.addr.clone(),
                bytes: self.buffer.len(),
                source: Box::new(err),
            });
        }
        counter!("bytes_written", &self.metric_labels).increment(self.buffer.len() as u64);
        counter!("lines_sent", &self.metric_labels).increment(lines);
        counter!("cycles", &self.metric_labels).increment(1);
        info!("sent.{}", "-".repeat(80));

        Ok(Some(lines))
    }

    /// Run [`Tcp`] until a shutdown signal is received.
    ///
    /// The signal is observed while sleeping between cycles and while a
    /// payload is being written. Building a payload is never interrupted.
    ///
    /// # Errors
    ///
    /// Function will return an error when the TCP socket cannot be written to.
    pub async fn spin(mut self) -> Result<(), Error> {
        loop {
            if self.shutdown.try_recv() {
                info!("shutdown signal received");
                return Ok(());
            }
            if self.tick(unix_now()).await?.is_none() {
                return Ok(());
            }

            debug!("sleeping for {delay:?}", delay = self.delay);
            tokio::select! {
                () = sleep(self.delay) => {},
                () = self.shutdown.recv() => {
                    info!("shutdown signal received");
                    return Ok(());
                },
            }
        }
    }

    /// The key-space generator driving this connection.
    #[must_use]
    pub fn graphite(&self) -> &Graphite {
        &self.graphite
    }
}

#[cfg(test)]
mod test {
    use tokio::{
        io::AsyncReadExt,
        net::TcpListener,
        time::{Duration, timeout},
    };

    use super::{Error, Tcp};
    use crate::{config::Config, signals};

    fn config(port: u16) -> Config {
        let mut config = default_key_space(port);
        config.key_space = Config::parse(
            r"
key_space:
  nodes: 2
  applications: 1
  apis: 1
  statuses: [200]
",
        )
        .expect("valid key space")
        .key_space;
        config
    }

    fn default_key_space(port: u16) -> Config {
        let contents = format!(
            r"
host: 127.0.0.1
port: {port}
delay_seconds: 3600
seed: [7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7]
"
        );
        Config::parse(&contents).expect("valid config")
    }

    #[tokio::test]
    async fn connection_refused_names_destination() {
        // Bind then drop to find a port with no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let (watcher, _broadcaster) = signals::signal();
        let err = Tcp::connect(&config(port), watcher)
            .await
            .expect_err("nothing is listening");
        match &err {
            Error::ConnectionFailed { host, port: p, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(*p, port);
            }
            other => panic!("unexpected error: {other}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1"));
        assert!(msg.contains(&port.to_string()));
    }

    #[tokio::test]
    async fn one_cycle_delivers_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let config = config(port);
        let (watcher, broadcaster) = signals::signal();
        let (tcp, accepted) = tokio::join!(Tcp::connect(&config, watcher), listener.accept());
        let mut tcp = tcp.expect("connect");
        let (mut socket, _) = accepted.expect("accept");

        let sent = tcp.tick(1_700_000_000).await.expect("write");
        assert_eq!(sent, Some(8));
        drop(broadcaster);
        tcp.spin().await.expect("clean shutdown");

        let mut received = String::new();
        timeout(Duration::from_secs(5), socket.read_to_string(&mut received))
            .await
            .expect("peer closes after shutdown")
            .expect("read");

        assert!(received.ends_with('\n'));
        assert!(!received.ends_with("\n\n"));
        let lines: Vec<&str> = received.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(
            lines[0],
            "metrics.node-1.api.ac.sccSc1.sccSp1.sccApp1.api_v1_0.200.count 1 1700000000"
        );
        assert!(
            lines[4].starts_with("metrics.node-2.api.ac.sccSc1.sccSp1.sccApp1.api_v1_0.200.count ")
        );
        for line in lines {
            assert!(line.ends_with(" 1700000000"));
        }
    }

    #[tokio::test]
    async fn spin_stops_on_signal_between_cycles() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let config = config(port);
        let (watcher, broadcaster) = signals::signal();
        let (tcp, accepted) = tokio::join!(Tcp::connect(&config, watcher), listener.accept());
        let tcp = tcp.expect("connect");
        let (mut socket, _) = accepted.expect("accept");

        let spin = tokio::spawn(tcp.spin());
        let mut first = vec![0u8; 1];
        socket.read_exact(&mut first).await.expect("first cycle arrives");
        broadcaster.signal();

        timeout(Duration::from_secs(5), spin)
            .await
            .expect("spin returns while sleeping")
            .expect("join")
            .expect("clean shutdown");
    }

    #[tokio::test]
    async fn spin_stops_on_signal_while_relay_stalls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        // 640,000 lines per cycle, far more than the socket buffers hold.
        let config = default_key_space(port);
        let (watcher, broadcaster) = signals::signal();
        let (tcp, accepted) = tokio::join!(Tcp::connect(&config, watcher), listener.accept());
        let tcp = tcp.expect("connect");
        // Held open and never read from.
        let (_socket, _) = accepted.expect("accept");

        let spin = tokio::spawn(tcp.spin());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!spin.is_finished(), "write must be blocked on the relay");
        broadcaster.signal();

        timeout(Duration::from_secs(5), spin)
            .await
            .expect("spin returns while the write is stalled")
            .expect("join")
            .expect("clean shutdown");
    }
}
