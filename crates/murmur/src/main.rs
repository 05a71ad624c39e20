use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use murmur::gossip::{Transport, UdpTransport};
use murmur::{Node, NodeConfig, DEFAULT_GOSSIP_ADDR, DEFAULT_UI_PORT};

#[derive(Parser, Debug)]
#[command(name = "murmur-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name used as the origin of our rumors.
    #[arg(short, long, default_value = "murmur")]
    name: String,

    /// Address peers reach us on.
    #[arg(short, long, default_value = DEFAULT_GOSSIP_ADDR)]
    gossip_addr: SocketAddr,

    /// Local client port, bound on 127.0.0.1.
    #[arg(short, long, default_value_t = DEFAULT_UI_PORT)]
    ui_port: u16,

    /// Comma-separated peer addresses.
    #[arg(short, long, value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// Flood simple messages only.
    #[arg(long)]
    simple: bool,

    /// Seconds between route announcements; 0 disables them.
    #[arg(long, default_value = "0")]
    rtimer: u64,

    /// Hop limit for private messages and transactions.
    #[arg(long, default_value = "10")]
    hop_limit: u32,

    /// Do not mine blocks.
    #[arg(long)]
    no_mine: bool,

    /// Seconds between status snapshots in the log.
    #[arg(long, default_value = "30")]
    status_interval: u64,
}

impl Args {
    fn node_config(&self) -> NodeConfig {
        let mut config =
            NodeConfig::new(self.name.clone(), self.gossip_addr).with_peers(self.peers.clone());
        config.client_addr = Some(SocketAddr::from(([127, 0, 0, 1], self.ui_port)));
        config.simple_mode = self.simple;
        config.gossip.hop_limit = self.hop_limit;
        config.gossip.route_rumor_interval =
            (self.rtimer > 0).then(|| Duration::from_secs(self.rtimer));
        config.mining.enabled = !self.no_mine;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    let config = args.node_config();

    let peers: Arc<dyn Transport> = Arc::new(
        UdpTransport::bind(config.gossip_addr)
            .await
            .with_context(|| format!("failed to bind gossip address {}", config.gossip_addr))?,
    );
    let client: Option<Arc<dyn Transport>> = match config.client_addr {
        Some(addr) => Some(Arc::new(
            UdpTransport::bind(addr)
                .await
                .with_context(|| format!("failed to bind client address {}", addr))?,
        )),
        None => None,
    };

    let node = Node::new(config);
    let handle = node.start(peers, client).context("failed to start node")?;

    let mut interval = time::interval(Duration::from_secs(args.status_interval.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, exiting gracefully");
                break;
            }
            _ = interval.tick() => {
                info!(
                    peers = ?node.peers(),
                    clock = ?node.vector_clock(),
                    routes = node.routes().len(),
                    chain_len = node.current_fork().len(),
                    tip = ?node.chain_tip(),
                    "status snapshot"
                );
            }
        }
    }

    handle.shutdown();
    Ok(())
}
