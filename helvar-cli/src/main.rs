//! # HelvarNET Command Line Tool
//!
//! Queries and controls Helvar lighting routers using [`helvar_client`], or serves a
//! lighting network described in YAML with the [`helvar_router`] emulation.
//!
//! ## Overview
//!
//! ```text
//! helvar --host 10.254.1.1 groups
//! helvar --host 10.254.1.1 recall --group 12 --block 1 --scene 3 --fade 150
//! helvar --host 10.254.1.1 raw '>V:1,C:191#'
//! helvar serve network.yml --port 50000
//! ```
use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use helvar_client::Client;
use helvar_protocol::{Message, Parameter, command::Destination};
use helvar_router::{
    network::Network,
    server::{Config, Server},
};

#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
struct Target {
    #[arg(short, long, help = "Group to address")]
    group: Option<u16>,

    #[arg(short, long, help = "Device address, e.g. 1.1.2.15")]
    device: Option<String>,
}

impl Target {
    fn destination(&self) -> Destination<'_> {
        match (&self.device, self.group) {
            (Some(address), _) => Destination::Device(address),
            (None, group) => Destination::Group(group.unwrap_or_default()),
        }
    }
}

#[derive(Subcommand, Clone)]
enum Command {
    #[command(flatten)]
    Router(RouterCommand),
    /// Serve a network described in YAML
    Serve {
        fixture: PathBuf,
        #[arg(short, long, default_value = "127.0.0.1")]
        ip: IpAddr,
        #[arg(short, long, default_value = "50000")]
        port: u16,
        #[arg(long, default_value = "1400", help = "Longest answer sent in one frame")]
        max_answer_len: usize,
    },
}

/// Commands sent to a router
#[derive(Subcommand, Clone)]
enum RouterCommand {
    /// List the clusters of the workgroup
    Clusters,
    /// List the groups of the workgroup with their names
    Groups,
    /// Print the time of the router network
    Time,
    /// List the devices of a group with their names and states
    Devices { group: u16 },
    /// Recall a scene
    Recall {
        #[command(flatten)]
        target: Target,
        #[arg(short, long, default_value = "1")]
        block: u8,
        #[arg(short, long)]
        scene: u8,
        #[arg(short, long, help = "Fade time in centiseconds")]
        fade: Option<u32>,
    },
    /// Set a direct level between 0 and 100
    Level {
        #[command(flatten)]
        target: Target,
        #[arg(short, long)]
        level: u8,
        #[arg(short, long, help = "Fade time in centiseconds")]
        fade: Option<u32>,
    },
    /// Send a raw frame and print the reply
    Raw { frame: String },
}

#[derive(Parser)]
#[command(about = "Query and control HelvarNET lighting routers", long_about=None)]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value = "50000")]
    port: u16,

    #[arg(short, long, default_value = "1", help = "Number of connections to open")]
    workers: usize,

    #[arg(short, long, default_value = "8", help = "Capacity of the request queue")]
    queue: usize,

    #[clap(subcommand)]
    command: Command,
}

fn fade(fade: Option<u32>) -> Vec<Parameter> {
    fade.map(Parameter::fade_time).into_iter().collect()
}

fn serve(fixture: PathBuf, addr: SocketAddr, max_answer_len: usize) -> Result<(), Box<dyn Error>> {
    log::info!("Loading network from {}", fixture.display());
    let network = Network::from_yaml_file(&fixture)?;
    log::debug!(
        "Network has {} cluster(s), {} router(s) and {} group(s)",
        network.clusters.len(),
        network.routers.len(),
        network.groups.len()
    );

    let config = Config {
        max_answer_len,
        ..Config::default()
    };
    log::info!("Binding to address: {}", addr);
    Server::new(network, config).listen(addr)
}

fn run(client: &Client, command: RouterCommand) -> Result<(), Box<dyn Error>> {
    match command {
        RouterCommand::Clusters => {
            for cluster in client.clusters()? {
                println!("{}", cluster.id);
            }
        }
        RouterCommand::Groups => {
            for group in client.groups()? {
                println!("{:>5}  {}", group.id, client.group_name(group.id)?);
            }
        }
        RouterCommand::Time => {
            let time = client.network_time()?;
            let seconds = time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_else(|e| -(e.duration().as_secs() as i64));
            println!("{}", seconds);
        }
        RouterCommand::Devices { group } => {
            for device in client.group_devices(group)? {
                let name = client.device_name(&device.address)?;
                let state = client.device_state(&device.address)?;
                println!("{:<12} {:<32} {:#010x}", device.address, name, state.bits());
            }
        }
        RouterCommand::Recall {
            target,
            block,
            scene,
            fade: f,
        } => client.recall_scene(target.destination(), block, scene, &fade(f))?,
        RouterCommand::Level {
            target,
            level,
            fade: f,
        } => client.direct_level(target.destination(), level, &fade(f))?,
        RouterCommand::Raw { frame } => {
            let message = Message::decode(&frame)?;
            log::debug!("Sending {}", message);
            match client.transceive(message)? {
                Some(reply) => println!("{}", reply),
                None => log::info!("Command is not answered by the router"),
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!(
        "Parsed arguments: host={}, port={}, workers={}, queue={}",
        cli.host,
        cli.port,
        cli.workers,
        cli.queue
    );

    let command = match cli.command {
        Command::Serve {
            fixture,
            ip,
            port,
            max_answer_len,
        } => return serve(fixture, SocketAddr::new(ip, port), max_answer_len),
        Command::Router(command) => command,
    };

    let client = Client::new(&cli.host, cli.port);
    let errors = client.connect(cli.workers, cli.queue)?;
    let result = run(&client, command);
    client.disconnect();
    for error in errors.iter().filter_map(|rx| rx.try_recv().ok()) {
        log::warn!("Connection stopped: {}", error);
    }
    result
}
